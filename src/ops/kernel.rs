//! Reduce kernels
//!
//! A [`ReduceKernel`] does the arithmetic of sparse-mm-reduce once the entry
//! points have validated every argument. [`CpuReduceKernel`] is the host
//! implementation; rows are independent, so with the `rayon` feature each
//! output row is computed on its own task.
//!
//! Selecting reductions record, for every output element, the CSR position
//! of the winning nonzero. Rows without nonzeros produce `0` and record the
//! sentinel position `nnz`.

use super::index_map::CscIndexMapping;
use super::reduce::ReductionType;
use crate::dtype::{Element, IndexElement};
use crate::error::{DeviceKind, Error, Result};
use crate::sparse::{index_from, CsrTensor};
use crate::tensor::DenseTensor;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Rows handed to one task unless configured otherwise
const DEFAULT_MIN_ROWS_PER_TASK: usize = 16;

/// Forward result: output values and, for selecting reductions, winner positions
pub type ForwardOutput<T, I> = (DenseTensor<T>, Option<DenseTensor<I>>);

/// Arithmetic backend of sparse-mm-reduce
///
/// Implementations may assume their arguments passed the contract check.
pub trait ReduceKernel {
    /// Device family every argument must live on
    fn device(&self) -> DeviceKind;

    /// `out[r, n] = reduce_{p in row r}(values[p] * other[col(p), n])`
    fn forward<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        other: &DenseTensor<T>,
        reduce: ReductionType,
    ) -> Result<ForwardOutput<T, I>>;

    /// Gradient w.r.t. the sparse values for `sum` / `mean`
    fn backward_values<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        other: &DenseTensor<T>,
        row_indices: &DenseTensor<I>,
        reduce: ReductionType,
    ) -> Result<DenseTensor<T>>;

    /// Gradient w.r.t. the sparse values for `amax` / `amin`
    fn backward_values_arg<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        other: &DenseTensor<T>,
        arg_out: &DenseTensor<I>,
    ) -> Result<DenseTensor<T>>;

    /// Gradient w.r.t. `other` for `sum` / `mean`
    fn backward_other<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        mapping: &CscIndexMapping<I>,
        reduce: ReductionType,
    ) -> Result<DenseTensor<T>>;

    /// Gradient w.r.t. `other` for `amax` / `amin`
    fn backward_other_arg<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        arg_out: &DenseTensor<I>,
    ) -> Result<DenseTensor<T>>;
}

/// Host reduce kernel
#[derive(Debug, Clone, Copy)]
pub struct CpuReduceKernel {
    min_rows_per_task: usize,
}

impl Default for CpuReduceKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuReduceKernel {
    /// Kernel with the default task granularity
    pub fn new() -> Self {
        Self {
            min_rows_per_task: DEFAULT_MIN_ROWS_PER_TASK,
        }
    }

    /// Set the smallest number of output rows a parallel task handles
    ///
    /// Has no effect without the `rayon` feature.
    pub fn with_min_rows_per_task(mut self, rows: usize) -> Self {
        self.min_rows_per_task = rows.max(1);
        self
    }

    /// Run `f(row, chunk)` over consecutive `width`-sized rows of `out`
    fn for_each_row<T, F>(&self, out: &mut [T], width: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        if width == 0 {
            return;
        }
        #[cfg(feature = "rayon")]
        out.par_chunks_mut(width)
            .enumerate()
            .with_min_len(self.min_rows_per_task)
            .for_each(|(row, chunk)| f(row, chunk));
        #[cfg(not(feature = "rayon"))]
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(row, chunk)| f(row, chunk));
    }
}

/// Shape of a tensor that must be a matrix
fn matrix_dims<T: bytemuck::Pod>(t: &DenseTensor<T>, name: &'static str) -> Result<[usize; 2]> {
    match *t.shape() {
        [rows, cols] => Ok([rows, cols]),
        ref other => Err(Error::rank_mismatch("reduce_kernel", name, 2, other.len())),
    }
}

/// Fails unless `t` has exactly the `expected` shape
fn require_shape<T: bytemuck::Pod>(
    t: &DenseTensor<T>,
    name: &'static str,
    expected: [usize; 2],
) -> Result<()> {
    let got = matrix_dims(t, name)?;
    for dim in 0..2 {
        if got[dim] != expected[dim] {
            return Err(Error::dim_size_mismatch(
                "reduce_kernel",
                name,
                dim,
                expected[dim],
                got[dim],
            ));
        }
    }
    Ok(())
}

/// Index tensor entries as host positions, each `< bound`
fn positions<I: IndexElement>(
    t: &DenseTensor<I>,
    name: &'static str,
    bound: usize,
) -> Result<Vec<usize>> {
    t.as_slice()
        .iter()
        .map(|&v| match v.to_index() {
            Some(p) if p < bound => Ok(p),
            _ => Err(Error::invalid_argument(
                name,
                format!("entry {:?} is out of range [0, {})", v, bound),
            )),
        })
        .collect()
}

/// Winner positions recorded in `arg_out`, one per output element
///
/// Each entry is either the sentinel `nnz` or a position inside its own row.
fn arg_positions<T: Element, I: IndexElement>(
    input: &CsrTensor<T, I>,
    arg_out: &DenseTensor<I>,
    width: usize,
) -> Result<Vec<usize>> {
    let nnz = input.nnz();
    let args = positions(arg_out, "arg_out", nnz + 1)?;
    for (i, &p) in args.iter().enumerate() {
        let row = i / width;
        if p != nnz && !input.row_range(row).contains(&p) {
            return Err(Error::invalid_argument(
                "arg_out",
                format!("position {} does not belong to row {}", p, row),
            ));
        }
    }
    Ok(args)
}

impl ReduceKernel for CpuReduceKernel {
    fn device(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn forward<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        other: &DenseTensor<T>,
        reduce: ReductionType,
    ) -> Result<ForwardOutput<T, I>> {
        let [nrows, ncols] = input.shape();
        let [_, width] = matrix_dims(other, "other")?;
        require_shape(other, "other", [ncols, width])?;

        let nnz = input.nnz();
        let crow = input.crow_positions();
        let cols = input.col_positions();
        let values = input.values().as_slice();
        let dense = other.as_slice();

        // Each row slot holds (value, winner position).
        let mut slots = vec![(T::zero(), nnz); nrows * width];
        self.for_each_row(&mut slots, width, |row, out_row| {
            let range = crow[row]..crow[row + 1];
            if range.is_empty() {
                return;
            }
            for (n, slot) in out_row.iter_mut().enumerate() {
                let mut acc = T::zero();
                let mut arg = nnz;
                for p in range.clone() {
                    let x = values[p] * dense[cols[p] * width + n];
                    match reduce {
                        ReductionType::Sum | ReductionType::Mean => acc = acc + x,
                        ReductionType::Amax => {
                            if arg == nnz || x > acc || x.is_nan() {
                                acc = x;
                                arg = p;
                            }
                        }
                        ReductionType::Amin => {
                            if arg == nnz || x < acc || x.is_nan() {
                                acc = x;
                                arg = p;
                            }
                        }
                    }
                }
                if reduce == ReductionType::Mean {
                    acc = acc / T::from_f64(range.len() as f64);
                }
                *slot = (acc, arg);
            }
        });

        let (out, args): (Vec<T>, Vec<usize>) = slots.into_iter().unzip();
        let out = DenseTensor::try_from_vec(out, &[nrows, width])?;
        if !reduce.needs_arg_out() {
            return Ok((out, None));
        }
        let args = args
            .into_iter()
            .map(index_from::<I>)
            .collect::<Result<Vec<_>>>()?;
        Ok((out, Some(DenseTensor::try_from_vec(args, &[nrows, width])?)))
    }

    fn backward_values<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        other: &DenseTensor<T>,
        row_indices: &DenseTensor<I>,
        reduce: ReductionType,
    ) -> Result<DenseTensor<T>> {
        let [nrows, ncols] = input.shape();
        let [_, width] = matrix_dims(other, "other")?;
        require_shape(other, "other", [ncols, width])?;
        require_shape(grad_out, "grad_out", [nrows, width])?;

        let nnz = input.nnz();
        let rows = positions(row_indices, "row_indices", nrows)?;
        let cols = input.col_positions();
        let crow = input.crow_positions();
        let grad = grad_out.as_slice();
        let dense = other.as_slice();

        let mut out = vec![T::zero(); nnz];
        // One "row" per nonzero.
        self.for_each_row(&mut out, 1, |p, slot| {
            let row = rows[p];
            let col = cols[p];
            let mut acc = T::zero();
            for n in 0..width {
                acc = acc + grad[row * width + n] * dense[col * width + n];
            }
            if reduce == ReductionType::Mean {
                acc = acc / T::from_f64((crow[row + 1] - crow[row]) as f64);
            }
            slot[0] = acc;
        });

        DenseTensor::try_from_vec(out, &[nnz])
    }

    fn backward_values_arg<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        other: &DenseTensor<T>,
        arg_out: &DenseTensor<I>,
    ) -> Result<DenseTensor<T>> {
        let [nrows, ncols] = input.shape();
        let [_, width] = matrix_dims(other, "other")?;
        require_shape(other, "other", [ncols, width])?;
        require_shape(grad_out, "grad_out", [nrows, width])?;
        require_shape(arg_out, "arg_out", [nrows, width])?;

        let nnz = input.nnz();
        let cols = input.col_positions();
        let grad = grad_out.as_slice();
        let dense = other.as_slice();
        let mut out = vec![T::zero(); nnz];
        if width == 0 {
            return DenseTensor::try_from_vec(out, &[nnz]);
        }
        let args = arg_positions(input, arg_out, width)?;

        for (i, &p) in args.iter().enumerate() {
            if p == nnz {
                continue;
            }
            let n = i % width;
            out[p] = out[p] + dense[cols[p] * width + n] * grad[i];
        }

        DenseTensor::try_from_vec(out, &[nnz])
    }

    fn backward_other<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        mapping: &CscIndexMapping<I>,
        reduce: ReductionType,
    ) -> Result<DenseTensor<T>> {
        let [nrows, ncols] = input.shape();
        let [_, width] = matrix_dims(grad_out, "grad_out")?;
        require_shape(grad_out, "grad_out", [nrows, width])?;

        let nnz = input.nnz();
        let rows = positions(&mapping.row_indices, "row_indices", nrows)?;
        let ccol = positions(&mapping.ccol_indices, "ccol_indices", nnz + 1)?;
        let perm = positions(&mapping.csr2csc, "csr2csc", nnz)?;
        if ccol.len() != ncols + 1 || rows.len() != nnz || perm.len() != nnz {
            return Err(Error::invalid_argument(
                "ccol_indices",
                "index mapping does not match the sparse matrix",
            ));
        }
        if ccol[0] != 0 || ccol[ncols] != nnz || ccol.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::invalid_argument(
                "ccol_indices",
                "column pointers must start at 0, never decrease and end at nnz",
            ));
        }
        let crow = input.crow_positions();
        let values = input.values().as_slice();
        let grad = grad_out.as_slice();

        let mut out = vec![T::zero(); ncols * width];
        self.for_each_row(&mut out, width, |col, out_row| {
            for &p in &perm[ccol[col]..ccol[col + 1]] {
                let row = rows[p];
                let mut w = values[p];
                if reduce == ReductionType::Mean {
                    w = w / T::from_f64((crow[row + 1] - crow[row]) as f64);
                }
                let grad_row = &grad[row * width..(row + 1) * width];
                for (o, &g) in out_row.iter_mut().zip(grad_row) {
                    *o = *o + w * g;
                }
            }
        });

        DenseTensor::try_from_vec(out, &[ncols, width])
    }

    fn backward_other_arg<T: Element, I: IndexElement>(
        &self,
        input: &CsrTensor<T, I>,
        grad_out: &DenseTensor<T>,
        arg_out: &DenseTensor<I>,
    ) -> Result<DenseTensor<T>> {
        let [nrows, ncols] = input.shape();
        let [_, width] = matrix_dims(grad_out, "grad_out")?;
        require_shape(grad_out, "grad_out", [nrows, width])?;
        require_shape(arg_out, "arg_out", [nrows, width])?;

        let nnz = input.nnz();
        let mut out = vec![T::zero(); ncols * width];
        if width == 0 {
            return DenseTensor::try_from_vec(out, &[ncols, width]);
        }
        let args = arg_positions(input, arg_out, width)?;
        let cols = input.col_positions();
        let values = input.values().as_slice();
        let grad = grad_out.as_slice();

        for (i, &p) in args.iter().enumerate() {
            if p == nnz {
                continue;
            }
            let idx = cols[p] * width + i % width;
            out[idx] = out[idx] + values[p] * grad[i];
        }

        DenseTensor::try_from_vec(out, &[ncols, width])
    }
}
