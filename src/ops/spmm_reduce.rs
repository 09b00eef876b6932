//! Forward and backward entry points
//!
//! Both validate every argument before the kernel touches element storage.
//! Forward short-circuits when the sparse operand has no nonzeros; backward
//! builds the CSC index mapping once and shares it between gradients.

use super::index_map::{CpuIndexMapper, IndexMapper};
use super::kernel::{CpuReduceKernel, ForwardOutput, ReduceKernel};
use super::reduce::ReductionType;
use crate::dtype::{Element, IndexElement};
use crate::error::{Error, Result};
use crate::sparse::{is_sparse_and_zero, CsrTensor, StorageLayout};
use crate::tensor::{DenseTensor, TensorMeta};
use crate::validate::{
    check_sparse_mm_reduce_inputs, require_device, require_dim, require_dim_size, require_layout,
    require_scalar_type, CheckMode, CheckedFrom, IndexArray, SpmmReduceArgs, BACKWARD_OP,
    FORWARD_OP,
};

/// Which gradients a backward call computes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackwardMask {
    /// Gradient w.r.t. the sparse operand's values
    pub input: bool,
    /// Gradient w.r.t. the dense operand
    pub other: bool,
}

impl BackwardMask {
    /// Both gradients
    pub const ALL: BackwardMask = BackwardMask {
        input: true,
        other: true,
    };
}

impl Default for BackwardMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Gradients produced by [`sparse_mm_reduce_backward`]
#[derive(Debug, Clone, PartialEq)]
pub struct SpmmReduceGrads<T, I = i64> {
    /// Same sparsity structure as the forward input, gradient as values
    pub input: Option<CsrTensor<T, I>>,
    /// Gradient w.r.t. `other`, shaped like `other`
    pub other: Option<DenseTensor<T>>,
}

/// `out[r, n] = reduce_{p in row r}(values[p] * other[col(p), n])` on the host
///
/// Returns the output and, for `amax` / `amin`, the CSR position of the
/// nonzero selected for every output element.
///
/// # Example
///
/// ```
/// use spmm_reduce::prelude::*;
///
/// // [1, 0]
/// // [0, 2]
/// let s = CsrTensor::<f32>::from_slices(&[0, 1, 2], &[0, 1], &[1.0, 2.0], [2, 2])?;
/// let other = DenseTensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
/// let (out, arg) = sparse_mm_reduce(&s, &other, ReductionType::Sum)?;
/// assert_eq!(out.as_slice(), &[1.0, 2.0, 6.0, 8.0]);
/// assert!(arg.is_none());
/// # Ok::<(), spmm_reduce::error::Error>(())
/// ```
pub fn sparse_mm_reduce<T, I>(
    input: &CsrTensor<T, I>,
    other: &DenseTensor<T>,
    reduce: ReductionType,
) -> Result<ForwardOutput<T, I>>
where
    T: Element,
    I: IndexElement,
{
    sparse_mm_reduce_with(&CpuReduceKernel::new(), input, other, reduce)
}

/// Forward pass on a caller-provided kernel
pub fn sparse_mm_reduce_with<K, T, I>(
    kernel: &K,
    input: &CsrTensor<T, I>,
    other: &DenseTensor<T>,
    reduce: ReductionType,
) -> Result<ForwardOutput<T, I>>
where
    K: ReduceKernel,
    T: Element,
    I: IndexElement,
{
    let op = FORWARD_OP;

    if is_sparse_and_zero(input) {
        require_dim(op, other, 2, "other")?;
        require_dim_size(op, other, 0, input.ncols(), "other")?;
        let shape = [input.nrows(), TensorMeta::size(other, 1)?];
        tracing::trace!(?shape, %reduce, "sparse operand has no nonzeros");
        let arg_out = if reduce.needs_arg_out() {
            Some(DenseTensor::zeros(&shape))
        } else {
            None
        };
        return Ok((DenseTensor::zeros(&shape), arg_out));
    }

    check_sparse_mm_reduce_inputs(CheckMode::Forward, &SpmmReduceArgs::new(input, other))?;
    require_on_kernel_device(
        op,
        kernel,
        &[
            (input as &dyn TensorMeta, "self"),
            (other as &dyn TensorMeta, "other"),
        ],
    )?;

    tracing::debug!(
        %reduce,
        nrows = input.nrows(),
        ncols = input.ncols(),
        nnz = input.nnz(),
        "dispatching sparse_mm_reduce kernel"
    );
    kernel.forward(input, other, reduce)
}

/// Gradients of [`sparse_mm_reduce`] on the host
///
/// `arg_out` is the selection recorded by the forward pass and is required
/// for `amax` / `amin`. Only the gradients enabled in `mask` are computed.
pub fn sparse_mm_reduce_backward<T, I>(
    input: &CsrTensor<T, I>,
    grad_out: &DenseTensor<T>,
    other: &DenseTensor<T>,
    reduce: ReductionType,
    arg_out: Option<&DenseTensor<I>>,
    mask: BackwardMask,
) -> Result<SpmmReduceGrads<T, I>>
where
    T: Element,
    I: IndexElement,
{
    sparse_mm_reduce_backward_with(
        &CpuReduceKernel::new(),
        &CpuIndexMapper,
        input,
        grad_out,
        other,
        reduce,
        arg_out,
        mask,
    )
}

/// Backward pass on a caller-provided kernel and index mapper
#[allow(clippy::too_many_arguments)]
pub fn sparse_mm_reduce_backward_with<K, M, T, I>(
    kernel: &K,
    mapper: &M,
    input: &CsrTensor<T, I>,
    grad_out: &DenseTensor<T>,
    other: &DenseTensor<T>,
    reduce: ReductionType,
    arg_out: Option<&DenseTensor<I>>,
    mask: BackwardMask,
) -> Result<SpmmReduceGrads<T, I>>
where
    K: ReduceKernel,
    M: IndexMapper,
    T: Element,
    I: IndexElement,
{
    let op = BACKWARD_OP;

    if reduce.needs_arg_out() {
        let arg_out = arg_out.ok_or_else(|| {
            Error::invalid_argument("arg_out", format!("required by {} backward", reduce))
        })?;

        check_sparse_mm_reduce_inputs(
            CheckMode::Backward,
            &SpmmReduceArgs::new(input, other).grad_out(grad_out),
        )?;
        check_arg_out(op, input, other, arg_out)?;
        require_on_kernel_device(
            op,
            kernel,
            &[
                (input as &dyn TensorMeta, "self"),
                (grad_out as &dyn TensorMeta, "grad_out"),
                (other as &dyn TensorMeta, "other"),
                (arg_out as &dyn TensorMeta, "arg_out"),
            ],
        )?;

        tracing::debug!(%reduce, ?mask, nnz = input.nnz(), "dispatching backward kernels");
        let grad_values = mask
            .input
            .then(|| kernel.backward_values_arg(input, grad_out, other, arg_out))
            .transpose()?;
        let grad_other = mask
            .other
            .then(|| kernel.backward_other_arg(input, grad_out, arg_out))
            .transpose()?;
        return finish(input, grad_values, grad_other);
    }

    // The value gradient only needs row_indices; the dense gradient needs the
    // whole mapping, which includes them.
    let mapping = if mask.other {
        Some(mapper.csr_to_csc(input)?)
    } else {
        None
    };
    let row_indices = match (&mapping, mask.input) {
        (Some(m), _) => Some(m.row_indices.clone()),
        (None, true) => Some(mapper.row_indices(input)?),
        (None, false) => None,
    };

    let mut args = SpmmReduceArgs::new(input, other).grad_out(grad_out);
    if let Some(rows) = &row_indices {
        args = args.index_array(IndexArray::RowIndices, rows);
    }
    if let Some(m) = &mapping {
        args = args
            .index_array(IndexArray::CcolIndices, &m.ccol_indices)
            .index_array(IndexArray::Csr2Csc, &m.csr2csc);
    }
    check_sparse_mm_reduce_inputs(CheckMode::Backward, &args)?;

    let mut on_device: Vec<(&dyn TensorMeta, &'static str)> = vec![
        (input as &dyn TensorMeta, "self"),
        (grad_out as &dyn TensorMeta, "grad_out"),
        (other as &dyn TensorMeta, "other"),
    ];
    for which in IndexArray::ALL {
        if let Some(t) = args.get_index_array(which) {
            on_device.push((t, which.name()));
        }
    }
    require_on_kernel_device(op, kernel, &on_device)?;

    tracing::debug!(%reduce, ?mask, nnz = input.nnz(), "dispatching backward kernels");
    let grad_values = match &row_indices {
        Some(rows) if mask.input => {
            Some(kernel.backward_values(input, grad_out, other, rows, reduce)?)
        }
        _ => None,
    };
    let grad_other = match &mapping {
        Some(m) => Some(kernel.backward_other(input, grad_out, m, reduce)?),
        None => None,
    };
    finish(input, grad_values, grad_other)
}

/// `arg_out` must be a strided `[self.rows, other.cols]` matrix of the index dtype
fn check_arg_out<T, I>(
    op: CheckedFrom,
    input: &CsrTensor<T, I>,
    other: &DenseTensor<T>,
    arg_out: &DenseTensor<I>,
) -> Result<()>
where
    T: Element,
    I: IndexElement,
{
    require_layout(op, arg_out, StorageLayout::Strided, "arg_out")?;
    require_scalar_type(op, arg_out, I::DTYPE, "arg_out")?;
    require_dim(op, arg_out, 2, "arg_out")?;
    require_dim_size(op, arg_out, 0, input.nrows(), "arg_out")?;
    require_dim_size(op, arg_out, 1, TensorMeta::size(other, 1)?, "arg_out")
}

fn require_on_kernel_device<K: ReduceKernel>(
    op: CheckedFrom,
    kernel: &K,
    tensors: &[(&dyn TensorMeta, &'static str)],
) -> Result<()> {
    let kind = kernel.device();
    for &(tensor, name) in tensors {
        require_device(op, tensor, kind, name)?;
    }
    Ok(())
}

fn finish<T: Element, I: IndexElement>(
    input: &CsrTensor<T, I>,
    grad_values: Option<DenseTensor<T>>,
    grad_other: Option<DenseTensor<T>>,
) -> Result<SpmmReduceGrads<T, I>> {
    let input = grad_values.map(|v| input.with_values(v)).transpose()?;
    Ok(SpmmReduceGrads {
        input,
        other: grad_other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeviceKind, ViolationKind};
    use crate::ops::index_map::CscIndexMapping;

    /// Kernel that claims accelerator residency and never computes
    struct AcceleratorKernel;

    impl ReduceKernel for AcceleratorKernel {
        fn device(&self) -> DeviceKind {
            DeviceKind::Cuda
        }

        fn forward<T: Element, I: IndexElement>(
            &self,
            _: &CsrTensor<T, I>,
            _: &DenseTensor<T>,
            _: ReductionType,
        ) -> Result<ForwardOutput<T, I>> {
            unreachable!("device check must fail first")
        }

        fn backward_values<T: Element, I: IndexElement>(
            &self,
            _: &CsrTensor<T, I>,
            _: &DenseTensor<T>,
            _: &DenseTensor<T>,
            _: &DenseTensor<I>,
            _: ReductionType,
        ) -> Result<DenseTensor<T>> {
            unreachable!("device check must fail first")
        }

        fn backward_values_arg<T: Element, I: IndexElement>(
            &self,
            _: &CsrTensor<T, I>,
            _: &DenseTensor<T>,
            _: &DenseTensor<T>,
            _: &DenseTensor<I>,
        ) -> Result<DenseTensor<T>> {
            unreachable!("device check must fail first")
        }

        fn backward_other<T: Element, I: IndexElement>(
            &self,
            _: &CsrTensor<T, I>,
            _: &DenseTensor<T>,
            _: &CscIndexMapping<I>,
            _: ReductionType,
        ) -> Result<DenseTensor<T>> {
            unreachable!("device check must fail first")
        }

        fn backward_other_arg<T: Element, I: IndexElement>(
            &self,
            _: &CsrTensor<T, I>,
            _: &DenseTensor<T>,
            _: &DenseTensor<I>,
        ) -> Result<DenseTensor<T>> {
            unreachable!("device check must fail first")
        }
    }

    /// Host mapper whose column pointers for columns 0 and 1 are swapped
    struct SwappedColumnsMapper;

    impl IndexMapper for SwappedColumnsMapper {
        fn row_indices<T: Element, I: IndexElement>(
            &self,
            csr: &CsrTensor<T, I>,
        ) -> Result<DenseTensor<I>> {
            CpuIndexMapper.row_indices(csr)
        }

        fn csr_to_csc<T: Element, I: IndexElement>(
            &self,
            csr: &CsrTensor<T, I>,
        ) -> Result<CscIndexMapping<I>> {
            let mut mapping = CpuIndexMapper.csr_to_csc(csr)?;
            let mut ccol = mapping.ccol_indices.to_vec();
            ccol.swap(1, 2);
            mapping.ccol_indices = DenseTensor::try_from_vec(ccol, &[csr.ncols() + 1])?;
            Ok(mapping)
        }
    }

    // [1, 0, 2, 0]
    // [0, 0, 0, 0]
    // [0, 3, 0, 0]
    fn sample() -> CsrTensor<f32> {
        CsrTensor::from_slices(&[0, 2, 2, 3], &[0, 2, 1], &[1.0, 2.0, 3.0], [3, 4]).unwrap()
    }

    fn other() -> DenseTensor<f32> {
        DenseTensor::from_slice(&(0..20).map(|v| v as f32).collect::<Vec<_>>(), &[4, 5])
    }

    #[test]
    fn test_forward_on_host() {
        let (out, arg) = sparse_mm_reduce(&sample(), &other(), ReductionType::Amax).unwrap();
        assert_eq!(out.shape(), &[3, 5]);
        let arg = arg.unwrap();
        assert_eq!(arg.shape(), &[3, 5]);
        // empty row keeps the sentinel
        assert_eq!(arg.get(&[1, 0]), Some(3));
    }

    #[test]
    fn test_forward_device_mismatch() {
        let err = sparse_mm_reduce_with(&AcceleratorKernel, &sample(), &other(), ReductionType::Sum)
            .unwrap_err();
        assert_eq!(err.violation(), ViolationKind::DeviceMismatch);
        assert_eq!(err.arg(), Some("self"));
        assert_eq!(err.op(), Some(FORWARD_OP));
    }

    #[test]
    fn test_forward_contract_before_device() {
        let bad = DenseTensor::<f32>::zeros(&[5, 5]);
        let err = sparse_mm_reduce_with(&AcceleratorKernel, &sample(), &bad, ReductionType::Sum)
            .unwrap_err();
        assert_eq!(err, Error::dim_size_mismatch(FORWARD_OP, "other", 0, 4, 5));
    }

    #[test]
    fn test_zero_sparse_fast_path() {
        let empty = CsrTensor::<f32>::empty([3, 4]);
        let other = DenseTensor::<f32>::full(&[4, 2], 1.0);
        let (out, arg) = sparse_mm_reduce(&empty, &other, ReductionType::Amin).unwrap();
        assert_eq!(out.as_slice(), &[0.0; 6]);
        assert_eq!(arg.unwrap().as_slice(), &[0i64; 6]);

        let (_, arg) = sparse_mm_reduce(&empty, &other, ReductionType::Mean).unwrap();
        assert!(arg.is_none());

        let vector = DenseTensor::<f32>::zeros(&[4]);
        let err = sparse_mm_reduce(&empty, &vector, ReductionType::Sum).unwrap_err();
        assert_eq!(err.violation(), ViolationKind::ShapeMismatch);

        let tall = DenseTensor::<f32>::zeros(&[5, 5]);
        let err = sparse_mm_reduce(&empty, &tall, ReductionType::Sum).unwrap_err();
        assert_eq!(err, Error::dim_size_mismatch(FORWARD_OP, "other", 0, 4, 5));
    }

    #[test]
    fn test_backward_requires_arg_out() {
        let grad = DenseTensor::<f32>::zeros(&[3, 5]);
        let err = sparse_mm_reduce_backward(
            &sample(),
            &grad,
            &other(),
            ReductionType::Amax,
            None,
            BackwardMask::ALL,
        )
        .unwrap_err();
        assert_eq!(err.arg(), Some("arg_out"));
        assert_eq!(err.violation(), ViolationKind::InvalidArgument);
    }

    #[test]
    fn test_backward_arg_out_shape() {
        let grad = DenseTensor::<f32>::zeros(&[3, 5]);
        let arg = DenseTensor::<i64>::zeros(&[3, 4]);
        let err = sparse_mm_reduce_backward(
            &sample(),
            &grad,
            &other(),
            ReductionType::Amin,
            Some(&arg),
            BackwardMask::ALL,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::dim_size_mismatch(BACKWARD_OP, "arg_out", 1, 5, 4)
        );
    }

    #[test]
    fn test_backward_mask() {
        let grad = DenseTensor::<f32>::full(&[3, 5], 1.0);
        let grads = sparse_mm_reduce_backward(
            &sample(),
            &grad,
            &other(),
            ReductionType::Sum,
            None,
            BackwardMask {
                input: false,
                other: true,
            },
        )
        .unwrap();
        assert!(grads.input.is_none());
        assert_eq!(grads.other.unwrap().shape(), &[4, 5]);

        let grads = sparse_mm_reduce_backward(
            &sample(),
            &grad,
            &other(),
            ReductionType::Mean,
            None,
            BackwardMask {
                input: true,
                other: false,
            },
        )
        .unwrap();
        let grad_self = grads.input.unwrap();
        assert_eq!(grad_self.col_indices(), sample().col_indices());
        assert!(grads.other.is_none());
    }

    #[test]
    fn test_backward_grad_out_checked() {
        let grad = DenseTensor::<f32>::zeros(&[4, 5]);
        let err = sparse_mm_reduce_backward(
            &sample(),
            &grad,
            &other(),
            ReductionType::Sum,
            None,
            BackwardMask::ALL,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::dim_size_mismatch(BACKWARD_OP, "grad_out", 0, 3, 4)
        );
    }

    #[test]
    fn test_backward_device_mismatch() {
        let grad = DenseTensor::<f32>::zeros(&[3, 5]);
        let err = sparse_mm_reduce_backward_with(
            &AcceleratorKernel,
            &CpuIndexMapper,
            &sample(),
            &grad,
            &other(),
            ReductionType::Sum,
            None,
            BackwardMask::ALL,
        )
        .unwrap_err();
        assert_eq!(err.violation(), ViolationKind::DeviceMismatch);
        assert_eq!(err.op(), Some(BACKWARD_OP));
    }

    #[test]
    fn test_backward_rejects_unordered_column_pointers() {
        let grad = DenseTensor::<f32>::full(&[3, 5], 1.0);
        // [0, 1, 2, 3, 3] becomes [0, 2, 1, 3, 3]
        let err = sparse_mm_reduce_backward_with(
            &CpuReduceKernel::new(),
            &SwappedColumnsMapper,
            &sample(),
            &grad,
            &other(),
            ReductionType::Sum,
            None,
            BackwardMask::ALL,
        )
        .unwrap_err();
        assert_eq!(err.violation(), ViolationKind::InvalidArgument);
        assert_eq!(err.arg(), Some("ccol_indices"));
    }
}
