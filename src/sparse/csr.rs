//! CSR tensor: struct, creation, getters

use super::format::StorageLayout;
use crate::dtype::{DType, Element, IndexElement};
use crate::error::{Error, Result};
use crate::tensor::{DenseTensor, Device, TensorMeta};

/// CSR (Compressed Sparse Row) sparse matrix
///
/// Structural invariants, checked on construction:
/// - `crow_indices` has `nrows + 1` entries, starts at 0, never decreases
///   and ends at `nnz`
/// - `col_indices` and `values` both have `nnz` entries
/// - every column index lies in `[0, ncols)`
///
/// Column indices within a row need not be sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrTensor<T, I = i64> {
    pub(crate) crow_indices: DenseTensor<I>,
    pub(crate) col_indices: DenseTensor<I>,
    pub(crate) values: DenseTensor<T>,
    pub(crate) shape: [usize; 2],
}

impl<T: Element, I: IndexElement> CsrTensor<T, I> {
    /// Create a new CSR matrix from components
    ///
    /// # Arguments
    ///
    /// * `crow_indices` - Row pointers (length: nrows + 1)
    /// * `col_indices` - Column indices for each non-zero
    /// * `values` - Values at each position
    /// * `shape` - Matrix shape [nrows, ncols]
    ///
    /// # Errors
    ///
    /// Returns `InvalidStructure` if any CSR invariant is violated.
    pub fn new(
        crow_indices: DenseTensor<I>,
        col_indices: DenseTensor<I>,
        values: DenseTensor<T>,
        shape: [usize; 2],
    ) -> Result<Self> {
        let [nrows, ncols] = shape;

        if crow_indices.shape().len() != 1
            || col_indices.shape().len() != 1
            || values.shape().len() != 1
        {
            return Err(Error::invalid_csr(format!(
                "expected 1D components, got crow_indices: {}D, col_indices: {}D, values: {}D",
                crow_indices.shape().len(),
                col_indices.shape().len(),
                values.shape().len()
            )));
        }

        let nnz = values.numel();
        if crow_indices.numel() != nrows + 1 {
            return Err(Error::invalid_csr(format!(
                "crow_indices must have nrows + 1 = {} entries, got {}",
                nrows + 1,
                crow_indices.numel()
            )));
        }
        if col_indices.numel() != nnz {
            return Err(Error::invalid_csr(format!(
                "col_indices must have nnz = {} entries, got {}",
                nnz,
                col_indices.numel()
            )));
        }

        let crow = crow_indices.as_slice();
        if crow[0].to_index() != Some(0) {
            return Err(Error::invalid_csr(format!(
                "crow_indices[0] must be 0, got {:?}",
                crow[0]
            )));
        }
        for (row, pair) in crow.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(Error::invalid_csr(format!(
                    "crow_indices must be non-decreasing, but row {} has bounds {:?}..{:?}",
                    row, pair[0], pair[1]
                )));
            }
        }
        if crow[nrows].to_index() != Some(nnz) {
            return Err(Error::invalid_csr(format!(
                "crow_indices[{}] must equal nnz = {}, got {:?}",
                nrows, nnz, crow[nrows]
            )));
        }

        for (pos, &col) in col_indices.as_slice().iter().enumerate() {
            match col.to_index() {
                Some(c) if c < ncols => {}
                _ => {
                    return Err(Error::invalid_csr(format!(
                        "col_indices[{}] = {:?} is out of range for {} columns",
                        pos, col, ncols
                    )));
                }
            }
        }

        Ok(Self {
            crow_indices,
            col_indices,
            values,
            shape,
        })
    }

    /// Create a CSR matrix from host slices
    ///
    /// # Example
    ///
    /// ```
    /// use spmm_reduce::sparse::CsrTensor;
    ///
    /// // [1, 0, 2]
    /// // [0, 0, 3]
    /// let csr = CsrTensor::<f32>::from_slices(&[0, 2, 3], &[0, 2, 2], &[1.0, 2.0, 3.0], [2, 3])?;
    /// assert_eq!(csr.nnz(), 3);
    /// # Ok::<(), spmm_reduce::error::Error>(())
    /// ```
    pub fn from_slices(
        crow_indices: &[I],
        col_indices: &[I],
        values: &[T],
        shape: [usize; 2],
    ) -> Result<Self> {
        Self::new(
            DenseTensor::try_from_slice(crow_indices, &[crow_indices.len()])?,
            DenseTensor::try_from_slice(col_indices, &[col_indices.len()])?,
            DenseTensor::try_from_slice(values, &[values.len()])?,
            shape,
        )
    }

    /// Create a CSR matrix with no stored nonzeros
    pub fn empty(shape: [usize; 2]) -> Self {
        let [nrows, _ncols] = shape;
        Self {
            crow_indices: DenseTensor::zeros(&[nrows + 1]),
            col_indices: DenseTensor::zeros(&[0]),
            values: DenseTensor::zeros(&[0]),
            shape,
        }
    }

    /// Build a CSR matrix from the nonzero entries of a dense matrix
    pub fn from_dense(dense: &DenseTensor<T>) -> Result<Self> {
        let [nrows, ncols] = match dense.shape() {
            &[r, c] => [r, c],
            other => return Err(Error::rank_mismatch("from_dense", "dense", 2, other.len())),
        };

        let data = dense.as_slice();
        let zero = T::zero();
        let mut crow_indices = Vec::with_capacity(nrows + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        crow_indices.push(index_from::<I>(0)?);

        for row in 0..nrows {
            for col in 0..ncols {
                let v = data[row * ncols + col];
                if v != zero {
                    col_indices.push(index_from::<I>(col)?);
                    values.push(v);
                }
            }
            crow_indices.push(index_from::<I>(values.len())?);
        }

        Self::from_slices(&crow_indices, &col_indices, &values, [nrows, ncols])
    }

    /// Expand to a dense row-major matrix
    ///
    /// Duplicate entries at the same position are summed.
    pub fn to_dense(&self) -> DenseTensor<T> {
        let [nrows, ncols] = self.shape;
        let mut data = vec![T::zero(); nrows * ncols];
        let values = self.values.as_slice();
        for row in 0..nrows {
            for pos in self.row_range(row) {
                let col = self.col_at(pos);
                data[row * ncols + col] = data[row * ncols + col] + values[pos];
            }
        }
        DenseTensor::from_parts(data, &[nrows, ncols])
    }

    /// Same sparsity structure, different values
    ///
    /// The structure was validated when `self` was built, so only the value
    /// count is checked.
    pub fn with_values(&self, values: DenseTensor<T>) -> Result<Self> {
        if values.shape().len() != 1 || values.numel() != self.nnz() {
            return Err(Error::invalid_csr(format!(
                "replacement values must be a vector of nnz = {} entries, got shape {:?}",
                self.nnz(),
                values.shape()
            )));
        }
        Ok(Self {
            crow_indices: self.crow_indices.clone(),
            col_indices: self.col_indices.clone(),
            values,
            shape: self.shape,
        })
    }

    /// Returns the row pointers tensor
    pub fn crow_indices(&self) -> &DenseTensor<I> {
        &self.crow_indices
    }

    /// Returns the column indices tensor
    pub fn col_indices(&self) -> &DenseTensor<I> {
        &self.col_indices
    }

    /// Returns the values tensor
    pub fn values(&self) -> &DenseTensor<T> {
        &self.values
    }

    /// Matrix shape as [nrows, ncols]
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.shape[1]
    }

    /// Number of stored nonzeros
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.numel()
    }

    /// Number of stored nonzeros in a row
    ///
    /// # Panics
    ///
    /// Panics if `row >= nrows`.
    pub fn row_nnz(&self, row: usize) -> usize {
        self.row_range(row).len()
    }

    /// Positions of a row's nonzeros in `col_indices` / `values`
    ///
    /// # Panics
    ///
    /// Panics if `row >= nrows`.
    pub fn row_range(&self, row: usize) -> std::ops::Range<usize> {
        let crow = self.crow_indices.as_slice();
        // Invariants checked in `new` make these conversions infallible.
        let start = crow[row].to_index().unwrap_or(0);
        let end = crow[row + 1].to_index().unwrap_or(start);
        start..end
    }

    /// Column of the nonzero stored at `pos`
    #[inline]
    pub(crate) fn col_at(&self, pos: usize) -> usize {
        self.col_indices.as_slice()[pos].to_index().unwrap_or(0)
    }

    /// Row pointers as host positions
    pub(crate) fn crow_positions(&self) -> Vec<usize> {
        self.crow_indices
            .as_slice()
            .iter()
            .map(|c| c.to_index().unwrap_or(0))
            .collect()
    }

    /// Column indices as host positions
    pub(crate) fn col_positions(&self) -> Vec<usize> {
        self.col_indices
            .as_slice()
            .iter()
            .map(|c| c.to_index().unwrap_or(0))
            .collect()
    }
}

/// Convert a host position into an index element
pub(crate) fn index_from<I: IndexElement>(v: usize) -> Result<I> {
    I::from_index(v).ok_or_else(|| {
        Error::invalid_csr(format!("position {} does not fit in index type {}", v, I::DTYPE))
    })
}

impl<T: Element, I: IndexElement> TensorMeta for CsrTensor<T, I> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::SPARSE_CSR
    }

    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn nnz(&self) -> usize {
        self.values.numel()
    }

    fn index_dtype(&self) -> Option<DType> {
        Some(I::DTYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    // [1, 0, 2]
    // [0, 0, 3]
    // [4, 5, 0]
    fn sample() -> CsrTensor<f32> {
        CsrTensor::from_slices(
            &[0, 2, 3, 5],
            &[0, 2, 2, 0, 1],
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            [3, 3],
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let csr = sample();
        assert_eq!(csr.shape(), [3, 3]);
        assert_eq!(csr.nnz(), 5);
        assert_eq!(csr.row_nnz(0), 2);
        assert_eq!(csr.row_nnz(1), 1);
        assert_eq!(csr.row_range(2), 3..5);
        assert_eq!(csr.index_dtype(), Some(DType::I64));
        assert_eq!(TensorMeta::dtype(&csr), DType::F32);
        assert!(TensorMeta::layout(&csr).is_sparse_csr());
    }

    #[test]
    fn test_dense_roundtrip() {
        let csr = sample();
        let dense = csr.to_dense();
        assert_eq!(
            dense.as_slice(),
            &[1.0, 0.0, 2.0, 0.0, 0.0, 3.0, 4.0, 5.0, 0.0]
        );
        let back = CsrTensor::<f32>::from_dense(&dense).unwrap();
        assert_eq!(back, csr);
    }

    #[test]
    fn test_unsorted_columns_accepted() {
        let csr =
            CsrTensor::<f64, i32>::from_slices(&[0, 2], &[3, 1], &[1.0, 2.0], [1, 4]).unwrap();
        assert_eq!(csr.to_dense().as_slice(), &[0.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_crow_length() {
        let err = CsrTensor::<f32>::from_slices(&[0, 1], &[0], &[1.0], [2, 2]).unwrap_err();
        assert_eq!(err.violation(), ViolationKind::InvalidStructure);
    }

    #[test]
    fn test_rejects_nonzero_start() {
        let err = CsrTensor::<f32>::from_slices(&[1, 1, 1], &[0], &[1.0], [2, 2]).unwrap_err();
        assert!(err.to_string().contains("crow_indices[0] must be 0"));
    }

    #[test]
    fn test_rejects_decreasing_crow() {
        let err = CsrTensor::<f32>::from_slices(&[0, 2, 1, 2], &[0, 1], &[1.0, 2.0], [3, 2])
            .unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn test_rejects_nnz_mismatch() {
        let err =
            CsrTensor::<f32>::from_slices(&[0, 1, 1], &[0, 1], &[1.0, 2.0], [2, 2]).unwrap_err();
        assert!(err.to_string().contains("must equal nnz"));
    }

    #[test]
    fn test_rejects_column_out_of_range() {
        let err = CsrTensor::<f32>::from_slices(&[0, 1], &[2], &[1.0], [1, 2]).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let err = CsrTensor::<f32>::from_slices(&[0, 1], &[-1], &[1.0], [1, 2]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_empty() {
        let csr = CsrTensor::<f32>::empty([3, 4]);
        assert_eq!(csr.nnz(), 0);
        assert_eq!(csr.crow_indices().as_slice(), &[0, 0, 0, 0]);
        assert_eq!(csr.row_nnz(2), 0);
    }

    #[test]
    fn test_with_values() {
        let csr = sample();
        let scaled = csr
            .with_values(DenseTensor::from_slice(&[2.0, 4.0, 6.0, 8.0, 10.0], &[5]))
            .unwrap();
        assert_eq!(scaled.col_indices(), csr.col_indices());
        assert!(csr
            .with_values(DenseTensor::from_slice(&[1.0], &[1]))
            .is_err());
    }
}
