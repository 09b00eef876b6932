//! Tensor metadata handle
//!
//! Validation only ever looks at metadata: layout, rank, sizes, dtype, device
//! and stored-element count. [`TensorMeta`] is that narrow view, and
//! [`TensorDesc`] is a handle carrying nothing else, for tensors whose storage
//! lives outside this crate.

use super::device::Device;
use super::layout::Shape;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::sparse::{SparseFormat, StorageLayout};

/// Read-only metadata view of a tensor
///
/// Implementations must be O(1): no method may scan element storage.
pub trait TensorMeta {
    /// Storage layout (strided or one of the sparse formats)
    fn layout(&self) -> StorageLayout;

    /// Element type; for sparse tensors, the element type of the values
    fn dtype(&self) -> DType;

    /// Device the storage lives on
    fn device(&self) -> Device;

    /// Logical shape
    fn shape(&self) -> &[usize];

    /// Number of stored elements
    ///
    /// Sparse tensors report their explicit nonzero count, dense tensors
    /// their element count.
    fn nnz(&self) -> usize;

    /// Element type of the column (or block) indices for sparse tensors
    fn index_dtype(&self) -> Option<DType> {
        None
    }

    /// Number of trailing dense dimensions of a sparse tensor's values
    fn dense_dim(&self) -> usize {
        0
    }

    /// Number of dimensions (rank)
    #[inline]
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Size along a dimension
    fn size(&self, dim: usize) -> Result<usize> {
        self.shape()
            .get(dim)
            .copied()
            .ok_or(Error::InvalidDimension {
                dim,
                ndim: self.ndim(),
            })
    }
}

/// Metadata-only tensor handle
///
/// # Example
///
/// ```
/// use spmm_reduce::prelude::*;
/// use spmm_reduce::tensor::TensorDesc;
///
/// let csr = TensorDesc::sparse_csr(&[3, 4], DType::F32, DType::I64, 2);
/// assert!(csr.layout().is_sparse_csr());
/// assert_eq!(csr.index_dtype(), Some(DType::I64));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDesc {
    layout: StorageLayout,
    dtype: DType,
    index_dtype: Option<DType>,
    device: Device,
    shape: Shape,
    nnz: usize,
    dense_dim: usize,
}

impl TensorDesc {
    /// Describe a dense, strided tensor on the host
    pub fn strided(shape: &[usize], dtype: DType) -> Self {
        Self {
            layout: StorageLayout::Strided,
            dtype,
            index_dtype: None,
            device: Device::Cpu,
            shape: shape.iter().copied().collect(),
            nnz: shape.iter().product(),
            dense_dim: 0,
        }
    }

    /// Describe a sparse tensor on the host
    pub fn sparse(
        format: SparseFormat,
        shape: &[usize],
        dtype: DType,
        index_dtype: DType,
        nnz: usize,
    ) -> Self {
        Self {
            layout: StorageLayout::Sparse(format),
            dtype,
            index_dtype: Some(index_dtype),
            device: Device::Cpu,
            shape: shape.iter().copied().collect(),
            nnz,
            dense_dim: 0,
        }
    }

    /// Describe a CSR tensor on the host
    pub fn sparse_csr(shape: &[usize], dtype: DType, index_dtype: DType, nnz: usize) -> Self {
        Self::sparse(SparseFormat::Csr, shape, dtype, index_dtype, nnz)
    }

    /// Snapshot the metadata of any tensor handle
    pub fn of(tensor: &dyn TensorMeta) -> Self {
        Self {
            layout: tensor.layout(),
            dtype: tensor.dtype(),
            index_dtype: tensor.index_dtype(),
            device: tensor.device(),
            shape: tensor.shape().iter().copied().collect(),
            nnz: tensor.nnz(),
            dense_dim: tensor.dense_dim(),
        }
    }

    /// Same tensor, resident on another device
    pub fn on(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Same tensor, with trailing dense dimensions
    pub fn with_dense_dim(mut self, dense_dim: usize) -> Self {
        self.dense_dim = dense_dim;
        self
    }

    /// Same tensor, with another stored-element count
    pub fn with_nnz(mut self, nnz: usize) -> Self {
        self.nnz = nnz;
        self
    }
}

impl TensorMeta for TensorDesc {
    fn layout(&self) -> StorageLayout {
        self.layout
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn device(&self) -> Device {
        self.device
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn nnz(&self) -> usize {
        self.nnz
    }

    fn index_dtype(&self) -> Option<DType> {
        self.index_dtype
    }

    fn dense_dim(&self) -> usize {
        self.dense_dim
    }
}
