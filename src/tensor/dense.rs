//! Host-resident dense tensor

use super::device::Device;
use super::layout::Layout;
use super::meta::TensorMeta;
use crate::dtype::{DType, TensorScalar};
use crate::error::{Error, Result};
use crate::sparse::StorageLayout;

/// Dense, row-major tensor stored in host memory
///
/// `T` is any [`Element`](crate::dtype::Element) for value tensors, or an
/// [`IndexElement`](crate::dtype::IndexElement) for the auxiliary index arrays
/// (`row_indices`, `ccol_indices`, `csr2csc`, `arg_out`). Both report their
/// dtype through [`TensorScalar`], so either kind is a [`TensorMeta`].
#[derive(Clone, Debug, PartialEq)]
pub struct DenseTensor<T> {
    data: Vec<T>,
    layout: Layout,
}

impl<T: bytemuck::Pod> DenseTensor<T> {
    /// Create a tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of `shape`.
    /// Use [`try_from_slice`](Self::try_from_slice) for a fallible version.
    pub fn from_slice(data: &[T], shape: &[usize]) -> Self {
        Self::try_from_slice(data, shape).expect("DenseTensor::from_slice failed")
    }

    /// Create a tensor from a slice of data (fallible version)
    pub fn try_from_slice(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::try_from_vec(data.to_vec(), shape)
    }

    /// Create a tensor taking ownership of `data`
    pub fn try_from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::invalid_argument(
                "data",
                format!(
                    "{} elements cannot fill shape {:?} ({} elements)",
                    data.len(),
                    shape,
                    expected_len
                ),
            ));
        }
        Ok(Self {
            data,
            layout: Layout::contiguous(shape),
        })
    }

    /// Wrap a buffer whose length is known to match `shape`
    pub(crate) fn from_parts(data: Vec<T>, shape: &[usize]) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Self {
            data,
            layout: Layout::contiguous(shape),
        }
    }

    /// Create a tensor filled with `value`
    pub fn full(shape: &[usize], value: T) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![value; len],
            layout: Layout::contiguous(shape),
        }
    }

    /// Create a zero-filled tensor
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, T::zeroed())
    }

    /// Layout (shape and strides)
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Logical shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Elements in row-major order
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Copy the elements out in row-major order
    pub fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Element at a multi-dimensional index
    pub fn get(&self, indices: &[usize]) -> Option<T> {
        self.layout.index(indices).map(|i| self.data[i])
    }
}

impl<T: TensorScalar> TensorMeta for DenseTensor<T> {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Strided
    }

    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    fn nnz(&self) -> usize {
        self.data.len()
    }
}
