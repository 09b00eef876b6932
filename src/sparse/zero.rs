//! Structural emptiness check for sparse tensors

use crate::tensor::TensorMeta;

/// Returns true if `tensor` is a sparse tensor with no stored nonzeros
///
/// Recognises every sparse layout (COO, CSR, CSC, BSR, BSC). Dense tensors
/// are never structurally empty, even when every element is zero: telling
/// them apart would need a scan of the values, and this check only reads
/// metadata.
///
/// Multiplying a structurally empty sparse matrix by anything yields a
/// zero-filled dense result, so callers use this to skip the kernel.
#[inline]
pub fn is_sparse_and_zero(tensor: &dyn TensorMeta) -> bool {
    tensor.layout().is_sparse() && tensor.nnz() == 0
}
