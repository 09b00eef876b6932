//! Single-tensor metadata checks
//!
//! Each check reads metadata only and fails with an error naming the
//! operation, the argument, the expected constraint and the observed value.

use crate::dtype::DType;
use crate::error::{DeviceKind, Error, Result};
use crate::sparse::StorageLayout;
use crate::tensor::TensorMeta;

/// Name of the operation a check runs on behalf of
pub type CheckedFrom = &'static str;

/// Fails with `DeviceMismatch` unless `tensor` lives in host memory
pub fn require_cpu(op: CheckedFrom, tensor: &dyn TensorMeta, name: &'static str) -> Result<()> {
    require_device(op, tensor, DeviceKind::Cpu, name)
}

/// Fails with `DeviceMismatch` unless `tensor` lives in accelerator memory
pub fn require_cuda(op: CheckedFrom, tensor: &dyn TensorMeta, name: &'static str) -> Result<()> {
    require_device(op, tensor, DeviceKind::Cuda, name)
}

/// Fails with `DeviceMismatch` unless `tensor` lives on a device of `kind`
pub fn require_device(
    op: CheckedFrom,
    tensor: &dyn TensorMeta,
    kind: DeviceKind,
    name: &'static str,
) -> Result<()> {
    let device = tensor.device();
    if device.kind() != kind {
        return Err(Error::DeviceMismatch {
            op,
            arg: name,
            expected: kind,
            got: device,
        });
    }
    Ok(())
}

/// Fails with `ShapeMismatch` unless `tensor` has exactly `target_dim` dimensions
///
/// The message names the rank ("must be a matrix" for 2-D, "vector" for 1-D).
pub fn require_dim(
    op: CheckedFrom,
    tensor: &dyn TensorMeta,
    target_dim: usize,
    name: &'static str,
) -> Result<()> {
    let ndim = tensor.ndim();
    if ndim != target_dim {
        return Err(Error::rank_mismatch(op, name, target_dim, ndim));
    }
    Ok(())
}

/// Fails with `LayoutMismatch` unless `tensor` has the `expected` storage layout
pub fn require_layout(
    op: CheckedFrom,
    tensor: &dyn TensorMeta,
    expected: StorageLayout,
    name: &'static str,
) -> Result<()> {
    let got = tensor.layout();
    if got != expected {
        return Err(Error::LayoutMismatch {
            op,
            arg: name,
            expected,
            got,
        });
    }
    Ok(())
}

/// Fails with `DTypeMismatch` unless `tensor`'s element type is `expected`
pub fn require_scalar_type(
    op: CheckedFrom,
    tensor: &dyn TensorMeta,
    expected: DType,
    name: &'static str,
) -> Result<()> {
    let got = tensor.dtype();
    if got != expected {
        return Err(Error::DTypeMismatch {
            op,
            arg: name,
            expected,
            got,
        });
    }
    Ok(())
}

/// Fails with `ShapeMismatch` unless `tensor.size(dim) == expected`
///
/// A `dim` past the tensor's rank fails with `InvalidDimension`.
pub fn require_dim_size(
    op: CheckedFrom,
    tensor: &dyn TensorMeta,
    dim: usize,
    expected: usize,
    name: &'static str,
) -> Result<()> {
    let got = tensor.size(dim)?;
    if got != expected {
        return Err(Error::dim_size_mismatch(op, name, dim, expected, got));
    }
    Ok(())
}
