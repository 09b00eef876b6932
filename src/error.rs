//! Error types for spmm-reduce
//!
//! Every contract violation carries the operation that detected it, the
//! argument it concerns, the expected constraint and the observed value.

use crate::dtype::DType;
use crate::sparse::StorageLayout;
use crate::tensor::Device;
use std::fmt;
use thiserror::Error;

/// Result type alias using spmm-reduce's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Device family a tensor is required to live on
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Host memory
    Cpu,
    /// Accelerator memory
    Cuda,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "CPU"),
            DeviceKind::Cuda => write!(f, "CUDA"),
        }
    }
}

/// Which shape relationship was violated
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeViolation {
    /// Tensor rank differs from the required rank
    Rank {
        /// Required number of dimensions
        expected: usize,
        /// Observed number of dimensions
        got: usize,
    },
    /// Size along one dimension differs from the required size
    DimSize {
        /// Dimension index
        dim: usize,
        /// Required size
        expected: usize,
        /// Observed size
        got: usize,
    },
}

/// Human-readable noun for a tensor of the given rank
pub(crate) fn rank_noun(ndim: usize) -> &'static str {
    match ndim {
        1 => "vector",
        2 => "matrix",
        _ => "tensor",
    }
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeViolation::Rank { expected, got } => write!(
                f,
                "must be a {} ({}-D), got {}-D tensor",
                rank_noun(*expected),
                expected,
                got
            ),
            ShapeViolation::DimSize { dim, expected, got } => write!(
                f,
                "expected size {} at dimension {}, got {}",
                expected, dim, got
            ),
        }
    }
}

/// Coarse classification of a failure, independent of its payload
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Storage layout not allowed for the argument's role
    LayoutMismatch,
    /// Tensor resides on the wrong device
    DeviceMismatch,
    /// Rank or dimension size mismatch
    ShapeMismatch,
    /// Element type mismatch
    DTypeMismatch,
    /// Sparse tensor with dense trailing dimensions
    UnsupportedHybrid,
    /// Sparse tensor whose index arrays break the CSR invariants
    InvalidStructure,
    /// Missing or malformed argument
    InvalidArgument,
    /// Valid request this crate does not implement
    Unsupported,
    /// Dimension index out of range
    InvalidDimension,
}

/// Errors that can occur in spmm-reduce operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Storage layout mismatch
    #[error("{op}: expected {arg} to have {expected} layout, got {got}")]
    LayoutMismatch {
        /// Operation that ran the check
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// Required layout
        expected: StorageLayout,
        /// Observed layout
        got: StorageLayout,
    },

    /// Tensor resides on the wrong device
    #[error(
        "Expected all tensors to be on the same device. {op} expected '{arg}' to be {expected} tensor, but got {got} tensor"
    )]
    DeviceMismatch {
        /// Operation that ran the check
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// Required device family
        expected: DeviceKind,
        /// Observed device
        got: Device,
    },

    /// Rank or dimension size mismatch
    #[error("{op}: {arg} {violation}")]
    ShapeMismatch {
        /// Operation that ran the check
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// What relationship was violated
        violation: ShapeViolation,
    },

    /// Element type mismatch
    #[error("{op}: expected scalar type {expected} for argument '{arg}' but got {got}")]
    DTypeMismatch {
        /// Operation that ran the check
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// Reference dtype
        expected: DType,
        /// Observed dtype
        got: DType,
    },

    /// Hybrid sparse tensor where a plain sparse matrix is required
    #[error("{op}: expected non-hybrid {arg} tensor, got dense_dim={dense_dim}")]
    UnsupportedHybrid {
        /// Operation that ran the check
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// Observed dense dimensionality
        dense_dim: usize,
    },

    /// Compressed index arrays violate the format's structural invariants
    #[error("Invalid {format} structure: {reason}")]
    InvalidStructure {
        /// Sparse format being constructed
        format: &'static str,
        /// Which invariant failed
        reason: String,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Request is well-formed but not implemented
    #[error("{op}: {reason}")]
    Unsupported {
        /// The operation name
        op: &'static str,
        /// Description of the limitation
        reason: String,
    },

    /// Invalid dimension index
    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension
        dim: usize,
        /// Number of dimensions
        ndim: usize,
    },
}

impl Error {
    /// Create a rank mismatch error
    pub fn rank_mismatch(op: &'static str, arg: &'static str, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch {
            op,
            arg,
            violation: ShapeViolation::Rank { expected, got },
        }
    }

    /// Create a dimension size mismatch error
    pub fn dim_size_mismatch(
        op: &'static str,
        arg: &'static str,
        dim: usize,
        expected: usize,
        got: usize,
    ) -> Self {
        Self::ShapeMismatch {
            op,
            arg,
            violation: ShapeViolation::DimSize { dim, expected, got },
        }
    }

    /// Create an invalid CSR structure error
    pub fn invalid_csr(reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            format: "CSR",
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Kind of violation, without the payload
    pub fn violation(&self) -> ViolationKind {
        match self {
            Error::LayoutMismatch { .. } => ViolationKind::LayoutMismatch,
            Error::DeviceMismatch { .. } => ViolationKind::DeviceMismatch,
            Error::ShapeMismatch { .. } => ViolationKind::ShapeMismatch,
            Error::DTypeMismatch { .. } => ViolationKind::DTypeMismatch,
            Error::UnsupportedHybrid { .. } => ViolationKind::UnsupportedHybrid,
            Error::InvalidStructure { .. } => ViolationKind::InvalidStructure,
            Error::InvalidArgument { .. } => ViolationKind::InvalidArgument,
            Error::Unsupported { .. } => ViolationKind::Unsupported,
            Error::InvalidDimension { .. } => ViolationKind::InvalidDimension,
        }
    }

    /// Argument the failure concerns, when the error is tied to one
    pub fn arg(&self) -> Option<&'static str> {
        match self {
            Error::LayoutMismatch { arg, .. }
            | Error::DeviceMismatch { arg, .. }
            | Error::ShapeMismatch { arg, .. }
            | Error::DTypeMismatch { arg, .. }
            | Error::UnsupportedHybrid { arg, .. }
            | Error::InvalidArgument { arg, .. } => Some(arg),
            _ => None,
        }
    }

    /// Operation that detected the failure, when recorded
    pub fn op(&self) -> Option<&'static str> {
        match self {
            Error::LayoutMismatch { op, .. }
            | Error::DeviceMismatch { op, .. }
            | Error::ShapeMismatch { op, .. }
            | Error::DTypeMismatch { op, .. }
            | Error::UnsupportedHybrid { op, .. }
            | Error::Unsupported { op, .. } => Some(op),
            _ => None,
        }
    }
}
