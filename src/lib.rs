//! # spmm-reduce
//!
//! **Validated sparse CSR × dense matrix multiplication with row reduction.**
//!
//! For a CSR matrix `S` (`M × K`) and a dense matrix `D` (`K × N`):
//!
//! ```text
//! out[m, n] = reduce_{e in row m}( values[e] * D[col(e), n] )
//! ```
//!
//! with `reduce` one of `sum`, `mean`, `amax`, `amin`, plus the backward pass
//! producing gradients w.r.t. the sparse values and w.r.t. `D`.
//!
//! ## Why validate first?
//!
//! - **Metadata only**: every check reads layout, dtype, device, rank and
//!   sizes through [`TensorMeta`](tensor::TensorMeta), never element storage
//! - **Fixed order**: the first violated constraint is always the one reported
//! - **Descriptive**: errors name the operation, the argument, what was
//!   expected and what was found
//!
//! ## Quick Start
//!
//! ```rust
//! use spmm_reduce::prelude::*;
//!
//! // [1, 0, 2]
//! // [0, 3, 0]
//! let s = CsrTensor::<f64>::from_slices(&[0, 2, 3], &[0, 2, 1], &[1.0, 2.0, 3.0], [2, 3])?;
//! let d = DenseTensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
//!
//! let (out, arg_out) = sparse_mm_reduce(&s, &d, "amax".parse()?)?;
//! assert_eq!(out.as_slice(), &[10.0, 12.0, 9.0, 12.0]);
//! assert_eq!(arg_out.unwrap().as_slice(), &[1, 1, 2, 2]);
//! # Ok::<(), spmm_reduce::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernel
//! - `f16`: Half-precision floats (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod ops;
pub mod sparse;
pub mod tensor;
pub mod validate;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element, IndexElement, TensorScalar};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{
        sparse_mm_reduce, sparse_mm_reduce_backward, BackwardMask, ReductionType,
        SpmmReduceGrads,
    };
    pub use crate::sparse::{CsrTensor, SparseFormat, StorageLayout};
    pub use crate::tensor::{DenseTensor, Device, TensorMeta};
    pub use crate::validate::{check_sparse_mm_reduce_inputs, CheckMode, SpmmReduceArgs};
}
