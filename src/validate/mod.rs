//! Argument validation for sparse-mm-reduce
//!
//! - [`domain`]: single-tensor checks (device, rank, layout, dtype, size)
//! - [`contract`]: the ordered, cross-tensor check of a whole call
//!
//! All checks read metadata only; none of them touch element storage.

pub mod contract;
pub mod domain;

pub use contract::{
    check_sparse_mm_reduce_inputs, CheckMode, IndexArray, SpmmReduceArgs, BACKWARD_OP, FORWARD_OP,
};
pub use domain::{
    require_cpu, require_cuda, require_device, require_dim, require_dim_size, require_layout,
    require_scalar_type, CheckedFrom,
};
