//! Sparse-mm-reduce operations
//!
//! ```text
//! sparse_mm_reduce(self, other, reduce)
//!   ├── zero-sparse fast path
//!   ├── validate::check_sparse_mm_reduce_inputs (forward)
//!   └── ReduceKernel::forward
//!
//! sparse_mm_reduce_backward(self, grad_out, other, reduce, arg_out, mask)
//!   ├── IndexMapper::csr_to_csc / row_indices   (once, sum/mean only)
//!   ├── validate::check_sparse_mm_reduce_inputs (backward)
//!   └── ReduceKernel::backward_*
//! ```
//!
//! # Implementing a kernel for another backend
//!
//! Implement [`ReduceKernel`] and report the device family through
//! [`ReduceKernel::device`]; the entry points then reject any argument that
//! does not live there before calling into the kernel.

pub mod index_map;
pub mod kernel;
pub mod reduce;
pub mod spmm_reduce;

pub use index_map::{CpuIndexMapper, CscIndexMapping, IndexMapper};
pub use kernel::{CpuReduceKernel, ForwardOutput, ReduceKernel};
pub use reduce::ReductionType;
pub use spmm_reduce::{
    sparse_mm_reduce, sparse_mm_reduce_backward, sparse_mm_reduce_backward_with,
    sparse_mm_reduce_with, BackwardMask, SpmmReduceGrads,
};
