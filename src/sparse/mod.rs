//! Sparse tensor support
//!
//! Only compressed sparse row (CSR) tensors are compute targets. The other
//! formats exist as layouts so that metadata checks can name and reject them.
//!
//! - **CSR** (Compressed Sparse Row): row pointers + column indices + values.
//!   O(nnz + nrows) storage, contiguous nonzeros per row, which is what a
//!   row-wise reduction wants.

mod csr;
mod format;
mod zero;

pub(crate) use csr::index_from;
pub use csr::CsrTensor;
pub use format::{SparseFormat, StorageLayout};
pub use zero::is_sparse_and_zero;
