//! Sparse format and storage layout definitions

use std::fmt;

/// Sparse matrix storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    /// Coordinate format (COO)
    ///
    /// Stores explicit (row, col, value) triplets.
    /// Storage: O(3 * nnz)
    Coo,

    /// Compressed Sparse Row (CSR)
    ///
    /// Row pointers + column indices + values.
    /// Storage: O(2 * nnz + nrows + 1)
    Csr,

    /// Compressed Sparse Column (CSC)
    ///
    /// Column pointers + row indices + values.
    /// Storage: O(2 * nnz + ncols + 1)
    Csc,

    /// Block Compressed Sparse Row (BSR)
    ///
    /// CSR over dense blocks; nnz counts stored blocks.
    Bsr,

    /// Block Compressed Sparse Column (BSC)
    ///
    /// CSC over dense blocks; nnz counts stored blocks.
    Bsc,
}

impl SparseFormat {
    /// Returns the format name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SparseFormat::Coo => "COO",
            SparseFormat::Csr => "CSR",
            SparseFormat::Csc => "CSC",
            SparseFormat::Bsr => "BSR",
            SparseFormat::Bsc => "BSC",
        }
    }
}

impl fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a tensor's elements are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLayout {
    /// Dense, strided storage
    Strided,
    /// One of the compressed/coordinate sparse formats
    Sparse(SparseFormat),
}

impl StorageLayout {
    /// Compressed sparse row layout
    pub const SPARSE_CSR: Self = StorageLayout::Sparse(SparseFormat::Csr);

    /// Returns true for any sparse format
    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self, StorageLayout::Sparse(_))
    }

    /// Returns true for compressed sparse row storage
    #[inline]
    pub fn is_sparse_csr(&self) -> bool {
        *self == Self::SPARSE_CSR
    }
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLayout::Strided => write!(f, "Strided"),
            StorageLayout::Sparse(format) => write!(f, "Sparse{}", format),
        }
    }
}
