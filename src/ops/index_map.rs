//! CSR to CSC index mapping
//!
//! The gradient w.r.t. `other` walks the sparse matrix column by column.
//! Rather than materialising a transposed matrix, backward builds three
//! index arrays once per call and reads the CSR values through them.

use crate::dtype::{Element, IndexElement};
use crate::error::Result;
use crate::sparse::{index_from, CsrTensor};
use crate::tensor::DenseTensor;

/// Column-major view of a CSR matrix's structure
#[derive(Debug, Clone, PartialEq)]
pub struct CscIndexMapping<I> {
    /// Row of each nonzero, in CSR order (length `nnz`)
    pub row_indices: DenseTensor<I>,
    /// Column pointers (length `ncols + 1`)
    pub ccol_indices: DenseTensor<I>,
    /// `csr2csc[p]` is the CSR position of the `p`-th nonzero in column-major
    /// order (length `nnz`)
    pub csr2csc: DenseTensor<I>,
}

/// Builds the auxiliary index arrays backward needs
pub trait IndexMapper {
    /// Row index of every nonzero, in CSR order
    fn row_indices<T: Element, I: IndexElement>(
        &self,
        csr: &CsrTensor<T, I>,
    ) -> Result<DenseTensor<I>>;

    /// Full column-major mapping of `csr`
    fn csr_to_csc<T: Element, I: IndexElement>(
        &self,
        csr: &CsrTensor<T, I>,
    ) -> Result<CscIndexMapping<I>>;
}

/// Host implementation based on a stable counting sort over columns
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuIndexMapper;

impl IndexMapper for CpuIndexMapper {
    fn row_indices<T: Element, I: IndexElement>(
        &self,
        csr: &CsrTensor<T, I>,
    ) -> Result<DenseTensor<I>> {
        let mut rows = Vec::with_capacity(csr.nnz());
        for row in 0..csr.nrows() {
            let r = index_from::<I>(row)?;
            rows.extend(std::iter::repeat(r).take(csr.row_nnz(row)));
        }
        DenseTensor::try_from_vec(rows, &[csr.nnz()])
    }

    fn csr_to_csc<T: Element, I: IndexElement>(
        &self,
        csr: &CsrTensor<T, I>,
    ) -> Result<CscIndexMapping<I>> {
        let [nrows, ncols] = csr.shape();
        let nnz = csr.nnz();
        let crow = csr.crow_positions();
        let cols = csr.col_positions();

        let mut col_counts = vec![0usize; ncols];
        for &col in &cols {
            col_counts[col] += 1;
        }

        let mut col_ptrs = vec![0usize; ncols + 1];
        for col in 0..ncols {
            col_ptrs[col + 1] = col_ptrs[col] + col_counts[col];
        }

        // Scanning rows in order keeps each column's entries sorted by row.
        let mut next = col_ptrs[..ncols].to_vec();
        let mut perm = vec![0usize; nnz];
        for row in 0..nrows {
            for pos in crow[row]..crow[row + 1] {
                let col = cols[pos];
                perm[next[col]] = pos;
                next[col] += 1;
            }
        }

        let ccol_indices = col_ptrs
            .into_iter()
            .map(index_from::<I>)
            .collect::<Result<Vec<_>>>()?;
        let csr2csc = perm
            .into_iter()
            .map(index_from::<I>)
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(nrows, ncols, nnz, "built CSC index mapping");

        Ok(CscIndexMapping {
            row_indices: self.row_indices(csr)?,
            ccol_indices: DenseTensor::try_from_vec(ccol_indices, &[ncols + 1])?,
            csr2csc: DenseTensor::try_from_vec(csr2csc, &[nnz])?,
        })
    }
}
