//! Cross-tensor contract of sparse-mm-reduce calls
//!
//! One pass over every tensor participating in a forward or backward call,
//! in a fixed order, stopping at the first violation:
//!
//! 1. `self` is sparse CSR
//! 2. `self` is not hybrid (`dense_dim == 0`)
//! 3. `self` is a matrix
//! 4. (backward) `grad_out` is strided, has `self`'s value dtype and shape
//!    `[self.rows, other.cols]`
//! 5. `other` is strided, has `self`'s value dtype and `self.cols` rows
//! 6. each supplied index array (`row_indices`, `ccol_indices`, `csr2csc`)
//!    is a strided vector of `self`'s index dtype with the length its role
//!    dictates
//!
//! Index arrays are optional and independent: an absent array is not
//! checked at all.

use super::domain::{
    require_dim, require_dim_size, require_layout, require_scalar_type, CheckedFrom,
};
use crate::error::{Error, Result};
use crate::sparse::StorageLayout;
use crate::tensor::TensorMeta;

/// Operation name reported by forward checks
pub const FORWARD_OP: CheckedFrom = "sparse_mm_reduce";

/// Operation name reported by backward checks
pub const BACKWARD_OP: CheckedFrom = "sparse_mm_reduce_backward";

/// Which call variant is being checked
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CheckMode {
    /// `out = reduce(self * other)`
    Forward,
    /// Gradients of the forward call; requires `grad_out`
    Backward,
}

impl CheckMode {
    /// Operation name used in error messages
    pub fn op(self) -> CheckedFrom {
        match self {
            CheckMode::Forward => FORWARD_OP,
            CheckMode::Backward => BACKWARD_OP,
        }
    }
}

/// Auxiliary index arrays derived from the CSR structure
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexArray {
    /// COO row index of every nonzero
    RowIndices,
    /// Compressed column pointers of the CSC transpose
    CcolIndices,
    /// CSR position of each nonzero in column-major order
    Csr2Csc,
}

impl IndexArray {
    /// Every index array, in checking order
    pub const ALL: [IndexArray; 3] = [
        IndexArray::RowIndices,
        IndexArray::CcolIndices,
        IndexArray::Csr2Csc,
    ];

    /// Argument name
    pub fn name(self) -> &'static str {
        match self {
            IndexArray::RowIndices => "row_indices",
            IndexArray::CcolIndices => "ccol_indices",
            IndexArray::Csr2Csc => "csr2csc",
        }
    }

    /// Required length for a sparse matrix with `nnz` nonzeros and `ncols` columns
    pub fn expected_len(self, nnz: usize, ncols: usize) -> usize {
        match self {
            IndexArray::RowIndices | IndexArray::Csr2Csc => nnz,
            IndexArray::CcolIndices => ncols + 1,
        }
    }
}

/// Tensors participating in one sparse-mm-reduce call
///
/// Built per call, consumed by [`check_sparse_mm_reduce_inputs`].
#[derive(Clone, Copy)]
pub struct SpmmReduceArgs<'a> {
    /// The sparse CSR operand (`self`)
    pub input: &'a dyn TensorMeta,
    /// The dense operand
    pub other: &'a dyn TensorMeta,
    /// Gradient w.r.t. the forward output (backward only)
    pub grad_out: Option<&'a dyn TensorMeta>,
    /// COO row indices of `input`'s nonzeros
    pub row_indices: Option<&'a dyn TensorMeta>,
    /// CSC column pointers of `input`
    pub ccol_indices: Option<&'a dyn TensorMeta>,
    /// CSR-to-CSC permutation of `input`'s nonzeros
    pub csr2csc: Option<&'a dyn TensorMeta>,
}

impl<'a> SpmmReduceArgs<'a> {
    /// Forward arguments: `self` and `other`, nothing optional
    pub fn new(input: &'a dyn TensorMeta, other: &'a dyn TensorMeta) -> Self {
        Self {
            input,
            other,
            grad_out: None,
            row_indices: None,
            ccol_indices: None,
            csr2csc: None,
        }
    }

    /// Attach the output gradient
    pub fn grad_out(mut self, grad_out: &'a dyn TensorMeta) -> Self {
        self.grad_out = Some(grad_out);
        self
    }

    /// Attach one of the auxiliary index arrays
    pub fn index_array(mut self, which: IndexArray, tensor: &'a dyn TensorMeta) -> Self {
        match which {
            IndexArray::RowIndices => self.row_indices = Some(tensor),
            IndexArray::CcolIndices => self.ccol_indices = Some(tensor),
            IndexArray::Csr2Csc => self.csr2csc = Some(tensor),
        }
        self
    }

    /// The supplied index array, if any
    pub fn get_index_array(&self, which: IndexArray) -> Option<&'a dyn TensorMeta> {
        match which {
            IndexArray::RowIndices => self.row_indices,
            IndexArray::CcolIndices => self.ccol_indices,
            IndexArray::Csr2Csc => self.csr2csc,
        }
    }
}

/// Validate every tensor of a sparse-mm-reduce call
///
/// Returns the first violated check; see the module docs for the order.
pub fn check_sparse_mm_reduce_inputs(mode: CheckMode, args: &SpmmReduceArgs<'_>) -> Result<()> {
    let result = run_checks(mode, args);
    match &result {
        Ok(()) => tracing::trace!(op = mode.op(), "contract check passed"),
        Err(e) => tracing::debug!(op = mode.op(), error = %e, "contract check failed"),
    }
    result
}

fn run_checks(mode: CheckMode, args: &SpmmReduceArgs<'_>) -> Result<()> {
    let op = mode.op();
    let input = args.input;

    require_layout(op, input, StorageLayout::SPARSE_CSR, "self")?;
    let dense_dim = input.dense_dim();
    if dense_dim != 0 {
        return Err(Error::UnsupportedHybrid {
            op,
            arg: "self",
            dense_dim,
        });
    }
    require_dim(op, input, 2, "self")?;

    let input_scalar_type = input.dtype();
    let index_scalar_type = input
        .index_dtype()
        .ok_or_else(|| Error::invalid_argument("self", "sparse CSR tensor reports no index dtype"))?;
    if !index_scalar_type.is_index() {
        return Err(Error::invalid_argument(
            "self",
            format!("index dtype must be i32 or i64, got {}", index_scalar_type),
        ));
    }
    let nnz = input.nnz();
    let nrows = input.size(0)?;
    let ncols = input.size(1)?;

    if mode == CheckMode::Backward {
        let grad_out = args
            .grad_out
            .ok_or_else(|| Error::invalid_argument("grad_out", "required by the backward pass"))?;
        require_layout(op, grad_out, StorageLayout::Strided, "grad_out")?;
        require_scalar_type(op, grad_out, input_scalar_type, "grad_out")?;
        require_dim(op, grad_out, 2, "grad_out")?;
        require_dim_size(op, grad_out, 0, nrows, "grad_out")?;
        // other's column count is needed before other itself is checked
        require_dim(op, args.other, 2, "other")?;
        require_dim_size(op, grad_out, 1, args.other.size(1)?, "grad_out")?;
    }

    let other = args.other;
    require_layout(op, other, StorageLayout::Strided, "other")?;
    require_scalar_type(op, other, input_scalar_type, "other")?;
    require_dim(op, other, 2, "other")?;
    require_dim_size(op, other, 0, ncols, "other")?;

    for which in IndexArray::ALL {
        let Some(tensor) = args.get_index_array(which) else {
            continue;
        };
        let name = which.name();
        require_layout(op, tensor, StorageLayout::Strided, name)?;
        require_scalar_type(op, tensor, index_scalar_type, name)?;
        require_dim(op, tensor, 1, name)?;
        require_dim_size(op, tensor, 0, which.expected_len(nnz, ncols), name)?;
    }

    Ok(())
}
