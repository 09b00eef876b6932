//! Common test utilities
#![allow(dead_code)]

use spmm_reduce::ops::ReductionType;
use spmm_reduce::sparse::CsrTensor;
use spmm_reduce::tensor::DenseTensor;

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic pseudo-random values in [-1, 1)
pub fn lcg_values(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}

/// Dense reference for the forward pass
///
/// Works on the dense expansion, treating every stored entry (even an
/// explicit zero) as a member of its row.
pub fn reference_forward(
    s: &CsrTensor<f64>,
    other: &DenseTensor<f64>,
    reduce: ReductionType,
) -> Vec<f64> {
    let [nrows, _] = s.shape();
    let width = other.shape()[1];
    let cols = s.col_indices().as_slice();
    let values = s.values().as_slice();
    let d = other.as_slice();
    let mut out = vec![0.0; nrows * width];
    for r in 0..nrows {
        let range = s.row_range(r);
        if range.is_empty() {
            continue;
        }
        for n in 0..width {
            let products: Vec<f64> = range
                .clone()
                .map(|p| values[p] * d[cols[p] as usize * width + n])
                .collect();
            out[r * width + n] = match reduce {
                ReductionType::Sum => products.iter().sum(),
                ReductionType::Mean => products.iter().sum::<f64>() / products.len() as f64,
                ReductionType::Amax => products.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                ReductionType::Amin => products.iter().copied().fold(f64::INFINITY, f64::min),
            };
        }
    }
    out
}

/// Random CSR matrix with roughly `density` of its entries stored
pub fn random_csr(seed: u64, nrows: usize, ncols: usize, density: f64) -> CsrTensor<f64> {
    let mask = lcg_values(seed, nrows * ncols);
    let vals = lcg_values(seed ^ 0x9e37_79b9, nrows * ncols);
    let mut crow = vec![0i64];
    let mut col = Vec::new();
    let mut values = Vec::new();
    for r in 0..nrows {
        for c in 0..ncols {
            let i = r * ncols + c;
            if (mask[i] + 1.0) / 2.0 < density {
                col.push(c as i64);
                values.push(vals[i]);
            }
        }
        crow.push(values.len() as i64);
    }
    CsrTensor::from_slices(&crow, &col, &values, [nrows, ncols]).unwrap()
}
