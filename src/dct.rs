//! Separable fixed-point 2D DCT.
//!
//! Two length-8 passes against [`DCT_BASIS`]: first along each row, then
//! along each column of the row-pass output. Every term is a constant times
//! a variable, so the transform lowers to linear combinations and adds no
//! multiplication constraints. The output carries the basis scale twice
//! (`1000²`), which the tolerance check absorbs into its targets.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use ark_r1cs_std::{fields::fp::FpVar, prelude::*};

use crate::{
    config::BLOCK_EDGE,
    field_from_i64,
    tables::{CENTER, DCT_BASIS},
    F,
};

/// An 8×8 matrix of in-circuit values.
pub type BlockVar = [[FpVar<F>; BLOCK_EDGE]; BLOCK_EDGE];

/// Subtract the 128 offset from every sample.
///
/// Samples near zero wrap modulo p; the byte bound on the inputs keeps the
/// centered values within `[-128, 127]` as integers.
pub fn center(samples: &BlockVar) -> BlockVar {
    let offset = F::from(CENTER);
    std::array::from_fn(|i| std::array::from_fn(|j| &samples[i][j] - offset))
}

/// Length-8 transform of one vector: `out[k] = Σ_j B[k][j] · v[j]`.
fn dct_1d(v: [&FpVar<F>; BLOCK_EDGE]) -> [FpVar<F>; BLOCK_EDGE] {
    std::array::from_fn(|k| {
        v.iter()
            .zip(DCT_BASIS[k].iter())
            .fold(FpVar::zero(), |acc, (x, &b)| acc + *x * field_from_i64(b))
    })
}

/// Row pass: `rowSum[i][k] = Σ_j B[k][j] · x[i][j]`.
pub fn row_pass(centered: &BlockVar) -> BlockVar {
    std::array::from_fn(|i| dct_1d(std::array::from_fn(|j| &centered[i][j])))
}

/// Column pass: `coeff[m][k] = Σ_i B[m][i] · rowSum[i][k]`.
pub fn column_pass(row_sums: &BlockVar) -> BlockVar {
    // Transform column k, then scatter it back so coeff[m][k] keeps (m, k).
    let columns: [[FpVar<F>; BLOCK_EDGE]; BLOCK_EDGE] =
        std::array::from_fn(|k| dct_1d(std::array::from_fn(|i| &row_sums[i][k])));
    std::array::from_fn(|m| std::array::from_fn(|k| columns[k][m].clone()))
}

/// Full 2D transform of already-centered samples, scaled by `1000²`.
pub fn dct_2d_var(centered: &BlockVar) -> BlockVar {
    column_pass(&row_pass(centered))
}

// ============================================================================
// Native mirror
// ============================================================================

/// Native 2D transform over centered integer samples; identical integers to
/// [`dct_2d_var`].
pub fn dct_2d(centered: &[[i64; BLOCK_EDGE]; BLOCK_EDGE]) -> [[i64; BLOCK_EDGE]; BLOCK_EDGE] {
    let mut rows = [[0i64; BLOCK_EDGE]; BLOCK_EDGE];
    for i in 0..BLOCK_EDGE {
        for k in 0..BLOCK_EDGE {
            rows[i][k] = (0..BLOCK_EDGE).map(|j| DCT_BASIS[k][j] * centered[i][j]).sum();
        }
    }
    let mut out = [[0i64; BLOCK_EDGE]; BLOCK_EDGE];
    for m in 0..BLOCK_EDGE {
        for k in 0..BLOCK_EDGE {
            out[m][k] = (0..BLOCK_EDGE).map(|i| DCT_BASIS[m][i] * rows[i][k]).sum();
        }
    }
    out
}

/// Center a block of 8-bit samples.
pub fn center_native(samples: &[[u8; BLOCK_EDGE]; BLOCK_EDGE]) -> [[i64; BLOCK_EDGE]; BLOCK_EDGE] {
    std::array::from_fn(|i| std::array::from_fn(|j| samples[i][j] as i64 - CENTER as i64))
}
