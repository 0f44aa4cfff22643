//! Crate root: field alias, step state, and the public surface of the DCTQ
//! fold circuit.
//!
//! The circuit proves that a *transformed* image was produced from an
//! *original* image by an integer-scaled forward DCT followed by JPEG-style
//! quantization. Work is split into **steps**: each step consumes a batch of
//! packed pixel rows of both images, emits R1CS constraints through
//! `ark-relations`, and folds hashes of its rows into a running
//! [`StepState`]. The final state of the last step is what an external
//! verifier compares against the published image commitment.
//!
//! ## Invariants
//!
//! - **Field.** All values live in `ark_bn254::Fr` (`F` in this crate). There
//!   is no native sign or ordering; signed quantities are field elements and
//!   every ordering claim is reduced to a bounded unsigned comparison
//!   ([`cmp::LessThan`]).
//!
//! - **Fixed tables.** The DCT basis and both quantization tables are
//!   `const` literals in [`tables`]; they shape the circuit and are never
//!   runtime configuration.
//!
//! - **Failure model.** A wrong witness never produces a Rust error. It
//!   produces a constraint system for which `is_satisfied()` is `false`.
//!   Rust errors are reserved for shape problems (bad config, malformed
//!   input files, rows of the wrong length).
//!
//! - **State threading.** [`StepState`] is a `Copy` value consumed by one
//!   step and produced for the next. Steps must run in order.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

/// Fixed circuit constants (DCT basis, quantization tables, scales).
pub mod tables;
/// Deployment shape (rows per step, packed width) and its validation.
pub mod config;
/// Bounded unsigned comparison over field elements.
pub mod cmp;
/// Packed pixel groups: in-circuit unpacking and native pack/unpack.
pub mod unpack;
/// Separable fixed-point 2D DCT (in-circuit and native).
pub mod dct;
/// Quantization tolerance check (in-circuit and native).
pub mod quant;
/// Per-block verification and block partitioning.
pub mod block;
/// Row hashing contracts and the Poseidon implementation.
pub mod hash;
/// Cross-step hash chain over [`StepState`].
pub mod chain;
/// Top-level step circuit.
pub mod step;
/// JSON input loading and hex helpers.
pub mod input;
/// Native DCTQ encoder producing transformed images the circuit accepts.
pub mod reference;

// ============================================================================
// Canonical aliases and root-level re-exports
// ============================================================================

/// Scalar field used across the crate (BN254).
pub type F = ark_bn254::Fr;

pub use crate::chain::{fold_image, StepHashChain, StepStateVar};
pub use crate::config::{ConfigError, DctqConfig};
pub use crate::hash::{ArrayHasher, PairHasher, PoseidonHasher};
pub use crate::input::{ImageInput, InputError};
pub use crate::step::{synthesize_step, DctqStep, StepError};
pub use crate::unpack::{ByteDecompressor, Decompressor};

/// Running accumulator threaded from step to step.
///
/// `orig` folds the hashes of every original row processed so far, `tran`
/// the hashes of every transformed row. Created once from an externally
/// supplied pair, replaced by the output of each step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct StepState {
    /// Accumulated digest of the original rows.
    pub orig: F,
    /// Accumulated digest of the transformed rows.
    pub tran: F,
}

impl StepState {
    /// Build a state from its two halves.
    #[inline]
    pub fn new(orig: F, tran: F) -> Self {
        Self { orig, tran }
    }
}

/// Convert a signed integer into the field (negative values wrap mod p).
#[inline]
pub fn field_from_i64(value: i64) -> F {
    if value >= 0 {
        F::from(value as u64)
    } else {
        -F::from(value.unsigned_abs())
    }
}

/// Interpret a field element as a signed integer if it lies within
/// `[-2^63, 2^63)` of zero (i.e. it is a small value or a wrapped negative).
pub fn field_to_i64(value: F) -> Option<i64> {
    let small = |v: F| -> Option<u64> {
        let limbs = v.into_bigint().0;
        if limbs[1..].iter().all(|&l| l == 0) {
            Some(limbs[0])
        } else {
            None
        }
    };
    if let Some(v) = small(value) {
        return i64::try_from(v).ok();
    }
    let neg = small(-value)?;
    if neg <= 1u64 << 63 {
        Some((neg as i64).wrapping_neg())
    } else {
        None
    }
}
