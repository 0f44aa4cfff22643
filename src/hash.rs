//! Row hashing contracts and their Poseidon implementation.
//!
//! The step hash chain needs two primitives: an order-sensitive digest over
//! a sequence ([`ArrayHasher`]) and a two-input combiner ([`PairHasher`]).
//! The only requirements are determinism and collision resistance. Each
//! primitive has an in-circuit form and a native form, and the two must
//! agree bit for bit so witnesses and public states can be computed outside
//! the circuit.
//!
//! ## Domain separation
//! Every sponge is seeded with a fixed tag before any data:
//! - array digests absorb `TAG_ARRAY` and the sequence length, then the items;
//! - pair digests absorb `TAG_PAIR`, then the two inputs.
//!
//! A pair digest therefore never collides with a two-element array digest.

#![forbid(unsafe_code)]

use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{constraints::PoseidonSpongeVar, find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::PrimeField;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::F;

const TAG_ARRAY: u64 = 0x4443_5451_4152; // "DCTQAR"
const TAG_PAIR: u64 = 0x4443_5451_5052; // "DCTQPR"

/// Order-sensitive digest of a sequence of field elements.
pub trait ArrayHasher {
    /// In-circuit digest.
    fn hash_array(&self, items: &[FpVar<F>]) -> Result<FpVar<F>, SynthesisError>;
    /// Native digest; equal to the value of [`ArrayHasher::hash_array`].
    fn hash_array_native(&self, items: &[F]) -> F;
}

/// Two-input combiner.
pub trait PairHasher {
    /// In-circuit combination of `left` and `right`.
    fn hash_pair(&self, left: &FpVar<F>, right: &FpVar<F>) -> Result<FpVar<F>, SynthesisError>;
    /// Native combination; equal to the value of [`PairHasher::hash_pair`].
    fn hash_pair_native(&self, left: F, right: F) -> F;
}

/// Poseidon sponge over BN254 (`t = 3`, `α = 5`, 8 full / 57 partial rounds).
#[derive(Clone, Debug)]
pub struct PoseidonHasher {
    config: PoseidonConfig<F>,
}

/// Sponge rate.
pub const POSEIDON_RATE: usize = 2;
/// Sponge capacity.
pub const POSEIDON_CAPACITY: usize = 1;
/// Full rounds.
pub const POSEIDON_FULL_ROUNDS: usize = 8;
/// Partial rounds.
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;
/// S-box exponent.
pub const POSEIDON_ALPHA: u64 = 5;

impl PoseidonHasher {
    /// Derive round constants and MDS matrix with the Grain LFSR.
    pub fn new() -> Self {
        let (ark, mds) = find_poseidon_ark_and_mds::<F>(
            F::MODULUS_BIT_SIZE as u64,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            0,
        );
        let config = PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        );
        Self { config }
    }

    /// Sponge parameters.
    pub fn config(&self) -> &PoseidonConfig<F> {
        &self.config
    }

    fn sponge_var(&self, cs: ConstraintSystemRef<F>, tag: u64) -> Result<PoseidonSpongeVar<F>, SynthesisError> {
        let mut sponge = PoseidonSpongeVar::new(cs, &self.config);
        sponge.absorb(&FpVar::constant(F::from(tag)))?;
        Ok(sponge)
    }

    fn sponge_native(&self, tag: u64) -> PoseidonSponge<F> {
        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&F::from(tag));
        sponge
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn squeeze_one(sponge: &mut PoseidonSpongeVar<F>) -> Result<FpVar<F>, SynthesisError> {
    sponge
        .squeeze_field_elements(1)?
        .pop()
        .ok_or(SynthesisError::Unsatisfiable)
}

impl ArrayHasher for PoseidonHasher {
    fn hash_array(&self, items: &[FpVar<F>]) -> Result<FpVar<F>, SynthesisError> {
        let mut sponge = self.sponge_var(items.cs(), TAG_ARRAY)?;
        sponge.absorb(&FpVar::constant(F::from(items.len() as u64)))?;
        for item in items {
            sponge.absorb(item)?;
        }
        squeeze_one(&mut sponge)
    }

    fn hash_array_native(&self, items: &[F]) -> F {
        let mut sponge = self.sponge_native(TAG_ARRAY);
        sponge.absorb(&F::from(items.len() as u64));
        for item in items {
            sponge.absorb(item);
        }
        sponge.squeeze_field_elements::<F>(1)[0]
    }
}

impl PairHasher for PoseidonHasher {
    fn hash_pair(&self, left: &FpVar<F>, right: &FpVar<F>) -> Result<FpVar<F>, SynthesisError> {
        let mut sponge = self.sponge_var(left.cs().or(right.cs()), TAG_PAIR)?;
        sponge.absorb(left)?;
        sponge.absorb(right)?;
        squeeze_one(&mut sponge)
    }

    fn hash_pair_native(&self, left: F, right: F) -> F {
        let mut sponge = self.sponge_native(TAG_PAIR);
        sponge.absorb(&left);
        sponge.absorb(&right);
        sponge.squeeze_field_elements::<F>(1)[0]
    }
}
