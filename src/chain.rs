//! Cross-step hash chain.
//!
//! Each step reduces its rows to one digest per track and folds it into the
//! running [`StepState`]:
//!
//! ```text
//! rowHash[i]  = ArrayHasher(row[i])
//! stepDigest  = ArrayHasher(rowHash[0..rows])
//! next        = PairHasher(prev, stepDigest)
//! ```
//!
//! The original and transformed tracks never mix. Because `PairHasher` is not
//! associative, the final state depends on how rows were grouped into steps;
//! prover and verifier must share `rows_per_step`.

#![forbid(unsafe_code)]

use std::borrow::Borrow;

use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, Namespace, SynthesisError};
use tracing::trace;

use crate::{
    hash::{ArrayHasher, PairHasher},
    step::StepError,
    StepState, F,
};

/// In-circuit [`StepState`].
#[derive(Clone, Debug)]
pub struct StepStateVar {
    /// Running digest of the original rows.
    pub orig: FpVar<F>,
    /// Running digest of the transformed rows.
    pub tran: FpVar<F>,
}

impl StepStateVar {
    /// Allocate as two public inputs.
    pub fn alloc_input(cs: ConstraintSystemRef<F>, state: Option<StepState>) -> Result<Self, SynthesisError> {
        Self::new_variable(cs, || state.ok_or(SynthesisError::AssignmentMissing), AllocationMode::Input)
    }

    /// Allocate as two private witnesses.
    pub fn alloc_witness(cs: ConstraintSystemRef<F>, state: Option<StepState>) -> Result<Self, SynthesisError> {
        Self::new_variable(cs, || state.ok_or(SynthesisError::AssignmentMissing), AllocationMode::Witness)
    }

    /// Embed a known state as constants.
    pub fn constant(state: StepState) -> Self {
        Self { orig: FpVar::constant(state.orig), tran: FpVar::constant(state.tran) }
    }

    /// Assigned value, if the system carries witnesses.
    pub fn value(&self) -> Result<StepState, SynthesisError> {
        Ok(StepState::new(self.orig.value()?, self.tran.value()?))
    }

    /// Enforce both halves equal.
    pub fn enforce_equal(&self, other: &Self) -> Result<(), SynthesisError> {
        self.orig.enforce_equal(&other.orig)?;
        self.tran.enforce_equal(&other.tran)
    }
}

impl AllocVar<StepState, F> for StepStateVar {
    fn new_variable<T: Borrow<StepState>>(
        cs: impl Into<Namespace<F>>,
        f: impl FnOnce() -> Result<T, SynthesisError>,
        mode: AllocationMode,
    ) -> Result<Self, SynthesisError> {
        let ns = cs.into();
        let cs = ns.cs();
        let state = f().ok().map(|s| *s.borrow());
        let orig = FpVar::new_variable(cs.clone(), || state.map(|s| s.orig).ok_or(SynthesisError::AssignmentMissing), mode)?;
        let tran = FpVar::new_variable(cs, || state.map(|s| s.tran).ok_or(SynthesisError::AssignmentMissing), mode)?;
        Ok(Self { orig, tran })
    }
}

/// Folds step rows into the running state, in circuit or natively.
#[derive(Copy, Clone, Debug)]
pub struct StepHashChain<'a, H> {
    hasher: &'a H,
}

impl<'a, H: ArrayHasher + PairHasher> StepHashChain<'a, H> {
    /// Chain over `hasher`.
    pub fn new(hasher: &'a H) -> Self {
        Self { hasher }
    }

    fn step_digest(&self, rows: &[Vec<FpVar<F>>]) -> Result<FpVar<F>, SynthesisError> {
        let row_hashes = rows
            .iter()
            .map(|row| self.hasher.hash_array(row))
            .collect::<Result<Vec<_>, _>>()?;
        self.hasher.hash_array(&row_hashes)
    }

    fn step_digest_native(&self, rows: &[Vec<F>]) -> F {
        let row_hashes: Vec<F> = rows.iter().map(|row| self.hasher.hash_array_native(row)).collect();
        self.hasher.hash_array_native(&row_hashes)
    }

    /// In-circuit fold of one step.
    pub fn fold(
        &self,
        prev: &StepStateVar,
        original: &[Vec<FpVar<F>>],
        transformed: &[Vec<FpVar<F>>],
    ) -> Result<StepStateVar, SynthesisError> {
        let orig = self.hasher.hash_pair(&prev.orig, &self.step_digest(original)?)?;
        let tran = self.hasher.hash_pair(&prev.tran, &self.step_digest(transformed)?)?;
        Ok(StepStateVar { orig, tran })
    }

    /// Native fold of one step; equal to the value of [`StepHashChain::fold`].
    pub fn fold_native(&self, prev: StepState, original: &[Vec<F>], transformed: &[Vec<F>]) -> StepState {
        let d_orig = self.step_digest_native(original);
        let d_tran = self.step_digest_native(transformed);
        trace!(digest_orig = %d_orig, digest_tran = %d_tran, "step digests");
        StepState::new(
            self.hasher.hash_pair_native(prev.orig, d_orig),
            self.hasher.hash_pair_native(prev.tran, d_tran),
        )
    }
}

/// Fold a whole image natively, `rows_per_step` rows at a time.
///
/// Returns the state an external verifier compares against the published
/// commitment. Row widths are not checked here; only the step shape is.
pub fn fold_image<H: ArrayHasher + PairHasher>(
    hasher: &H,
    initial: StepState,
    original_rows: &[Vec<F>],
    transformed_rows: &[Vec<F>],
    rows_per_step: usize,
) -> Result<StepState, StepError> {
    if original_rows.len() != transformed_rows.len() {
        return Err(StepError::TrackMismatch {
            original: original_rows.len(),
            transformed: transformed_rows.len(),
        });
    }
    if rows_per_step == 0 || original_rows.len() % rows_per_step != 0 {
        return Err(StepError::RowCount { expected: rows_per_step, got: original_rows.len() });
    }

    let chain = StepHashChain::new(hasher);
    let state = original_rows
        .chunks(rows_per_step)
        .zip(transformed_rows.chunks(rows_per_step))
        .fold(initial, |state, (o, t)| chain.fold_native(state, o, t));
    Ok(state)
}
