//! Top-level step circuit.
//!
//! One step takes `rows_per_step` packed rows of each image, unpacks them,
//! verifies every 8×8 block of every channel, and folds the row hashes into
//! the running state. [`synthesize_step`] is the gadget form, working on
//! caller-allocated variables; [`DctqStep`] owns its witness and plugs into
//! any arkworks backend through [`ConstraintSynthesizer`].

#![forbid(unsafe_code)]

use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use tracing::{debug, info, trace};

use crate::{
    block::{self, PixelGridVar},
    chain::{StepHashChain, StepStateVar},
    config::{ConfigError, DctqConfig, CHANNELS},
    hash::{ArrayHasher, PairHasher},
    unpack::{ByteDecompressor, Decompressor},
    PoseidonHasher, StepState, F,
};

/// Shape and synthesis failures of a step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The deployment shape itself is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Wrong number of rows for one step.
    #[error("step expects {expected} rows (got {got})")]
    RowCount {
        /// Rows per step.
        expected: usize,
        /// Rows supplied.
        got: usize,
    },
    /// A row has the wrong number of packed elements.
    #[error("{track} row {row} must hold {expected} packed elements (got {got})")]
    RowWidth {
        /// `"original"` or `"transformed"`.
        track: &'static str,
        /// Row index within the step.
        row: usize,
        /// Configured packed width.
        expected: usize,
        /// Elements supplied.
        got: usize,
    },
    /// The two tracks disagree on row count.
    #[error("original has {original} rows but transformed has {transformed}")]
    TrackMismatch {
        /// Original rows.
        original: usize,
        /// Transformed rows.
        transformed: usize,
    },
    /// Constraint emission failed.
    #[error("constraint synthesis failed: {0}")]
    Synthesis(SynthesisError),
}

impl From<SynthesisError> for StepError {
    fn from(e: SynthesisError) -> Self {
        StepError::Synthesis(e)
    }
}

impl StepError {
    /// Collapse into the error type `ConstraintSynthesizer` must return.
    pub fn into_synthesis(self) -> SynthesisError {
        match self {
            StepError::Synthesis(e) => e,
            _ => SynthesisError::Unsatisfiable,
        }
    }
}

/// Check both tracks against the configured step shape.
pub fn check_shape<T>(config: &DctqConfig, original: &[Vec<T>], transformed: &[Vec<T>]) -> Result<(), StepError> {
    config.validate()?;
    if original.len() != transformed.len() {
        return Err(StepError::TrackMismatch { original: original.len(), transformed: transformed.len() });
    }
    if original.len() != config.rows_per_step {
        return Err(StepError::RowCount { expected: config.rows_per_step, got: original.len() });
    }
    for (track, rows) in [("original", original), ("transformed", transformed)] {
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != config.packed_width) {
            return Err(StepError::RowWidth { track, row, expected: config.packed_width, got: r.len() });
        }
    }
    Ok(())
}

/// Decompress packed rows into a `rows × pixel_width` grid.
fn unpack_rows<D: Decompressor>(decompressor: &D, rows: &[Vec<FpVar<F>>]) -> Result<PixelGridVar, SynthesisError> {
    rows.iter()
        .map(|row| {
            let mut pixels: Vec<[FpVar<F>; CHANNELS]> = Vec::new();
            for packed in row {
                pixels.extend(decompressor.decompress(packed)?);
            }
            Ok(pixels)
        })
        .collect()
}

/// Emit one step's constraints and return the next state.
///
/// Blocks are verified in partition order, then the state is folded. A
/// wrong witness leaves `cs` unsatisfied; only shape problems are errors.
pub fn synthesize_step<D, H>(
    cs: ConstraintSystemRef<F>,
    config: &DctqConfig,
    decompressor: &D,
    hasher: &H,
    state_in: &StepStateVar,
    original: &[Vec<FpVar<F>>],
    transformed: &[Vec<FpVar<F>>],
) -> Result<StepStateVar, StepError>
where
    D: Decompressor,
    H: ArrayHasher + PairHasher,
{
    check_shape(config, original, transformed)?;
    let start = cs.num_constraints();

    let grid_orig = unpack_rows(decompressor, original)?;
    let grid_tran = unpack_rows(decompressor, transformed)?;
    debug!(constraints = cs.num_constraints() - start, "rows unpacked");

    let blocks_orig = block::partition(&grid_orig);
    let blocks_tran = block::partition(&grid_tran);
    for ((pos, o), (_, t)) in blocks_orig.iter().zip(blocks_tran.iter()) {
        block::verify_block(o, t, pos.table())?;
        trace!(?pos, "block verified");
    }
    debug!(blocks = blocks_orig.len(), constraints = cs.num_constraints() - start, "blocks verified");

    let next = StepHashChain::new(hasher).fold(state_in, original, transformed)?;
    info!(
        rows = config.rows_per_step,
        blocks = blocks_orig.len(),
        constraints = cs.num_constraints() - start,
        "step synthesized"
    );
    Ok(next)
}

/// A self-contained step: packed rows plus the state pair around them.
///
/// `state_in` and `state_out` are the public inputs, in that order; packed
/// rows are private witnesses.
#[derive(Clone, Debug)]
pub struct DctqStep<D = ByteDecompressor, H = PoseidonHasher> {
    config: DctqConfig,
    decompressor: D,
    hasher: H,
    state_in: StepState,
    state_out: StepState,
    original: Vec<Vec<F>>,
    transformed: Vec<Vec<F>>,
}

impl DctqStep {
    /// Step over the default decompressor and Poseidon hasher.
    pub fn new(
        config: DctqConfig,
        state_in: StepState,
        original: Vec<Vec<F>>,
        transformed: Vec<Vec<F>>,
    ) -> Result<Self, StepError> {
        Self::with_parts(config, ByteDecompressor, PoseidonHasher::new(), state_in, original, transformed)
    }
}

impl<D: Decompressor, H: ArrayHasher + PairHasher> DctqStep<D, H> {
    /// Step over explicit collaborators. `state_out` is set to the honest
    /// [`DctqStep::next_state`].
    pub fn with_parts(
        config: DctqConfig,
        decompressor: D,
        hasher: H,
        state_in: StepState,
        original: Vec<Vec<F>>,
        transformed: Vec<Vec<F>>,
    ) -> Result<Self, StepError> {
        check_shape(&config, &original, &transformed)?;
        let state_out = StepHashChain::new(&hasher).fold_native(state_in, &original, &transformed);
        Ok(Self { config, decompressor, hasher, state_in, state_out, original, transformed })
    }

    /// Replace the claimed output state.
    pub fn with_state_out(mut self, state_out: StepState) -> Self {
        self.state_out = state_out;
        self
    }

    /// Input state.
    pub fn state_in(&self) -> StepState {
        self.state_in
    }

    /// Claimed output state.
    pub fn state_out(&self) -> StepState {
        self.state_out
    }

    /// Output state computed natively from the rows.
    pub fn next_state(&self) -> StepState {
        StepHashChain::new(&self.hasher).fold_native(self.state_in, &self.original, &self.transformed)
    }

    /// Public inputs in allocation order.
    pub fn public_inputs(&self) -> Vec<F> {
        vec![self.state_in.orig, self.state_in.tran, self.state_out.orig, self.state_out.tran]
    }
}

fn alloc_rows(cs: &ConstraintSystemRef<F>, rows: &[Vec<F>]) -> Result<Vec<Vec<FpVar<F>>>, SynthesisError> {
    rows.iter()
        .map(|row| row.iter().map(|v| FpVar::new_witness(cs.clone(), || Ok(*v))).collect())
        .collect()
}

impl<D: Decompressor, H: ArrayHasher + PairHasher> ConstraintSynthesizer<F> for DctqStep<D, H> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let state_in = StepStateVar::alloc_input(cs.clone(), Some(self.state_in))?;
        let state_out = StepStateVar::alloc_input(cs.clone(), Some(self.state_out))?;
        let original = alloc_rows(&cs, &self.original)?;
        let transformed = alloc_rows(&cs, &self.transformed)?;

        let next = synthesize_step(
            cs,
            &self.config,
            &self.decompressor,
            &self.hasher,
            &state_in,
            &original,
            &transformed,
        )
        .map_err(StepError::into_synthesis)?;
        next.enforce_equal(&state_out)
    }
}
