//! Per-block verification and block partitioning.
//!
//! A step's decompressed pixels form a `rows × pixel_width` grid of RGB
//! triples for each image. [`partition`] cuts that grid into 8×8 blocks of
//! one channel; [`verify_block`] checks one original/transformed block pair.
//! Blocks share no state: each only appends constraints to the common
//! system, so the order they are emitted in does not matter.

#![forbid(unsafe_code)]

use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::SynthesisError;

use crate::{
    config::{BLOCK_EDGE, CHANNELS},
    dct::{self, BlockVar},
    quant,
    tables::{QuantTable, CENTER, COEFF_SCALE},
    F,
};

/// Position of a block inside a step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockPos {
    /// Block row (group of 8 image rows) within the step.
    pub block_row: usize,
    /// Block column (group of 8 pixels) within the row group.
    pub block_col: usize,
    /// Colour channel, 0..3.
    pub channel: usize,
}

impl BlockPos {
    /// Quantization table this block is checked against.
    #[inline]
    pub fn table(&self) -> QuantTable {
        QuantTable::for_channel(self.channel)
    }
}

/// A decompressed pixel grid: `grid[row][col][channel]`.
pub type PixelGridVar = Vec<Vec<[FpVar<F>; CHANNELS]>>;

/// Slice every 8×8 single-channel block out of a decompressed grid.
///
/// Blocks come out row-group-major, then column, then channel. The grid
/// dimensions must already be multiples of 8.
pub fn partition(grid: &PixelGridVar) -> Vec<(BlockPos, BlockVar)> {
    let rows = grid.len();
    let cols = grid.first().map_or(0, |r| r.len());
    debug_assert!(rows % BLOCK_EDGE == 0 && cols % BLOCK_EDGE == 0);

    let mut out = Vec::with_capacity((rows / BLOCK_EDGE) * (cols / BLOCK_EDGE) * CHANNELS);
    for block_row in 0..rows / BLOCK_EDGE {
        for block_col in 0..cols / BLOCK_EDGE {
            for channel in 0..CHANNELS {
                let block: BlockVar = std::array::from_fn(|i| {
                    std::array::from_fn(|j| {
                        grid[block_row * BLOCK_EDGE + i][block_col * BLOCK_EDGE + j][channel].clone()
                    })
                });
                out.push((BlockPos { block_row, block_col, channel }, block));
            }
        }
    }
    out
}

/// Verify one single-channel block.
///
/// Centers the original samples, transforms them, and checks every
/// coefficient `(m, k)` against the transformed sample at the same position,
/// itself centered to a signed quantized value `q = t − 128`.
pub fn verify_block(
    original: &BlockVar,
    transformed: &BlockVar,
    table: QuantTable,
) -> Result<(), SynthesisError> {
    let coeffs = dct::dct_2d_var(&dct::center(original));
    let offset = F::from(CENTER);
    for m in 0..BLOCK_EDGE {
        for k in 0..BLOCK_EDGE {
            let q = &transformed[m][k] - offset;
            quant::enforce_quantization_tolerance(&coeffs[m][k], &q, table.divisor(m, k), COEFF_SCALE)?;
        }
    }
    Ok(())
}

/// Constraints one [`verify_block`] call emits.
///
/// Each of the 64 checks range-checks `diff` (`COMPARISON_BITS`
/// booleans + one recomposition) and decomposes the shifted difference
/// (`COMPARISON_BITS + 1` booleans + one recomposition), then binds the
/// outcome bit.
pub const fn constraints_per_block() -> usize {
    use crate::tables::COMPARISON_BITS;
    let per_check = (COMPARISON_BITS + 1) + (COMPARISON_BITS + 1 + 1) + 1;
    BLOCK_EDGE * BLOCK_EDGE * per_check
}
