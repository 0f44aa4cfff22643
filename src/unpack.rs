//! Packed pixel groups.
//!
//! One field element carries ten RGB pixels: pixel `i`, channel `j` sits at
//! bits `[24i + 8j, 24i + 8j + 8)`. That is 240 bits, below the 254-bit
//! modulus, so the little-endian byte decomposition of a valid group is
//! unique.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use ark_ff::{BigInteger, PrimeField, Zero};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::SynthesisError;

use crate::{cmp, config::CHANNELS, F};

/// Pixels per packed field element.
pub const PIXELS_PER_GROUP: usize = 10;

/// Bits used by one packed group.
pub const PACKED_BITS: usize = PIXELS_PER_GROUP * CHANNELS * 8;

/// Ten pixels of three in-circuit channel values.
pub type PixelGroupVar = [[FpVar<F>; CHANNELS]; PIXELS_PER_GROUP];

/// Ten native RGB pixels.
pub type PixelGroup = [[u8; CHANNELS]; PIXELS_PER_GROUP];

/// Unpacks one packed element into ten pixel triples.
///
/// Implementations must make the decomposition unique and every returned
/// channel value byte-bounded; callers rely on both without re-checking.
pub trait Decompressor {
    fn decompress(&self, packed: &FpVar<F>) -> Result<PixelGroupVar, SynthesisError>;
}

/// Bit-level decompressor: 240 boolean witnesses, one recomposition
/// constraint, bytes as linear combinations of their bits.
#[derive(Copy, Clone, Debug, Default)]
pub struct ByteDecompressor;

impl Decompressor for ByteDecompressor {
    fn decompress(&self, packed: &FpVar<F>) -> Result<PixelGroupVar, SynthesisError> {
        let bytes: Vec<FpVar<F>> = match packed {
            FpVar::Constant(c) => {
                let group = unpack_pixels(*c).ok_or(SynthesisError::Unsatisfiable)?;
                group
                    .iter()
                    .flat_map(|px| px.iter().map(|&b| FpVar::constant(F::from(b as u64))))
                    .collect()
            }
            FpVar::Var(_) => {
                let cs = packed.cs();
                let bits = cmp::decompose(&cs, packed, PACKED_BITS)?;
                bits.chunks(8).map(Boolean::le_bits_to_fp_var).collect::<Result<_, _>>()?
            }
        };

        let mut it = bytes.into_iter();
        let mut next = || it.next().ok_or(SynthesisError::Unsatisfiable);
        let mut out: Vec<[FpVar<F>; CHANNELS]> = Vec::with_capacity(PIXELS_PER_GROUP);
        for _ in 0..PIXELS_PER_GROUP {
            out.push([next()?, next()?, next()?]);
        }
        out.try_into().map_err(|_| SynthesisError::Unsatisfiable)
    }
}

/// Pack ten RGB pixels into one field element.
pub fn pack_pixels(pixels: &PixelGroup) -> F {
    let mut acc = F::zero();
    let mut scale = F::from(1u64);
    let base = F::from(256u64);
    for px in pixels {
        for &ch in px {
            acc += scale * F::from(ch as u64);
            scale *= base;
        }
    }
    acc
}

/// Inverse of [`pack_pixels`]; `None` if any bit at or above 240 is set.
pub fn unpack_pixels(packed: F) -> Option<PixelGroup> {
    let bits = packed.into_bigint().to_bits_le();
    if bits.iter().skip(PACKED_BITS).any(|&b| b) {
        return None;
    }
    let mut out = [[0u8; CHANNELS]; PIXELS_PER_GROUP];
    for (i, px) in out.iter_mut().enumerate() {
        for (j, ch) in px.iter_mut().enumerate() {
            let base = (i * CHANNELS + j) * 8;
            *ch = (0..8).fold(0u8, |acc, k| acc | ((bits[base + k] as u8) << k));
        }
    }
    Some(out)
}
