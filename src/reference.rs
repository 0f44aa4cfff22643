//! Native DCTQ encoder.
//!
//! Produces transformed images the step circuit accepts: every 8×8 block of
//! every channel is centered, transformed with the same fixed-point basis the
//! circuit uses, quantized with round-half-away-from-zero, clipped to
//! `[-127, 127]` and shifted by 128 into a byte. Transformed pixel `(r, c)`
//! holds the quantized coefficient at `(r mod 8, c mod 8)` of its block.
//!
//! Clipping never bites with the fixed tables: the largest possible
//! `|coeff| / (1000²·d)` is about 103.
//!
//! Blocks are independent; with the `parallel` feature they are encoded on
//! the rayon pool.

#![forbid(unsafe_code)]

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::{BLOCK_EDGE, CHANNELS},
    dct::{center_native, dct_2d},
    input::{ImageInput, InputError},
    quant::quantize,
    tables::{QuantTable, COEFF_SCALE},
    unpack::{pack_pixels, PixelGroup, PIXELS_PER_GROUP},
    F,
};

/// RGB pixels, row-major.
pub type PixelRows = Vec<Vec<[u8; CHANNELS]>>;

/// Encode one single-channel block.
pub fn encode_block(block: &[[u8; BLOCK_EDGE]; BLOCK_EDGE], table: QuantTable) -> [[u8; BLOCK_EDGE]; BLOCK_EDGE] {
    let coeffs = dct_2d(&center_native(block));
    let mut out = [[0u8; BLOCK_EDGE]; BLOCK_EDGE];
    for m in 0..BLOCK_EDGE {
        for k in 0..BLOCK_EDGE {
            let q = quantize(coeffs[m][k], table.divisor(m, k), COEFF_SCALE).clamp(-127, 127);
            out[m][k] = (q + 128) as u8;
        }
    }
    out
}

fn dims(pixels: &[Vec<[u8; CHANNELS]>]) -> Result<(usize, usize), InputError> {
    let rows = pixels.len();
    let cols = pixels.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Err(InputError::PixelShape { rows, cols, reason: "image is empty" });
    }
    if pixels.iter().any(|r| r.len() != cols) {
        return Err(InputError::PixelShape { rows, cols, reason: "rows differ in length" });
    }
    Ok((rows, cols))
}

/// Encode a whole image. Both dimensions must be multiples of 8.
pub fn encode_image(pixels: &[Vec<[u8; CHANNELS]>]) -> Result<PixelRows, InputError> {
    let (rows, cols) = dims(pixels)?;
    if rows % BLOCK_EDGE != 0 || cols % BLOCK_EDGE != 0 {
        return Err(InputError::PixelShape { rows, cols, reason: "dimensions must be multiples of 8" });
    }

    let positions: Vec<(usize, usize, usize)> = (0..rows / BLOCK_EDGE)
        .flat_map(|br| (0..cols / BLOCK_EDGE).flat_map(move |bc| (0..CHANNELS).map(move |ch| (br, bc, ch))))
        .collect();

    let encode = |&(br, bc, ch): &(usize, usize, usize)| {
        let block: [[u8; BLOCK_EDGE]; BLOCK_EDGE] = std::array::from_fn(|i| {
            std::array::from_fn(|j| pixels[br * BLOCK_EDGE + i][bc * BLOCK_EDGE + j][ch])
        });
        encode_block(&block, QuantTable::for_channel(ch))
    };

    #[cfg(feature = "parallel")]
    let encoded: Vec<_> = positions.par_iter().map(encode).collect();
    #[cfg(not(feature = "parallel"))]
    let encoded: Vec<_> = positions.iter().map(encode).collect();

    let mut out = vec![vec![[0u8; CHANNELS]; cols]; rows];
    for (&(br, bc, ch), block) in positions.iter().zip(encoded.iter()) {
        for i in 0..BLOCK_EDGE {
            for j in 0..BLOCK_EDGE {
                out[br * BLOCK_EDGE + i][bc * BLOCK_EDGE + j][ch] = block[i][j];
            }
        }
    }
    debug!(rows, cols, blocks = positions.len(), "image encoded");
    Ok(out)
}

/// Pack pixel rows ten pixels per field element.
pub fn pack_image(pixels: &[Vec<[u8; CHANNELS]>]) -> Result<Vec<Vec<F>>, InputError> {
    let (rows, cols) = dims(pixels)?;
    if cols % PIXELS_PER_GROUP != 0 {
        return Err(InputError::PixelShape { rows, cols, reason: "row width must be a multiple of 10" });
    }
    Ok(pixels
        .iter()
        .map(|row| {
            row.chunks_exact(PIXELS_PER_GROUP)
                .map(|chunk| {
                    let mut group: PixelGroup = [[0u8; CHANNELS]; PIXELS_PER_GROUP];
                    group.copy_from_slice(chunk);
                    pack_pixels(&group)
                })
                .collect()
        })
        .collect())
}

/// Cut each row into consecutive `new_width`-pixel rows, stacking them
/// vertically. A 1280×720 frame becomes 160×5760.
pub fn reshape_rows(pixels: &[Vec<[u8; CHANNELS]>], new_width: usize) -> Result<PixelRows, InputError> {
    let (rows, cols) = dims(pixels)?;
    if new_width == 0 || cols % new_width != 0 {
        return Err(InputError::PixelShape { rows, cols, reason: "row width must be a multiple of the new width" });
    }
    Ok(pixels.iter().flat_map(|row| row.chunks_exact(new_width).map(<[_]>::to_vec)).collect())
}

/// Encode and pack an image into a ready-to-check input.
pub fn build_input(pixels: &[Vec<[u8; CHANNELS]>]) -> Result<ImageInput, InputError> {
    let encoded = encode_image(pixels)?;
    ImageInput::new(pack_image(pixels)?, pack_image(&encoded)?)
}

/// Distribution of quantized coefficients in an encoded image.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoefficientStats {
    /// Coefficients quantized to zero.
    pub zero: usize,
    /// All other coefficients.
    pub nonzero: usize,
    /// Smallest signed coefficient.
    pub min: i16,
    /// Largest signed coefficient.
    pub max: i16,
}

impl CoefficientStats {
    /// Tally an encoded image (samples are `q + 128`).
    pub fn of(encoded: &[Vec<[u8; CHANNELS]>]) -> Self {
        let mut s = Self { min: i16::MAX, max: i16::MIN, ..Self::default() };
        for q in encoded.iter().flatten().flatten().map(|&t| t as i16 - 128) {
            if q == 0 {
                s.zero += 1;
            } else {
                s.nonzero += 1;
            }
            s.min = s.min.min(q);
            s.max = s.max.max(q);
        }
        s
    }

    /// Share of zero coefficients, in percent.
    pub fn sparsity(&self) -> f64 {
        let total = self.zero + self.nonzero;
        if total == 0 {
            0.0
        } else {
            100.0 * self.zero as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unpack::unpack_pixels;

    fn gradient(rows: usize, cols: usize) -> PixelRows {
        (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| [((r * 3 + c) % 256) as u8, ((r * 7) % 256) as u8, ((c * 5) % 256) as u8])
                    .collect()
            })
            .collect()
    }

    #[test]
    fn flat_image_encodes_to_dc_only() {
        let flat = vec![vec![[128u8, 128, 128]; 8]; 8];
        let enc = encode_image(&flat).unwrap();
        assert!(enc.iter().flatten().all(|px| *px == [128, 128, 128]));

        let white = vec![vec![[255u8; CHANNELS]; 8]; 8];
        let enc = encode_image(&white).unwrap();
        // DC: 127 · (8 · 354)² / (1000² · 16) ≈ 63.7 → 64.
        assert_eq!(enc[0][0][0], 128 + 64);
        assert_eq!(enc[0][1][0], 128);
    }

    #[test]
    fn channels_use_their_own_table() {
        let white = vec![vec![[255u8; CHANNELS]; 8]; 8];
        let enc = encode_image(&white).unwrap();
        // Chrominance DC divisor is 17: 1_018_568_448 / 17_000_000 ≈ 59.9 → 60.
        assert_eq!(enc[0][0][1], 128 + 60);
        assert_eq!(enc[0][0][1], enc[0][0][2]);
    }

    #[test]
    fn pack_image_uses_ten_pixel_groups() {
        let img = gradient(2, 20);
        let packed = pack_image(&img).unwrap();
        assert_eq!((packed.len(), packed[0].len()), (2, 2));
        let group = unpack_pixels(packed[1][1]).unwrap();
        assert_eq!(group[3], img[1][13]);
    }

    #[test]
    fn reshape_stacks_row_chunks() {
        let img = gradient(2, 32);
        let tall = reshape_rows(&img, 16).unwrap();
        assert_eq!((tall.len(), tall[0].len()), (4, 16));
        assert_eq!(tall[1][0], img[0][16]);
        assert_eq!(tall[2][5], img[1][5]);
        assert!(reshape_rows(&img, 10).is_err());
    }

    #[test]
    fn shape_errors() {
        assert!(encode_image(&gradient(8, 12)).is_err());
        assert!(encode_image(&[]).is_err());
        assert!(pack_image(&gradient(1, 15)).is_err());
        let mut ragged = gradient(8, 8);
        ragged[3].pop();
        assert!(encode_image(&ragged).is_err());
    }

    #[test]
    fn stats_count_zero_coefficients() {
        let white = vec![vec![[255u8; CHANNELS]; 8]; 8];
        let stats = CoefficientStats::of(&encode_image(&white).unwrap());
        assert_eq!(stats.nonzero, 3);
        assert_eq!(stats.zero, 3 * 64 - 3);
        assert_eq!((stats.min, stats.max), (0, 64));
        assert!(stats.sparsity() > 98.0);
    }

    #[test]
    fn build_input_matches_manual_pipeline() {
        let img = gradient(8, 40);
        let input = build_input(&img).unwrap();
        assert_eq!(input.original, pack_image(&img).unwrap());
        assert_eq!(input.transformed, pack_image(&encode_image(&img).unwrap()).unwrap());
    }
}
