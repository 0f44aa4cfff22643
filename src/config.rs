//! Deployment shape of the step circuit.
//!
//! The number of rows per step and the packed row width are fixed per
//! deployment: they determine how many constraints one step emits, so a
//! prover and verifier must agree on them exactly. The defaults match an HD
//! frame reshaped to 160-pixel rows processed eight rows at a time.

#![forbid(unsafe_code)]

use blake3::Hasher;

use crate::{
    tables::{COMPARISON_BITS, DCT_BASIS, QUANT_CHROMINANCE, QUANT_LUMINANCE},
    unpack::PIXELS_PER_GROUP,
};

/// Side length of a DCT block.
pub const BLOCK_EDGE: usize = 8;

/// Number of colour channels per pixel.
pub const CHANNELS: usize = 3;

/// Environment variable overriding [`DctqConfig::rows_per_step`].
pub const ENV_ROWS_PER_STEP: &str = "DCTQ_ROWS_PER_STEP";
/// Environment variable overriding [`DctqConfig::packed_width`].
pub const ENV_PACKED_WIDTH: &str = "DCTQ_PACKED_WIDTH";

/// Shape errors for a deployment configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A step must process at least one block row.
    #[error("rows_per_step must be a positive multiple of {BLOCK_EDGE} (got {0})")]
    BadRowsPerStep(usize),
    /// Decompressed rows must split evenly into 8-pixel blocks.
    #[error("packed_width={width} decompresses to {pixels} pixels, not a positive multiple of {BLOCK_EDGE}")]
    BadPackedWidth {
        /// Packed elements per row.
        width: usize,
        /// Pixels per decompressed row.
        pixels: usize,
    },
    /// An environment override could not be parsed.
    #[error("{var} must be an unsigned integer (got `{value}`)")]
    BadEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Rows per step and packed elements per row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DctqConfig {
    /// Rows of each image consumed by one step.
    pub rows_per_step: usize,
    /// Packed field elements per row (each holds 10 pixels).
    pub packed_width: usize,
}

impl Default for DctqConfig {
    fn default() -> Self {
        Self { rows_per_step: 8, packed_width: 16 }
    }
}

impl DctqConfig {
    /// Build and validate a configuration.
    pub fn new(rows_per_step: usize, packed_width: usize) -> Result<Self, ConfigError> {
        let cfg = Self { rows_per_step, packed_width };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by `DCTQ_ROWS_PER_STEP` / `DCTQ_PACKED_WIDTH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = read_env_usize(ENV_ROWS_PER_STEP)? {
            cfg.rows_per_step = v;
        }
        if let Some(v) = read_env_usize(ENV_PACKED_WIDTH)? {
            cfg.packed_width = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that rows and columns partition exactly into 8×8 blocks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows_per_step == 0 || self.rows_per_step % BLOCK_EDGE != 0 {
            return Err(ConfigError::BadRowsPerStep(self.rows_per_step));
        }
        let pixels = self.pixel_width();
        if pixels == 0 || pixels % BLOCK_EDGE != 0 {
            return Err(ConfigError::BadPackedWidth { width: self.packed_width, pixels });
        }
        Ok(())
    }

    /// Pixels per decompressed row.
    #[inline]
    pub fn pixel_width(&self) -> usize {
        self.packed_width * PIXELS_PER_GROUP
    }

    /// 8×8 blocks across one decompressed row group.
    #[inline]
    pub fn blocks_per_row(&self) -> usize {
        self.pixel_width() / BLOCK_EDGE
    }

    /// Block rows (groups of 8 image rows) per step.
    #[inline]
    pub fn block_rows(&self) -> usize {
        self.rows_per_step / BLOCK_EDGE
    }

    /// Single-channel blocks verified per step.
    #[inline]
    pub fn blocks_per_step(&self) -> usize {
        self.block_rows() * self.blocks_per_row() * CHANNELS
    }
}

/// Stable 32-byte digest of everything that shapes the step circuit.
///
/// Two parties whose digests differ synthesize different constraint
/// systems; print it next to results so mismatches are obvious.
pub fn circuit_digest(cfg: &DctqConfig) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(b"DCTQ.step.v1");
    h.update(&(cfg.rows_per_step as u64).to_be_bytes());
    h.update(&(cfg.packed_width as u64).to_be_bytes());
    h.update(&(COMPARISON_BITS as u64).to_be_bytes());
    for v in DCT_BASIS.iter().flatten() {
        h.update(&v.to_be_bytes());
    }
    for v in QUANT_LUMINANCE.iter().chain(QUANT_CHROMINANCE.iter()).flatten() {
        h.update(&v.to_be_bytes());
    }
    *h.finalize().as_bytes()
}

fn read_env_usize(var: &'static str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(var) {
        Ok(s) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::BadEnv { var, value: s }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reshaped_hd_frame() {
        let cfg = DctqConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.pixel_width(), 160);
        assert_eq!(cfg.blocks_per_row(), 20);
        assert_eq!(cfg.blocks_per_step(), 60);
    }

    #[test]
    fn rejects_shapes_that_do_not_tile() {
        assert_eq!(DctqConfig::new(0, 16), Err(ConfigError::BadRowsPerStep(0)));
        assert_eq!(DctqConfig::new(12, 16), Err(ConfigError::BadRowsPerStep(12)));
        // 3 packed elements → 30 pixels, not divisible by 8.
        assert_eq!(
            DctqConfig::new(8, 3),
            Err(ConfigError::BadPackedWidth { width: 3, pixels: 30 })
        );
        assert!(DctqConfig::new(8, 0).is_err());
        assert!(DctqConfig::new(16, 4).is_ok());
    }

    #[test]
    fn digest_tracks_shape() {
        let a = circuit_digest(&DctqConfig::default());
        assert_eq!(a, circuit_digest(&DctqConfig::default()));
        assert_ne!(a, circuit_digest(&DctqConfig { rows_per_step: 16, packed_width: 16 }));
        assert_ne!(a, circuit_digest(&DctqConfig { rows_per_step: 8, packed_width: 8 }));
    }
}
