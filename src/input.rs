//! JSON input loading and hex helpers.
//!
//! The input document carries both images as packed rows:
//!
//! ```json
//! { "original": [["0x1a2b…", …], …], "transformed": [["0x…", …], …] }
//! ```
//!
//! Every entry is a `0x`-prefixed big-endian hex integer below the field
//! modulus. Both images must be rectangular and share one shape.

#![forbid(unsafe_code)]

use std::path::Path;

use ark_ff::{BigInt, BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::DctqConfig, F};

/// Failures loading or slicing an input document.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The file could not be read or written.
    #[error("io error on {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The document is not valid JSON of the expected shape.
    #[error("malformed input json: {0}")]
    Json(#[from] serde_json::Error),
    /// An entry is not a `0x`-prefixed hex integer.
    #[error("{at}: `{value}` is not a 0x-prefixed hex integer")]
    BadHex {
        /// Location, e.g. `original[3][1]`.
        at: String,
        /// Raw entry.
        value: String,
    },
    /// An entry is not below the field modulus.
    #[error("{at}: value does not fit in the scalar field")]
    OutOfField {
        /// Location, e.g. `original[3][1]`.
        at: String,
    },
    /// A track has no rows or empty rows.
    #[error("{0} image is empty")]
    Empty(&'static str),
    /// Rows of one track differ in length.
    #[error("{track} row {row} has {got} entries, expected {expected}")]
    Ragged {
        /// `"original"` or `"transformed"`.
        track: &'static str,
        /// Row index.
        row: usize,
        /// Width of row 0.
        expected: usize,
        /// Width of this row.
        got: usize,
    },
    /// The two tracks differ in shape.
    #[error("original is {orig_rows}×{orig_width} but transformed is {tran_rows}×{tran_width}")]
    ShapeMismatch {
        /// Original rows.
        orig_rows: usize,
        /// Original packed width.
        orig_width: usize,
        /// Transformed rows.
        tran_rows: usize,
        /// Transformed packed width.
        tran_width: usize,
    },
    /// The image does not split into steps of the configured shape.
    #[error("{rows}×{width} image does not split into steps of {rows_per_step}×{packed_width}")]
    StepShape {
        /// Image rows.
        rows: usize,
        /// Image packed width.
        width: usize,
        /// Configured rows per step.
        rows_per_step: usize,
        /// Configured packed width.
        packed_width: usize,
    },
    /// Pixel dimensions do not fit the block or packing grid.
    #[error("{rows}×{cols} pixels: {reason}")]
    PixelShape {
        /// Pixel rows.
        rows: usize,
        /// Pixels per row.
        cols: usize,
        /// What went wrong.
        reason: &'static str,
    },
}

#[derive(Serialize, Deserialize)]
struct RawInput {
    original: Vec<Vec<String>>,
    transformed: Vec<Vec<String>>,
}

/// Both images as packed field elements, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInput {
    /// Packed rows of the original image.
    pub original: Vec<Vec<F>>,
    /// Packed rows of the transformed image.
    pub transformed: Vec<Vec<F>>,
}

impl ImageInput {
    /// Wrap already-packed rows, checking shape.
    pub fn new(original: Vec<Vec<F>>, transformed: Vec<Vec<F>>) -> Result<Self, InputError> {
        let orig_width = track_width("original", &original)?;
        let tran_width = track_width("transformed", &transformed)?;
        if original.len() != transformed.len() || orig_width != tran_width {
            return Err(InputError::ShapeMismatch {
                orig_rows: original.len(),
                orig_width,
                tran_rows: transformed.len(),
                tran_width,
            });
        }
        Ok(Self { original, transformed })
    }

    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, InputError> {
        let raw: RawInput = serde_json::from_str(s)?;
        let original = parse_track("original", &raw.original)?;
        let transformed = parse_track("transformed", &raw.transformed)?;
        let input = Self::new(original, transformed)?;
        debug!(rows = input.rows(), width = input.width(), "input parsed");
        Ok(input)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| InputError::Io { path: path.display().to_string(), source })?;
        Self::from_json_str(&text)
    }

    /// Serialize back to the JSON document format.
    pub fn to_json_string(&self) -> Result<String, InputError> {
        let raw = RawInput {
            original: self.original.iter().map(|r| r.iter().map(|v| fe_to_hex(*v)).collect()).collect(),
            transformed: self.transformed.iter().map(|r| r.iter().map(|v| fe_to_hex(*v)).collect()).collect(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Write the JSON document to `path`.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), InputError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?)
            .map_err(|source| InputError::Io { path: path.display().to_string(), source })
    }

    /// Rows per image.
    pub fn rows(&self) -> usize {
        self.original.len()
    }

    /// Packed elements per row.
    pub fn width(&self) -> usize {
        self.original.first().map_or(0, Vec::len)
    }

    /// Split into per-step `(original, transformed)` row batches.
    pub fn steps(
        &self,
        config: &DctqConfig,
    ) -> Result<impl Iterator<Item = (&[Vec<F>], &[Vec<F>])> + '_, InputError> {
        let rps = config.rows_per_step;
        if rps == 0 || self.rows() % rps != 0 || self.width() != config.packed_width {
            return Err(InputError::StepShape {
                rows: self.rows(),
                width: self.width(),
                rows_per_step: rps,
                packed_width: config.packed_width,
            });
        }
        Ok(self.original.chunks(rps).zip(self.transformed.chunks(rps)))
    }
}

fn track_width(track: &'static str, rows: &[Vec<F>]) -> Result<usize, InputError> {
    let expected = match rows.first() {
        Some(r) if !r.is_empty() => r.len(),
        _ => return Err(InputError::Empty(track)),
    };
    if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(InputError::Ragged { track, row, expected, got: r.len() });
    }
    Ok(expected)
}

fn parse_track(track: &'static str, rows: &[Vec<String>]) -> Result<Vec<Vec<F>>, InputError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, s)| {
                    fe_from_hex(s).map_err(|e| match e {
                        HexError::Syntax => {
                            InputError::BadHex { at: format!("{track}[{i}][{j}]"), value: s.clone() }
                        }
                        HexError::Range => InputError::OutOfField { at: format!("{track}[{i}][{j}]") },
                    })
                })
                .collect()
        })
        .collect()
}

/// Why a hex string did not parse to a field element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HexError {
    /// Missing prefix, bad digit, or too many digits.
    Syntax,
    /// Well-formed but not below the modulus.
    Range,
}

/// Minimal `0x`-prefixed big-endian hex, as the input documents use.
pub fn fe_to_hex(x: F) -> String {
    let bytes = x.into_bigint().to_bytes_be();
    let digits = hex::encode(bytes);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{trimmed}")
    }
}

/// Parse a `0x`-prefixed big-endian hex integer below the field modulus.
pub fn fe_from_hex(s: &str) -> Result<F, HexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(HexError::Syntax)?;
    if digits.is_empty() || digits.len() > 64 {
        return Err(HexError::Syntax);
    }
    let padded = format!("{digits:0>64}");
    let bytes = hex::decode(padded).map_err(|_| HexError::Syntax)?;

    let mut limbs = [0u64; 4];
    for (k, chunk) in bytes.rchunks(8).enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        limbs[k] = u64::from_be_bytes(word);
    }
    F::from_bigint(BigInt::new(limbs)).ok_or(HexError::Range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    #[test]
    fn hex_helpers_roundtrip_and_reject_garbage() {
        for v in [F::from(0u64), F::one(), F::from(0xdead_beefu64), -F::one()] {
            assert_eq!(fe_from_hex(&fe_to_hex(v)), Ok(v));
        }
        assert_eq!(fe_to_hex(F::from(0x1abu64)), "0x1ab");
        assert_eq!(fe_from_hex("0xABC"), Ok(F::from(0xabcu64)));
        assert_eq!(fe_from_hex("abc"), Err(HexError::Syntax));
        assert_eq!(fe_from_hex("0x"), Err(HexError::Syntax));
        assert_eq!(fe_from_hex("0xzz"), Err(HexError::Syntax));
        assert_eq!(fe_from_hex(&format!("0x{}", "f".repeat(65))), Err(HexError::Syntax));
        // 2^256 − 1 exceeds the modulus.
        assert_eq!(fe_from_hex(&format!("0x{}", "f".repeat(64))), Err(HexError::Range));
    }

    #[test]
    fn modulus_itself_is_out_of_field() {
        let p_minus_one = fe_to_hex(-F::one());
        let len = p_minus_one.len();
        assert_eq!(len, 66);
        // Bump the last digit of p − 1 to reach p; p − 1 is even so no carry.
        let last = p_minus_one.chars().last().unwrap().to_digit(16).unwrap();
        let p = format!("{}{:x}", &p_minus_one[..len - 1], last + 1);
        assert_eq!(fe_from_hex(&p), Err(HexError::Range));
    }

    #[test]
    fn parses_document_and_splits_steps() {
        let doc = r#"{
            "original":    [["0x1", "0x2"], ["0x3", "0x4"], ["0x5", "0x6"], ["0x7", "0x8"]],
            "transformed": [["0x9", "0xa"], ["0xb", "0xc"], ["0xd", "0xe"], ["0xf", "0x10"]]
        }"#;
        let input = ImageInput::from_json_str(doc).unwrap();
        assert_eq!((input.rows(), input.width()), (4, 2));
        assert_eq!(input.transformed[3][1], F::from(16u64));

        let cfg = DctqConfig { rows_per_step: 2, packed_width: 2 };
        let steps: Vec<_> = input.steps(&cfg).unwrap().collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].0[0][0], F::from(5u64));

        let bad = DctqConfig { rows_per_step: 3, packed_width: 2 };
        assert!(matches!(input.steps(&bad), Err(InputError::StepShape { .. })));
    }

    #[test]
    fn json_roundtrip_preserves_values() {
        let input = ImageInput::new(
            vec![vec![F::from(1u64), -F::one()]],
            vec![vec![F::from(0u64), F::from(255u64)]],
        )
        .unwrap();
        let back = ImageInput::from_json_str(&input.to_json_string().unwrap()).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn rejects_malformed_documents() {
        let ragged = r#"{"original": [["0x1"], ["0x2", "0x3"]], "transformed": [["0x1"], ["0x2"]]}"#;
        assert!(matches!(
            ImageInput::from_json_str(ragged),
            Err(InputError::Ragged { track: "original", row: 1, expected: 1, got: 2 })
        ));

        let mismatch = r#"{"original": [["0x1"]], "transformed": [["0x1"], ["0x2"]]}"#;
        assert!(matches!(ImageInput::from_json_str(mismatch), Err(InputError::ShapeMismatch { .. })));

        let bad_hex = r#"{"original": [["0x1", "12"]], "transformed": [["0x1", "0x2"]]}"#;
        match ImageInput::from_json_str(bad_hex) {
            Err(InputError::BadHex { at, .. }) => assert_eq!(at, "original[0][1]"),
            other => panic!("unexpected {other:?}"),
        }

        let empty = r#"{"original": [], "transformed": []}"#;
        assert!(matches!(ImageInput::from_json_str(empty), Err(InputError::Empty("original"))));

        assert!(matches!(ImageInput::from_json_str("{"), Err(InputError::Json(_))));
    }
}
