//! Fixed circuit constants: DCT basis, JPEG quantization tables, scales.
//!
//! Every value here shapes the emitted constraints, so they are compile-time
//! literals rather than configuration. Changing any of them produces a
//! different circuit.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

/// Fixed-point scale applied to each basis entry.
pub const BASIS_SCALE: u64 = 1000;

/// Net scale of a 2D coefficient after the row and column passes.
pub const COEFF_SCALE: u64 = BASIS_SCALE * BASIS_SCALE;

/// Offset subtracted from every 8-bit sample before the transform.
pub const CENTER: u64 = 128;

/// Orthonormal DCT-II basis, `round(1000 · c(k) · cos((2j+1)kπ/16))`.
///
/// Row `k` is the frequency, column `j` the sample position.
pub const DCT_BASIS: [[i64; 8]; 8] = [
    [354, 354, 354, 354, 354, 354, 354, 354],
    [490, 416, 278, 98, -98, -278, -416, -490],
    [462, 191, -191, -462, -462, -191, 191, 462],
    [416, -98, -490, -278, 278, 490, 98, -416],
    [354, -354, -354, 354, 354, -354, -354, 354],
    [278, -490, 98, 416, -416, -98, 490, -278],
    [191, -462, 462, -191, -191, 462, -462, 191],
    [98, -278, 416, -490, 490, -416, 278, -98],
];

/// JPEG Annex K, Table K.1 (luminance).
pub const QUANT_LUMINANCE: [[u64; 8]; 8] = [
    [16, 11, 10, 16, 24, 40, 51, 61],
    [12, 12, 14, 19, 26, 58, 60, 55],
    [14, 13, 16, 24, 40, 57, 69, 56],
    [14, 17, 22, 29, 51, 87, 80, 62],
    [18, 22, 37, 56, 68, 109, 103, 77],
    [24, 35, 55, 64, 81, 104, 113, 92],
    [49, 64, 78, 87, 103, 121, 120, 101],
    [72, 92, 95, 98, 112, 100, 103, 99],
];

/// JPEG Annex K, Table K.2 (chrominance).
pub const QUANT_CHROMINANCE: [[u64; 8]; 8] = [
    [17, 18, 24, 47, 99, 99, 99, 99],
    [18, 21, 26, 66, 99, 99, 99, 99],
    [24, 26, 56, 99, 99, 99, 99, 99],
    [47, 66, 99, 99, 99, 99, 99, 99],
    [99, 99, 99, 99, 99, 99, 99, 99],
    [99, 99, 99, 99, 99, 99, 99, 99],
    [99, 99, 99, 99, 99, 99, 99, 99],
    [99, 99, 99, 99, 99, 99, 99, 99],
];

/// Bit width of the combined range check in the tolerance gadget.
pub const COMPARISON_BITS: usize = 32;

/// Which quantization table a colour channel uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QuantTable {
    Luminance,
    Chrominance,
}

impl QuantTable {
    /// Channel 0 is luminance; channels 1 and 2 share the chrominance table.
    #[inline]
    pub fn for_channel(channel: usize) -> Self {
        if channel == 0 {
            QuantTable::Luminance
        } else {
            QuantTable::Chrominance
        }
    }

    #[inline]
    pub fn divisors(self) -> &'static [[u64; 8]; 8] {
        match self {
            QuantTable::Luminance => &QUANT_LUMINANCE,
            QuantTable::Chrominance => &QUANT_CHROMINANCE,
        }
    }

    #[inline]
    pub fn divisor(self, row: usize, col: usize) -> u64 {
        self.divisors()[row][col]
    }
}

/// Largest `Σ_j |B[k][j]|` over all frequencies `k`.
pub const fn max_basis_row_abs_sum() -> u64 {
    let mut best = 0u64;
    let mut k = 0;
    while k < 8 {
        let mut sum = 0u64;
        let mut j = 0;
        while j < 8 {
            sum += DCT_BASIS[k][j].unsigned_abs();
            j += 1;
        }
        if sum > best {
            best = sum;
        }
        k += 1;
    }
    best
}

const fn max_divisor() -> u64 {
    let mut best = 0u64;
    let mut r = 0;
    while r < 8 {
        let mut c = 0;
        while c < 8 {
            if QUANT_LUMINANCE[r][c] > best {
                best = QUANT_LUMINANCE[r][c];
            }
            if QUANT_CHROMINANCE[r][c] > best {
                best = QUANT_CHROMINANCE[r][c];
            }
            c += 1;
        }
        r += 1;
    }
    best
}

/// Upper bound on `|coeff|` for any block of 8-bit samples.
///
/// Centered samples lie in `[-128, 127]`, so each pass grows the magnitude by
/// at most the largest absolute row sum of the basis.
pub const MAX_ABS_COEFF: u64 = CENTER * max_basis_row_abs_sum() * max_basis_row_abs_sum();

/// Largest tolerance bound `COEFF_SCALE · (d + 1)` over both tables.
pub const MAX_BOUND: u64 = COEFF_SCALE * (max_divisor() + 1);

// The comparison operands (`diff` up to `|coeff| + bound`, and `2·bound`)
// must fit the range check.
const _: () = assert!(MAX_ABS_COEFF + MAX_BOUND < 1u64 << COMPARISON_BITS);
const _: () = assert!(2 * MAX_BOUND < 1u64 << COMPARISON_BITS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_width_is_derived_not_guessed() {
        assert_eq!(max_basis_row_abs_sum(), 2832);
        assert_eq!(max_divisor(), 121);
        assert_eq!(MAX_ABS_COEFF, 1_026_588_672);
        // 31 bits would already hold the largest diff; 32 keeps headroom.
        assert!(MAX_ABS_COEFF + MAX_BOUND < 1u64 << 31);
    }

    #[test]
    fn basis_rows_are_nearly_orthogonal() {
        for a in 0..8 {
            for b in 0..8 {
                let dot: i64 = (0..8).map(|j| DCT_BASIS[a][j] * DCT_BASIS[b][j]).sum();
                if a == b {
                    assert!((dot - 1_000_000).abs() < 5_000, "row {a} norm {dot}");
                } else {
                    assert!(dot.abs() < 5_000, "rows {a},{b} dot {dot}");
                }
            }
        }
    }

    #[test]
    fn channel_table_selection() {
        assert_eq!(QuantTable::for_channel(0), QuantTable::Luminance);
        assert_eq!(QuantTable::for_channel(1), QuantTable::Chrominance);
        assert_eq!(QuantTable::for_channel(2), QuantTable::Chrominance);
        assert_eq!(QuantTable::Luminance.divisor(0, 0), 16);
        assert_eq!(QuantTable::Chrominance.divisor(7, 7), 99);
    }
}
