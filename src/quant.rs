//! Quantization tolerance check.
//!
//! JPEG quantization rounds `coeff / (S·d)` to the nearest integer. The
//! circuit cannot divide or round, so it accepts a claimed `q` when
//!
//! ```text
//! −S·(d+1) ≤ coeff − S·d·q < S·(d+1)
//! ```
//!
//! The two-sided bound becomes one unsigned comparison by shifting:
//! `diff = coeff − S·d·q + S·(d+1)` must satisfy `0 ≤ diff < 2·S·(d+1)`.
//! Non-negativity comes from the operand range check inside
//! [`LessThan`](crate::cmp::LessThan); a shifted value that went "negative"
//! is a field element near `p` with no short bit decomposition.
//!
//! The correctly rounded `q` always passes, as does its neighbour on the
//! other side of the rounding point; anything two or more steps away fails
//! for every divisor in the tables (`d ≥ 2`).

#![forbid(unsafe_code)]

use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::SynthesisError;

use crate::{cmp::LessThan, tables::COMPARISON_BITS, F};

/// Assert that `q` is an acceptable quantization of `coeff` for divisor `d`
/// at coefficient scale `scale`.
///
/// `q` is a signed integer encoded as a field element.
pub fn enforce_quantization_tolerance(
    coeff: &FpVar<F>,
    q: &FpVar<F>,
    divisor: u64,
    scale: u64,
) -> Result<(), SynthesisError> {
    let step = F::from(scale * divisor);
    let bound = F::from(scale * (divisor + 1));

    let product = q * step;
    let diff = coeff - &product + bound;
    let twice_bound = FpVar::constant(bound + bound);

    LessThan::new(COMPARISON_BITS).enforce(&diff, &twice_bound)
}

// ============================================================================
// Native mirror
// ============================================================================

/// Round-half-away-from-zero of `coeff / (scale · d)`.
pub fn quantize(coeff: i64, divisor: u64, scale: u64) -> i64 {
    let den = (scale * divisor) as i64;
    let half = den / 2;
    if coeff >= 0 {
        (coeff + half) / den
    } else {
        -((-coeff + half) / den)
    }
}

/// Native form of the accepted set: `−bound ≤ coeff − scale·d·q < bound`.
pub fn within_tolerance(coeff: i64, q: i64, divisor: u64, scale: u64) -> bool {
    let product = (scale * divisor) as i128 * q as i128;
    let bound = (scale * (divisor + 1)) as i128;
    let diff = coeff as i128 - product + bound;
    (0..2 * bound).contains(&diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field_from_i64, tables::COEFF_SCALE};
    use ark_relations::r1cs::ConstraintSystem;

    fn accepts(coeff: i64, q: i64, divisor: u64, scale: u64) -> bool {
        let cs = ConstraintSystem::<F>::new_ref();
        let c = FpVar::new_witness(cs.clone(), || Ok(field_from_i64(coeff))).unwrap();
        let qv = FpVar::new_witness(cs.clone(), || Ok(field_from_i64(q))).unwrap();
        enforce_quantization_tolerance(&c, &qv, divisor, scale).unwrap();
        let sat = cs.is_satisfied().unwrap();
        assert_eq!(sat, within_tolerance(coeff, q, divisor, scale), "coeff={coeff} q={q} d={divisor}");
        sat
    }

    #[test]
    fn literal_boundary_at_divisor_16() {
        // 8500 / 16000 = 0.531 → rounds to 1.
        assert_eq!(quantize(8500, 16, 1000), 1);
        assert!(accepts(8500, 1, 16, 1000));
        assert!(accepts(8500, 0, 16, 1000));
        // diff = 8500 + 16000 + 17000 = 41500 ≥ 34000
        assert!(!accepts(8500, -1, 16, 1000));
        // diff = 8500 − 32000 + 17000 < 0
        assert!(!accepts(8500, 2, 16, 1000));
    }

    #[test]
    fn zero_coefficient_accepts_only_the_neighbourhood_of_zero() {
        // bound = 17000: q=0 → diff=17000, q=1 → 1000, q=-1 → 33000.
        for q in [-1, 0, 1] {
            assert!(accepts(0, q, 16, 1000), "q={q}");
        }
        for q in [-3, -2, 2, 3] {
            assert!(!accepts(0, q, 16, 1000), "q={q}");
        }
    }

    #[test]
    fn rounded_value_passes_and_two_steps_away_fails() {
        let divisors = [10u64, 16, 55, 99, 121];
        let coeffs = [
            0i64,
            1_234_567,
            -9_876_543,
            55_500_000,
            -120_000_000,
            1_026_588_672,
            -1_026_588_672,
        ];
        for &d in &divisors {
            for &c in &coeffs {
                let q = quantize(c, d, COEFF_SCALE);
                assert!(accepts(c, q, d, COEFF_SCALE), "c={c} d={d} q={q}");
                assert!(!accepts(c, q + 2, d, COEFF_SCALE), "c={c} d={d} q+2");
                assert!(!accepts(c, q - 2, d, COEFF_SCALE), "c={c} d={d} q-2");
            }
        }
    }

    #[test]
    fn both_candidates_at_exact_halfway_are_accepted() {
        // coeff / (1000·16) = 0.5 exactly.
        let c = 8000;
        assert!(accepts(c, 0, 16, 1000));
        assert!(accepts(c, 1, 16, 1000));
        assert!(!accepts(c, -1, 16, 1000));
        assert!(!accepts(c, 2, 16, 1000));
        // Symmetric on the negative side.
        assert!(accepts(-c, 0, 16, 1000));
        assert!(accepts(-c, -1, 16, 1000));
        assert!(!accepts(-c, -2, 16, 1000));
    }

    #[test]
    fn quantize_rounds_half_away_from_zero() {
        assert_eq!(quantize(8000, 16, 1000), 1);
        assert_eq!(quantize(-8000, 16, 1000), -1);
        assert_eq!(quantize(7999, 16, 1000), 0);
        assert_eq!(quantize(-7999, 16, 1000), 0);
    }
}
