//! Bounded unsigned comparison over field elements.
//!
//! Field elements carry no order. [`LessThan`] recovers one for values known
//! to fit in `bits` bits: both operands are range-checked by bit
//! decomposition, then `a + 2^bits − b` is decomposed into `bits + 1` bits and
//! its top bit read. That bit is set exactly when `a ≥ b`.
//!
//! The range checks on the operands are what make the comparison sound for
//! shifted quantities such as the tolerance `diff`: a "negative" operand is a
//! field element near `p`, which has no `bits`-bit decomposition, so no
//! witness exists.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, One, PrimeField};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::F;

/// `LessThan(bits)(a, b)`: a boolean that is true iff `a < b`, for operands
/// asserted to lie in `[0, 2^bits)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LessThan {
    bits: usize,
}

impl LessThan {
    /// Comparison over `bits`-bit operands. `bits` must leave room for one
    /// extra bit below the field's capacity.
    pub fn new(bits: usize) -> Self {
        debug_assert!(bits + 1 < F::MODULUS_BIT_SIZE as usize, "comparison width too large");
        Self { bits }
    }

    /// Operand width.
    #[inline]
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Emit the comparison and return its boolean outcome.
    pub fn evaluate(&self, a: &FpVar<F>, b: &FpVar<F>) -> Result<Boolean<F>, SynthesisError> {
        let cs = a.cs().or(b.cs());
        if cs.is_none() {
            // Both operands are constants.
            let (av, bv) = (a.value()?, b.value()?);
            let fits = |v: F| v.into_bigint().num_bits() as usize <= self.bits;
            if !fits(av) || !fits(bv) {
                return Err(SynthesisError::Unsatisfiable);
            }
            return Ok(Boolean::constant(av < bv));
        }

        enforce_bit_width(&cs, a, self.bits)?;
        enforce_bit_width(&cs, b, self.bits)?;

        let shifted = a + pow2(self.bits) - b;
        let bits = decompose(&cs, &shifted, self.bits + 1)?;
        Ok(bits[self.bits].not())
    }

    /// Assert `a < b`.
    pub fn enforce(&self, a: &FpVar<F>, b: &FpVar<F>) -> Result<(), SynthesisError> {
        self.evaluate(a, b)?.enforce_equal(&Boolean::TRUE)
    }
}

/// Assert that `v` fits in `bits` bits.
///
/// Constants are checked natively; a constant that does not fit is a
/// construction error rather than an unsatisfiable witness.
pub fn enforce_bit_width(
    cs: &ConstraintSystemRef<F>,
    v: &FpVar<F>,
    bits: usize,
) -> Result<(), SynthesisError> {
    if let FpVar::Constant(c) = v {
        if c.into_bigint().num_bits() as usize > bits {
            return Err(SynthesisError::Unsatisfiable);
        }
        return Ok(());
    }
    decompose(cs, v, bits).map(|_| ())
}

/// Allocate the low `bits` bits of `v` as booleans and enforce that their
/// little-endian recomposition equals `v`.
///
/// If `v` does not fit, the witness bits are still the low bits of its
/// canonical representative, so the recomposition constraint fails.
pub fn decompose(
    cs: &ConstraintSystemRef<F>,
    v: &FpVar<F>,
    bits: usize,
) -> Result<Vec<Boolean<F>>, SynthesisError> {
    let repr = v.value().ok().map(|x| x.into_bigint());
    let out = (0..bits)
        .map(|i| {
            Boolean::new_witness(cs.clone(), || {
                repr.map(|r| r.get_bit(i)).ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Boolean::le_bits_to_fp_var(&out)?.enforce_equal(v)?;
    Ok(out)
}

/// `2^k` as a field element.
#[inline]
pub(crate) fn pow2(k: usize) -> F {
    let mut acc = F::one();
    for _ in 0..k {
        acc += acc;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_from_i64;
    use ark_relations::r1cs::ConstraintSystem;

    fn check(a: i64, b: i64, bits: usize) -> (Option<bool>, bool) {
        let cs = ConstraintSystem::<F>::new_ref();
        let av = FpVar::new_witness(cs.clone(), || Ok(field_from_i64(a))).unwrap();
        let bv = FpVar::new_witness(cs.clone(), || Ok(field_from_i64(b))).unwrap();
        let out = LessThan::new(bits).evaluate(&av, &bv).unwrap();
        (out.value().ok(), cs.is_satisfied().unwrap())
    }

    #[test]
    fn orders_in_range_operands() {
        assert_eq!(check(3, 5, 8), (Some(true), true));
        assert_eq!(check(5, 5, 8), (Some(false), true));
        assert_eq!(check(255, 0, 8), (Some(false), true));
        assert_eq!(check(0, 255, 8), (Some(true), true));
    }

    #[test]
    fn negative_operand_has_no_witness() {
        // -1 wraps to p-1; without the operand range check it would compare
        // as "less than" after the 2^bits shift.
        let (_, sat) = check(-1, 10, 8);
        assert!(!sat);
    }

    #[test]
    fn operand_over_width_has_no_witness() {
        let (_, sat) = check(256, 300, 8);
        assert!(!sat);
    }

    #[test]
    fn constant_operands_evaluate_natively() {
        let a = FpVar::constant(F::from(4u64));
        let b = FpVar::constant(F::from(9u64));
        let lt = LessThan::new(8).evaluate(&a, &b).unwrap();
        assert!(lt.is_constant());
        assert_eq!(lt.value().unwrap(), true);

        let wide = FpVar::constant(F::from(1u64 << 20));
        assert!(LessThan::new(8).evaluate(&wide, &b).is_err());
    }

    #[test]
    fn enforce_binds_the_outcome() {
        let cs = ConstraintSystem::<F>::new_ref();
        let a = FpVar::new_witness(cs.clone(), || Ok(F::from(9u64))).unwrap();
        let b = FpVar::constant(F::from(4u64));
        LessThan::new(8).enforce(&a, &b).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn pow2_matches_shift() {
        assert_eq!(pow2(0), F::one());
        assert_eq!(pow2(32), F::from(1u64 << 32));
    }
}
