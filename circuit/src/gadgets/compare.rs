//! Gated assertions and boolean plumbing.
//!
//! Every transaction-kind check runs unconditionally and is switched on or
//! off by that kind's indicator, so all helpers here take an `enabled` gate.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use core::cmp::Ordering;
use num_bigint::BigUint;

use super::bits::to_bits_fixed;

/// Enforce `a == b` only when `enabled` is set.
pub fn enforce_equal_if(
    enabled: &Boolean<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<(), SynthesisError> {
    a.conditional_enforce_equal(b, enabled)
}

/// Enforce `a <= b` only when `enabled` is set.
/// Both operands must be far below the field half-order, which holds for
/// every balance, amount and timestamp in the system.
pub fn enforce_le_if(
    enabled: &Boolean<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<(), SynthesisError> {
    let holds = a.is_cmp(b, Ordering::Less, true)?;
    holds.conditional_enforce_equal(&Boolean::constant(true), enabled)
}

/// Enforce `a <= bound` for a fixed bound only when `enabled` is set.
/// `is_cmp` rejects constant operands, so the bound goes in as a witnessed
/// slack: `a` and `bound - a` are both decomposed at the bound's bit width
/// (which range-checks them) and must sum to the bound when enabled.
pub fn enforce_le_const_if(
    cs: ConstraintSystemRef<Fr>,
    enabled: &Boolean<Fr>,
    a: &FpVar<Fr>,
    bound: u64,
) -> Result<(), SynthesisError> {
    let width = (64 - bound.leading_zeros()) as usize;
    let slack = FpVar::new_witness(cs.clone(), || {
        let v: BigUint = a.value()?.into();
        let b = BigUint::from(bound);
        Ok(if v <= b { Fr::from(b - v) } else { Fr::from(0u64) })
    })?;
    let _ = to_bits_fixed(cs.clone(), a, width)?;
    let _ = to_bits_fixed(cs, &slack, width)?;
    (a + &slack).conditional_enforce_equal(&FpVar::constant(Fr::from(bound)), enabled)
}

/// Boolean AND expressed through selection.
pub fn and(a: &Boolean<Fr>, b: &Boolean<Fr>) -> Result<Boolean<Fr>, SynthesisError> {
    Boolean::conditionally_select(a, b, &Boolean::constant(false))
}

/// Boolean OR expressed through selection.
pub fn or(a: &Boolean<Fr>, b: &Boolean<Fr>) -> Result<Boolean<Fr>, SynthesisError> {
    Boolean::conditionally_select(a, &Boolean::constant(true), b)
}

/// Boolean NOT expressed through selection.
pub fn not(a: &Boolean<Fr>) -> Result<Boolean<Fr>, SynthesisError> {
    Boolean::conditionally_select(a, &Boolean::constant(false), &Boolean::constant(true))
}

/// 0/1 field indicator for a boolean.
pub fn indicator(b: &Boolean<Fr>) -> FpVar<Fr> {
    FpVar::from(b.clone())
}

/// Sum of 0/1 indicators. With mutually exclusive flags this is itself 0/1.
pub fn indicator_sum(flags: &[Boolean<Fr>]) -> FpVar<Fr> {
    let mut sum = FpVar::<Fr>::zero();
    for flag in flags {
        sum += indicator(flag);
    }
    sum
}

/// Enforce that exactly one of `flags` is set.
pub fn enforce_one_hot(flags: &[Boolean<Fr>]) -> Result<(), SynthesisError> {
    indicator_sum(flags).enforce_equal(&FpVar::one())
}

/// Collapse a set of mutually exclusive flags into a single boolean.
pub fn any_of(flags: &[Boolean<Fr>]) -> Result<Boolean<Fr>, SynthesisError> {
    indicator_sum(flags).is_eq(&FpVar::one())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    fn fp(cs: &ark_relations::r1cs::ConstraintSystemRef<Fr>, v: u64) -> FpVar<Fr> {
        FpVar::new_witness(cs.clone(), || Ok(Fr::from(v))).unwrap()
    }

    #[test]
    fn test_gated_equality_off() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let off = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        enforce_equal_if(&off, &fp(&cs, 1), &fp(&cs, 2)).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_gated_equality_on() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let on = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        enforce_equal_if(&on, &fp(&cs, 1), &fp(&cs, 2)).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_gated_le() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let on = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        enforce_le_if(&on, &fp(&cs, 100), &fp(&cs, 100)).unwrap();
        enforce_le_if(&on, &fp(&cs, 99), &fp(&cs, 100)).unwrap();
        assert!(cs.is_satisfied().unwrap());

        enforce_le_if(&on, &fp(&cs, 101), &fp(&cs, 100)).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_gated_le_fixed_bound() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let on = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        enforce_le_const_if(cs.clone(), &on, &fp(&cs, 9_999), 9_999).unwrap();
        enforce_le_const_if(cs.clone(), &on, &fp(&cs, 0), 9_999).unwrap();
        assert!(cs.is_satisfied().unwrap());

        enforce_le_const_if(cs.clone(), &on, &fp(&cs, 10_000), 9_999).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_gated_le_fixed_bound_off() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let off = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        enforce_le_const_if(cs.clone(), &off, &fp(&cs, 10_000), 9_999).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_one_hot() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flags: Vec<Boolean<Fr>> = (0..4)
            .map(|i| Boolean::new_witness(cs.clone(), || Ok(i == 2)).unwrap())
            .collect();
        enforce_one_hot(&flags).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_one_hot_rejects_none_set() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flags: Vec<Boolean<Fr>> = (0..4)
            .map(|_| Boolean::new_witness(cs.clone(), || Ok(false)).unwrap())
            .collect();
        enforce_one_hot(&flags).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_and_or_not() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let t = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let f = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        assert!(!and(&t, &f).unwrap().value().unwrap());
        assert!(and(&t, &t).unwrap().value().unwrap());
        assert!(or(&t, &f).unwrap().value().unwrap());
        assert!(!or(&f, &f).unwrap().value().unwrap());
        assert!(not(&f).unwrap().value().unwrap());
        assert!(cs.is_satisfied().unwrap());
    }
}
