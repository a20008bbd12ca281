//! In-circuit decoding of packed fixed-point values.
//!
//! The packed layout puts the 5-bit exponent in the LOW bits. Decoding
//! decomposes the packed value (which is also its range check), recomposes
//! the mantissa, then applies the exponent with five conditional
//! multiplications by `10^(2^i)`.

use ark_bn254::Fr;
use ark_ff::Field;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{EXPONENT_BITS, PACKED_AMOUNT_BITS, PACKED_FEE_BITS};

use super::bits::{from_bits, to_bits_fixed};

fn unpack_var(
    cs: ConstraintSystemRef<Fr>,
    packed: &FpVar<Fr>,
    total_bits: usize,
) -> Result<FpVar<Fr>, SynthesisError> {
    let bits = to_bits_fixed(cs, packed, total_bits)?;
    let mantissa = from_bits(&bits[EXPONENT_BITS..]);

    let mut result = mantissa;
    let mut power = Fr::from(10u64);
    for bit in &bits[..EXPONENT_BITS] {
        let factor = FpVar::conditionally_select(bit, &FpVar::constant(power), &FpVar::one())?;
        result *= factor;
        power.square_in_place();
    }
    Ok(result)
}

/// Decode a packed amount (35-bit mantissa) to its integer value.
pub fn unpack_amount_var(
    cs: ConstraintSystemRef<Fr>,
    packed: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    unpack_var(cs, packed, PACKED_AMOUNT_BITS)
}

/// Decode a packed fee (11-bit mantissa) to its integer value.
pub fn unpack_fee_var(
    cs: ConstraintSystemRef<Fr>,
    packed: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    unpack_var(cs, packed, PACKED_FEE_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packed::{max_amount, pack_amount, pack_fee, unpack};
    use ark_relations::r1cs::ConstraintSystem;
    use num_bigint::BigUint;

    #[test]
    fn test_unpack_amount_matches_native() {
        for v in [0u64, 1, 47, 1_000_000, (1 << 35) - 1] {
            let packed = pack_amount(&BigUint::from(v)).unwrap();

            let cs = ConstraintSystem::<Fr>::new_ref();
            let packed_var =
                FpVar::new_witness(cs.clone(), || Ok(Fr::from(packed))).unwrap();
            let decoded = unpack_amount_var(cs.clone(), &packed_var).unwrap();

            assert_eq!(decoded.value().unwrap(), Fr::from(unpack(packed)));
            assert!(cs.is_satisfied().unwrap());
        }
    }

    #[test]
    fn test_unpack_max_amount() {
        let max = max_amount();
        let packed = pack_amount(&max).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let packed_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(packed))).unwrap();
        let decoded = unpack_amount_var(cs.clone(), &packed_var).unwrap();

        assert_eq!(decoded.value().unwrap(), Fr::from(max));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_unpack_fee_matches_native() {
        for v in [0u64, 5, 2040, 1_000_000] {
            let packed = pack_fee(&BigUint::from(v)).unwrap();

            let cs = ConstraintSystem::<Fr>::new_ref();
            let packed_var =
                FpVar::new_witness(cs.clone(), || Ok(Fr::from(packed))).unwrap();
            let decoded = unpack_fee_var(cs.clone(), &packed_var).unwrap();

            assert_eq!(decoded.value().unwrap(), Fr::from(v));
            assert!(cs.is_satisfied().unwrap());
        }
    }

    #[test]
    fn test_overwide_packed_value_fails() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let packed_var =
            FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64 << PACKED_FEE_BITS))).unwrap();
        let _ = unpack_fee_var(cs.clone(), &packed_var).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
