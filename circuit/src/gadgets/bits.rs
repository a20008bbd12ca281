use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, BigInteger, Field, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Decompose `value` into exactly `width` LSB-first bits and enforce the
/// recomposition. A value that does not fit in `width` bits has no valid
/// assignment, so this doubles as the range check for tree indices and
/// packed values.
pub fn to_bits_fixed(
    cs: ConstraintSystemRef<Fr>,
    value: &FpVar<Fr>,
    width: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let native_bits: Vec<bool> = match value.value() {
        Ok(v) => v.into_bigint().to_bits_le(),
        // Setup mode: the closures below are never invoked.
        Err(_) => Vec::new(),
    };

    let mut bits = Vec::with_capacity(width);
    for i in 0..width {
        let bit = native_bits.get(i).copied().unwrap_or(false);
        bits.push(Boolean::new_witness(cs.clone(), || Ok(bit))?);
    }

    from_bits(&bits).enforce_equal(value)?;
    Ok(bits)
}

/// Recompose LSB-first bits into a field element (linear combination only).
pub fn from_bits(bits: &[Boolean<Fr>]) -> FpVar<Fr> {
    let mut acc = FpVar::<Fr>::zero();
    let mut coeff = Fr::ONE;
    for bit in bits {
        acc += FpVar::from(bit.clone()) * FpVar::constant(coeff);
        coeff.double_in_place();
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_decompose_and_recompose() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0b1011u64))).unwrap();
        let bits = to_bits_fixed(cs.clone(), &value, 8).unwrap();

        let expected = [true, true, false, true, false, false, false, false];
        for (bit, want) in bits.iter().zip(expected) {
            assert_eq!(bit.value().unwrap(), want);
        }
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_width_is_a_range_check() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64 << 16))).unwrap();
        let _ = to_bits_fixed(cs.clone(), &value, 16).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_boundary_value_fits() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpVar::new_witness(cs.clone(), || Ok(Fr::from((1u64 << 16) - 1))).unwrap();
        let _ = to_bits_fixed(cs.clone(), &value, 16).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
