use ark_bn254::Fr;
use ark_r1cs_std::fields::{FieldVar, fp::FpVar};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use ark_crypto_primitives::sponge::{
    CryptographicSponge, constraints::CryptographicSpongeVar,
    poseidon::PoseidonSponge, poseidon::constraints::PoseidonSpongeVar,
};

use super::poseidon::poseidon_config;

/// Poseidon hash of field elements INSIDE the circuit.
/// A fresh sponge per call; there is no shared accumulator to reset.
/// The input count is absorbed first so different arities never collide
/// (hashing `[a]` and `[a, 0]` gives distinct digests).
pub fn hash_vars(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let config = poseidon_config();

    let mut sponge = PoseidonSpongeVar::new(cs, config);
    sponge.absorb(&FpVar::constant(Fr::from(inputs.len() as u64)))?;
    for input in inputs {
        sponge.absorb(input)?;
    }

    Ok(sponge.squeeze_field_elements(1)?[0].clone())
}

/// Native mirror of [`hash_vars`]; witness construction and tests must
/// produce bit-identical digests to the circuit.
pub fn hash(inputs: &[Fr]) -> Fr {
    let config = poseidon_config();

    let mut sponge = PoseidonSponge::<Fr>::new(config);
    sponge.absorb(&Fr::from(inputs.len() as u64));
    for input in inputs {
        sponge.absorb(input);
    }

    sponge.squeeze_field_elements(1)[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_circuit_matches_native() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let inputs = [Fr::from(3u64), Fr::from(17u64), Fr::from(99u64)];

        let vars: Vec<FpVar<Fr>> = inputs
            .iter()
            .map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)).unwrap())
            .collect();

        let digest_var = hash_vars(cs.clone(), &vars).unwrap();
        assert_eq!(digest_var.value().unwrap(), hash(&inputs));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_arity_changes_digest() {
        let a = Fr::from(5u64);
        assert_ne!(hash(&[a]), hash(&[a, Fr::from(0u64)]));
    }
}
