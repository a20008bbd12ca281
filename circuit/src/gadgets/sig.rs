//! Field-native signature binding.
//!
//! The rollup's signature scheme lives outside this crate. What the slot
//! circuit needs is a binding between an account's public key and the
//! signing hash of its transaction, so the gadget here checks
//! `sig.s == Poseidon(pub_key, message, sig.r)` with a Poseidon-PRF key
//! derivation on the native side. A production EdDSA gadget replaces the
//! body of `verify_signature`; its callers and the witness types stay.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::hash::{hash, hash_vars};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignatureWitness {
    pub r: Fr,
    pub s: Fr,
}

#[derive(Clone)]
pub struct SignatureVar {
    pub r: FpVar<Fr>,
    pub s: FpVar<Fr>,
}

impl SignatureVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        sig: &SignatureWitness,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            r: FpVar::new_witness(cs.clone(), || Ok(sig.r))?,
            s: FpVar::new_witness(cs, || Ok(sig.s))?,
        })
    }
}

/// Enforce, when `enabled` is set, that `sig` binds `pub_key` to `message`.
pub fn verify_signature(
    cs: ConstraintSystemRef<Fr>,
    enabled: &Boolean<Fr>,
    pub_key: &FpVar<Fr>,
    message: &FpVar<Fr>,
    sig: &SignatureVar,
) -> Result<(), SynthesisError> {
    let expected = hash_vars(cs, &[pub_key.clone(), message.clone(), sig.r.clone()])?;
    sig.s.conditional_enforce_equal(&expected, enabled)
}

/// Derive the public key for a secret key (native side).
pub fn derive_pub_key(sk: Fr) -> Fr {
    hash(&[sk])
}

/// Produce a signature the circuit accepts for `message` under `sk`.
pub fn sign(sk: Fr, message: Fr) -> SignatureWitness {
    let r = hash(&[sk, message]);
    let s = hash(&[derive_pub_key(sk), message, r]);
    SignatureWitness { r, s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_valid_signature_verifies() {
        let sk = Fr::from(1234u64);
        let message = Fr::from(5678u64);
        let sig = sign(sk, message);

        let cs = ConstraintSystem::<Fr>::new_ref();
        let enabled = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let pk = FpVar::new_witness(cs.clone(), || Ok(derive_pub_key(sk))).unwrap();
        let msg = FpVar::new_witness(cs.clone(), || Ok(message)).unwrap();
        let sig_var = SignatureVar::new_witness(cs.clone(), &sig).unwrap();

        verify_signature(cs.clone(), &enabled, &pk, &msg, &sig_var).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_wrong_message_rejected() {
        let sk = Fr::from(1234u64);
        let sig = sign(sk, Fr::from(5678u64));

        let cs = ConstraintSystem::<Fr>::new_ref();
        let enabled = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let pk = FpVar::new_witness(cs.clone(), || Ok(derive_pub_key(sk))).unwrap();
        let msg = FpVar::new_witness(cs.clone(), || Ok(Fr::from(9999u64))).unwrap();
        let sig_var = SignatureVar::new_witness(cs.clone(), &sig).unwrap();

        verify_signature(cs.clone(), &enabled, &pk, &msg, &sig_var).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_disabled_check_passes_anything() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let disabled = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let pk = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        let msg = FpVar::new_witness(cs.clone(), || Ok(Fr::from(2u64))).unwrap();
        let sig_var = SignatureVar::new_witness(cs.clone(), &SignatureWitness::default()).unwrap();

        verify_signature(cs.clone(), &disabled, &pk, &msg, &sig_var).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
