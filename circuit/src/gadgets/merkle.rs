//! In-circuit Merkle verification and root recomputation.
//!
//! Path bits come from the leaf index via fixed-width decomposition; bit `i`
//! set means the running node is the RIGHT child at level `i`. Verification
//! is gated so filler slots can carry all-zero proofs.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::bits::to_bits_fixed;
use super::hash::hash_vars;

/// Decompose a leaf index into path bits. Doubles as the index range check.
pub fn index_to_path_bits(
    cs: ConstraintSystemRef<Fr>,
    index: &FpVar<Fr>,
    depth: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    to_bits_fixed(cs, index, depth)
}

fn fold_path(
    cs: ConstraintSystemRef<Fr>,
    leaf_hash: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    path_bits: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    debug_assert_eq!(siblings.len(), path_bits.len());

    let mut current = leaf_hash.clone();
    for (sibling, bit) in siblings.iter().zip(path_bits) {
        let left = FpVar::conditionally_select(bit, sibling, &current)?;
        let right = FpVar::conditionally_select(bit, &current, sibling)?;
        current = hash_vars(cs.clone(), &[left, right])?;
    }
    Ok(current)
}

/// Enforce, when `enabled` is set, that `leaf_hash` sits in the tree with
/// the given `root` at the position described by `path_bits`.
pub fn verify_merkle_proof(
    cs: ConstraintSystemRef<Fr>,
    enabled: &Boolean<Fr>,
    root: &FpVar<Fr>,
    leaf_hash: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    path_bits: &[Boolean<Fr>],
) -> Result<(), SynthesisError> {
    let computed = fold_path(cs, leaf_hash, siblings, path_bits)?;
    computed.conditional_enforce_equal(root, enabled)
}

/// Recompute the root after replacing the leaf at `path_bits` with
/// `new_leaf_hash`. The caller has already verified the old leaf against
/// the same sibling set.
pub fn update_merkle_root(
    cs: ConstraintSystemRef<Fr>,
    new_leaf_hash: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    path_bits: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    fold_path(cs, new_leaf_hash, siblings, path_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gadgets::hash::hash;
    use crate::tree::SparseMerkleTree;
    use ark_relations::r1cs::ConstraintSystem;

    fn alloc(cs: &ConstraintSystemRef<Fr>, v: Fr) -> FpVar<Fr> {
        FpVar::new_witness(cs.clone(), || Ok(v)).unwrap()
    }

    #[test]
    fn test_verify_against_native_tree() {
        let mut tree = SparseMerkleTree::new(8, Fr::from(0u64));
        tree.update(5, hash(&[Fr::from(42u64)]));
        tree.update(200, hash(&[Fr::from(7u64)]));

        let cs = ConstraintSystem::<Fr>::new_ref();
        let enabled = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let root = alloc(&cs, tree.root());
        let leaf = alloc(&cs, hash(&[Fr::from(42u64)]));
        let siblings: Vec<FpVar<Fr>> = tree
            .sibling_path(5)
            .into_iter()
            .map(|s| alloc(&cs, s))
            .collect();
        let index = alloc(&cs, Fr::from(5u64));
        let path_bits = index_to_path_bits(cs.clone(), &index, 8).unwrap();

        verify_merkle_proof(cs.clone(), &enabled, &root, &leaf, &siblings, &path_bits).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_altered_sibling_fails() {
        let mut tree = SparseMerkleTree::new(8, Fr::from(0u64));
        tree.update(5, hash(&[Fr::from(42u64)]));

        let cs = ConstraintSystem::<Fr>::new_ref();
        let enabled = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let root = alloc(&cs, tree.root());
        let leaf = alloc(&cs, hash(&[Fr::from(42u64)]));
        let mut siblings = tree.sibling_path(5);
        siblings[3] += Fr::from(1u64);
        let siblings: Vec<FpVar<Fr>> =
            siblings.into_iter().map(|s| alloc(&cs, s)).collect();
        let index = alloc(&cs, Fr::from(5u64));
        let path_bits = index_to_path_bits(cs.clone(), &index, 8).unwrap();

        verify_merkle_proof(cs.clone(), &enabled, &root, &leaf, &siblings, &path_bits).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_disabled_proof_is_free() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let disabled = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let root = alloc(&cs, Fr::from(999u64));
        let leaf = alloc(&cs, Fr::from(1u64));
        let siblings: Vec<FpVar<Fr>> = (0..8).map(|_| alloc(&cs, Fr::from(0u64))).collect();
        let index = alloc(&cs, Fr::from(0u64));
        let path_bits = index_to_path_bits(cs.clone(), &index, 8).unwrap();

        verify_merkle_proof(cs.clone(), &disabled, &root, &leaf, &siblings, &path_bits).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_update_matches_native() {
        let mut tree = SparseMerkleTree::new(8, Fr::from(0u64));
        tree.update(9, hash(&[Fr::from(1u64)]));

        let cs = ConstraintSystem::<Fr>::new_ref();
        let siblings: Vec<FpVar<Fr>> = tree
            .sibling_path(9)
            .into_iter()
            .map(|s| alloc(&cs, s))
            .collect();
        let index = alloc(&cs, Fr::from(9u64));
        let path_bits = index_to_path_bits(cs.clone(), &index, 8).unwrap();

        let new_leaf = hash(&[Fr::from(2u64)]);
        let new_root =
            update_merkle_root(cs.clone(), &alloc(&cs, new_leaf), &siblings, &path_bits).unwrap();

        tree.update(9, new_leaf);
        assert_eq!(new_root.value().unwrap(), tree.root());
        assert!(cs.is_satisfied().unwrap());
    }
}
