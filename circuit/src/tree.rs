//! Native sparse Merkle tree for witness construction and tests.
//!
//! Fixed depth, Poseidon inner nodes, default-subtree hashes cached per
//! level so an empty tree costs nothing. The sibling-path convention is the
//! one the circuit folds with: entry `i` is the sibling at level `i`, and
//! bit `i` of the leaf index picks the side.

use std::collections::HashMap;

use ark_bn254::Fr;

use crate::gadgets::hash::hash;

pub struct SparseMerkleTree {
    depth: usize,
    /// `defaults[level]` is the hash of an untouched subtree of that height.
    defaults: Vec<Fr>,
    nodes: HashMap<(usize, u64), Fr>,
}

impl SparseMerkleTree {
    pub fn new(depth: usize, default_leaf: Fr) -> Self {
        let mut defaults = Vec::with_capacity(depth + 1);
        defaults.push(default_leaf);
        for level in 0..depth {
            let d = defaults[level];
            defaults.push(hash(&[d, d]));
        }
        Self {
            depth,
            defaults,
            nodes: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn node(&self, level: usize, index: u64) -> Fr {
        match self.nodes.get(&(level, index)) {
            Some(h) => *h,
            None => self.defaults[level],
        }
    }

    pub fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    pub fn leaf(&self, index: u64) -> Fr {
        self.node(0, index)
    }

    pub fn update(&mut self, index: u64, leaf_hash: Fr) {
        debug_assert!(index < 1u64 << self.depth);
        self.nodes.insert((0, index), leaf_hash);
        let mut idx = index;
        for level in 0..self.depth {
            let parent = idx >> 1;
            let left = self.node(level, parent << 1);
            let right = self.node(level, (parent << 1) | 1);
            self.nodes.insert((level + 1, parent), hash(&[left, right]));
            idx = parent;
        }
    }

    /// Sibling hashes for `index`, leaf level first.
    pub fn sibling_path(&self, index: u64) -> Vec<Fr> {
        (0..self.depth)
            .map(|level| self.node(level, (index >> level) ^ 1))
            .collect()
    }

    /// Fold a leaf against a sibling path; equals `root()` iff the proof
    /// is consistent.
    pub fn compute_root(index: u64, leaf_hash: Fr, path: &[Fr]) -> Fr {
        let mut current = leaf_hash;
        for (level, sibling) in path.iter().enumerate() {
            current = if (index >> level) & 1 == 0 {
                hash(&[current, *sibling])
            } else {
                hash(&[*sibling, current])
            };
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_path_verifies() {
        let tree = SparseMerkleTree::new(8, Fr::from(0u64));
        let path = tree.sibling_path(77);
        assert_eq!(
            SparseMerkleTree::compute_root(77, Fr::from(0u64), &path),
            tree.root()
        );
    }

    #[test]
    fn test_update_then_verify() {
        let mut tree = SparseMerkleTree::new(8, Fr::from(0u64));
        let before = tree.root();

        let leaf = hash(&[Fr::from(11u64)]);
        tree.update(3, leaf);
        assert_ne!(tree.root(), before);

        let path = tree.sibling_path(3);
        assert_eq!(SparseMerkleTree::compute_root(3, leaf, &path), tree.root());

        // Untouched leaves still verify against the new root.
        let other = tree.sibling_path(250);
        assert_eq!(
            SparseMerkleTree::compute_root(250, Fr::from(0u64), &other),
            tree.root()
        );
    }

    #[test]
    fn test_order_independence() {
        let leaf_a = hash(&[Fr::from(1u64)]);
        let leaf_b = hash(&[Fr::from(2u64)]);

        let mut t1 = SparseMerkleTree::new(6, Fr::from(0u64));
        t1.update(0, leaf_a);
        t1.update(63, leaf_b);

        let mut t2 = SparseMerkleTree::new(6, Fr::from(0u64));
        t2.update(63, leaf_b);
        t2.update(0, leaf_a);

        assert_eq!(t1.root(), t2.root());
    }

    #[test]
    fn test_wrong_leaf_does_not_verify() {
        let mut tree = SparseMerkleTree::new(8, Fr::from(0u64));
        tree.update(3, hash(&[Fr::from(11u64)]));

        let path = tree.sibling_path(3);
        assert_ne!(
            SparseMerkleTree::compute_root(3, hash(&[Fr::from(12u64)]), &path),
            tree.root()
        );
    }
}
