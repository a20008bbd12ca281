//! State-transition verifier circuit for a zk-rollup, one transaction slot
//! per instantiation.
//!
//! The circuit proves that applying a single (possibly empty) transaction to
//! the committed ledger state yields the claimed post-state commitment. The
//! ledger is a two-level Merkle structure: an account tree whose leaves each
//! commit to a per-account asset subtree, plus a parallel NFT tree. The state
//! commitment is `Poseidon(account_root, nft_root)`.
//!
//! Proof-system backend (Groth16 etc.) and signature scheme are external;
//! the crate ends at `ConstraintSynthesizer`.

pub mod builder;
pub mod constants;
pub mod deltas;
pub mod error;
pub mod gadgets;
pub mod packed;
pub mod tree;
pub mod tx;
pub mod tx_circuit;
pub mod vars;
pub mod witness;

pub use error::{Result, WitnessError};
pub use tx_circuit::TxCircuit;
pub use witness::TxWitness;
