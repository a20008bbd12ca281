//! Plain-data witness types for one transaction slot.
//!
//! Everything the circuit allocates comes from here: the transaction payload
//! (every kind's fields are always present, zeroed when inactive, so the
//! constraint shape never depends on the kind), the before-leaves of every
//! touched tree position, and the sibling sets. All hashing on this side
//! goes through the same Poseidon as the circuit.

use ark_bn254::Fr;
use once_cell::sync::Lazy;

use crate::constants::{
    ACCOUNT_TREE_DEPTH, ASSET_TREE_DEPTH, NB_ACCOUNTS_PER_TX, NB_ASSETS_PER_ACCOUNT,
    NFT_TREE_DEPTH,
};
use crate::gadgets::hash::hash;
use crate::gadgets::sig::SignatureWitness;
use crate::tree::SparseMerkleTree;
use crate::tx::atomic_match::AtomicMatchTx;
use crate::tx::cancel_offer::CancelOfferTx;
use crate::tx::create_collection::CreateCollectionTx;
use crate::tx::deposit::DepositTx;
use crate::tx::deposit_nft::DepositNftTx;
use crate::tx::full_exit::FullExitTx;
use crate::tx::full_exit_nft::FullExitNftTx;
use crate::tx::mint_nft::MintNftTx;
use crate::tx::register::RegisterTx;
use crate::tx::transfer::TransferTx;
use crate::tx::transfer_nft::TransferNftTx;
use crate::tx::withdraw::WithdrawTx;
use crate::tx::withdraw_nft::WithdrawNftTx;

/// One asset position of an account: balance plus the 128-bit
/// offer-consumption bitmap that shares the leaf.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetSlotWitness {
    pub asset_id: u64,
    pub balance: Fr,
    pub offer_bitmap: Fr,
}

impl AssetSlotWitness {
    pub fn leaf_hash(&self) -> Fr {
        hash(&[self.balance, self.offer_bitmap])
    }
}

/// An account leaf together with the two asset positions the transaction
/// touches inside its asset subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountWitness {
    pub account_index: u64,
    pub name_hash: Fr,
    pub pub_key: Fr,
    pub nonce: u64,
    pub collection_nonce: u64,
    pub asset_root: Fr,
    pub assets: Vec<AssetSlotWitness>,
}

impl AccountWitness {
    /// A never-registered account: zero identity, empty asset subtree.
    pub fn empty(account_index: u64) -> Self {
        Self {
            account_index,
            name_hash: Fr::from(0u64),
            pub_key: Fr::from(0u64),
            nonce: 0,
            collection_nonce: 0,
            asset_root: empty_asset_root(),
            assets: vec![AssetSlotWitness::default(); NB_ASSETS_PER_ACCOUNT],
        }
    }

    /// The five-tuple account leaf hash.
    pub fn leaf_hash(&self) -> Fr {
        hash(&[
            self.name_hash,
            self.pub_key,
            Fr::from(self.nonce),
            Fr::from(self.collection_nonce),
            self.asset_root,
        ])
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NftWitness {
    pub nft_index: u64,
    pub creator_account_index: u64,
    pub owner_account_index: u64,
    pub content_hash: Fr,
    pub royalty_rate: u64,
    pub collection_id: u64,
}

impl NftWitness {
    pub fn empty(nft_index: u64) -> Self {
        Self {
            nft_index,
            ..Self::default()
        }
    }

    pub fn leaf_hash(&self) -> Fr {
        hash(&[
            Fr::from(self.creator_account_index),
            Fr::from(self.owner_account_index),
            self.content_hash,
            Fr::from(self.royalty_rate),
            Fr::from(self.collection_id),
        ])
    }
}

static EMPTY_ASSET_ROOT: Lazy<Fr> = Lazy::new(|| {
    SparseMerkleTree::new(ASSET_TREE_DEPTH, AssetSlotWitness::default().leaf_hash()).root()
});

/// Root of an asset subtree in which every position is the zero slot.
pub fn empty_asset_root() -> Fr {
    *EMPTY_ASSET_ROOT
}

pub fn empty_account_leaf() -> Fr {
    AccountWitness::empty(0).leaf_hash()
}

pub fn empty_nft_leaf() -> Fr {
    NftWitness::default().leaf_hash()
}

/// The ledger commitment over both trees.
pub fn state_root(account_root: Fr, nft_root: Fr) -> Fr {
    hash(&[account_root, nft_root])
}

/// Complete witness for one transaction slot.
#[derive(Clone, Debug)]
pub struct TxWitness {
    pub tx_type: u8,
    pub nonce: u64,
    pub expired_at: u64,
    pub signature: SignatureWitness,

    pub register: RegisterTx,
    pub deposit: DepositTx,
    pub deposit_nft: DepositNftTx,
    pub transfer: TransferTx,
    pub withdraw: WithdrawTx,
    pub create_collection: CreateCollectionTx,
    pub mint_nft: MintNftTx,
    pub transfer_nft: TransferNftTx,
    pub atomic_match: AtomicMatchTx,
    pub cancel_offer: CancelOfferTx,
    pub withdraw_nft: WithdrawNftTx,
    pub full_exit: FullExitTx,
    pub full_exit_nft: FullExitNftTx,

    pub account_root_before: Fr,
    pub accounts_before: Vec<AccountWitness>,
    /// `account_proofs[i]` proves slot `i`'s account leaf, against the root
    /// chained through the updates of slots `0..i`.
    pub account_proofs: Vec<Vec<Fr>>,
    /// `asset_proofs[i][j]` proves slot `i`'s asset position `j`, chained
    /// the same way inside the account's asset subtree.
    pub asset_proofs: Vec<Vec<Vec<Fr>>>,

    pub nft_root_before: Fr,
    pub nft_before: NftWitness,
    pub nft_proof: Vec<Fr>,

    pub state_root_before: Fr,
    pub state_root_after: Fr,
}

impl TxWitness {
    /// Filler slot: no transaction, untouched state, all-zero proofs.
    pub fn empty(account_root: Fr, nft_root: Fr) -> Self {
        let root = state_root(account_root, nft_root);
        Self {
            tx_type: crate::constants::TX_TYPE_EMPTY,
            nonce: 0,
            expired_at: 0,
            signature: SignatureWitness::default(),

            register: RegisterTx::default(),
            deposit: DepositTx::default(),
            deposit_nft: DepositNftTx::default(),
            transfer: TransferTx::default(),
            withdraw: WithdrawTx::default(),
            create_collection: CreateCollectionTx::default(),
            mint_nft: MintNftTx::default(),
            transfer_nft: TransferNftTx::default(),
            atomic_match: AtomicMatchTx::default(),
            cancel_offer: CancelOfferTx::default(),
            withdraw_nft: WithdrawNftTx::default(),
            full_exit: FullExitTx::default(),
            full_exit_nft: FullExitNftTx::default(),

            account_root_before: account_root,
            accounts_before: (0..NB_ACCOUNTS_PER_TX as u64)
                .map(AccountWitness::empty)
                .collect(),
            account_proofs: vec![
                vec![Fr::from(0u64); ACCOUNT_TREE_DEPTH];
                NB_ACCOUNTS_PER_TX
            ],
            asset_proofs: vec![
                vec![vec![Fr::from(0u64); ASSET_TREE_DEPTH]; NB_ASSETS_PER_ACCOUNT];
                NB_ACCOUNTS_PER_TX
            ],

            nft_root_before: nft_root,
            nft_before: NftWitness::default(),
            nft_proof: vec![Fr::from(0u64); NFT_TREE_DEPTH],

            state_root_before: root,
            state_root_after: root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_account_has_empty_asset_root() {
        let acct = AccountWitness::empty(7);
        assert_eq!(acct.asset_root, empty_asset_root());
        // Leaf hash is index-independent.
        assert_eq!(acct.leaf_hash(), AccountWitness::empty(0).leaf_hash());
    }

    #[test]
    fn test_empty_witness_roots_agree() {
        let a = Fr::from(11u64);
        let n = Fr::from(22u64);
        let w = TxWitness::empty(a, n);
        assert_eq!(w.state_root_before, w.state_root_after);
        assert_eq!(w.state_root_before, state_root(a, n));
    }
}
