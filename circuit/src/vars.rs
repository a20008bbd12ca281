//! Circuit-side images of the witness types.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::gadgets::hash::hash_vars;
use crate::gadgets::sig::SignatureVar;
use crate::witness::{AccountWitness, AssetSlotWitness, NftWitness, TxWitness};

use crate::tx::atomic_match::AtomicMatchVar;
use crate::tx::cancel_offer::CancelOfferVar;
use crate::tx::create_collection::CreateCollectionVar;
use crate::tx::deposit::DepositVar;
use crate::tx::deposit_nft::DepositNftVar;
use crate::tx::full_exit::FullExitVar;
use crate::tx::full_exit_nft::FullExitNftVar;
use crate::tx::mint_nft::MintNftVar;
use crate::tx::register::RegisterVar;
use crate::tx::transfer::TransferVar;
use crate::tx::transfer_nft::TransferNftVar;
use crate::tx::withdraw::WithdrawVar;
use crate::tx::withdraw_nft::WithdrawNftVar;

#[derive(Clone)]
pub struct AssetSlotVar {
    pub asset_id: FpVar<Fr>,
    pub balance: FpVar<Fr>,
    pub offer_bitmap: FpVar<Fr>,
}

impl AssetSlotVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        slot: &AssetSlotWitness,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            asset_id: FpVar::new_witness(cs.clone(), || Ok(Fr::from(slot.asset_id)))?,
            balance: FpVar::new_witness(cs.clone(), || Ok(slot.balance))?,
            offer_bitmap: FpVar::new_witness(cs, || Ok(slot.offer_bitmap))?,
        })
    }

    pub fn leaf_hash(&self, cs: ConstraintSystemRef<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        hash_vars(cs, &[self.balance.clone(), self.offer_bitmap.clone()])
    }
}

#[derive(Clone)]
pub struct AccountVar {
    pub account_index: FpVar<Fr>,
    pub name_hash: FpVar<Fr>,
    pub pub_key: FpVar<Fr>,
    pub nonce: FpVar<Fr>,
    pub collection_nonce: FpVar<Fr>,
    pub asset_root: FpVar<Fr>,
    pub assets: Vec<AssetSlotVar>,
}

impl AccountVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        acct: &AccountWitness,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(acct.account_index)))?,
            name_hash: FpVar::new_witness(cs.clone(), || Ok(acct.name_hash))?,
            pub_key: FpVar::new_witness(cs.clone(), || Ok(acct.pub_key))?,
            nonce: FpVar::new_witness(cs.clone(), || Ok(Fr::from(acct.nonce)))?,
            collection_nonce: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(acct.collection_nonce))
            })?,
            asset_root: FpVar::new_witness(cs.clone(), || Ok(acct.asset_root))?,
            assets: acct
                .assets
                .iter()
                .map(|slot| AssetSlotVar::new_witness(cs.clone(), slot))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Five-tuple account leaf over an explicit asset root, so the same
    /// code hashes both the before- and after-images.
    pub fn leaf_hash(
        &self,
        cs: ConstraintSystemRef<Fr>,
        asset_root: &FpVar<Fr>,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        hash_vars(
            cs,
            &[
                self.name_hash.clone(),
                self.pub_key.clone(),
                self.nonce.clone(),
                self.collection_nonce.clone(),
                asset_root.clone(),
            ],
        )
    }
}

#[derive(Clone)]
pub struct NftVar {
    pub nft_index: FpVar<Fr>,
    pub creator_account_index: FpVar<Fr>,
    pub owner_account_index: FpVar<Fr>,
    pub content_hash: FpVar<Fr>,
    pub royalty_rate: FpVar<Fr>,
    pub collection_id: FpVar<Fr>,
}

impl NftVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        nft: &NftWitness,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            nft_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(nft.nft_index)))?,
            creator_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(nft.creator_account_index))
            })?,
            owner_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(nft.owner_account_index))
            })?,
            content_hash: FpVar::new_witness(cs.clone(), || Ok(nft.content_hash))?,
            royalty_rate: FpVar::new_witness(cs.clone(), || Ok(Fr::from(nft.royalty_rate)))?,
            collection_id: FpVar::new_witness(cs, || Ok(Fr::from(nft.collection_id)))?,
        })
    }

    pub fn leaf_hash(&self, cs: ConstraintSystemRef<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        hash_vars(
            cs,
            &[
                self.creator_account_index.clone(),
                self.owner_account_index.clone(),
                self.content_hash.clone(),
                self.royalty_rate.clone(),
                self.collection_id.clone(),
            ],
        )
    }
}

/// Everything the slot circuit allocates from one [`TxWitness`].
pub struct TxVars {
    pub tx_type: FpVar<Fr>,
    pub nonce: FpVar<Fr>,
    pub expired_at: FpVar<Fr>,
    pub signature: SignatureVar,

    pub register: RegisterVar,
    pub deposit: DepositVar,
    pub deposit_nft: DepositNftVar,
    pub transfer: TransferVar,
    pub withdraw: WithdrawVar,
    pub create_collection: CreateCollectionVar,
    pub mint_nft: MintNftVar,
    pub transfer_nft: TransferNftVar,
    pub atomic_match: AtomicMatchVar,
    pub cancel_offer: CancelOfferVar,
    pub withdraw_nft: WithdrawNftVar,
    pub full_exit: FullExitVar,
    pub full_exit_nft: FullExitNftVar,

    pub account_root_before: FpVar<Fr>,
    pub accounts_before: Vec<AccountVar>,
    pub account_proofs: Vec<Vec<FpVar<Fr>>>,
    pub asset_proofs: Vec<Vec<Vec<FpVar<Fr>>>>,

    pub nft_root_before: FpVar<Fr>,
    pub nft_before: NftVar,
    pub nft_proof: Vec<FpVar<Fr>>,
}

impl TxVars {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        w: &TxWitness,
    ) -> Result<Self, SynthesisError> {
        let alloc_path = |path: &Vec<Fr>| -> Result<Vec<FpVar<Fr>>, SynthesisError> {
            path.iter()
                .map(|s| FpVar::new_witness(cs.clone(), || Ok(*s)))
                .collect()
        };

        Ok(Self {
            tx_type: FpVar::new_witness(cs.clone(), || Ok(Fr::from(w.tx_type as u64)))?,
            nonce: FpVar::new_witness(cs.clone(), || Ok(Fr::from(w.nonce)))?,
            expired_at: FpVar::new_witness(cs.clone(), || Ok(Fr::from(w.expired_at)))?,
            signature: SignatureVar::new_witness(cs.clone(), &w.signature)?,

            register: RegisterVar::new_witness(cs.clone(), &w.register)?,
            deposit: DepositVar::new_witness(cs.clone(), &w.deposit)?,
            deposit_nft: DepositNftVar::new_witness(cs.clone(), &w.deposit_nft)?,
            transfer: TransferVar::new_witness(cs.clone(), &w.transfer)?,
            withdraw: WithdrawVar::new_witness(cs.clone(), &w.withdraw)?,
            create_collection: CreateCollectionVar::new_witness(cs.clone(), &w.create_collection)?,
            mint_nft: MintNftVar::new_witness(cs.clone(), &w.mint_nft)?,
            transfer_nft: TransferNftVar::new_witness(cs.clone(), &w.transfer_nft)?,
            atomic_match: AtomicMatchVar::new_witness(cs.clone(), &w.atomic_match)?,
            cancel_offer: CancelOfferVar::new_witness(cs.clone(), &w.cancel_offer)?,
            withdraw_nft: WithdrawNftVar::new_witness(cs.clone(), &w.withdraw_nft)?,
            full_exit: FullExitVar::new_witness(cs.clone(), &w.full_exit)?,
            full_exit_nft: FullExitNftVar::new_witness(cs.clone(), &w.full_exit_nft)?,

            account_root_before: FpVar::new_witness(cs.clone(), || Ok(w.account_root_before))?,
            accounts_before: w
                .accounts_before
                .iter()
                .map(|acct| AccountVar::new_witness(cs.clone(), acct))
                .collect::<Result<_, _>>()?,
            account_proofs: w
                .account_proofs
                .iter()
                .map(&alloc_path)
                .collect::<Result<_, _>>()?,
            asset_proofs: w
                .asset_proofs
                .iter()
                .map(|per_account| {
                    per_account
                        .iter()
                        .map(&alloc_path)
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<_, _>>()?,

            nft_root_before: FpVar::new_witness(cs.clone(), || Ok(w.nft_root_before))?,
            nft_before: NftVar::new_witness(cs.clone(), &w.nft_before)?,
            nft_proof: alloc_path(&w.nft_proof)?,
        })
    }
}
