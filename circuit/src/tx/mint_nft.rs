//! NFT minting into an empty leaf, by a creator with a registered
//! collection.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, RATE_BASE, TX_TYPE_MINT_NFT};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar, NftDeltaVar};
use crate::gadgets::compare::{enforce_equal_if, enforce_le_const_if, enforce_le_if};
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::unpack_fee_var;

use super::{enforce_fee_slot, fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MintNftTx {
    pub creator_account_index: u64,
    pub to_account_index: u64,
    pub to_name_hash: Fr,
    pub nft_index: u64,
    pub content_hash: Fr,
    pub royalty_rate: u64,
    pub collection_id: u64,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
}

#[derive(Clone)]
pub struct MintNftVar {
    pub creator_account_index: FpVar<Fr>,
    pub to_account_index: FpVar<Fr>,
    pub to_name_hash: FpVar<Fr>,
    pub nft_index: FpVar<Fr>,
    pub content_hash: FpVar<Fr>,
    pub royalty_rate: FpVar<Fr>,
    pub collection_id: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
}

impl MintNftVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &MintNftTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            creator_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.creator_account_index))
            })?,
            to_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.to_account_index))
            })?,
            to_name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.to_name_hash))?,
            nft_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.nft_index)))?,
            content_hash: FpVar::new_witness(cs.clone(), || Ok(tx.content_hash))?,
            royalty_rate: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.royalty_rate)))?,
            collection_id: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.collection_id)))?,
            gas_fee_asset_id: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.gas_fee_asset_id))
            })?,
            packed_fee: FpVar::new_witness(cs, || Ok(Fr::from(tx.packed_fee)))?,
        })
    }
}

pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    tx: &MintNftVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_MINT_NFT),
            tx.creator_account_index.clone(),
            tx.to_account_index.clone(),
            tx.to_name_hash.clone(),
            tx.nft_index.clone(),
            tx.content_hash.clone(),
            tx.royalty_rate.clone(),
            tx.collection_id.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &MintNftTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_MINT_NFT as u64),
        Fr::from(tx.creator_account_index),
        Fr::from(tx.to_account_index),
        tx.to_name_hash,
        Fr::from(tx.nft_index),
        tx.content_hash,
        Fr::from(tx.royalty_rate),
        Fr::from(tx.collection_id),
        Fr::from(tx.gas_fee_asset_id),
        Fr::from(tx.packed_fee),
        Fr::from(nonce),
        Fr::from(expired_at),
    ])
}

pub fn verify(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &MintNftVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let creator = &ctx.accounts[roles::SUBMITTER];
    let recipient = &ctx.accounts[roles::COUNTERPARTY];

    enforce_equal_if(flag, &creator.account_index, &tx.creator_account_index)?;
    enforce_equal_if(flag, &recipient.account_index, &tx.to_account_index)?;
    enforce_equal_if(flag, &recipient.name_hash, &tx.to_name_hash)?;

    // Collection ids run 0..collection_nonce.
    let next_id = &tx.collection_id + FpVar::one();
    enforce_le_if(flag, &next_id, &creator.collection_nonce)?;
    enforce_le_const_if(cs.clone(), flag, &tx.royalty_rate, RATE_BASE)?;

    // Target NFT leaf must be empty.
    enforce_equal_if(flag, &ctx.nft.nft_index, &tx.nft_index)?;
    enforce_equal_if(flag, &ctx.nft.owner_account_index, &FpVar::zero())?;
    enforce_equal_if(flag, &ctx.nft.content_hash, &FpVar::zero())?;

    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_fee_slot(flag, &creator.assets[0], &tx.gas_fee_asset_id, &fee)
}

pub fn nft_delta(tx: &MintNftVar) -> NftDeltaVar {
    NftDeltaVar {
        creator_account_index: tx.creator_account_index.clone(),
        owner_account_index: tx.to_account_index.clone(),
        content_hash: tx.content_hash.clone(),
        royalty_rate: tx.royalty_rate.clone(),
        collection_id: tx.collection_id.clone(),
    }
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &MintNftVar,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&fee);
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &MintNftVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &MintNftVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_MINT_NFT),
        tx.creator_account_index.clone(),
        tx.to_account_index.clone(),
        tx.nft_index.clone(),
        tx.content_hash.clone(),
        tx.packed_fee.clone(),
    ])
}
