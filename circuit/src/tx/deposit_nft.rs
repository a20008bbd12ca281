//! Layer-1 deposit of an NFT into an empty leaf.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, TX_TYPE_DEPOSIT_NFT};
use crate::deltas::NftDeltaVar;
use crate::gadgets::compare::enforce_equal_if;

use super::{pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepositNftTx {
    pub account_index: u64,
    pub name_hash: Fr,
    pub nft_index: u64,
    pub creator_account_index: u64,
    pub content_hash: Fr,
    pub royalty_rate: u64,
    pub collection_id: u64,
}

#[derive(Clone)]
pub struct DepositNftVar {
    pub account_index: FpVar<Fr>,
    pub name_hash: FpVar<Fr>,
    pub nft_index: FpVar<Fr>,
    pub creator_account_index: FpVar<Fr>,
    pub content_hash: FpVar<Fr>,
    pub royalty_rate: FpVar<Fr>,
    pub collection_id: FpVar<Fr>,
}

impl DepositNftVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &DepositNftTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.name_hash))?,
            nft_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.nft_index)))?,
            creator_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.creator_account_index))
            })?,
            content_hash: FpVar::new_witness(cs.clone(), || Ok(tx.content_hash))?,
            royalty_rate: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.royalty_rate)))?,
            collection_id: FpVar::new_witness(cs, || Ok(Fr::from(tx.collection_id)))?,
        })
    }
}

pub fn verify(
    flag: &Boolean<Fr>,
    tx: &DepositNftVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let target = &ctx.accounts[roles::SUBMITTER];
    enforce_equal_if(flag, &target.account_index, &tx.account_index)?;

    let is_unbound = target.name_hash.is_eq(&FpVar::zero())?;
    let bound = FpVar::conditionally_select(&is_unbound, &tx.name_hash, &target.name_hash)?;
    enforce_equal_if(flag, &bound, &tx.name_hash)?;

    // Target NFT leaf must be empty.
    enforce_equal_if(flag, &ctx.nft.nft_index, &tx.nft_index)?;
    enforce_equal_if(flag, &ctx.nft.owner_account_index, &FpVar::zero())?;
    enforce_equal_if(flag, &ctx.nft.content_hash, &FpVar::zero())
}

pub fn nft_delta(tx: &DepositNftVar) -> NftDeltaVar {
    NftDeltaVar {
        creator_account_index: tx.creator_account_index.clone(),
        owner_account_index: tx.account_index.clone(),
        content_hash: tx.content_hash.clone(),
        royalty_rate: tx.royalty_rate.clone(),
        collection_id: tx.collection_id.clone(),
    }
}

pub fn pubdata(tx: &DepositNftVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_DEPOSIT_NFT),
        tx.account_index.clone(),
        tx.nft_index.clone(),
        tx.content_hash.clone(),
        tx.royalty_rate.clone(),
        tx.collection_id.clone(),
    ])
}
