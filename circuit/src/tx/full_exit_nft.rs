//! Forced exit of an NFT, authorized on layer 1 by the owner's bound name
//! hash. The leaf is cleared; an exit request for an NFT the requester
//! does not own cannot be included.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, TX_TYPE_FULL_EXIT_NFT};
use crate::deltas::NftDeltaVar;
use crate::gadgets::compare::enforce_equal_if;

use super::{pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FullExitNftTx {
    pub account_index: u64,
    pub name_hash: Fr,
    pub nft_index: u64,
}

#[derive(Clone)]
pub struct FullExitNftVar {
    pub account_index: FpVar<Fr>,
    pub name_hash: FpVar<Fr>,
    pub nft_index: FpVar<Fr>,
}

impl FullExitNftVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &FullExitNftTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.name_hash))?,
            nft_index: FpVar::new_witness(cs, || Ok(Fr::from(tx.nft_index)))?,
        })
    }
}

pub fn verify(
    flag: &Boolean<Fr>,
    tx: &FullExitNftVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let owner = &ctx.accounts[roles::SUBMITTER];

    enforce_equal_if(flag, &owner.account_index, &tx.account_index)?;
    enforce_equal_if(flag, &owner.name_hash, &tx.name_hash)?;
    enforce_equal_if(flag, &ctx.nft.nft_index, &tx.nft_index)?;
    enforce_equal_if(flag, &ctx.nft.owner_account_index, &tx.account_index)
}

pub fn nft_delta() -> NftDeltaVar {
    NftDeltaVar::cleared()
}

pub fn pubdata(tx: &FullExitNftVar, ctx: &SlotContext) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_FULL_EXIT_NFT),
        tx.account_index.clone(),
        tx.nft_index.clone(),
        ctx.nft.creator_account_index.clone(),
        ctx.nft.content_hash.clone(),
    ])
}
