//! Forced exit of an entire asset balance, authorized on layer 1 by the
//! owner's bound name hash. No signature, no nonce, no fee.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, TX_TYPE_FULL_EXIT};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar};
use crate::gadgets::compare::enforce_equal_if;

use super::{pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FullExitTx {
    pub account_index: u64,
    pub name_hash: Fr,
    pub asset_id: u64,
}

#[derive(Clone)]
pub struct FullExitVar {
    pub account_index: FpVar<Fr>,
    pub name_hash: FpVar<Fr>,
    pub asset_id: FpVar<Fr>,
}

impl FullExitVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &FullExitTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.name_hash))?,
            asset_id: FpVar::new_witness(cs, || Ok(Fr::from(tx.asset_id)))?,
        })
    }
}

pub fn verify(
    flag: &Boolean<Fr>,
    tx: &FullExitVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let owner = &ctx.accounts[roles::SUBMITTER];

    enforce_equal_if(flag, &owner.account_index, &tx.account_index)?;
    enforce_equal_if(flag, &owner.name_hash, &tx.name_hash)?;
    enforce_equal_if(flag, &owner.assets[0].asset_id, &tx.asset_id)
}

/// The exit drains the whole balance.
pub fn asset_deltas(tx: &FullExitVar, ctx: &SlotContext) -> AccountAssetDeltas {
    let _ = tx;
    let balance = &ctx.accounts[roles::SUBMITTER].assets[0].balance;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(balance);
    deltas
}

pub fn pubdata(tx: &FullExitVar, ctx: &SlotContext) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_FULL_EXIT),
        tx.account_index.clone(),
        tx.asset_id.clone(),
        ctx.accounts[roles::SUBMITTER].assets[0].balance.clone(),
        tx.name_hash.clone(),
    ])
}
