//! Layer-1 deposit of a fungible asset. Deposit amounts come straight from
//! the chain, so they are full-precision rather than packed.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, TX_TYPE_DEPOSIT};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar};
use crate::gadgets::compare::enforce_equal_if;

use super::{pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepositTx {
    pub account_index: u64,
    pub name_hash: Fr,
    pub asset_id: u64,
    pub amount: Fr,
}

#[derive(Clone)]
pub struct DepositVar {
    pub account_index: FpVar<Fr>,
    pub name_hash: FpVar<Fr>,
    pub asset_id: FpVar<Fr>,
    pub amount: FpVar<Fr>,
}

impl DepositVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &DepositTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.name_hash))?,
            asset_id: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.asset_id)))?,
            amount: FpVar::new_witness(cs, || Ok(tx.amount))?,
        })
    }
}

/// The depositing address must match the account's bound name hash, unless
/// the account has never been bound (first deposit binds it).
pub fn verify(
    flag: &Boolean<Fr>,
    tx: &DepositVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let target = &ctx.accounts[roles::SUBMITTER];
    enforce_equal_if(flag, &target.account_index, &tx.account_index)?;

    let is_unbound = target.name_hash.is_eq(&FpVar::zero())?;
    let bound = FpVar::conditionally_select(&is_unbound, &tx.name_hash, &target.name_hash)?;
    enforce_equal_if(flag, &bound, &tx.name_hash)?;

    enforce_equal_if(flag, &target.assets[0].asset_id, &tx.asset_id)
}

pub fn asset_deltas(tx: &DepositVar) -> AccountAssetDeltas {
    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::credit(&tx.amount);
    deltas
}

pub fn pubdata(tx: &DepositVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_DEPOSIT),
        tx.account_index.clone(),
        tx.asset_id.clone(),
        tx.amount.clone(),
        tx.name_hash.clone(),
    ])
}
