//! Withdrawal to layer 1. Signed by the owner but exempt from the nonce
//! and expiry gates, so a queued withdrawal can always be included.
//! Amounts leave the system at full precision.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, TX_TYPE_WITHDRAW};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar};
use crate::gadgets::compare::{enforce_equal_if, enforce_le_if};
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::unpack_fee_var;

use super::{fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WithdrawTx {
    pub account_index: u64,
    pub to_address: Fr,
    pub asset_id: u64,
    pub amount: Fr,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
}

#[derive(Clone)]
pub struct WithdrawVar {
    pub account_index: FpVar<Fr>,
    pub to_address: FpVar<Fr>,
    pub asset_id: FpVar<Fr>,
    pub amount: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
}

impl WithdrawVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &WithdrawTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            to_address: FpVar::new_witness(cs.clone(), || Ok(tx.to_address))?,
            asset_id: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.asset_id)))?,
            amount: FpVar::new_witness(cs.clone(), || Ok(tx.amount))?,
            gas_fee_asset_id: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.gas_fee_asset_id))
            })?,
            packed_fee: FpVar::new_witness(cs, || Ok(Fr::from(tx.packed_fee)))?,
        })
    }
}

pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    tx: &WithdrawVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_WITHDRAW),
            tx.account_index.clone(),
            tx.to_address.clone(),
            tx.asset_id.clone(),
            tx.amount.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &WithdrawTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_WITHDRAW as u64),
        Fr::from(tx.account_index),
        tx.to_address,
        Fr::from(tx.asset_id),
        tx.amount,
        Fr::from(tx.gas_fee_asset_id),
        Fr::from(tx.packed_fee),
        Fr::from(nonce),
        Fr::from(expired_at),
    ])
}

pub fn verify(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &WithdrawVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let owner = &ctx.accounts[roles::SUBMITTER];

    enforce_equal_if(flag, &owner.account_index, &tx.account_index)?;
    enforce_equal_if(flag, &owner.assets[0].asset_id, &tx.asset_id)?;
    enforce_equal_if(flag, &owner.assets[1].asset_id, &tx.gas_fee_asset_id)?;

    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_le_if(flag, &tx.amount, &owner.assets[0].balance)?;
    enforce_le_if(flag, &fee, &owner.assets[1].balance)
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &WithdrawVar,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&tx.amount);
    deltas[roles::SUBMITTER][1] = AssetDeltaVar::debit(&fee);
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &WithdrawVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &WithdrawVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_WITHDRAW),
        tx.account_index.clone(),
        tx.to_address.clone(),
        tx.asset_id.clone(),
        tx.amount.clone(),
        tx.packed_fee.clone(),
    ])
}
