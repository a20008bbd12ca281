//! Layer-2 transfer between two accounts. The default branch of the
//! signing-hash selection chain, so its hash is also what an empty slot's
//! (never-checked) signature would range over.
//!
//! Slot layout: slot 0 is the sender with the transferred asset in position
//! 0 and the fee asset in position 1; slot 1 is the recipient with the
//! transferred asset in position 0.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, TX_TYPE_TRANSFER};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar};
use crate::gadgets::compare::{enforce_equal_if, enforce_le_if};
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::{unpack_amount_var, unpack_fee_var};

use super::{fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransferTx {
    pub from_account_index: u64,
    pub to_account_index: u64,
    pub to_name_hash: Fr,
    pub asset_id: u64,
    pub packed_amount: u64,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
    pub call_data_hash: Fr,
}

#[derive(Clone)]
pub struct TransferVar {
    pub from_account_index: FpVar<Fr>,
    pub to_account_index: FpVar<Fr>,
    pub to_name_hash: FpVar<Fr>,
    pub asset_id: FpVar<Fr>,
    pub packed_amount: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
    pub call_data_hash: FpVar<Fr>,
}

impl TransferVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &TransferTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            from_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.from_account_index))
            })?,
            to_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.to_account_index))
            })?,
            to_name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.to_name_hash))?,
            asset_id: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.asset_id)))?,
            packed_amount: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.packed_amount)))?,
            gas_fee_asset_id: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.gas_fee_asset_id))
            })?,
            packed_fee: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.packed_fee)))?,
            call_data_hash: FpVar::new_witness(cs, || Ok(tx.call_data_hash))?,
        })
    }
}

pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    tx: &TransferVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_TRANSFER),
            tx.from_account_index.clone(),
            tx.to_account_index.clone(),
            tx.to_name_hash.clone(),
            tx.asset_id.clone(),
            tx.packed_amount.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            tx.call_data_hash.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &TransferTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_TRANSFER as u64),
        Fr::from(tx.from_account_index),
        Fr::from(tx.to_account_index),
        tx.to_name_hash,
        Fr::from(tx.asset_id),
        Fr::from(tx.packed_amount),
        Fr::from(tx.gas_fee_asset_id),
        Fr::from(tx.packed_fee),
        tx.call_data_hash,
        Fr::from(nonce),
        Fr::from(expired_at),
    ])
}

pub fn verify(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &TransferVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let from = &ctx.accounts[roles::SUBMITTER];
    let to = &ctx.accounts[roles::COUNTERPARTY];

    enforce_equal_if(flag, &from.account_index, &tx.from_account_index)?;
    enforce_equal_if(flag, &to.account_index, &tx.to_account_index)?;
    enforce_equal_if(flag, &to.name_hash, &tx.to_name_hash)?;

    enforce_equal_if(flag, &from.assets[0].asset_id, &tx.asset_id)?;
    enforce_equal_if(flag, &from.assets[1].asset_id, &tx.gas_fee_asset_id)?;
    enforce_equal_if(flag, &to.assets[0].asset_id, &tx.asset_id)?;

    let amount = unpack_amount_var(cs.clone(), &tx.packed_amount)?;
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_le_if(flag, &amount, &from.assets[0].balance)?;
    enforce_le_if(flag, &fee, &from.assets[1].balance)
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &TransferVar,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let amount = unpack_amount_var(cs.clone(), &tx.packed_amount)?;
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&amount);
    deltas[roles::SUBMITTER][1] = AssetDeltaVar::debit(&fee);
    deltas[roles::COUNTERPARTY][0] = AssetDeltaVar::credit(&amount);
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &TransferVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &TransferVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_TRANSFER),
        tx.from_account_index.clone(),
        tx.to_account_index.clone(),
        tx.asset_id.clone(),
        tx.packed_amount.clone(),
        tx.packed_fee.clone(),
    ])
}
