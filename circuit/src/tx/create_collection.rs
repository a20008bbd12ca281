//! Collection creation: consumes the submitter's current collection nonce
//! as the new collection id. The nonce increment itself happens in the
//! account update step under the same indicator.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, TX_TYPE_CREATE_COLLECTION};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar};
use crate::gadgets::compare::enforce_equal_if;
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::unpack_fee_var;

use super::{enforce_fee_slot, fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateCollectionTx {
    pub account_index: u64,
    pub collection_id: u64,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
}

#[derive(Clone)]
pub struct CreateCollectionVar {
    pub account_index: FpVar<Fr>,
    pub collection_id: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
}

impl CreateCollectionVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &CreateCollectionTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
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
    tx: &CreateCollectionVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_CREATE_COLLECTION),
            tx.account_index.clone(),
            tx.collection_id.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &CreateCollectionTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_CREATE_COLLECTION as u64),
        Fr::from(tx.account_index),
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
    tx: &CreateCollectionVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let creator = &ctx.accounts[roles::SUBMITTER];

    enforce_equal_if(flag, &creator.account_index, &tx.account_index)?;
    enforce_equal_if(flag, &tx.collection_id, &creator.collection_nonce)?;

    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_fee_slot(flag, &creator.assets[0], &tx.gas_fee_asset_id, &fee)
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &CreateCollectionVar,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&fee);
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &CreateCollectionVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &CreateCollectionVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_CREATE_COLLECTION),
        tx.account_index.clone(),
        tx.collection_id.clone(),
        tx.packed_fee.clone(),
    ])
}
