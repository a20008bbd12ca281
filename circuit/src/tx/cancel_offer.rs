//! Offer cancellation: permanently consumes the offer's bitmap bit so it
//! can never be matched.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, TX_TYPE_CANCEL_OFFER};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar};
use crate::gadgets::compare::enforce_equal_if;
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::unpack_fee_var;

use super::offer::{consume_offer_bit, decode_offer_id_var};
use super::{enforce_fee_slot, fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CancelOfferTx {
    pub account_index: u64,
    pub offer_id: u64,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
}

#[derive(Clone)]
pub struct CancelOfferVar {
    pub account_index: FpVar<Fr>,
    pub offer_id: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
}

impl CancelOfferVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &CancelOfferTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            offer_id: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.offer_id)))?,
            gas_fee_asset_id: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.gas_fee_asset_id))
            })?,
            packed_fee: FpVar::new_witness(cs, || Ok(Fr::from(tx.packed_fee)))?,
        })
    }
}

pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    tx: &CancelOfferVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_CANCEL_OFFER),
            tx.account_index.clone(),
            tx.offer_id.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &CancelOfferTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_CANCEL_OFFER as u64),
        Fr::from(tx.account_index),
        Fr::from(tx.offer_id),
        Fr::from(tx.gas_fee_asset_id),
        Fr::from(tx.packed_fee),
        Fr::from(nonce),
        Fr::from(expired_at),
    ])
}

pub fn verify(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &CancelOfferVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let maker = &ctx.accounts[roles::SUBMITTER];

    enforce_equal_if(flag, &maker.account_index, &tx.account_index)?;

    // Position 1 carries the bitmap leaf the offer id points into.
    let (asset_pos, _) = decode_offer_id_var(cs.clone(), &tx.offer_id)?;
    enforce_equal_if(flag, &maker.assets[1].asset_id, &asset_pos)?;

    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_fee_slot(flag, &maker.assets[0], &tx.gas_fee_asset_id, &fee)
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &CancelOfferVar,
    ctx: &SlotContext,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let maker = &ctx.accounts[roles::SUBMITTER];

    let fee = unpack_fee_var(cs.clone(), &tx.packed_fee)?;
    let (_, bit_pos) = decode_offer_id_var(cs.clone(), &tx.offer_id)?;
    let new_bitmap = consume_offer_bit(cs, flag, &maker.assets[1].offer_bitmap, &bit_pos)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&fee);
    deltas[roles::SUBMITTER][1] = AssetDeltaVar {
        balance_delta: FpVar::zero(),
        new_bitmap,
        set_bitmap: Boolean::constant(true),
    };
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &CancelOfferVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &CancelOfferVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_CANCEL_OFFER),
        tx.account_index.clone(),
        tx.offer_id.clone(),
        tx.packed_fee.clone(),
    ])
}
