//! Per-kind transaction checks, deltas and records.
//!
//! Each module owns its payload witness struct, its circuit image, its
//! gated `verify`, and whatever deltas/pubdata/signing hash the kind has.
//! All of them run for every slot; the kind indicator switches them on.

pub mod atomic_match;
pub mod cancel_offer;
pub mod create_collection;
pub mod deposit;
pub mod deposit_nft;
pub mod full_exit;
pub mod full_exit_nft;
pub mod mint_nft;
pub mod offer;
pub mod register;
pub mod transfer;
pub mod transfer_nft;
pub mod withdraw;
pub mod withdraw_nft;

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use crate::constants::PUB_DATA_ELEMS_PER_TX;
use crate::deltas::GasDeltaVar;
use crate::gadgets::compare::{enforce_equal_if, enforce_le_if};
use crate::vars::{AccountVar, AssetSlotVar, NftVar};

/// Read-only view of the slot's allocated state, shared by every kind's
/// checks.
pub struct SlotContext<'a> {
    pub accounts: &'a [AccountVar],
    pub nft: &'a NftVar,
    pub block_created_at: &'a FpVar<Fr>,
}

/// Constant for a transaction tag.
pub(crate) fn tag(tx_type: u8) -> FpVar<Fr> {
    FpVar::constant(Fr::from(tx_type as u64))
}

/// Check the asset slot carrying the fee: right asset, enough balance.
pub(crate) fn enforce_fee_slot(
    flag: &Boolean<Fr>,
    slot: &AssetSlotVar,
    gas_fee_asset_id: &FpVar<Fr>,
    fee: &FpVar<Fr>,
) -> Result<(), SynthesisError> {
    enforce_equal_if(flag, &slot.asset_id, gas_fee_asset_id)?;
    enforce_le_if(flag, fee, &slot.balance)
}

/// Gas credit pair for a single-asset fee.
pub(crate) fn fee_gas_deltas(gas_fee_asset_id: &FpVar<Fr>, fee: &FpVar<Fr>) -> Vec<GasDeltaVar> {
    vec![
        GasDeltaVar {
            asset_id: gas_fee_asset_id.clone(),
            amount: fee.clone(),
        },
        GasDeltaVar::neutral(),
    ]
}

/// Pad a pubdata record with zeros to the fixed slot width.
pub(crate) fn pad_pubdata(mut elems: Vec<FpVar<Fr>>) -> Vec<FpVar<Fr>> {
    debug_assert!(elems.len() <= PUB_DATA_ELEMS_PER_TX);
    elems.resize(PUB_DATA_ELEMS_PER_TX, FpVar::zero());
    elems
}
