//! NFT ownership transfer.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, TX_TYPE_TRANSFER_NFT};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar, NftDeltaVar};
use crate::gadgets::compare::enforce_equal_if;
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::unpack_fee_var;
use crate::vars::NftVar;

use super::{enforce_fee_slot, fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransferNftTx {
    pub from_account_index: u64,
    pub to_account_index: u64,
    pub to_name_hash: Fr,
    pub nft_index: u64,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
    pub call_data_hash: Fr,
}

#[derive(Clone)]
pub struct TransferNftVar {
    pub from_account_index: FpVar<Fr>,
    pub to_account_index: FpVar<Fr>,
    pub to_name_hash: FpVar<Fr>,
    pub nft_index: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
    pub call_data_hash: FpVar<Fr>,
}

impl TransferNftVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &TransferNftTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            from_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.from_account_index))
            })?,
            to_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.to_account_index))
            })?,
            to_name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.to_name_hash))?,
            nft_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.nft_index)))?,
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
    tx: &TransferNftVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_TRANSFER_NFT),
            tx.from_account_index.clone(),
            tx.to_account_index.clone(),
            tx.to_name_hash.clone(),
            tx.nft_index.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            tx.call_data_hash.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &TransferNftTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_TRANSFER_NFT as u64),
        Fr::from(tx.from_account_index),
        Fr::from(tx.to_account_index),
        tx.to_name_hash,
        Fr::from(tx.nft_index),
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
    tx: &TransferNftVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let from = &ctx.accounts[roles::SUBMITTER];
    let to = &ctx.accounts[roles::COUNTERPARTY];

    enforce_equal_if(flag, &from.account_index, &tx.from_account_index)?;
    enforce_equal_if(flag, &to.account_index, &tx.to_account_index)?;
    enforce_equal_if(flag, &to.name_hash, &tx.to_name_hash)?;

    enforce_equal_if(flag, &ctx.nft.nft_index, &tx.nft_index)?;
    enforce_equal_if(flag, &ctx.nft.owner_account_index, &tx.from_account_index)?;

    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_fee_slot(flag, &from.assets[0], &tx.gas_fee_asset_id, &fee)
}

pub fn nft_delta(tx: &TransferNftVar, nft_before: &NftVar) -> NftDeltaVar {
    let mut delta = NftDeltaVar::keep(nft_before);
    delta.owner_account_index = tx.to_account_index.clone();
    delta
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &TransferNftVar,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&fee);
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &TransferNftVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &TransferNftVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_TRANSFER_NFT),
        tx.from_account_index.clone(),
        tx.to_account_index.clone(),
        tx.nft_index.clone(),
        tx.call_data_hash.clone(),
        tx.packed_fee.clone(),
    ])
}
