//! NFT withdrawal to layer 1: the leaf is cleared and the content hash
//! surfaces in pubdata for the L1 side to mint against.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, CHAIN_ID, TX_TYPE_WITHDRAW_NFT};
use crate::deltas::{neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar, NftDeltaVar};
use crate::gadgets::compare::enforce_equal_if;
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::unpack_fee_var;

use super::{enforce_fee_slot, fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WithdrawNftTx {
    pub account_index: u64,
    pub nft_index: u64,
    pub to_address: Fr,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
}

#[derive(Clone)]
pub struct WithdrawNftVar {
    pub account_index: FpVar<Fr>,
    pub nft_index: FpVar<Fr>,
    pub to_address: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
}

impl WithdrawNftVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &WithdrawNftTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            nft_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.nft_index)))?,
            to_address: FpVar::new_witness(cs.clone(), || Ok(tx.to_address))?,
            gas_fee_asset_id: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.gas_fee_asset_id))
            })?,
            packed_fee: FpVar::new_witness(cs, || Ok(Fr::from(tx.packed_fee)))?,
        })
    }
}

pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    tx: &WithdrawNftVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_WITHDRAW_NFT),
            tx.account_index.clone(),
            tx.nft_index.clone(),
            tx.to_address.clone(),
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &WithdrawNftTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_WITHDRAW_NFT as u64),
        Fr::from(tx.account_index),
        Fr::from(tx.nft_index),
        tx.to_address,
        Fr::from(tx.gas_fee_asset_id),
        Fr::from(tx.packed_fee),
        Fr::from(nonce),
        Fr::from(expired_at),
    ])
}

pub fn verify(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &WithdrawNftVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let owner = &ctx.accounts[roles::SUBMITTER];

    enforce_equal_if(flag, &owner.account_index, &tx.account_index)?;
    enforce_equal_if(flag, &ctx.nft.nft_index, &tx.nft_index)?;
    enforce_equal_if(flag, &ctx.nft.owner_account_index, &tx.account_index)?;

    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    enforce_fee_slot(flag, &owner.assets[0], &tx.gas_fee_asset_id, &fee)
}

pub fn nft_delta() -> NftDeltaVar {
    NftDeltaVar::cleared()
}

pub fn asset_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &WithdrawNftVar,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;

    let mut deltas = neutral_asset_deltas();
    deltas[roles::SUBMITTER][0] = AssetDeltaVar::debit(&fee);
    Ok(deltas)
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &WithdrawNftVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &WithdrawNftVar, ctx: &SlotContext) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_WITHDRAW_NFT),
        tx.account_index.clone(),
        tx.nft_index.clone(),
        tx.to_address.clone(),
        ctx.nft.content_hash.clone(),
        tx.packed_fee.clone(),
    ])
}
