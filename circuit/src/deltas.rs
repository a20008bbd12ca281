//! Delta records and their selection chains.
//!
//! Every transaction kind produces a full 7x2 grid of asset deltas, an NFT
//! delta and a pair of gas credits; inactive kinds contribute neutral
//! records and the active kind's grid is folded in by `select_*`. Applying
//! the selected deltas is the only way account and NFT state changes.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use crate::constants::{NB_ACCOUNTS_PER_TX, NB_ASSETS_PER_ACCOUNT, NB_GAS_ASSETS_PER_TX};
use crate::vars::NftVar;

/// Change to one asset position: a signed balance delta plus an optional
/// wholesale replacement of the offer bitmap.
#[derive(Clone)]
pub struct AssetDeltaVar {
    pub balance_delta: FpVar<Fr>,
    pub new_bitmap: FpVar<Fr>,
    pub set_bitmap: Boolean<Fr>,
}

impl AssetDeltaVar {
    pub fn neutral() -> Self {
        Self {
            balance_delta: FpVar::zero(),
            new_bitmap: FpVar::zero(),
            set_bitmap: Boolean::constant(false),
        }
    }

    pub fn debit(amount: &FpVar<Fr>) -> Self {
        Self {
            balance_delta: FpVar::zero() - amount,
            new_bitmap: FpVar::zero(),
            set_bitmap: Boolean::constant(false),
        }
    }

    pub fn credit(amount: &FpVar<Fr>) -> Self {
        Self {
            balance_delta: amount.clone(),
            new_bitmap: FpVar::zero(),
            set_bitmap: Boolean::constant(false),
        }
    }

    fn select(
        cond: &Boolean<Fr>,
        if_true: &Self,
        if_false: &Self,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            balance_delta: FpVar::conditionally_select(
                cond,
                &if_true.balance_delta,
                &if_false.balance_delta,
            )?,
            new_bitmap: FpVar::conditionally_select(
                cond,
                &if_true.new_bitmap,
                &if_false.new_bitmap,
            )?,
            set_bitmap: Boolean::conditionally_select(
                cond,
                &if_true.set_bitmap,
                &if_false.set_bitmap,
            )?,
        })
    }
}

/// 7 accounts x 2 asset positions.
pub type AccountAssetDeltas = Vec<Vec<AssetDeltaVar>>;

pub fn neutral_asset_deltas() -> AccountAssetDeltas {
    vec![vec![AssetDeltaVar::neutral(); NB_ASSETS_PER_ACCOUNT]; NB_ACCOUNTS_PER_TX]
}

/// Fold one kind's grid into the accumulator under its indicator.
pub fn select_asset_deltas(
    flag: &Boolean<Fr>,
    candidate: &AccountAssetDeltas,
    acc: &AccountAssetDeltas,
) -> Result<AccountAssetDeltas, SynthesisError> {
    let mut out = Vec::with_capacity(NB_ACCOUNTS_PER_TX);
    for (cand_row, acc_row) in candidate.iter().zip(acc) {
        let mut row = Vec::with_capacity(NB_ASSETS_PER_ACCOUNT);
        for (cand, prev) in cand_row.iter().zip(acc_row) {
            row.push(AssetDeltaVar::select(flag, cand, prev)?);
        }
        out.push(row);
    }
    Ok(out)
}

/// Replacement image of the NFT leaf. Neutral keeps the before-leaf.
#[derive(Clone)]
pub struct NftDeltaVar {
    pub creator_account_index: FpVar<Fr>,
    pub owner_account_index: FpVar<Fr>,
    pub content_hash: FpVar<Fr>,
    pub royalty_rate: FpVar<Fr>,
    pub collection_id: FpVar<Fr>,
}

impl NftDeltaVar {
    pub fn keep(before: &NftVar) -> Self {
        Self {
            creator_account_index: before.creator_account_index.clone(),
            owner_account_index: before.owner_account_index.clone(),
            content_hash: before.content_hash.clone(),
            royalty_rate: before.royalty_rate.clone(),
            collection_id: before.collection_id.clone(),
        }
    }

    /// Zero the leaf, as withdrawals and full exits do.
    pub fn cleared() -> Self {
        Self {
            creator_account_index: FpVar::zero(),
            owner_account_index: FpVar::zero(),
            content_hash: FpVar::zero(),
            royalty_rate: FpVar::zero(),
            collection_id: FpVar::zero(),
        }
    }
}

pub fn select_nft_delta(
    flag: &Boolean<Fr>,
    candidate: &NftDeltaVar,
    acc: &NftDeltaVar,
) -> Result<NftDeltaVar, SynthesisError> {
    Ok(NftDeltaVar {
        creator_account_index: FpVar::conditionally_select(
            flag,
            &candidate.creator_account_index,
            &acc.creator_account_index,
        )?,
        owner_account_index: FpVar::conditionally_select(
            flag,
            &candidate.owner_account_index,
            &acc.owner_account_index,
        )?,
        content_hash: FpVar::conditionally_select(
            flag,
            &candidate.content_hash,
            &acc.content_hash,
        )?,
        royalty_rate: FpVar::conditionally_select(
            flag,
            &candidate.royalty_rate,
            &acc.royalty_rate,
        )?,
        collection_id: FpVar::conditionally_select(
            flag,
            &candidate.collection_id,
            &acc.collection_id,
        )?,
    })
}

/// Gas-fee credit carried out of the slot; the enclosing batch circuit
/// applies these to the gas account once per block.
#[derive(Clone)]
pub struct GasDeltaVar {
    pub asset_id: FpVar<Fr>,
    pub amount: FpVar<Fr>,
}

impl GasDeltaVar {
    pub fn neutral() -> Self {
        Self {
            asset_id: FpVar::zero(),
            amount: FpVar::zero(),
        }
    }
}

pub fn neutral_gas_deltas() -> Vec<GasDeltaVar> {
    vec![GasDeltaVar::neutral(); NB_GAS_ASSETS_PER_TX]
}

pub fn select_gas_deltas(
    flag: &Boolean<Fr>,
    candidate: &[GasDeltaVar],
    acc: &[GasDeltaVar],
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    candidate
        .iter()
        .zip(acc)
        .map(|(cand, prev)| {
            Ok(GasDeltaVar {
                asset_id: FpVar::conditionally_select(flag, &cand.asset_id, &prev.asset_id)?,
                amount: FpVar::conditionally_select(flag, &cand.amount, &prev.amount)?,
            })
        })
        .collect()
}

/// Fold one kind's pubdata record into the accumulator.
pub fn select_pubdata(
    flag: &Boolean<Fr>,
    candidate: &[FpVar<Fr>],
    acc: &[FpVar<Fr>],
) -> Result<Vec<FpVar<Fr>>, SynthesisError> {
    candidate
        .iter()
        .zip(acc)
        .map(|(cand, prev)| FpVar::conditionally_select(flag, cand, prev))
        .collect()
}
