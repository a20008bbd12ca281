//! Atomic match of a buy offer against a sell offer, submitted by a third
//! party (or one of the makers).
//!
//! Money flow, all in the offer's asset: the buyer pays
//! `amount + protocol + royalty + buy_channel`; the seller receives
//! `amount - sell_channel`; creator, both channels and the protocol
//! account receive their cuts. Every cut is `floor(amount * rate /
//! RATE_BASE)`, enforced through a witnessed quotient/remainder pair.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;

use crate::constants::{roles, CHAIN_ID, RATE_BASE, TX_TYPE_ATOMIC_MATCH};
use crate::deltas::{
    neutral_asset_deltas, AccountAssetDeltas, AssetDeltaVar, GasDeltaVar, NftDeltaVar,
};
use crate::gadgets::compare::{enforce_equal_if, enforce_le_const_if, enforce_le_if};
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::packed::{unpack_amount_var, unpack_fee_var};
use crate::vars::NftVar;

use super::offer::{
    self, consume_offer_bit, decode_offer_id_var, OfferTx, OfferVar, OFFER_TYPE_BUY,
    OFFER_TYPE_SELL,
};
use super::{enforce_fee_slot, fee_gas_deltas, pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AtomicMatchTx {
    pub account_index: u64,
    pub buy_offer: OfferTx,
    pub sell_offer: OfferTx,
    pub protocol_account_index: u64,
    pub gas_fee_asset_id: u64,
    pub packed_fee: u64,
}

#[derive(Clone)]
pub struct AtomicMatchVar {
    pub account_index: FpVar<Fr>,
    pub buy_offer: OfferVar,
    pub sell_offer: OfferVar,
    pub protocol_account_index: FpVar<Fr>,
    pub gas_fee_asset_id: FpVar<Fr>,
    pub packed_fee: FpVar<Fr>,
}

impl AtomicMatchVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &AtomicMatchTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            buy_offer: OfferVar::new_witness(cs.clone(), &tx.buy_offer)?,
            sell_offer: OfferVar::new_witness(cs.clone(), &tx.sell_offer)?,
            protocol_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.protocol_account_index))
            })?,
            gas_fee_asset_id: FpVar::new_witness(cs.clone(), || {
                Ok(Fr::from(tx.gas_fee_asset_id))
            })?,
            packed_fee: FpVar::new_witness(cs, || Ok(Fr::from(tx.packed_fee)))?,
        })
    }
}

pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    tx: &AtomicMatchVar,
    nonce: &FpVar<Fr>,
    expired_at: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let buy_hash = offer::signing_hash_var(cs.clone(), &tx.buy_offer)?;
    let sell_hash = offer::signing_hash_var(cs.clone(), &tx.sell_offer)?;
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            tag(TX_TYPE_ATOMIC_MATCH),
            tx.account_index.clone(),
            buy_hash,
            sell_hash,
            tx.gas_fee_asset_id.clone(),
            tx.packed_fee.clone(),
            nonce.clone(),
            expired_at.clone(),
        ],
    )
}

pub fn signing_hash(tx: &AtomicMatchTx, nonce: u64, expired_at: u64) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(TX_TYPE_ATOMIC_MATCH as u64),
        Fr::from(tx.account_index),
        offer::signing_hash(&tx.buy_offer),
        offer::signing_hash(&tx.sell_offer),
        Fr::from(tx.gas_fee_asset_id),
        Fr::from(tx.packed_fee),
        Fr::from(nonce),
        Fr::from(expired_at),
    ])
}

/// Floor division of `amount * rate` by `RATE_BASE`, sound under `flag`:
/// the witnessed quotient/remainder must recompose to the exact product
/// with the remainder strictly inside the base.
fn floor_rate(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    amount: &FpVar<Fr>,
    rate: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let quotient = FpVar::new_witness(cs.clone(), || {
        let a: BigUint = amount.value()?.into();
        let r: BigUint = rate.value()?.into();
        Ok(Fr::from(a * r / RATE_BASE))
    })?;
    let remainder = FpVar::new_witness(cs.clone(), || {
        let a: BigUint = amount.value()?.into();
        let r: BigUint = rate.value()?.into();
        Ok(Fr::from(a * r % RATE_BASE))
    })?;

    let product = amount * rate;
    let recomposed = &quotient * FpVar::constant(Fr::from(RATE_BASE)) + &remainder;
    recomposed.conditional_enforce_equal(&product, flag)?;
    enforce_le_const_if(cs, flag, &remainder, RATE_BASE - 1)?;
    Ok(quotient)
}

pub struct MatchAmounts {
    pub amount: FpVar<Fr>,
    pub fee: FpVar<Fr>,
    pub protocol_amount: FpVar<Fr>,
    pub royalty_amount: FpVar<Fr>,
    pub buy_channel_amount: FpVar<Fr>,
    pub sell_channel_amount: FpVar<Fr>,
}

fn compute_amounts(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &AtomicMatchVar,
    nft: &NftVar,
) -> Result<MatchAmounts, SynthesisError> {
    let amount = unpack_amount_var(cs.clone(), &tx.buy_offer.packed_amount)?;
    let fee = unpack_fee_var(cs.clone(), &tx.packed_fee)?;
    let protocol_amount = floor_rate(cs.clone(), flag, &amount, &tx.buy_offer.protocol_rate)?;
    let royalty_amount = floor_rate(cs.clone(), flag, &amount, &nft.royalty_rate)?;
    let buy_channel_amount = floor_rate(cs.clone(), flag, &amount, &tx.buy_offer.channel_rate)?;
    let sell_channel_amount = floor_rate(cs, flag, &amount, &tx.sell_offer.channel_rate)?;
    Ok(MatchAmounts {
        amount,
        fee,
        protocol_amount,
        royalty_amount,
        buy_channel_amount,
        sell_channel_amount,
    })
}

pub fn verify(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &AtomicMatchVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let submitter = &ctx.accounts[roles::SUBMITTER];
    let buyer = &ctx.accounts[roles::COUNTERPARTY];
    let seller = &ctx.accounts[roles::SELLER];
    let creator = &ctx.accounts[roles::CREATOR];
    let buy_channel = &ctx.accounts[roles::BUY_CHANNEL];
    let sell_channel = &ctx.accounts[roles::SELL_CHANNEL];
    let protocol = &ctx.accounts[roles::PROTOCOL];

    enforce_equal_if(flag, &submitter.account_index, &tx.account_index)?;

    // The two offers describe the same trade, from opposite sides.
    let buy = &tx.buy_offer;
    let sell = &tx.sell_offer;
    enforce_equal_if(flag, &buy.offer_type, &FpVar::constant(Fr::from(OFFER_TYPE_BUY)))?;
    enforce_equal_if(flag, &sell.offer_type, &FpVar::constant(Fr::from(OFFER_TYPE_SELL)))?;
    enforce_equal_if(flag, &buy.asset_id, &sell.asset_id)?;
    enforce_equal_if(flag, &buy.packed_amount, &sell.packed_amount)?;
    enforce_equal_if(flag, &buy.nft_index, &sell.nft_index)?;
    enforce_equal_if(flag, &buy.protocol_rate, &sell.protocol_rate)?;

    enforce_equal_if(flag, &ctx.nft.nft_index, &buy.nft_index)?;
    enforce_equal_if(flag, &ctx.nft.owner_account_index, &sell.account_index)?;

    offer::verify_offer(
        cs.clone(),
        flag,
        buy,
        buyer,
        &submitter.account_index,
        ctx.block_created_at,
    )?;
    offer::verify_offer(
        cs.clone(),
        flag,
        sell,
        seller,
        &submitter.account_index,
        ctx.block_created_at,
    )?;

    // Remaining role slots carry the right accounts.
    enforce_equal_if(flag, &creator.account_index, &ctx.nft.creator_account_index)?;
    enforce_equal_if(flag, &buy_channel.account_index, &buy.channel_account_index)?;
    enforce_equal_if(flag, &sell_channel.account_index, &sell.channel_account_index)?;
    enforce_equal_if(flag, &protocol.account_index, &tx.protocol_account_index)?;

    // Every credited slot holds the traded asset in position 0.
    for account in [buyer, seller, creator, buy_channel, sell_channel, protocol] {
        enforce_equal_if(flag, &account.assets[0].asset_id, &buy.asset_id)?;
    }

    // Positions 1 of buyer and seller carry their offer bitmaps.
    let (buy_pos, _) = decode_offer_id_var(cs.clone(), &buy.offer_id)?;
    let (sell_pos, _) = decode_offer_id_var(cs.clone(), &sell.offer_id)?;
    enforce_equal_if(flag, &buyer.assets[1].asset_id, &buy_pos)?;
    enforce_equal_if(flag, &seller.assets[1].asset_id, &sell_pos)?;

    let amounts = compute_amounts(cs.clone(), flag, tx, ctx.nft)?;
    let buyer_debit = &amounts.amount
        + &amounts.protocol_amount
        + &amounts.royalty_amount
        + &amounts.buy_channel_amount;
    enforce_le_if(flag, &buyer_debit, &buyer.assets[0].balance)?;
    // Seller proceeds must not go negative.
    enforce_le_if(flag, &amounts.sell_channel_amount, &amounts.amount)?;

    enforce_fee_slot(flag, &submitter.assets[0], &tx.gas_fee_asset_id, &amounts.fee)
}

pub fn deltas(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    tx: &AtomicMatchVar,
    ctx: &SlotContext,
) -> Result<(AccountAssetDeltas, NftDeltaVar), SynthesisError> {
    let buyer = &ctx.accounts[roles::COUNTERPARTY];
    let seller = &ctx.accounts[roles::SELLER];

    let amounts = compute_amounts(cs.clone(), flag, tx, ctx.nft)?;
    let buyer_debit = &amounts.amount
        + &amounts.protocol_amount
        + &amounts.royalty_amount
        + &amounts.buy_channel_amount;
    let seller_credit = &amounts.amount - &amounts.sell_channel_amount;

    let (_, buy_bit) = decode_offer_id_var(cs.clone(), &tx.buy_offer.offer_id)?;
    let (_, sell_bit) = decode_offer_id_var(cs.clone(), &tx.sell_offer.offer_id)?;
    let buy_bitmap =
        consume_offer_bit(cs.clone(), flag, &buyer.assets[1].offer_bitmap, &buy_bit)?;
    let sell_bitmap =
        consume_offer_bit(cs.clone(), flag, &seller.assets[1].offer_bitmap, &sell_bit)?;

    let mut grid = neutral_asset_deltas();
    grid[roles::SUBMITTER][0] = AssetDeltaVar::debit(&amounts.fee);
    grid[roles::COUNTERPARTY][0] = AssetDeltaVar::debit(&buyer_debit);
    grid[roles::COUNTERPARTY][1] = AssetDeltaVar {
        balance_delta: FpVar::zero(),
        new_bitmap: buy_bitmap,
        set_bitmap: Boolean::constant(true),
    };
    grid[roles::SELLER][0] = AssetDeltaVar::credit(&seller_credit);
    grid[roles::SELLER][1] = AssetDeltaVar {
        balance_delta: FpVar::zero(),
        new_bitmap: sell_bitmap,
        set_bitmap: Boolean::constant(true),
    };
    grid[roles::CREATOR][0] = AssetDeltaVar::credit(&amounts.royalty_amount);
    grid[roles::BUY_CHANNEL][0] = AssetDeltaVar::credit(&amounts.buy_channel_amount);
    grid[roles::SELL_CHANNEL][0] = AssetDeltaVar::credit(&amounts.sell_channel_amount);
    grid[roles::PROTOCOL][0] = AssetDeltaVar::credit(&amounts.protocol_amount);

    let mut nft_delta = NftDeltaVar::keep(ctx.nft);
    nft_delta.owner_account_index = tx.buy_offer.account_index.clone();

    Ok((grid, nft_delta))
}

pub fn gas_deltas(
    cs: ConstraintSystemRef<Fr>,
    tx: &AtomicMatchVar,
) -> Result<Vec<GasDeltaVar>, SynthesisError> {
    let fee = unpack_fee_var(cs, &tx.packed_fee)?;
    Ok(fee_gas_deltas(&tx.gas_fee_asset_id, &fee))
}

pub fn pubdata(tx: &AtomicMatchVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_ATOMIC_MATCH),
        tx.buy_offer.account_index.clone(),
        tx.sell_offer.account_index.clone(),
        tx.buy_offer.nft_index.clone(),
        tx.buy_offer.packed_amount.clone(),
        tx.packed_fee.clone(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_floor_rate_exact() {
        // 1_000_000 * 200 / 10_000 = 20_000 exactly.
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let amount = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1_000_000u64))).unwrap();
        let rate = FpVar::new_witness(cs.clone(), || Ok(Fr::from(200u64))).unwrap();

        let cut = floor_rate(cs.clone(), &flag, &amount, &rate).unwrap();
        assert_eq!(cut.value().unwrap(), Fr::from(20_000u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_floor_rate_rounds_down() {
        // 12_345 * 33 / 10_000 = 40.7385 -> 40.
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let amount = FpVar::new_witness(cs.clone(), || Ok(Fr::from(12_345u64))).unwrap();
        let rate = FpVar::new_witness(cs.clone(), || Ok(Fr::from(33u64))).unwrap();

        let cut = floor_rate(cs.clone(), &flag, &amount, &rate).unwrap();
        assert_eq!(cut.value().unwrap(), Fr::from(40u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_forged_quotient_rejected() {
        // Replicate the enforcement with a claimed quotient one short; the
        // remainder needed to balance the product lands outside the base.
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let amount = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1_000_000u64))).unwrap();
        let rate = FpVar::new_witness(cs.clone(), || Ok(Fr::from(200u64))).unwrap();
        let claimed = FpVar::new_witness(cs.clone(), || Ok(Fr::from(19_999u64))).unwrap();
        let remainder = FpVar::new_witness(cs.clone(), || Ok(Fr::from(10_000u64))).unwrap();

        let product = &amount * &rate;
        let recomposed = &claimed * FpVar::constant(Fr::from(RATE_BASE)) + &remainder;
        recomposed.conditional_enforce_equal(&product, &flag).unwrap();
        enforce_le_const_if(cs.clone(), &flag, &remainder, RATE_BASE - 1).unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_floor_rate_gated_off() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let amount = FpVar::new_witness(cs.clone(), || Ok(Fr::from(5u64))).unwrap();
        let rate = FpVar::new_witness(cs.clone(), || Ok(Fr::from(3u64))).unwrap();

        let _ = floor_rate(cs.clone(), &flag, &amount, &rate).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
