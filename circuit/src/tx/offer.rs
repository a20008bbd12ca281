//! Signed offers, the shared sub-payload of atomic match and cancel offer.
//!
//! An offer id is 24 bits: the low 7 select a bit inside a 128-bit
//! consumption bitmap, the high 17 name the asset position whose leaf
//! carries that bitmap. Consuming an offer requires its bit to be clear
//! and sets it, which kills replays and double-spends of the same offer.

use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, Field};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{CHAIN_ID, OFFER_ID_BITS, OFFERS_PER_ASSET};
use crate::error::{Result as WitnessResult, WitnessError};
use crate::gadgets::bits::{from_bits, to_bits_fixed};
use crate::gadgets::compare::{and, enforce_equal_if, enforce_le_if, indicator, not};
use crate::gadgets::hash::{hash, hash_vars};
use crate::gadgets::sig::{sign, verify_signature, SignatureVar, SignatureWitness};
use crate::vars::AccountVar;

pub const OFFER_TYPE_BUY: u64 = 0;
pub const OFFER_TYPE_SELL: u64 = 1;

/// Number of bits selecting a position inside the bitmap.
const BIT_POS_BITS: usize = 7;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfferTx {
    pub offer_type: u64,
    pub offer_id: u64,
    pub account_index: u64,
    pub nft_index: u64,
    pub asset_id: u64,
    pub packed_amount: u64,
    pub listed_at: u64,
    pub expired_at: u64,
    pub protocol_rate: u64,
    pub channel_account_index: u64,
    pub channel_rate: u64,
    pub sig: SignatureWitness,
}

#[derive(Clone)]
pub struct OfferVar {
    pub offer_type: FpVar<Fr>,
    pub offer_id: FpVar<Fr>,
    pub account_index: FpVar<Fr>,
    pub nft_index: FpVar<Fr>,
    pub asset_id: FpVar<Fr>,
    pub packed_amount: FpVar<Fr>,
    pub listed_at: FpVar<Fr>,
    pub expired_at: FpVar<Fr>,
    pub protocol_rate: FpVar<Fr>,
    pub channel_account_index: FpVar<Fr>,
    pub channel_rate: FpVar<Fr>,
    pub sig: SignatureVar,
}

impl OfferVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        offer: &OfferTx,
    ) -> Result<Self, SynthesisError> {
        let fp = |v: u64| -> Fr { Fr::from(v) };
        Ok(Self {
            offer_type: FpVar::new_witness(cs.clone(), || Ok(fp(offer.offer_type)))?,
            offer_id: FpVar::new_witness(cs.clone(), || Ok(fp(offer.offer_id)))?,
            account_index: FpVar::new_witness(cs.clone(), || Ok(fp(offer.account_index)))?,
            nft_index: FpVar::new_witness(cs.clone(), || Ok(fp(offer.nft_index)))?,
            asset_id: FpVar::new_witness(cs.clone(), || Ok(fp(offer.asset_id)))?,
            packed_amount: FpVar::new_witness(cs.clone(), || Ok(fp(offer.packed_amount)))?,
            listed_at: FpVar::new_witness(cs.clone(), || Ok(fp(offer.listed_at)))?,
            expired_at: FpVar::new_witness(cs.clone(), || Ok(fp(offer.expired_at)))?,
            protocol_rate: FpVar::new_witness(cs.clone(), || Ok(fp(offer.protocol_rate)))?,
            channel_account_index: FpVar::new_witness(cs.clone(), || {
                Ok(fp(offer.channel_account_index))
            })?,
            channel_rate: FpVar::new_witness(cs.clone(), || Ok(fp(offer.channel_rate)))?,
            sig: SignatureVar::new_witness(cs, &offer.sig)?,
        })
    }
}

/// Hash an offer for signing, in circuit.
pub fn signing_hash_var(
    cs: ConstraintSystemRef<Fr>,
    offer: &OfferVar,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_vars(
        cs,
        &[
            FpVar::constant(Fr::from(CHAIN_ID)),
            offer.offer_type.clone(),
            offer.offer_id.clone(),
            offer.account_index.clone(),
            offer.nft_index.clone(),
            offer.asset_id.clone(),
            offer.packed_amount.clone(),
            offer.listed_at.clone(),
            offer.expired_at.clone(),
            offer.protocol_rate.clone(),
            offer.channel_account_index.clone(),
            offer.channel_rate.clone(),
        ],
    )
}

/// Native mirror of [`signing_hash_var`].
pub fn signing_hash(offer: &OfferTx) -> Fr {
    hash(&[
        Fr::from(CHAIN_ID),
        Fr::from(offer.offer_type),
        Fr::from(offer.offer_id),
        Fr::from(offer.account_index),
        Fr::from(offer.nft_index),
        Fr::from(offer.asset_id),
        Fr::from(offer.packed_amount),
        Fr::from(offer.listed_at),
        Fr::from(offer.expired_at),
        Fr::from(offer.protocol_rate),
        Fr::from(offer.channel_account_index),
        Fr::from(offer.channel_rate),
    ])
}

/// Maker-side signing of an offer, native.
pub fn sign_offer(key: Fr, offer: &OfferTx) -> SignatureWitness {
    sign(key, signing_hash(offer))
}

/// Split an offer id into (bitmap asset position, bit position).
/// The decomposition is also the 24-bit range check.
pub fn decode_offer_id_var(
    cs: ConstraintSystemRef<Fr>,
    offer_id: &FpVar<Fr>,
) -> Result<(FpVar<Fr>, FpVar<Fr>), SynthesisError> {
    let bits = to_bits_fixed(cs, offer_id, OFFER_ID_BITS)?;
    let bit_pos = from_bits(&bits[..BIT_POS_BITS]);
    let asset_position = from_bits(&bits[BIT_POS_BITS..]);
    Ok((asset_position, bit_pos))
}

/// Native mirror of [`decode_offer_id_var`].
pub fn decode_offer_id(offer_id: u64) -> WitnessResult<(u64, u64)> {
    if offer_id >= 1 << OFFER_ID_BITS {
        return Err(WitnessError::InvalidOfferId(offer_id));
    }
    Ok((
        offer_id >> BIT_POS_BITS,
        offer_id & ((1 << BIT_POS_BITS) - 1),
    ))
}

/// Check the offer's bit is clear and return the bitmap with it set.
/// Enforcement is gated; the returned bitmap is only meaningful (and only
/// applied) under the same flag.
pub fn consume_offer_bit(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    bitmap: &FpVar<Fr>,
    bit_pos: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let bits = to_bits_fixed(cs.clone(), bitmap, OFFERS_PER_ASSET)?;

    let mut new_bitmap = FpVar::<Fr>::zero();
    let mut coeff = Fr::ONE;
    for (j, bit) in bits.iter().enumerate() {
        let is_target = bit_pos.is_eq(&FpVar::constant(Fr::from(j as u64)))?;
        let gate = and(flag, &is_target)?;
        let bit_fp = FpVar::from(bit.clone());
        bit_fp.conditional_enforce_equal(&FpVar::zero(), &gate)?;

        // The target bit is known clear, so addition sets it.
        let new_bit = bit_fp + indicator(&is_target);
        new_bitmap += new_bit * FpVar::constant(coeff);
        coeff.double_in_place();
    }
    Ok(new_bitmap)
}

/// Offer-level checks shared by both sides of a match: the witnessed
/// account is the offer's maker, the offer has not expired, and the maker
/// signed it unless the maker is the transaction submitter (whose own
/// signature already covers the whole match).
pub fn verify_offer(
    cs: ConstraintSystemRef<Fr>,
    flag: &Boolean<Fr>,
    offer: &OfferVar,
    maker: &AccountVar,
    submitter_index: &FpVar<Fr>,
    block_created_at: &FpVar<Fr>,
) -> Result<(), SynthesisError> {
    enforce_equal_if(flag, &maker.account_index, &offer.account_index)?;
    enforce_le_if(flag, block_created_at, &offer.expired_at)?;

    let maker_is_submitter = offer.account_index.is_eq(submitter_index)?;
    let needs_sig = and(flag, &not(&maker_is_submitter)?)?;
    let message = signing_hash_var(cs.clone(), offer)?;
    verify_signature(cs, &needs_sig, &maker.pub_key, &message, &offer.sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_decode_offer_id() {
        // id 300 = asset position 2, bit 44.
        assert_eq!(decode_offer_id(300).unwrap(), (2, 44));
        assert_eq!(decode_offer_id(0).unwrap(), (0, 0));
        assert!(decode_offer_id(1 << OFFER_ID_BITS).is_err());

        let cs = ConstraintSystem::<Fr>::new_ref();
        let id = FpVar::new_witness(cs.clone(), || Ok(Fr::from(300u64))).unwrap();
        let (pos, bit) = decode_offer_id_var(cs.clone(), &id).unwrap();
        assert_eq!(pos.value().unwrap(), Fr::from(2u64));
        assert_eq!(bit.value().unwrap(), Fr::from(44u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_consume_clear_bit() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        // Bits 0 and 5 already consumed.
        let bitmap = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0b100001u64))).unwrap();
        let bit_pos = FpVar::new_witness(cs.clone(), || Ok(Fr::from(3u64))).unwrap();

        let updated = consume_offer_bit(cs.clone(), &flag, &bitmap, &bit_pos).unwrap();
        assert_eq!(updated.value().unwrap(), Fr::from(0b101001u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_consume_set_bit_fails() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let bitmap = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0b1000u64))).unwrap();
        let bit_pos = FpVar::new_witness(cs.clone(), || Ok(Fr::from(3u64))).unwrap();

        let _ = consume_offer_bit(cs.clone(), &flag, &bitmap, &bit_pos).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_consume_gated_off_ignores_set_bit() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let flag = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let bitmap = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0b1000u64))).unwrap();
        let bit_pos = FpVar::new_witness(cs.clone(), || Ok(Fr::from(3u64))).unwrap();

        let _ = consume_offer_bit(cs.clone(), &flag, &bitmap, &bit_pos).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
