//! Packed fixed-point codec for balances and fees.
//!
//! A packed value is `mantissa * 10^exponent` stored as
//! `(mantissa << EXPONENT_BITS) | exponent`. Amounts carry a 35-bit
//! mantissa, fees an 11-bit one; both use a 5-bit exponent. Cleaning rounds
//! an arbitrary value DOWN to the nearest representable one by repeated
//! division by 10, so packing is lossy by design and the transaction must
//! carry the cleaned value.

use num_bigint::BigUint;
use once_cell::sync::Lazy;

use crate::constants::{
    AMOUNT_MANTISSA_BITS, EXPONENT_BITS, FEE_MANTISSA_BITS, MAX_AMOUNT_EXPONENT,
};
use crate::error::{Result, WitnessError};

static AMOUNT_MAX_MANTISSA: Lazy<BigUint> =
    Lazy::new(|| (BigUint::from(1u8) << AMOUNT_MANTISSA_BITS) - 1u8);
static FEE_MAX_MANTISSA: Lazy<BigUint> =
    Lazy::new(|| (BigUint::from(1u8) << FEE_MANTISSA_BITS) - 1u8);

fn reduce(value: &BigUint, max_mantissa: &BigUint) -> Result<(BigUint, u32)> {
    let mut mantissa = value.clone();
    let mut exponent = 0u32;
    while &mantissa > max_mantissa {
        if exponent == MAX_AMOUNT_EXPONENT {
            return Err(WitnessError::AmountOutOfRange {
                kind: "fixed-point",
                value: value.to_string(),
            });
        }
        mantissa /= 10u8;
        exponent += 1;
    }
    Ok((mantissa, exponent))
}

fn pow10(exponent: u32) -> BigUint {
    BigUint::from(10u8).pow(exponent)
}

/// Round an amount down to the nearest packable value.
pub fn clean_amount(value: &BigUint) -> Result<BigUint> {
    let (mantissa, exponent) = reduce(value, &AMOUNT_MAX_MANTISSA)?;
    Ok(mantissa * pow10(exponent))
}

/// Round a fee down to the nearest packable value.
pub fn clean_fee(value: &BigUint) -> Result<BigUint> {
    let (mantissa, exponent) = reduce(value, &FEE_MAX_MANTISSA)?;
    Ok(mantissa * pow10(exponent))
}

/// Pack an amount, rounding down to the nearest representable value the
/// same way [`clean_amount`] does: `unpack(pack(v)) == clean(v)`.
pub fn pack_amount(value: &BigUint) -> Result<u64> {
    let (mantissa, exponent) = reduce(value, &AMOUNT_MAX_MANTISSA)?;
    // mantissa fits in 35 bits after reduction, exponent in 5
    let mantissa: u64 = mantissa.try_into().map_err(|_| WitnessError::AmountOutOfRange {
        kind: "amount",
        value: value.to_string(),
    })?;
    Ok((mantissa << EXPONENT_BITS) | exponent as u64)
}

/// Pack a fee. Same rounding contract as [`pack_amount`].
pub fn pack_fee(value: &BigUint) -> Result<u64> {
    let (mantissa, exponent) = reduce(value, &FEE_MAX_MANTISSA)?;
    let mantissa: u64 = mantissa.try_into().map_err(|_| WitnessError::AmountOutOfRange {
        kind: "fee",
        value: value.to_string(),
    })?;
    Ok((mantissa << EXPONENT_BITS) | exponent as u64)
}

/// Decode a packed value back to its integer amount.
pub fn unpack(packed: u64) -> BigUint {
    let exponent = (packed & ((1 << EXPONENT_BITS) - 1)) as u32;
    let mantissa = packed >> EXPONENT_BITS;
    BigUint::from(mantissa) * pow10(exponent)
}

/// Largest representable amount: a full mantissa at the maximum exponent.
pub fn max_amount() -> BigUint {
    AMOUNT_MAX_MANTISSA.clone() * pow10(MAX_AMOUNT_EXPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_small_amounts_pack_exactly() {
        for v in [0u64, 1, 100, 999_999, (1 << 35) - 1] {
            let packed = pack_amount(&big(v)).unwrap();
            assert_eq!(unpack(packed), big(v));
        }
    }

    #[test]
    fn test_pack_rounds_down_like_clean() {
        // 36-bit value with a nonzero low digit: the last digit drops.
        let raw = big((1u64 << 36) + 7);
        let cleaned = clean_amount(&raw).unwrap();
        assert!(cleaned < raw);
        assert_eq!(unpack(pack_amount(&raw).unwrap()), cleaned);
        // Re-packing the cleaned value is exact.
        assert_eq!(unpack(pack_amount(&cleaned).unwrap()), cleaned);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let raw = BigUint::parse_bytes(b"123456789123456789123456789", 10).unwrap();
        let once = clean_amount(&raw).unwrap();
        let twice = clean_amount(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_max_amount_round_trips() {
        let max = max_amount();
        let packed = pack_amount(&max).unwrap();
        assert_eq!(unpack(packed), max);
        // One past the max exponent range fails.
        assert!(pack_amount(&(max * 10u8)).is_err());
    }

    #[test]
    fn test_fee_mantissa_is_narrower() {
        // 2^11 needs an exponent step for fees but not for amounts.
        let v = big(1 << 11);
        assert_eq!(unpack(pack_amount(&v).unwrap()), v);
        // 2048 rounds down to 204 * 10^1 in an 11-bit mantissa.
        assert_eq!(unpack(pack_fee(&v).unwrap()), big(2040));
        assert_eq!(clean_fee(&v).unwrap(), big(2040));
    }

    #[test]
    fn test_zero() {
        assert_eq!(pack_amount(&big(0)).unwrap(), 0);
        assert_eq!(unpack(0), big(0));
    }
}
