//! Error definitions for witness construction.
//!
//! Constraint violations are not errors: they surface as an unsatisfied
//! constraint system. This type covers the off-circuit side only — packing,
//! index bounds, and witness assembly.
use thiserror::Error;

/// Errors that can occur while assembling a transaction witness
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WitnessError {
    /// Amount exceeds the packed fixed-point range
    #[error("Amount out of range for {kind} packing: {value}")]
    AmountOutOfRange { kind: &'static str, value: String },

    /// Tree index exceeds the fixed depth of its tree
    #[error("Index {index} out of range for {tree} tree (max {max})")]
    IndexOutOfRange {
        tree: &'static str,
        index: u64,
        max: u64,
    },

    /// Offer id does not decompose into (asset slot, bit position)
    #[error("Invalid offer id: {0}")]
    InvalidOfferId(u64),

    /// Transaction tag outside the known set
    #[error("Unknown transaction type: {0}")]
    UnknownTxType(u8),

    /// Account referenced by the transaction is missing from the state
    #[error("Account {0} not present in state")]
    MissingAccount(u64),

    /// Balance would go negative when applying the transaction
    #[error("Insufficient balance for account {account}, asset {asset_id}")]
    InsufficientBalance { account: u64, asset_id: u64 },
}

/// Result type for witness construction
pub type Result<T> = std::result::Result<T, WitnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WitnessError::IndexOutOfRange {
            tree: "account",
            index: 70000,
            max: 65535,
        };
        assert_eq!(
            err.to_string(),
            "Index 70000 out of range for account tree (max 65535)"
        );

        let err = WitnessError::UnknownTxType(77);
        assert_eq!(err.to_string(), "Unknown transaction type: 77");
    }

    #[test]
    fn test_error_equality() {
        let err1 = WitnessError::InvalidOfferId(300);
        let err2 = WitnessError::InvalidOfferId(300);
        assert_eq!(err1, err2);
    }
}
