//! Shared constants for the transaction slot circuit and the witness side.
//!
//! Tree depths bound every index: an index is valid iff it decomposes into
//! `depth` bits, and those bits double as the Merkle path bits.

pub const ACCOUNT_TREE_DEPTH: usize = 16;
pub const ASSET_TREE_DEPTH: usize = 8;
pub const NFT_TREE_DEPTH: usize = 16;

/// Role-tagged account slots carried per transaction.
pub const NB_ACCOUNTS_PER_TX: usize = 7;
/// Asset slots witnessed per account.
pub const NB_ASSETS_PER_ACCOUNT: usize = 2;
/// Gas-fee credit records emitted per transaction.
pub const NB_GAS_ASSETS_PER_TX: usize = 2;

/// Offer-cancellation bitmap width per asset slot.
pub const OFFERS_PER_ASSET: usize = 128;
/// Offer ids decompose into (asset slot, bit position) over this many bits.
pub const OFFER_ID_BITS: usize = 24;

/// Denominator for protocol/royalty rates (basis points).
pub const RATE_BASE: u64 = 10_000;

pub const CHAIN_ID: u64 = 1;

/// Field elements of pubdata emitted per transaction slot, tag first.
pub const PUB_DATA_ELEMS_PER_TX: usize = 6;

// Packed fixed-point widths. The exponent occupies the LOW bits.
pub const AMOUNT_MANTISSA_BITS: usize = 35;
pub const FEE_MANTISSA_BITS: usize = 11;
pub const EXPONENT_BITS: usize = 5;
pub const PACKED_AMOUNT_BITS: usize = AMOUNT_MANTISSA_BITS + EXPONENT_BITS;
pub const PACKED_FEE_BITS: usize = FEE_MANTISSA_BITS + EXPONENT_BITS;
/// Largest decimal exponent the codec ever produces (mantissa of 1 shifted
/// to the full amount range).
pub const MAX_AMOUNT_EXPONENT: u32 = 31;

// Transaction tags, matched against `tx_type` by field equality.
pub const TX_TYPE_EMPTY: u8 = 0;
pub const TX_TYPE_REGISTER: u8 = 1;
pub const TX_TYPE_DEPOSIT: u8 = 2;
pub const TX_TYPE_DEPOSIT_NFT: u8 = 3;
pub const TX_TYPE_TRANSFER: u8 = 4;
pub const TX_TYPE_WITHDRAW: u8 = 5;
pub const TX_TYPE_CREATE_COLLECTION: u8 = 6;
pub const TX_TYPE_MINT_NFT: u8 = 7;
pub const TX_TYPE_TRANSFER_NFT: u8 = 8;
pub const TX_TYPE_ATOMIC_MATCH: u8 = 9;
pub const TX_TYPE_CANCEL_OFFER: u8 = 10;
pub const TX_TYPE_WITHDRAW_NFT: u8 = 11;
pub const TX_TYPE_FULL_EXIT: u8 = 12;
pub const TX_TYPE_FULL_EXIT_NFT: u8 = 13;

pub const NB_TX_TYPES: usize = 14;

/// Fixed meaning of each of the 7 account slots.
pub mod roles {
    pub const SUBMITTER: usize = 0;
    /// Transfer/mint recipient, atomic-match buyer, exit owner.
    pub const COUNTERPARTY: usize = 1;
    pub const SELLER: usize = 2;
    pub const CREATOR: usize = 3;
    pub const BUY_CHANNEL: usize = 4;
    pub const SELL_CHANNEL: usize = 5;
    pub const PROTOCOL: usize = 6;
}
