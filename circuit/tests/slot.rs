//! End-to-end slot proofs: native ledger assembles the witness, the
//! circuit replays it against the committed roots.

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use num_bigint::BigUint;

use rollup_circuit::builder::LedgerState;
use rollup_circuit::gadgets::sig::derive_pub_key;
use rollup_circuit::packed::{pack_amount, pack_fee};
use rollup_circuit::tx::atomic_match::AtomicMatchTx;
use rollup_circuit::tx::cancel_offer::CancelOfferTx;
use rollup_circuit::tx::create_collection::CreateCollectionTx;
use rollup_circuit::tx::deposit::DepositTx;
use rollup_circuit::tx::deposit_nft::DepositNftTx;
use rollup_circuit::tx::full_exit::FullExitTx;
use rollup_circuit::tx::full_exit_nft::FullExitNftTx;
use rollup_circuit::tx::mint_nft::MintNftTx;
use rollup_circuit::tx::offer::{sign_offer, OfferTx, OFFER_TYPE_BUY, OFFER_TYPE_SELL};
use rollup_circuit::tx::register::RegisterTx;
use rollup_circuit::tx::transfer::TransferTx;
use rollup_circuit::tx::transfer_nft::TransferNftTx;
use rollup_circuit::tx::withdraw::WithdrawTx;
use rollup_circuit::tx::withdraw_nft::WithdrawNftTx;
use rollup_circuit::TxCircuit;

const BLOCK_TIME: u64 = 100;

fn is_satisfied(circuit: TxCircuit) -> bool {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.generate_constraints(cs.clone()).unwrap();
    cs.is_satisfied().unwrap()
}

fn funded_ledger(sender_key: Fr) -> LedgerState {
    let mut ledger = LedgerState::new();
    ledger
        .register_account(1, Fr::from(1001u64), derive_pub_key(sender_key))
        .unwrap();
    ledger
        .register_account(2, Fr::from(1002u64), Fr::from(7u64))
        .unwrap();
    ledger.credit(1, 3, Fr::from(500u64)).unwrap();
    ledger.credit(1, 0, Fr::from(50u64)).unwrap();
    ledger
}

fn transfer_tx() -> TransferTx {
    TransferTx {
        from_account_index: 1,
        to_account_index: 2,
        to_name_hash: Fr::from(1002u64),
        asset_id: 3,
        packed_amount: pack_amount(&BigUint::from(100u64)).unwrap(),
        gas_fee_asset_id: 0,
        packed_fee: pack_fee(&BigUint::from(10u64)).unwrap(),
        call_data_hash: Fr::from(0u64),
    }
}

#[test]
fn empty_slot_proves() {
    let ledger = LedgerState::new();
    let w = ledger.assemble_empty();
    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn transfer_proves_and_moves_state() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);
    let root_before = ledger.state_root();

    let w = ledger.assemble_transfer(transfer_tx(), sk, 9999).unwrap();
    assert_eq!(w.state_root_before, root_before);
    assert_eq!(w.state_root_after, ledger.state_root());
    assert_eq!(ledger.balance(1, 3), Fr::from(400u64));
    assert_eq!(ledger.balance(2, 3), Fr::from(100u64));
    assert_eq!(ledger.nonce(1), 1);

    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn consecutive_slots_chain_roots() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let w1 = ledger.assemble_transfer(transfer_tx(), sk, 9999).unwrap();
    let mut second = transfer_tx();
    second.packed_amount = pack_amount(&BigUint::from(25u64)).unwrap();
    let w2 = ledger.assemble_transfer(second, sk, 9999).unwrap();

    assert_eq!(w1.state_root_after, w2.state_root_before);
    assert!(is_satisfied(TxCircuit::new(w1, BLOCK_TIME)));
    assert!(is_satisfied(TxCircuit::new(w2, BLOCK_TIME)));
}

#[test]
fn deposit_proves_and_binds_name() {
    let mut ledger = LedgerState::new();
    let w = ledger
        .assemble_deposit(DepositTx {
            account_index: 5,
            name_hash: Fr::from(777u64),
            asset_id: 2,
            amount: Fr::from(1_000_000u64),
        })
        .unwrap();

    assert_eq!(ledger.balance(5, 2), Fr::from(1_000_000u64));
    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

/// Marketplace fixture: seller 1 owns NFT 4 (creator 3, 5% royalty),
/// buyer 2 holds the traded asset, submitter 4 holds gas.
fn market() -> (LedgerState, Fr, Fr, Fr) {
    let sk_seller = Fr::from(11u64);
    let sk_buyer = Fr::from(22u64);
    let sk_submitter = Fr::from(44u64);
    let mut ledger = LedgerState::new();
    ledger
        .register_account(1, Fr::from(1001u64), derive_pub_key(sk_seller))
        .unwrap();
    ledger
        .register_account(2, Fr::from(1002u64), derive_pub_key(sk_buyer))
        .unwrap();
    ledger
        .register_account(4, Fr::from(1004u64), derive_pub_key(sk_submitter))
        .unwrap();
    ledger.credit(2, 3, Fr::from(100_000u64)).unwrap();
    ledger.credit(4, 0, Fr::from(100u64)).unwrap();
    ledger
        .assemble_deposit_nft(DepositNftTx {
            account_index: 1,
            name_hash: Fr::from(1001u64),
            nft_index: 4,
            creator_account_index: 3,
            content_hash: Fr::from(777u64),
            royalty_rate: 500,
            collection_id: 0,
        })
        .unwrap();
    (ledger, sk_seller, sk_buyer, sk_submitter)
}

/// 10_000 of asset 3 for NFT 4, 1% protocol, 2%/1.5% channel cuts.
fn match_tx(sk_seller: Fr, sk_buyer: Fr) -> AtomicMatchTx {
    let mut buy = OfferTx {
        offer_type: OFFER_TYPE_BUY,
        offer_id: (5 << 7) | 3,
        account_index: 2,
        nft_index: 4,
        asset_id: 3,
        packed_amount: pack_amount(&BigUint::from(10_000u64)).unwrap(),
        listed_at: 0,
        expired_at: 9999,
        protocol_rate: 100,
        channel_account_index: 5,
        channel_rate: 200,
        sig: Default::default(),
    };
    buy.sig = sign_offer(sk_buyer, &buy);
    let mut sell = OfferTx {
        offer_type: OFFER_TYPE_SELL,
        offer_id: (6 << 7) | 9,
        account_index: 1,
        nft_index: 4,
        asset_id: 3,
        packed_amount: pack_amount(&BigUint::from(10_000u64)).unwrap(),
        listed_at: 0,
        expired_at: 9999,
        protocol_rate: 100,
        channel_account_index: 6,
        channel_rate: 150,
        sig: Default::default(),
    };
    sell.sig = sign_offer(sk_seller, &sell);
    AtomicMatchTx {
        account_index: 4,
        buy_offer: buy,
        sell_offer: sell,
        protocol_account_index: 7,
        gas_fee_asset_id: 0,
        packed_fee: pack_fee(&BigUint::from(10u64)).unwrap(),
    }
}

#[test]
fn register_proves() {
    let mut ledger = LedgerState::new();
    let w = ledger
        .assemble_register(RegisterTx {
            account_index: 3,
            name_hash: Fr::from(1003u64),
            pub_key: Fr::from(9u64),
        })
        .unwrap();
    assert_ne!(w.state_root_before, w.state_root_after);
    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn withdraw_proves_without_consuming_nonce() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let w = ledger
        .assemble_withdraw(
            WithdrawTx {
                account_index: 1,
                to_address: Fr::from(999u64),
                asset_id: 3,
                amount: Fr::from(200u64),
                gas_fee_asset_id: 0,
                packed_fee: pack_fee(&BigUint::from(10u64)).unwrap(),
            },
            sk,
            9999,
        )
        .unwrap();

    assert_eq!(ledger.balance(1, 3), Fr::from(300u64));
    assert_eq!(ledger.balance(1, 0), Fr::from(40u64));
    assert_eq!(ledger.nonce(1), 0);
    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn nft_lifecycle_proves() {
    let sk_creator = Fr::from(11u64);
    let sk_holder = Fr::from(22u64);
    let mut ledger = LedgerState::new();
    ledger
        .register_account(1, Fr::from(1001u64), derive_pub_key(sk_creator))
        .unwrap();
    ledger
        .register_account(2, Fr::from(1002u64), derive_pub_key(sk_holder))
        .unwrap();
    ledger.credit(1, 0, Fr::from(1000u64)).unwrap();
    ledger.credit(2, 0, Fr::from(100u64)).unwrap();

    let fee = pack_fee(&BigUint::from(10u64)).unwrap();
    let w1 = ledger
        .assemble_create_collection(
            CreateCollectionTx {
                account_index: 1,
                collection_id: 0,
                gas_fee_asset_id: 0,
                packed_fee: fee,
            },
            sk_creator,
            9999,
        )
        .unwrap();
    let w2 = ledger
        .assemble_mint_nft(
            MintNftTx {
                creator_account_index: 1,
                to_account_index: 2,
                to_name_hash: Fr::from(1002u64),
                nft_index: 9,
                content_hash: Fr::from(555u64),
                royalty_rate: 500,
                collection_id: 0,
                gas_fee_asset_id: 0,
                packed_fee: fee,
            },
            sk_creator,
            9999,
        )
        .unwrap();
    let w3 = ledger
        .assemble_transfer_nft(
            TransferNftTx {
                from_account_index: 2,
                to_account_index: 1,
                to_name_hash: Fr::from(1001u64),
                nft_index: 9,
                gas_fee_asset_id: 0,
                packed_fee: fee,
                call_data_hash: Fr::from(0u64),
            },
            sk_holder,
            9999,
        )
        .unwrap();
    let w4 = ledger
        .assemble_withdraw_nft(
            WithdrawNftTx {
                account_index: 1,
                nft_index: 9,
                to_address: Fr::from(888u64),
                gas_fee_asset_id: 0,
                packed_fee: fee,
            },
            sk_creator,
            9999,
        )
        .unwrap();

    assert_eq!(w1.state_root_after, w2.state_root_before);
    assert_eq!(w2.state_root_after, w3.state_root_before);
    assert_eq!(w3.state_root_after, w4.state_root_before);
    // Collection creation and mint consume nonces; the withdrawal does not.
    assert_eq!(ledger.nonce(1), 2);
    assert_eq!(ledger.nonce(2), 1);

    for w in [w1, w2, w3, w4] {
        assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
    }
}

#[test]
fn wrong_collection_id_does_not_prove() {
    let sk = Fr::from(11u64);
    let mut ledger = LedgerState::new();
    ledger
        .register_account(1, Fr::from(1001u64), derive_pub_key(sk))
        .unwrap();
    ledger.credit(1, 0, Fr::from(100u64)).unwrap();

    // The next collection id is 0, not 5.
    let w = ledger
        .assemble_create_collection(
            CreateCollectionTx {
                account_index: 1,
                collection_id: 5,
                gas_fee_asset_id: 0,
                packed_fee: 0,
            },
            sk,
            9999,
        )
        .unwrap();
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn atomic_match_proves_and_settles_cuts() {
    let (mut ledger, sk_seller, sk_buyer, sk_submitter) = market();
    let w = ledger
        .assemble_atomic_match(match_tx(sk_seller, sk_buyer), sk_submitter, 9999)
        .unwrap();

    // amount 10_000: protocol 100, royalty 500, buy channel 200, sell
    // channel 150.
    assert_eq!(ledger.balance(2, 3), Fr::from(89_200u64));
    assert_eq!(ledger.balance(1, 3), Fr::from(9_850u64));
    assert_eq!(ledger.balance(3, 3), Fr::from(500u64));
    assert_eq!(ledger.balance(5, 3), Fr::from(200u64));
    assert_eq!(ledger.balance(6, 3), Fr::from(150u64));
    assert_eq!(ledger.balance(7, 3), Fr::from(100u64));
    assert_eq!(ledger.balance(4, 0), Fr::from(90u64));
    assert_eq!(ledger.nonce(4), 1);

    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn matching_cancelled_offer_does_not_prove() {
    let (mut ledger, sk_seller, sk_buyer, sk_submitter) = market();

    let cancel = ledger
        .assemble_cancel_offer(
            CancelOfferTx {
                account_index: 2,
                offer_id: (5 << 7) | 3,
                gas_fee_asset_id: 0,
                packed_fee: 0,
            },
            sk_buyer,
            9999,
        )
        .unwrap();
    assert!(is_satisfied(TxCircuit::new(cancel, BLOCK_TIME)));

    // The buy offer's bitmap bit is consumed; the match cannot prove.
    let w = ledger
        .assemble_atomic_match(match_tx(sk_seller, sk_buyer), sk_submitter, 9999)
        .unwrap();
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn full_exit_drains_balance() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let w = ledger
        .assemble_full_exit(FullExitTx {
            account_index: 1,
            name_hash: Fr::from(1001u64),
            asset_id: 3,
        })
        .unwrap();

    assert_eq!(ledger.balance(1, 3), Fr::from(0u64));
    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn full_exit_nft_clears_leaf() {
    let (mut ledger, _, _, _) = market();

    let w = ledger
        .assemble_full_exit_nft(FullExitNftTx {
            account_index: 1,
            name_hash: Fr::from(1001u64),
            nft_index: 4,
        })
        .unwrap();
    assert!(is_satisfied(TxCircuit::new(w, BLOCK_TIME)));

    // The leaf is empty again: a fresh deposit into it proves.
    let w2 = ledger
        .assemble_deposit_nft(DepositNftTx {
            account_index: 2,
            name_hash: Fr::from(1002u64),
            nft_index: 4,
            creator_account_index: 3,
            content_hash: Fr::from(999u64),
            royalty_rate: 100,
            collection_id: 0,
        })
        .unwrap();
    assert!(is_satisfied(TxCircuit::new(w2, BLOCK_TIME)));
}

#[test]
fn stale_nonce_does_not_prove() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let mut w = ledger.assemble_transfer(transfer_tx(), sk, 9999).unwrap();
    w.nonce += 1;
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn wrong_signer_does_not_prove() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    // Signed with a key that does not match the sender's registered one.
    let w = ledger
        .assemble_transfer(transfer_tx(), Fr::from(43u64), 9999)
        .unwrap();
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn expired_transfer_does_not_prove() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let w = ledger.assemble_transfer(transfer_tx(), sk, 50).unwrap();
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn tampered_sibling_does_not_prove() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let mut w = ledger.assemble_transfer(transfer_tx(), sk, 9999).unwrap();
    w.account_proofs[0][0] += Fr::from(1u64);
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn out_of_range_account_index_does_not_prove() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    // A 17-bit index cannot decompose into the fixed-width path bits.
    let mut w = ledger.assemble_transfer(transfer_tx(), sk, 9999).unwrap();
    w.accounts_before[6].account_index = 1 << 16;
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}

#[test]
fn forged_after_root_does_not_prove() {
    let sk = Fr::from(42u64);
    let mut ledger = funded_ledger(sk);

    let mut w = ledger.assemble_transfer(transfer_tx(), sk, 9999).unwrap();
    w.state_root_after = w.state_root_before;
    assert!(!is_satisfied(TxCircuit::new(w, BLOCK_TIME)));
}
