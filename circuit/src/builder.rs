//! Native ledger state and witness assembly.
//!
//! `LedgerState` mirrors the two on-circuit trees plus the per-account
//! asset subtrees, and assembles one [`TxWitness`] per transaction. Proof
//! collection is interleaved with application in exactly the order the
//! circuit replays it: within a slot, asset position 0 is proven and
//! applied before position 1; account slots are proven against the root
//! chained through the slots before them.
//!
//! The builder is strict about what would make the witness unusable
//! (index bounds, balances going negative) and lenient about everything
//! the circuit itself rejects, such as a stale nonce or a bad signature.

use std::collections::HashMap;

use ark_bn254::Fr;
use num_bigint::BigUint;
use tracing::debug;

use crate::constants::{
    roles, ACCOUNT_TREE_DEPTH, ASSET_TREE_DEPTH, NB_ACCOUNTS_PER_TX, NB_ASSETS_PER_ACCOUNT,
    NFT_TREE_DEPTH, RATE_BASE, TX_TYPE_ATOMIC_MATCH, TX_TYPE_CANCEL_OFFER,
    TX_TYPE_CREATE_COLLECTION, TX_TYPE_DEPOSIT, TX_TYPE_DEPOSIT_NFT, TX_TYPE_FULL_EXIT,
    TX_TYPE_FULL_EXIT_NFT, TX_TYPE_MINT_NFT, TX_TYPE_REGISTER, TX_TYPE_TRANSFER,
    TX_TYPE_TRANSFER_NFT, TX_TYPE_WITHDRAW, TX_TYPE_WITHDRAW_NFT,
};
use crate::error::{Result, WitnessError};
use crate::gadgets::hash::hash;
use crate::gadgets::sig::sign;
use crate::packed::unpack;
use crate::tree::SparseMerkleTree;
use crate::tx::atomic_match::{self, AtomicMatchTx};
use crate::tx::cancel_offer::{self, CancelOfferTx};
use crate::tx::create_collection::{self, CreateCollectionTx};
use crate::tx::deposit::DepositTx;
use crate::tx::deposit_nft::DepositNftTx;
use crate::tx::full_exit::FullExitTx;
use crate::tx::full_exit_nft::FullExitNftTx;
use crate::tx::mint_nft::{self, MintNftTx};
use crate::tx::offer::decode_offer_id;
use crate::tx::register::RegisterTx;
use crate::tx::transfer::{self, TransferTx};
use crate::tx::transfer_nft::{self, TransferNftTx};
use crate::tx::withdraw::{self, WithdrawTx};
use crate::tx::withdraw_nft::{self, WithdrawNftTx};
use crate::witness::{
    empty_account_leaf, empty_nft_leaf, state_root, AccountWitness, AssetSlotWitness,
    NftWitness, TxWitness,
};

#[derive(Clone, Copy, Default)]
struct AccountMeta {
    name_hash: Fr,
    pub_key: Fr,
    nonce: u64,
    collection_nonce: u64,
}

/// What one account slot does to its two asset positions.
struct SlotSpec {
    account_index: u64,
    asset_ids: [u64; NB_ASSETS_PER_ACCOUNT],
    balance_deltas: [Fr; NB_ASSETS_PER_ACCOUNT],
    bitmap_updates: [Option<Fr>; NB_ASSETS_PER_ACCOUNT],
}

impl SlotSpec {
    fn passive(account_index: u64) -> Self {
        Self {
            account_index,
            asset_ids: [0; NB_ASSETS_PER_ACCOUNT],
            balance_deltas: [Fr::from(0u64); NB_ASSETS_PER_ACCOUNT],
            bitmap_updates: [None; NB_ASSETS_PER_ACCOUNT],
        }
    }
}

/// Scalar updates only the submitter slot may carry.
#[derive(Default)]
struct SubmitterUpdate {
    bump_nonce: bool,
    bump_collection_nonce: bool,
    /// Register: overwrite identity outright.
    set_identity: Option<(Fr, Fr)>,
    /// Deposits: bind the name hash only if the account is unbound.
    bind_name: Option<Fr>,
}

/// The full layer-2 ledger on the native side.
pub struct LedgerState {
    accounts: SparseMerkleTree,
    nfts: SparseMerkleTree,
    metas: HashMap<u64, AccountMeta>,
    asset_trees: HashMap<u64, SparseMerkleTree>,
    slots: HashMap<(u64, u64), (Fr, Fr)>,
    nft_data: HashMap<u64, NftWitness>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerState {
    pub fn new() -> Self {
        Self {
            accounts: SparseMerkleTree::new(ACCOUNT_TREE_DEPTH, empty_account_leaf()),
            nfts: SparseMerkleTree::new(NFT_TREE_DEPTH, empty_nft_leaf()),
            metas: HashMap::new(),
            asset_trees: HashMap::new(),
            slots: HashMap::new(),
            nft_data: HashMap::new(),
        }
    }

    pub fn account_root(&self) -> Fr {
        self.accounts.root()
    }

    pub fn nft_root(&self) -> Fr {
        self.nfts.root()
    }

    pub fn state_root(&self) -> Fr {
        state_root(self.account_root(), self.nft_root())
    }

    pub fn nonce(&self, account_index: u64) -> u64 {
        self.meta(account_index).nonce
    }

    pub fn balance(&self, account_index: u64, asset_id: u64) -> Fr {
        self.slot_values(account_index, asset_id).0
    }

    /// Bind an account leaf directly, bypassing witness assembly. Test and
    /// genesis setup.
    pub fn register_account(
        &mut self,
        account_index: u64,
        name_hash: Fr,
        pub_key: Fr,
    ) -> Result<()> {
        check_account_index(account_index)?;
        let mut meta = self.meta(account_index);
        meta.name_hash = name_hash;
        meta.pub_key = pub_key;
        self.metas.insert(account_index, meta);
        self.refresh_account_leaf(account_index);
        Ok(())
    }

    /// Credit a balance directly, bypassing witness assembly.
    pub fn credit(&mut self, account_index: u64, asset_id: u64, amount: Fr) -> Result<()> {
        check_account_index(account_index)?;
        check_asset_id(asset_id)?;
        let (balance, bitmap) = self.slot_values(account_index, asset_id);
        let balance = balance + amount;
        self.slots.insert((account_index, asset_id), (balance, bitmap));
        self.asset_tree_mut(account_index)
            .update(asset_id, hash(&[balance, bitmap]));
        self.refresh_account_leaf(account_index);
        Ok(())
    }

    /// Filler slot over the current roots.
    pub fn assemble_empty(&self) -> TxWitness {
        TxWitness::empty(self.account_root(), self.nft_root())
    }

    /// Registration: binds name and key to a fresh position. Layer-1
    /// originated, so no signature and no nonce.
    pub fn assemble_register(&mut self, tx: RegisterTx) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;

        let update = SubmitterUpdate {
            set_identity: Some((tx.name_hash, tx.pub_key)),
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![SlotSpec::passive(tx.account_index)], &update, 0, None);

        debug!(account_index = tx.account_index, "assembled register witness");

        Ok(TxWitness {
            tx_type: TX_TYPE_REGISTER,
            register: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Deposit: credits the balance and binds the name hash if the account
    /// has never been registered. No signature, no nonce.
    pub fn assemble_deposit(&mut self, tx: DepositTx) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_asset_id(tx.asset_id)?;

        let mut spec = SlotSpec::passive(tx.account_index);
        spec.asset_ids[0] = tx.asset_id;
        spec.balance_deltas[0] = tx.amount;

        let update = SubmitterUpdate {
            bind_name: Some(tx.name_hash),
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![spec], &update, 0, None);

        debug!(
            account_index = tx.account_index,
            asset_id = tx.asset_id,
            "assembled deposit witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_DEPOSIT,
            deposit: tx,
            ..self.frame_witness(frame)
        })
    }

    /// NFT deposit into an empty leaf. No signature, no nonce.
    pub fn assemble_deposit_nft(&mut self, tx: DepositNftTx) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_account_index(tx.creator_account_index)?;
        check_nft_index(tx.nft_index)?;

        let after = NftWitness {
            nft_index: tx.nft_index,
            creator_account_index: tx.creator_account_index,
            owner_account_index: tx.account_index,
            content_hash: tx.content_hash,
            royalty_rate: tx.royalty_rate,
            collection_id: tx.collection_id,
        };
        let update = SubmitterUpdate {
            bind_name: Some(tx.name_hash),
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(
            vec![SlotSpec::passive(tx.account_index)],
            &update,
            tx.nft_index,
            Some(after),
        );

        debug!(
            account_index = tx.account_index,
            nft_index = tx.nft_index,
            "assembled nft deposit witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_DEPOSIT_NFT,
            deposit_nft: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Transfer: debits amount and fee from the sender, credits the
    /// recipient, bumps the sender nonce, signs with the sender key.
    pub fn assemble_transfer(
        &mut self,
        tx: TransferTx,
        sender_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.from_account_index)?;
        check_account_index(tx.to_account_index)?;
        check_asset_id(tx.asset_id)?;
        check_asset_id(tx.gas_fee_asset_id)?;

        let amount = fr_from_big(&unpack(tx.packed_amount));
        let fee = fr_from_big(&unpack(tx.packed_fee));

        // The circuit checks the same bounds in sequence: amount against
        // position 0, fee against position 1 after position 0 applied.
        let mut available = big_from_fr(self.balance(tx.from_account_index, tx.asset_id));
        let amount_big = unpack(tx.packed_amount);
        if amount_big > available {
            return Err(WitnessError::InsufficientBalance {
                account: tx.from_account_index,
                asset_id: tx.asset_id,
            });
        }
        let mut fee_available =
            big_from_fr(self.balance(tx.from_account_index, tx.gas_fee_asset_id));
        if tx.gas_fee_asset_id == tx.asset_id {
            available -= &amount_big;
            fee_available = available;
        }
        if unpack(tx.packed_fee) > fee_available {
            return Err(WitnessError::InsufficientBalance {
                account: tx.from_account_index,
                asset_id: tx.gas_fee_asset_id,
            });
        }

        let nonce = self.nonce(tx.from_account_index);
        let signature = sign(sender_key, transfer::signing_hash(&tx, nonce, expired_at));

        let mut sender = SlotSpec::passive(tx.from_account_index);
        sender.asset_ids = [tx.asset_id, tx.gas_fee_asset_id];
        sender.balance_deltas = [-amount, -fee];
        let mut recipient = SlotSpec::passive(tx.to_account_index);
        recipient.asset_ids[0] = tx.asset_id;
        recipient.balance_deltas[0] = amount;

        let update = SubmitterUpdate {
            bump_nonce: true,
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![sender, recipient], &update, 0, None);

        debug!(
            from = tx.from_account_index,
            to = tx.to_account_index,
            asset_id = tx.asset_id,
            nonce,
            "assembled transfer witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_TRANSFER,
            nonce,
            expired_at,
            signature,
            transfer: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Withdrawal to layer 1 at full precision. Signed with the owner's
    /// current nonce but the nonce is not consumed, so a queued withdrawal
    /// survives unrelated transactions.
    pub fn assemble_withdraw(
        &mut self,
        tx: WithdrawTx,
        owner_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_asset_id(tx.asset_id)?;
        check_asset_id(tx.gas_fee_asset_id)?;

        let amount = big_from_fr(tx.amount);
        let mut available = big_from_fr(self.balance(tx.account_index, tx.asset_id));
        if amount > available {
            return Err(WitnessError::InsufficientBalance {
                account: tx.account_index,
                asset_id: tx.asset_id,
            });
        }
        let mut fee_available =
            big_from_fr(self.balance(tx.account_index, tx.gas_fee_asset_id));
        if tx.gas_fee_asset_id == tx.asset_id {
            available -= &amount;
            fee_available = available;
        }
        if unpack(tx.packed_fee) > fee_available {
            return Err(WitnessError::InsufficientBalance {
                account: tx.account_index,
                asset_id: tx.gas_fee_asset_id,
            });
        }
        let fee = fr_from_big(&unpack(tx.packed_fee));

        let nonce = self.nonce(tx.account_index);
        let signature = sign(owner_key, withdraw::signing_hash(&tx, nonce, expired_at));

        let mut owner = SlotSpec::passive(tx.account_index);
        owner.asset_ids = [tx.asset_id, tx.gas_fee_asset_id];
        owner.balance_deltas = [-tx.amount, -fee];
        let frame = self.run_slot(vec![owner], &SubmitterUpdate::default(), 0, None);

        debug!(
            account_index = tx.account_index,
            asset_id = tx.asset_id,
            "assembled withdraw witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_WITHDRAW,
            nonce,
            expired_at,
            signature,
            withdraw: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Collection creation: the current collection nonce becomes the new
    /// collection's id and is consumed alongside the account nonce.
    pub fn assemble_create_collection(
        &mut self,
        tx: CreateCollectionTx,
        creator_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_asset_id(tx.gas_fee_asset_id)?;

        let fee_big = unpack(tx.packed_fee);
        self.require_balance(tx.account_index, tx.gas_fee_asset_id, &fee_big)?;

        let nonce = self.nonce(tx.account_index);
        let signature = sign(
            creator_key,
            create_collection::signing_hash(&tx, nonce, expired_at),
        );

        let mut creator = SlotSpec::passive(tx.account_index);
        creator.asset_ids[0] = tx.gas_fee_asset_id;
        creator.balance_deltas[0] = -fr_from_big(&fee_big);

        let update = SubmitterUpdate {
            bump_nonce: true,
            bump_collection_nonce: true,
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![creator], &update, 0, None);

        debug!(
            account_index = tx.account_index,
            collection_id = tx.collection_id,
            "assembled create-collection witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_CREATE_COLLECTION,
            nonce,
            expired_at,
            signature,
            create_collection: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Mint into an empty NFT leaf under one of the creator's collections.
    pub fn assemble_mint_nft(
        &mut self,
        tx: MintNftTx,
        creator_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.creator_account_index)?;
        check_account_index(tx.to_account_index)?;
        check_nft_index(tx.nft_index)?;
        check_asset_id(tx.gas_fee_asset_id)?;

        let fee_big = unpack(tx.packed_fee);
        self.require_balance(tx.creator_account_index, tx.gas_fee_asset_id, &fee_big)?;

        let nonce = self.nonce(tx.creator_account_index);
        let signature = sign(creator_key, mint_nft::signing_hash(&tx, nonce, expired_at));

        let mut creator = SlotSpec::passive(tx.creator_account_index);
        creator.asset_ids[0] = tx.gas_fee_asset_id;
        creator.balance_deltas[0] = -fr_from_big(&fee_big);
        let recipient = SlotSpec::passive(tx.to_account_index);

        let after = NftWitness {
            nft_index: tx.nft_index,
            creator_account_index: tx.creator_account_index,
            owner_account_index: tx.to_account_index,
            content_hash: tx.content_hash,
            royalty_rate: tx.royalty_rate,
            collection_id: tx.collection_id,
        };
        let update = SubmitterUpdate {
            bump_nonce: true,
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![creator, recipient], &update, tx.nft_index, Some(after));

        debug!(
            creator = tx.creator_account_index,
            to = tx.to_account_index,
            nft_index = tx.nft_index,
            "assembled mint witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_MINT_NFT,
            nonce,
            expired_at,
            signature,
            mint_nft: tx,
            ..self.frame_witness(frame)
        })
    }

    /// NFT ownership transfer.
    pub fn assemble_transfer_nft(
        &mut self,
        tx: TransferNftTx,
        owner_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.from_account_index)?;
        check_account_index(tx.to_account_index)?;
        check_nft_index(tx.nft_index)?;
        check_asset_id(tx.gas_fee_asset_id)?;

        let fee_big = unpack(tx.packed_fee);
        self.require_balance(tx.from_account_index, tx.gas_fee_asset_id, &fee_big)?;

        let nonce = self.nonce(tx.from_account_index);
        let signature = sign(owner_key, transfer_nft::signing_hash(&tx, nonce, expired_at));

        let mut from = SlotSpec::passive(tx.from_account_index);
        from.asset_ids[0] = tx.gas_fee_asset_id;
        from.balance_deltas[0] = -fr_from_big(&fee_big);
        let to = SlotSpec::passive(tx.to_account_index);

        let mut after = self.nft_leaf(tx.nft_index);
        after.owner_account_index = tx.to_account_index;

        let update = SubmitterUpdate {
            bump_nonce: true,
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![from, to], &update, tx.nft_index, Some(after));

        debug!(
            from = tx.from_account_index,
            to = tx.to_account_index,
            nft_index = tx.nft_index,
            "assembled nft transfer witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_TRANSFER_NFT,
            nonce,
            expired_at,
            signature,
            transfer_nft: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Match a signed buy offer against a signed sell offer. All seven role
    /// slots are live: submitter pays the gas fee, the buyer funds the
    /// price plus every cut, the seller collects the price minus their
    /// channel's cut, and creator, channels and protocol collect theirs.
    pub fn assemble_atomic_match(
        &mut self,
        tx: AtomicMatchTx,
        submitter_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        let buy = tx.buy_offer.clone();
        let sell = tx.sell_offer.clone();

        check_account_index(tx.account_index)?;
        check_account_index(buy.account_index)?;
        check_account_index(sell.account_index)?;
        check_account_index(buy.channel_account_index)?;
        check_account_index(sell.channel_account_index)?;
        check_account_index(tx.protocol_account_index)?;
        check_asset_id(buy.asset_id)?;
        check_asset_id(tx.gas_fee_asset_id)?;
        check_nft_index(buy.nft_index)?;

        let (buy_pos, buy_bit) = decode_offer_id(buy.offer_id)?;
        let (sell_pos, sell_bit) = decode_offer_id(sell.offer_id)?;
        check_asset_id(buy_pos)?;
        check_asset_id(sell_pos)?;

        let nft = self.nft_leaf(buy.nft_index);
        let amount = unpack(buy.packed_amount);
        let cut = |rate: u64| -> BigUint { &amount * rate / RATE_BASE };
        let protocol_cut = cut(buy.protocol_rate);
        let royalty_cut = cut(nft.royalty_rate);
        let buy_channel_cut = cut(buy.channel_rate);
        let sell_channel_cut = cut(sell.channel_rate);
        if sell_channel_cut > amount {
            return Err(WitnessError::AmountOutOfRange {
                kind: "sell channel cut",
                value: sell_channel_cut.to_string(),
            });
        }

        let buyer_debit = &amount + &protocol_cut + &royalty_cut + &buy_channel_cut;
        self.require_balance(buy.account_index, buy.asset_id, &buyer_debit)?;
        let fee_big = unpack(tx.packed_fee);
        self.require_balance(tx.account_index, tx.gas_fee_asset_id, &fee_big)?;

        let nonce = self.nonce(tx.account_index);
        let signature = sign(
            submitter_key,
            atomic_match::signing_hash(&tx, nonce, expired_at),
        );

        let mut buyer_bitmap = big_from_fr(self.slot_values(buy.account_index, buy_pos).1);
        buyer_bitmap.set_bit(buy_bit, true);
        let mut seller_bitmap = big_from_fr(self.slot_values(sell.account_index, sell_pos).1);
        seller_bitmap.set_bit(sell_bit, true);

        let mut submitter = SlotSpec::passive(tx.account_index);
        submitter.asset_ids[0] = tx.gas_fee_asset_id;
        submitter.balance_deltas[0] = -fr_from_big(&fee_big);

        let mut buyer = SlotSpec::passive(buy.account_index);
        buyer.asset_ids = [buy.asset_id, buy_pos];
        buyer.balance_deltas[0] = -fr_from_big(&buyer_debit);
        buyer.bitmap_updates[1] = Some(fr_from_big(&buyer_bitmap));

        let mut seller = SlotSpec::passive(sell.account_index);
        seller.asset_ids = [buy.asset_id, sell_pos];
        seller.balance_deltas[0] = fr_from_big(&(&amount - &sell_channel_cut));
        seller.bitmap_updates[1] = Some(fr_from_big(&seller_bitmap));

        let mut creator = SlotSpec::passive(nft.creator_account_index);
        creator.asset_ids[0] = buy.asset_id;
        creator.balance_deltas[0] = fr_from_big(&royalty_cut);

        let mut buy_channel = SlotSpec::passive(buy.channel_account_index);
        buy_channel.asset_ids[0] = buy.asset_id;
        buy_channel.balance_deltas[0] = fr_from_big(&buy_channel_cut);

        let mut sell_channel = SlotSpec::passive(sell.channel_account_index);
        sell_channel.asset_ids[0] = buy.asset_id;
        sell_channel.balance_deltas[0] = fr_from_big(&sell_channel_cut);

        let mut protocol = SlotSpec::passive(tx.protocol_account_index);
        protocol.asset_ids[0] = buy.asset_id;
        protocol.balance_deltas[0] = fr_from_big(&protocol_cut);

        let mut after = nft.clone();
        after.owner_account_index = buy.account_index;

        let update = SubmitterUpdate {
            bump_nonce: true,
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(
            vec![
                submitter,
                buyer,
                seller,
                creator,
                buy_channel,
                sell_channel,
                protocol,
            ],
            &update,
            buy.nft_index,
            Some(after),
        );

        debug!(
            buyer = buy.account_index,
            seller = sell.account_index,
            nft_index = buy.nft_index,
            "assembled atomic match witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_ATOMIC_MATCH,
            nonce,
            expired_at,
            signature,
            atomic_match: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Cancellation burns the offer's bitmap bit so it can never match.
    pub fn assemble_cancel_offer(
        &mut self,
        tx: CancelOfferTx,
        maker_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_asset_id(tx.gas_fee_asset_id)?;
        let (asset_pos, bit) = decode_offer_id(tx.offer_id)?;
        check_asset_id(asset_pos)?;

        let fee_big = unpack(tx.packed_fee);
        self.require_balance(tx.account_index, tx.gas_fee_asset_id, &fee_big)?;

        let nonce = self.nonce(tx.account_index);
        let signature = sign(maker_key, cancel_offer::signing_hash(&tx, nonce, expired_at));

        let mut bitmap = big_from_fr(self.slot_values(tx.account_index, asset_pos).1);
        bitmap.set_bit(bit, true);

        let mut maker = SlotSpec::passive(tx.account_index);
        maker.asset_ids = [tx.gas_fee_asset_id, asset_pos];
        maker.balance_deltas[0] = -fr_from_big(&fee_big);
        maker.bitmap_updates[1] = Some(fr_from_big(&bitmap));

        let update = SubmitterUpdate {
            bump_nonce: true,
            ..SubmitterUpdate::default()
        };
        let frame = self.run_slot(vec![maker], &update, 0, None);

        debug!(
            account_index = tx.account_index,
            offer_id = tx.offer_id,
            "assembled cancel-offer witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_CANCEL_OFFER,
            nonce,
            expired_at,
            signature,
            cancel_offer: tx,
            ..self.frame_witness(frame)
        })
    }

    /// NFT withdrawal to layer 1: clears the leaf. Signed with the current
    /// nonce, nonce not consumed.
    pub fn assemble_withdraw_nft(
        &mut self,
        tx: WithdrawNftTx,
        owner_key: Fr,
        expired_at: u64,
    ) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_nft_index(tx.nft_index)?;
        check_asset_id(tx.gas_fee_asset_id)?;

        let fee_big = unpack(tx.packed_fee);
        self.require_balance(tx.account_index, tx.gas_fee_asset_id, &fee_big)?;

        let nonce = self.nonce(tx.account_index);
        let signature = sign(owner_key, withdraw_nft::signing_hash(&tx, nonce, expired_at));

        let mut owner = SlotSpec::passive(tx.account_index);
        owner.asset_ids[0] = tx.gas_fee_asset_id;
        owner.balance_deltas[0] = -fr_from_big(&fee_big);

        let frame = self.run_slot(
            vec![owner],
            &SubmitterUpdate::default(),
            tx.nft_index,
            Some(NftWitness::empty(tx.nft_index)),
        );

        debug!(
            account_index = tx.account_index,
            nft_index = tx.nft_index,
            "assembled nft withdraw witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_WITHDRAW_NFT,
            nonce,
            expired_at,
            signature,
            withdraw_nft: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Forced exit of an entire balance. No signature, no nonce, no fee.
    pub fn assemble_full_exit(&mut self, tx: FullExitTx) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_asset_id(tx.asset_id)?;

        let balance = self.balance(tx.account_index, tx.asset_id);
        let mut owner = SlotSpec::passive(tx.account_index);
        owner.asset_ids[0] = tx.asset_id;
        owner.balance_deltas[0] = -balance;
        let frame = self.run_slot(vec![owner], &SubmitterUpdate::default(), 0, None);

        debug!(
            account_index = tx.account_index,
            asset_id = tx.asset_id,
            "assembled full exit witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_FULL_EXIT,
            full_exit: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Forced exit of an NFT: clears the leaf. No signature, no nonce.
    pub fn assemble_full_exit_nft(&mut self, tx: FullExitNftTx) -> Result<TxWitness> {
        check_account_index(tx.account_index)?;
        check_nft_index(tx.nft_index)?;

        let frame = self.run_slot(
            vec![SlotSpec::passive(tx.account_index)],
            &SubmitterUpdate::default(),
            tx.nft_index,
            Some(NftWitness::empty(tx.nft_index)),
        );

        debug!(
            account_index = tx.account_index,
            nft_index = tx.nft_index,
            "assembled nft full exit witness"
        );

        Ok(TxWitness {
            tx_type: TX_TYPE_FULL_EXIT_NFT,
            full_exit_nft: tx,
            ..self.frame_witness(frame)
        })
    }

    /// Snapshot the roots, prove-and-apply every slot, prove-and-replace
    /// the NFT leaf.
    fn run_slot(
        &mut self,
        specs: Vec<SlotSpec>,
        update: &SubmitterUpdate,
        nft_index: u64,
        nft_after: Option<NftWitness>,
    ) -> Frame {
        let account_root_before = self.account_root();
        let nft_root_before = self.nft_root();
        let specs = with_padding(specs);
        let (accounts_before, account_proofs, asset_proofs) =
            self.collect_accounts(&specs, update);
        let (nft_before, nft_proof) = self.collect_nft(nft_index, nft_after);
        Frame {
            account_root_before,
            nft_root_before,
            accounts_before,
            account_proofs,
            asset_proofs,
            nft_before,
            nft_proof,
        }
    }

    /// Wrap a completed frame into a witness; the payload fields are filled
    /// in by the caller via struct update.
    fn frame_witness(&self, frame: Frame) -> TxWitness {
        TxWitness {
            account_root_before: frame.account_root_before,
            accounts_before: frame.accounts_before,
            account_proofs: frame.account_proofs,
            asset_proofs: frame.asset_proofs,
            nft_root_before: frame.nft_root_before,
            nft_before: frame.nft_before,
            nft_proof: frame.nft_proof,
            state_root_before: state_root(frame.account_root_before, frame.nft_root_before),
            state_root_after: self.state_root(),
            ..TxWitness::empty(frame.account_root_before, frame.nft_root_before)
        }
    }

    fn require_balance(&self, account: u64, asset_id: u64, needed: &BigUint) -> Result<()> {
        if *needed > big_from_fr(self.balance(account, asset_id)) {
            return Err(WitnessError::InsufficientBalance { account, asset_id });
        }
        Ok(())
    }

    fn nft_leaf(&self, nft_index: u64) -> NftWitness {
        self.nft_data
            .get(&nft_index)
            .cloned()
            .unwrap_or_else(|| NftWitness::empty(nft_index))
    }

    fn meta(&self, account_index: u64) -> AccountMeta {
        self.metas
            .get(&account_index)
            .copied()
            .unwrap_or_default()
    }

    fn slot_values(&self, account_index: u64, asset_id: u64) -> (Fr, Fr) {
        self.slots
            .get(&(account_index, asset_id))
            .copied()
            .unwrap_or((Fr::from(0u64), Fr::from(0u64)))
    }

    fn asset_tree_mut(&mut self, account_index: u64) -> &mut SparseMerkleTree {
        self.asset_trees.entry(account_index).or_insert_with(|| {
            SparseMerkleTree::new(ASSET_TREE_DEPTH, AssetSlotWitness::default().leaf_hash())
        })
    }

    fn refresh_account_leaf(&mut self, account_index: u64) {
        let asset_root = self.asset_tree_mut(account_index).root();
        let meta = self.meta(account_index);
        let leaf = hash(&[
            meta.name_hash,
            meta.pub_key,
            Fr::from(meta.nonce),
            Fr::from(meta.collection_nonce),
            asset_root,
        ]);
        self.accounts.update(account_index, leaf);
    }

    /// Prove and apply all 7 account slots in circuit order.
    fn collect_accounts(
        &mut self,
        specs: &[SlotSpec],
        update: &SubmitterUpdate,
    ) -> (Vec<AccountWitness>, Vec<Vec<Fr>>, Vec<Vec<Vec<Fr>>>) {
        let mut accounts_before = Vec::with_capacity(NB_ACCOUNTS_PER_TX);
        let mut account_proofs = Vec::with_capacity(NB_ACCOUNTS_PER_TX);
        let mut asset_proofs = Vec::with_capacity(NB_ACCOUNTS_PER_TX);

        for (i, spec) in specs.iter().enumerate() {
            let idx = spec.account_index;
            let meta = self.meta(idx);
            let asset_root_before = self.asset_tree_mut(idx).root();
            account_proofs.push(self.accounts.sibling_path(idx));

            let mut assets = Vec::with_capacity(NB_ASSETS_PER_ACCOUNT);
            let mut paths = Vec::with_capacity(NB_ASSETS_PER_ACCOUNT);
            for j in 0..NB_ASSETS_PER_ACCOUNT {
                let asset_id = spec.asset_ids[j];
                let (balance, bitmap) = self.slot_values(idx, asset_id);
                paths.push(self.asset_tree_mut(idx).sibling_path(asset_id));
                assets.push(AssetSlotWitness {
                    asset_id,
                    balance,
                    offer_bitmap: bitmap,
                });

                let balance = balance + spec.balance_deltas[j];
                let bitmap = spec.bitmap_updates[j].unwrap_or(bitmap);
                self.slots.insert((idx, asset_id), (balance, bitmap));
                self.asset_tree_mut(idx)
                    .update(asset_id, hash(&[balance, bitmap]));
            }
            asset_proofs.push(paths);

            accounts_before.push(AccountWitness {
                account_index: idx,
                name_hash: meta.name_hash,
                pub_key: meta.pub_key,
                nonce: meta.nonce,
                collection_nonce: meta.collection_nonce,
                asset_root: asset_root_before,
                assets,
            });

            let mut meta_after = meta;
            if i == roles::SUBMITTER {
                if update.bump_nonce {
                    meta_after.nonce += 1;
                }
                if update.bump_collection_nonce {
                    meta_after.collection_nonce += 1;
                }
                if let Some((name_hash, pub_key)) = update.set_identity {
                    meta_after.name_hash = name_hash;
                    meta_after.pub_key = pub_key;
                }
                if let Some(name_hash) = update.bind_name {
                    if meta.name_hash == Fr::from(0u64) {
                        meta_after.name_hash = name_hash;
                    }
                }
            }
            self.metas.insert(idx, meta_after);
            self.refresh_account_leaf(idx);
        }

        (accounts_before, account_proofs, asset_proofs)
    }

    /// Prove the NFT leaf, then replace it if the transaction does.
    fn collect_nft(&mut self, nft_index: u64, after: Option<NftWitness>) -> (NftWitness, Vec<Fr>) {
        let before = self.nft_leaf(nft_index);
        let path = self.nfts.sibling_path(nft_index);

        if let Some(after) = after {
            self.nfts.update(nft_index, after.leaf_hash());
            self.nft_data.insert(nft_index, after);
        }
        (before, path)
    }
}

/// The tree-facing half of one assembled slot, before the payload fields
/// are filled in.
struct Frame {
    account_root_before: Fr,
    nft_root_before: Fr,
    accounts_before: Vec<AccountWitness>,
    account_proofs: Vec<Vec<Fr>>,
    asset_proofs: Vec<Vec<Vec<Fr>>>,
    nft_before: NftWitness,
    nft_proof: Vec<Fr>,
}

/// Fill unused roles with empty accounts at the top of the index space;
/// their slots prove and re-write the untouched default leaves.
fn with_padding(mut specs: Vec<SlotSpec>) -> Vec<SlotSpec> {
    let mut next = (1u64 << ACCOUNT_TREE_DEPTH) - 1;
    while specs.len() < NB_ACCOUNTS_PER_TX {
        debug_assert!(specs.iter().all(|s| s.account_index != next));
        specs.push(SlotSpec::passive(next));
        next -= 1;
    }
    specs
}

fn check_account_index(index: u64) -> Result<()> {
    let max = (1u64 << ACCOUNT_TREE_DEPTH) - 1;
    if index > max {
        return Err(WitnessError::IndexOutOfRange {
            tree: "account",
            index,
            max,
        });
    }
    Ok(())
}

fn check_asset_id(asset_id: u64) -> Result<()> {
    let max = (1u64 << ASSET_TREE_DEPTH) - 1;
    if asset_id > max {
        return Err(WitnessError::IndexOutOfRange {
            tree: "asset",
            index: asset_id,
            max,
        });
    }
    Ok(())
}

fn check_nft_index(index: u64) -> Result<()> {
    let max = (1u64 << NFT_TREE_DEPTH) - 1;
    if index > max {
        return Err(WitnessError::IndexOutOfRange {
            tree: "nft",
            index,
            max,
        });
    }
    Ok(())
}

fn big_from_fr(value: Fr) -> BigUint {
    value.into()
}

fn fr_from_big(value: &BigUint) -> Fr {
    Fr::from(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gadgets::sig::derive_pub_key;
    use crate::packed::pack_amount;
    use crate::tree::SparseMerkleTree;

    #[test]
    fn test_fresh_ledger_matches_empty_trees() {
        let ledger = LedgerState::new();
        let accounts = SparseMerkleTree::new(ACCOUNT_TREE_DEPTH, empty_account_leaf());
        let nfts = SparseMerkleTree::new(NFT_TREE_DEPTH, empty_nft_leaf());
        assert_eq!(ledger.account_root(), accounts.root());
        assert_eq!(ledger.nft_root(), nfts.root());
    }

    #[test]
    fn test_transfer_moves_balances_and_bumps_nonce() {
        let mut ledger = LedgerState::new();
        let sk = Fr::from(42u64);
        ledger
            .register_account(1, Fr::from(1001u64), derive_pub_key(sk))
            .unwrap();
        ledger
            .register_account(2, Fr::from(1002u64), Fr::from(7u64))
            .unwrap();
        ledger.credit(1, 3, Fr::from(500u64)).unwrap();
        ledger.credit(1, 0, Fr::from(50u64)).unwrap();

        let tx = TransferTx {
            from_account_index: 1,
            to_account_index: 2,
            to_name_hash: Fr::from(1002u64),
            asset_id: 3,
            packed_amount: pack_amount(&BigUint::from(100u64)).unwrap(),
            gas_fee_asset_id: 0,
            packed_fee: crate::packed::pack_fee(&BigUint::from(10u64)).unwrap(),
            call_data_hash: Fr::from(0u64),
        };
        let w = ledger.assemble_transfer(tx, sk, 9999).unwrap();

        assert_eq!(ledger.balance(1, 3), Fr::from(400u64));
        assert_eq!(ledger.balance(1, 0), Fr::from(40u64));
        assert_eq!(ledger.balance(2, 3), Fr::from(100u64));
        assert_eq!(ledger.nonce(1), 1);
        assert_eq!(w.state_root_after, ledger.state_root());
        assert_ne!(w.state_root_before, w.state_root_after);
    }

    #[test]
    fn test_transfer_rejects_overdraft() {
        let mut ledger = LedgerState::new();
        let sk = Fr::from(42u64);
        ledger
            .register_account(1, Fr::from(1001u64), derive_pub_key(sk))
            .unwrap();
        ledger.credit(1, 3, Fr::from(50u64)).unwrap();

        let tx = TransferTx {
            from_account_index: 1,
            to_account_index: 2,
            to_name_hash: Fr::from(0u64),
            asset_id: 3,
            packed_amount: pack_amount(&BigUint::from(100u64)).unwrap(),
            gas_fee_asset_id: 0,
            packed_fee: 0,
            call_data_hash: Fr::from(0u64),
        };
        let err = ledger.assemble_transfer(tx, sk, 9999).unwrap_err();
        assert_eq!(
            err,
            WitnessError::InsufficientBalance {
                account: 1,
                asset_id: 3
            }
        );
    }

    #[test]
    fn test_deposit_binds_name_once() {
        let mut ledger = LedgerState::new();
        let name = Fr::from(777u64);

        let w = ledger
            .assemble_deposit(DepositTx {
                account_index: 5,
                name_hash: name,
                asset_id: 2,
                amount: Fr::from(1000u64),
            })
            .unwrap();
        assert_eq!(w.accounts_before[0].name_hash, Fr::from(0u64));
        assert_eq!(ledger.balance(5, 2), Fr::from(1000u64));

        // A second deposit under a different name does not rebind.
        ledger
            .assemble_deposit(DepositTx {
                account_index: 5,
                name_hash: Fr::from(888u64),
                asset_id: 2,
                amount: Fr::from(1u64),
            })
            .unwrap();
        let w3 = ledger.assemble_empty();
        let _ = w3;
        assert_eq!(ledger.meta(5).name_hash, name);
    }

    #[test]
    fn test_index_bounds() {
        let mut ledger = LedgerState::new();
        let err = ledger
            .register_account(1 << ACCOUNT_TREE_DEPTH, Fr::from(1u64), Fr::from(1u64))
            .unwrap_err();
        assert!(matches!(err, WitnessError::IndexOutOfRange { tree: "account", .. }));

        let err = ledger.credit(1, 1 << ASSET_TREE_DEPTH, Fr::from(1u64)).unwrap_err();
        assert!(matches!(err, WitnessError::IndexOutOfRange { tree: "asset", .. }));
    }
}
