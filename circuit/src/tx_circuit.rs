//! The transaction-slot circuit.
//!
//! Proves that applying one (possibly empty) transaction to the committed
//! ledger state yields the claimed post-state commitment.
//!
//! Public Inputs (3 field elements, order matters for verifier):
//! 1. state_root_before - Poseidon(account_root, nft_root) before the slot
//! 2. state_root_after  - the same commitment after the slot
//! 3. block_created_at  - block timestamp, bounds tx and offer expiry
//!
//! Every transaction kind's checks and deltas are synthesized for every
//! slot; the kind indicators (one-hot over the tag) switch enforcement on
//! and select the active kind's deltas, so the constraint shape is
//! independent of the witness.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::constants::{
    roles, ACCOUNT_TREE_DEPTH, ASSET_TREE_DEPTH, NB_ACCOUNTS_PER_TX, NB_ASSETS_PER_ACCOUNT,
    NFT_TREE_DEPTH, PUB_DATA_ELEMS_PER_TX, TX_TYPE_ATOMIC_MATCH, TX_TYPE_CANCEL_OFFER,
    TX_TYPE_CREATE_COLLECTION, TX_TYPE_DEPOSIT, TX_TYPE_DEPOSIT_NFT, TX_TYPE_EMPTY,
    TX_TYPE_FULL_EXIT, TX_TYPE_FULL_EXIT_NFT, TX_TYPE_MINT_NFT, TX_TYPE_REGISTER,
    TX_TYPE_TRANSFER, TX_TYPE_TRANSFER_NFT, TX_TYPE_WITHDRAW, TX_TYPE_WITHDRAW_NFT,
};
use crate::deltas::{
    neutral_asset_deltas, neutral_gas_deltas, select_asset_deltas, select_gas_deltas,
    select_nft_delta, select_pubdata, GasDeltaVar, NftDeltaVar,
};
use crate::gadgets::compare::{
    and, any_of, enforce_equal_if, enforce_le_if, enforce_one_hot, indicator, not, or,
};
use crate::gadgets::hash::hash_vars;
use crate::gadgets::merkle::{index_to_path_bits, update_merkle_root, verify_merkle_proof};
use crate::gadgets::sig::verify_signature;
use crate::tree::SparseMerkleTree;
use crate::tx::{
    atomic_match, cancel_offer, create_collection, deposit, deposit_nft, full_exit,
    full_exit_nft, mint_nft, register, transfer, transfer_nft, withdraw, withdraw_nft,
    SlotContext,
};
use crate::vars::TxVars;
use crate::witness::{empty_account_leaf, empty_nft_leaf, TxWitness};

/// One boolean indicator per transaction tag, plus the derived gates.
struct TxFlags {
    is_empty: Boolean<Fr>,
    is_register: Boolean<Fr>,
    is_deposit: Boolean<Fr>,
    is_deposit_nft: Boolean<Fr>,
    is_transfer: Boolean<Fr>,
    is_withdraw: Boolean<Fr>,
    is_create_collection: Boolean<Fr>,
    is_mint_nft: Boolean<Fr>,
    is_transfer_nft: Boolean<Fr>,
    is_atomic_match: Boolean<Fr>,
    is_cancel_offer: Boolean<Fr>,
    is_withdraw_nft: Boolean<Fr>,
    is_full_exit: Boolean<Fr>,
    is_full_exit_nft: Boolean<Fr>,
    /// Layer-2 originated: nonce equality, nonce bump, expiry gate.
    is_layer2: Boolean<Fr>,
    /// Needs the submitter's signature over the selected signing hash.
    /// Strictly wider than `is_layer2`: withdrawals sign but are exempt
    /// from the nonce and expiry gates.
    requires_signature: Boolean<Fr>,
    /// 0/1: priority operation recorded on layer 1.
    is_onchain_op: FpVar<Fr>,
}

/// Derive all indicators from the tag. An unknown tag has no satisfying
/// assignment: the indicators would sum to zero.
fn derive_flags(tx_type: &FpVar<Fr>) -> Result<TxFlags, SynthesisError> {
    let is = |t: u8| tx_type.is_eq(&FpVar::constant(Fr::from(t as u64)));

    let is_empty = is(TX_TYPE_EMPTY)?;
    let is_register = is(TX_TYPE_REGISTER)?;
    let is_deposit = is(TX_TYPE_DEPOSIT)?;
    let is_deposit_nft = is(TX_TYPE_DEPOSIT_NFT)?;
    let is_transfer = is(TX_TYPE_TRANSFER)?;
    let is_withdraw = is(TX_TYPE_WITHDRAW)?;
    let is_create_collection = is(TX_TYPE_CREATE_COLLECTION)?;
    let is_mint_nft = is(TX_TYPE_MINT_NFT)?;
    let is_transfer_nft = is(TX_TYPE_TRANSFER_NFT)?;
    let is_atomic_match = is(TX_TYPE_ATOMIC_MATCH)?;
    let is_cancel_offer = is(TX_TYPE_CANCEL_OFFER)?;
    let is_withdraw_nft = is(TX_TYPE_WITHDRAW_NFT)?;
    let is_full_exit = is(TX_TYPE_FULL_EXIT)?;
    let is_full_exit_nft = is(TX_TYPE_FULL_EXIT_NFT)?;

    enforce_one_hot(&[
        is_empty.clone(),
        is_register.clone(),
        is_deposit.clone(),
        is_deposit_nft.clone(),
        is_transfer.clone(),
        is_withdraw.clone(),
        is_create_collection.clone(),
        is_mint_nft.clone(),
        is_transfer_nft.clone(),
        is_atomic_match.clone(),
        is_cancel_offer.clone(),
        is_withdraw_nft.clone(),
        is_full_exit.clone(),
        is_full_exit_nft.clone(),
    ])?;

    let is_layer2 = any_of(&[
        is_transfer.clone(),
        is_create_collection.clone(),
        is_mint_nft.clone(),
        is_transfer_nft.clone(),
        is_atomic_match.clone(),
        is_cancel_offer.clone(),
    ])?;
    let requires_signature = or(
        &is_layer2,
        &or(&is_withdraw, &is_withdraw_nft)?,
    )?;
    let is_onchain_op = crate::gadgets::compare::indicator_sum(&[
        is_register.clone(),
        is_deposit.clone(),
        is_deposit_nft.clone(),
        is_withdraw.clone(),
        is_withdraw_nft.clone(),
        is_full_exit.clone(),
        is_full_exit_nft.clone(),
    ]);

    Ok(TxFlags {
        is_empty,
        is_register,
        is_deposit,
        is_deposit_nft,
        is_transfer,
        is_withdraw,
        is_create_collection,
        is_mint_nft,
        is_transfer_nft,
        is_atomic_match,
        is_cancel_offer,
        is_withdraw_nft,
        is_full_exit,
        is_full_exit_nft,
        is_layer2,
        requires_signature,
        is_onchain_op,
    })
}

/// What the slot hands to the enclosing batch circuit.
pub struct TxOutputs {
    pub is_onchain_op: FpVar<Fr>,
    pub pubdata: Vec<FpVar<Fr>>,
    pub new_account_root: FpVar<Fr>,
    pub new_nft_root: FpVar<Fr>,
    pub gas_deltas: Vec<GasDeltaVar>,
}

/// The per-slot protocol: flags, signature, per-kind checks, delta
/// selection, tree passes, commitment binding.
pub fn verify_transaction(
    cs: ConstraintSystemRef<Fr>,
    tx: &TxVars,
    state_root_before: &FpVar<Fr>,
    state_root_after: &FpVar<Fr>,
    block_created_at: &FpVar<Fr>,
) -> Result<TxOutputs, SynthesisError> {
    let flags = derive_flags(&tx.tx_type)?;
    let not_empty = not(&flags.is_empty)?;

    let ctx = SlotContext {
        accounts: &tx.accounts_before,
        nft: &tx.nft_before,
        block_created_at,
    };
    let submitter = &tx.accounts_before[roles::SUBMITTER];

    // ---- signing hash selection (transfer is the structural default) ----
    let mut message =
        transfer::signing_hash_var(cs.clone(), &tx.transfer, &tx.nonce, &tx.expired_at)?;
    for (flag, hash) in [
        (
            &flags.is_withdraw,
            withdraw::signing_hash_var(cs.clone(), &tx.withdraw, &tx.nonce, &tx.expired_at)?,
        ),
        (
            &flags.is_create_collection,
            create_collection::signing_hash_var(
                cs.clone(),
                &tx.create_collection,
                &tx.nonce,
                &tx.expired_at,
            )?,
        ),
        (
            &flags.is_mint_nft,
            mint_nft::signing_hash_var(cs.clone(), &tx.mint_nft, &tx.nonce, &tx.expired_at)?,
        ),
        (
            &flags.is_transfer_nft,
            transfer_nft::signing_hash_var(
                cs.clone(),
                &tx.transfer_nft,
                &tx.nonce,
                &tx.expired_at,
            )?,
        ),
        (
            &flags.is_atomic_match,
            atomic_match::signing_hash_var(
                cs.clone(),
                &tx.atomic_match,
                &tx.nonce,
                &tx.expired_at,
            )?,
        ),
        (
            &flags.is_cancel_offer,
            cancel_offer::signing_hash_var(
                cs.clone(),
                &tx.cancel_offer,
                &tx.nonce,
                &tx.expired_at,
            )?,
        ),
        (
            &flags.is_withdraw_nft,
            withdraw_nft::signing_hash_var(
                cs.clone(),
                &tx.withdraw_nft,
                &tx.nonce,
                &tx.expired_at,
            )?,
        ),
    ] {
        message = FpVar::conditionally_select(flag, &hash, &message)?;
    }
    verify_signature(
        cs.clone(),
        &flags.requires_signature,
        &submitter.pub_key,
        &message,
        &tx.signature,
    )?;

    // ---- layer-2 gates: declared nonce matches, slot not expired ----
    enforce_equal_if(&flags.is_layer2, &tx.nonce, &submitter.nonce)?;
    enforce_le_if(&flags.is_layer2, block_created_at, &tx.expired_at)?;

    // ---- per-kind validity checks ----
    register::verify(&flags.is_register, &tx.register, &ctx)?;
    deposit::verify(&flags.is_deposit, &tx.deposit, &ctx)?;
    deposit_nft::verify(&flags.is_deposit_nft, &tx.deposit_nft, &ctx)?;
    transfer::verify(cs.clone(), &flags.is_transfer, &tx.transfer, &ctx)?;
    withdraw::verify(cs.clone(), &flags.is_withdraw, &tx.withdraw, &ctx)?;
    create_collection::verify(
        cs.clone(),
        &flags.is_create_collection,
        &tx.create_collection,
        &ctx,
    )?;
    mint_nft::verify(cs.clone(), &flags.is_mint_nft, &tx.mint_nft, &ctx)?;
    transfer_nft::verify(cs.clone(), &flags.is_transfer_nft, &tx.transfer_nft, &ctx)?;
    atomic_match::verify(cs.clone(), &flags.is_atomic_match, &tx.atomic_match, &ctx)?;
    cancel_offer::verify(cs.clone(), &flags.is_cancel_offer, &tx.cancel_offer, &ctx)?;
    withdraw_nft::verify(cs.clone(), &flags.is_withdraw_nft, &tx.withdraw_nft, &ctx)?;
    full_exit::verify(&flags.is_full_exit, &tx.full_exit, &ctx)?;
    full_exit_nft::verify(&flags.is_full_exit_nft, &tx.full_exit_nft, &ctx)?;

    // ---- asset delta selection ----
    let mut asset_deltas = neutral_asset_deltas();
    asset_deltas = select_asset_deltas(
        &flags.is_deposit,
        &deposit::asset_deltas(&tx.deposit),
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_transfer,
        &transfer::asset_deltas(cs.clone(), &tx.transfer)?,
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_withdraw,
        &withdraw::asset_deltas(cs.clone(), &tx.withdraw)?,
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_create_collection,
        &create_collection::asset_deltas(cs.clone(), &tx.create_collection)?,
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_mint_nft,
        &mint_nft::asset_deltas(cs.clone(), &tx.mint_nft)?,
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_transfer_nft,
        &transfer_nft::asset_deltas(cs.clone(), &tx.transfer_nft)?,
        &asset_deltas,
    )?;
    let (match_grid, match_nft_delta) =
        atomic_match::deltas(cs.clone(), &flags.is_atomic_match, &tx.atomic_match, &ctx)?;
    asset_deltas = select_asset_deltas(&flags.is_atomic_match, &match_grid, &asset_deltas)?;
    asset_deltas = select_asset_deltas(
        &flags.is_cancel_offer,
        &cancel_offer::asset_deltas(cs.clone(), &flags.is_cancel_offer, &tx.cancel_offer, &ctx)?,
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_withdraw_nft,
        &withdraw_nft::asset_deltas(cs.clone(), &tx.withdraw_nft)?,
        &asset_deltas,
    )?;
    asset_deltas = select_asset_deltas(
        &flags.is_full_exit,
        &full_exit::asset_deltas(&tx.full_exit, &ctx),
        &asset_deltas,
    )?;

    // ---- NFT delta selection ----
    let mut nft_delta = NftDeltaVar::keep(&tx.nft_before);
    nft_delta = select_nft_delta(
        &flags.is_deposit_nft,
        &deposit_nft::nft_delta(&tx.deposit_nft),
        &nft_delta,
    )?;
    nft_delta = select_nft_delta(
        &flags.is_mint_nft,
        &mint_nft::nft_delta(&tx.mint_nft),
        &nft_delta,
    )?;
    nft_delta = select_nft_delta(
        &flags.is_transfer_nft,
        &transfer_nft::nft_delta(&tx.transfer_nft, &tx.nft_before),
        &nft_delta,
    )?;
    nft_delta = select_nft_delta(&flags.is_atomic_match, &match_nft_delta, &nft_delta)?;
    nft_delta = select_nft_delta(
        &flags.is_withdraw_nft,
        &withdraw_nft::nft_delta(),
        &nft_delta,
    )?;
    nft_delta = select_nft_delta(
        &flags.is_full_exit_nft,
        &full_exit_nft::nft_delta(),
        &nft_delta,
    )?;

    // ---- gas credit selection ----
    let mut gas_deltas = neutral_gas_deltas();
    gas_deltas = select_gas_deltas(
        &flags.is_transfer,
        &transfer::gas_deltas(cs.clone(), &tx.transfer)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_withdraw,
        &withdraw::gas_deltas(cs.clone(), &tx.withdraw)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_create_collection,
        &create_collection::gas_deltas(cs.clone(), &tx.create_collection)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_mint_nft,
        &mint_nft::gas_deltas(cs.clone(), &tx.mint_nft)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_transfer_nft,
        &transfer_nft::gas_deltas(cs.clone(), &tx.transfer_nft)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_atomic_match,
        &atomic_match::gas_deltas(cs.clone(), &tx.atomic_match)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_cancel_offer,
        &cancel_offer::gas_deltas(cs.clone(), &tx.cancel_offer)?,
        &gas_deltas,
    )?;
    gas_deltas = select_gas_deltas(
        &flags.is_withdraw_nft,
        &withdraw_nft::gas_deltas(cs.clone(), &tx.withdraw_nft)?,
        &gas_deltas,
    )?;

    // ---- pubdata selection (empty slot leaves all zeros) ----
    let mut pubdata = vec![FpVar::<Fr>::zero(); PUB_DATA_ELEMS_PER_TX];
    pubdata = select_pubdata(&flags.is_register, &register::pubdata(&tx.register), &pubdata)?;
    pubdata = select_pubdata(&flags.is_deposit, &deposit::pubdata(&tx.deposit), &pubdata)?;
    pubdata = select_pubdata(
        &flags.is_deposit_nft,
        &deposit_nft::pubdata(&tx.deposit_nft),
        &pubdata,
    )?;
    pubdata = select_pubdata(&flags.is_transfer, &transfer::pubdata(&tx.transfer), &pubdata)?;
    pubdata = select_pubdata(&flags.is_withdraw, &withdraw::pubdata(&tx.withdraw), &pubdata)?;
    pubdata = select_pubdata(
        &flags.is_create_collection,
        &create_collection::pubdata(&tx.create_collection),
        &pubdata,
    )?;
    pubdata = select_pubdata(&flags.is_mint_nft, &mint_nft::pubdata(&tx.mint_nft), &pubdata)?;
    pubdata = select_pubdata(
        &flags.is_transfer_nft,
        &transfer_nft::pubdata(&tx.transfer_nft),
        &pubdata,
    )?;
    pubdata = select_pubdata(
        &flags.is_atomic_match,
        &atomic_match::pubdata(&tx.atomic_match),
        &pubdata,
    )?;
    pubdata = select_pubdata(
        &flags.is_cancel_offer,
        &cancel_offer::pubdata(&tx.cancel_offer),
        &pubdata,
    )?;
    pubdata = select_pubdata(
        &flags.is_withdraw_nft,
        &withdraw_nft::pubdata(&tx.withdraw_nft, &ctx),
        &pubdata,
    )?;
    pubdata = select_pubdata(
        &flags.is_full_exit,
        &full_exit::pubdata(&tx.full_exit, &ctx),
        &pubdata,
    )?;
    pubdata = select_pubdata(
        &flags.is_full_exit_nft,
        &full_exit_nft::pubdata(&tx.full_exit_nft, &ctx),
        &pubdata,
    )?;

    // ---- bind the before-commitment ----
    let commitment_before = hash_vars(
        cs.clone(),
        &[tx.account_root_before.clone(), tx.nft_root_before.clone()],
    )?;
    commitment_before.conditional_enforce_equal(state_root_before, &not_empty)?;

    // ---- account passes, root chained across the 7 slots ----
    let mut new_account_root = tx.account_root_before.clone();
    for i in 0..NB_ACCOUNTS_PER_TX {
        let account = &tx.accounts_before[i];

        // After-image of the account scalars. Only the submitter slot can
        // change identity or nonces.
        let (name_hash_after, pub_key_after, nonce_after, collection_nonce_after) =
            if i == roles::SUBMITTER {
                let is_unbound = account.name_hash.is_eq(&FpVar::zero())?;
                let deposit_kind = or(&flags.is_deposit, &flags.is_deposit_nft)?;
                let binds_name = and(&deposit_kind, &is_unbound)?;
                let deposit_name = FpVar::conditionally_select(
                    &flags.is_deposit,
                    &tx.deposit.name_hash,
                    &tx.deposit_nft.name_hash,
                )?;
                let bound = FpVar::conditionally_select(
                    &binds_name,
                    &deposit_name,
                    &account.name_hash,
                )?;
                let name_hash = FpVar::conditionally_select(
                    &flags.is_register,
                    &tx.register.name_hash,
                    &bound,
                )?;
                let pub_key = FpVar::conditionally_select(
                    &flags.is_register,
                    &tx.register.pub_key,
                    &account.pub_key,
                )?;
                let nonce = &account.nonce + indicator(&flags.is_layer2);
                let collection_nonce =
                    &account.collection_nonce + indicator(&flags.is_create_collection);
                (name_hash, pub_key, nonce, collection_nonce)
            } else {
                (
                    account.name_hash.clone(),
                    account.pub_key.clone(),
                    account.nonce.clone(),
                    account.collection_nonce.clone(),
                )
            };

        // Asset subtree pass, chained across the two positions.
        let mut new_asset_root = account.asset_root.clone();
        for j in 0..NB_ASSETS_PER_ACCOUNT {
            let slot = &account.assets[j];
            let path_bits = index_to_path_bits(cs.clone(), &slot.asset_id, ASSET_TREE_DEPTH)?;
            let leaf_before = slot.leaf_hash(cs.clone())?;
            verify_merkle_proof(
                cs.clone(),
                &not_empty,
                &new_asset_root,
                &leaf_before,
                &tx.asset_proofs[i][j],
                &path_bits,
            )?;

            let delta = &asset_deltas[i][j];
            let balance_after = &slot.balance + &delta.balance_delta;
            let bitmap_after = FpVar::conditionally_select(
                &delta.set_bitmap,
                &delta.new_bitmap,
                &slot.offer_bitmap,
            )?;
            let leaf_after = hash_vars(cs.clone(), &[balance_after, bitmap_after])?;
            new_asset_root =
                update_merkle_root(cs.clone(), &leaf_after, &tx.asset_proofs[i][j], &path_bits)?;
        }

        let path_bits =
            index_to_path_bits(cs.clone(), &account.account_index, ACCOUNT_TREE_DEPTH)?;
        let leaf_before = account.leaf_hash(cs.clone(), &account.asset_root)?;
        verify_merkle_proof(
            cs.clone(),
            &not_empty,
            &new_account_root,
            &leaf_before,
            &tx.account_proofs[i],
            &path_bits,
        )?;

        let leaf_after = hash_vars(
            cs.clone(),
            &[
                name_hash_after,
                pub_key_after,
                nonce_after,
                collection_nonce_after,
                new_asset_root,
            ],
        )?;
        new_account_root =
            update_merkle_root(cs.clone(), &leaf_after, &tx.account_proofs[i], &path_bits)?;
    }

    // ---- NFT tree pass ----
    let nft_path_bits =
        index_to_path_bits(cs.clone(), &tx.nft_before.nft_index, NFT_TREE_DEPTH)?;
    let nft_leaf_before = tx.nft_before.leaf_hash(cs.clone())?;
    verify_merkle_proof(
        cs.clone(),
        &not_empty,
        &tx.nft_root_before,
        &nft_leaf_before,
        &tx.nft_proof,
        &nft_path_bits,
    )?;
    let nft_leaf_after = hash_vars(
        cs.clone(),
        &[
            nft_delta.creator_account_index.clone(),
            nft_delta.owner_account_index.clone(),
            nft_delta.content_hash.clone(),
            nft_delta.royalty_rate.clone(),
            nft_delta.collection_id.clone(),
        ],
    )?;
    let new_nft_root =
        update_merkle_root(cs.clone(), &nft_leaf_after, &tx.nft_proof, &nft_path_bits)?;

    // ---- bind the after-commitment, unconditionally ----
    // A filler slot selects the before-roots, so its all-zero proofs never
    // reach the commitment.
    let final_account_root = FpVar::conditionally_select(
        &flags.is_empty,
        &tx.account_root_before,
        &new_account_root,
    )?;
    let final_nft_root =
        FpVar::conditionally_select(&flags.is_empty, &tx.nft_root_before, &new_nft_root)?;
    let commitment_after = hash_vars(
        cs.clone(),
        &[final_account_root.clone(), final_nft_root.clone()],
    )?;
    commitment_after.enforce_equal(state_root_after)?;

    Ok(TxOutputs {
        is_onchain_op: flags.is_onchain_op,
        pubdata,
        new_account_root: final_account_root,
        new_nft_root: final_nft_root,
        gas_deltas,
    })
}

/// One slot of the rollup block proof.
#[derive(Clone)]
pub struct TxCircuit {
    pub tx: Option<TxWitness>,
    pub block_created_at: Option<u64>,
}

impl TxCircuit {
    pub fn new(tx: TxWitness, block_created_at: u64) -> Self {
        Self {
            tx: Some(tx),
            block_created_at: Some(block_created_at),
        }
    }

    /// Filler slot over empty trees; satisfiable, used for key generation.
    pub fn dummy() -> Self {
        let account_root =
            SparseMerkleTree::new(ACCOUNT_TREE_DEPTH, empty_account_leaf()).root();
        let nft_root = SparseMerkleTree::new(NFT_TREE_DEPTH, empty_nft_leaf()).root();
        Self::new(TxWitness::empty(account_root, nft_root), 0)
    }
}

impl ConstraintSynthesizer<Fr> for TxCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let w = self.tx.ok_or(SynthesisError::AssignmentMissing)?;
        let block_created_at_val = self
            .block_created_at
            .ok_or(SynthesisError::AssignmentMissing)?;

        // Public inputs (ORDER MATTERS - must match verifier).
        let state_root_before = FpVar::new_input(cs.clone(), || Ok(w.state_root_before))?;
        let state_root_after = FpVar::new_input(cs.clone(), || Ok(w.state_root_after))?;
        let block_created_at =
            FpVar::new_input(cs.clone(), || Ok(Fr::from(block_created_at_val)))?;

        let tx = TxVars::new_witness(cs.clone(), &w)?;
        let _ = verify_transaction(
            cs,
            &tx,
            &state_root_before,
            &state_root_after,
            &block_created_at,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_dummy_slot_is_satisfiable() {
        let circuit = TxCircuit::dummy();
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();

        println!("Number of constraints: {}", cs.num_constraints());
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_public_input_count() {
        let circuit = TxCircuit::dummy();
        let cs = ConstraintSystem::<Fr>::new_ref();
        let _ = circuit.generate_constraints(cs.clone());

        // 3 public inputs + 1 (arkworks adds a constant "1" as first input)
        assert_eq!(cs.num_instance_variables(), 4);
    }

    #[test]
    fn test_unknown_tag_unsatisfiable() {
        let mut circuit = TxCircuit::dummy();
        circuit.tx.as_mut().unwrap().tx_type = 77;
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
