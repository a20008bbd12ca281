//! Account registration: binds a name hash and public key to a fresh
//! account position. Layer-1 originated, so no signature and no nonce.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::{roles, TX_TYPE_REGISTER};
use crate::gadgets::compare::enforce_equal_if;

use super::{pad_pubdata, tag, SlotContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegisterTx {
    pub account_index: u64,
    pub name_hash: Fr,
    pub pub_key: Fr,
}

#[derive(Clone)]
pub struct RegisterVar {
    pub account_index: FpVar<Fr>,
    pub name_hash: FpVar<Fr>,
    pub pub_key: FpVar<Fr>,
}

impl RegisterVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        tx: &RegisterTx,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            account_index: FpVar::new_witness(cs.clone(), || Ok(Fr::from(tx.account_index)))?,
            name_hash: FpVar::new_witness(cs.clone(), || Ok(tx.name_hash))?,
            pub_key: FpVar::new_witness(cs, || Ok(tx.pub_key))?,
        })
    }
}

/// The target position must be unregistered.
pub fn verify(
    flag: &Boolean<Fr>,
    tx: &RegisterVar,
    ctx: &SlotContext,
) -> Result<(), SynthesisError> {
    let target = &ctx.accounts[roles::SUBMITTER];
    enforce_equal_if(flag, &target.account_index, &tx.account_index)?;
    enforce_equal_if(flag, &target.name_hash, &FpVar::zero())?;
    enforce_equal_if(flag, &target.pub_key, &FpVar::zero())
}

pub fn pubdata(tx: &RegisterVar) -> Vec<FpVar<Fr>> {
    pad_pubdata(vec![
        tag(TX_TYPE_REGISTER),
        tx.account_index.clone(),
        tx.name_hash.clone(),
        tx.pub_key.clone(),
    ])
}
