//! Reusable in-circuit building blocks.

pub mod bits;
pub mod compare;
pub mod hash;
pub mod merkle;
pub mod packed;
pub mod poseidon;
pub mod sig;
