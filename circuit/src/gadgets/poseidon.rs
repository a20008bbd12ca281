use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, find_poseidon_ark_and_mds};
use ark_ff::PrimeField;
use once_cell::sync::Lazy;

/// Poseidon configuration shared by the circuit and its native mirror
///
/// Field: BN254 Fr (254 bits)
/// Rate: 2
/// Capacity: 1
/// Security: 128 bits
static CONFIG: Lazy<PoseidonConfig<Fr>> = Lazy::new(|| {
    let rate: usize = 2;
    let capacity: usize = 1;

    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;

    // alpha = 5 is standard for Poseidon over large prime fields
    let alpha: u64 = 5;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        rate,
        full_rounds,
        partial_rounds,
        0,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
});

pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    &CONFIG
}
