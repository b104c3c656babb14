//! Circuit gadgets for hidden-coordinate proofs.
//!
//! Every gadget is generic over [`r1cs::Driver`] and is built bottom-up:
//! range proofs and the quin selector underpin the hint-assisted [`modulo`], which together
//! with the [`mimc`] hash drives the [`perlin`] terrain noise.

pub mod mimc;
pub mod modulo;
pub mod perlin;
pub mod quin_selector;
pub mod range_proof;
#[cfg(test)]
mod testing;

pub use mimc::{Mimc, MimcParams, COMMITMENT_ROUNDS, NOISE_ROUNDS};
pub use modulo::{is_negative, modulo, sqrt_modulus};
pub use perlin::{multi_scale_perlin, NoiseParams, DENOMINATOR, MAX_SCALE};
pub use quin_selector::{quin_select, QuinSelector};
pub use range_proof::{multi_range_proof, range_proof};
