//! MiMC permutation hash over the circuit field, in-circuit and native.
//!
//! Round constants come from a Keccak-256 chain over the seed:
//! `rnd = keccak(seed)`, then per round `rnd = keccak(rnd)` and the constant is `rnd` read
//! big-endian and reduced into the field.
//!
//! Compression is Miyaguchi–Preneel with field addition: for each written element `m`,
//! `h <- h + E_h(m) + m`, where `E_h` applies `x <- (x + h + c)^5` per round constant and
//! finishes with `+ h`.

use std::sync::Arc;

use anyhow::{ensure, Result};
use ff::PrimeField;
use r1cs::field::from_be_bytes_mod_order;
use r1cs::gadgets::mul;
use r1cs::{Driver, Wire};
use sha3::{Digest, Keccak256};

/// Rounds used for coordinate commitments.
pub const COMMITMENT_ROUNDS: usize = 110;
/// Rounds used for the noise nibble.
pub const NOISE_ROUNDS: usize = 4;

pub fn round_constants<F: PrimeField>(seed: &str, rounds: usize) -> Vec<F> {
    let mut rnd: [u8; 32] = Keccak256::digest(seed.as_bytes()).into();
    (0..rounds)
        .map(|_| {
            rnd = Keccak256::digest(rnd).into();
            from_be_bytes_mod_order(&rnd)
        })
        .collect()
}

/// Immutable round-constant table for one `(seed, rounds)` pair. Clones share the table.
#[derive(Clone, Debug)]
pub struct MimcParams<F: PrimeField> {
    seed: String,
    constants: Arc<[F]>,
}

impl<F: PrimeField> MimcParams<F> {
    pub fn new(seed: &str, rounds: usize) -> Result<Self> {
        ensure!(rounds > 0, "mimc needs at least one round");
        let constants: Vec<F> = round_constants(seed, rounds);
        tracing::trace!(seed, rounds, "mimc constants derived");
        Ok(Self { seed: seed.to_string(), constants: constants.into() })
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn rounds(&self) -> usize {
        self.constants.len()
    }

    pub fn constants(&self) -> &[F] {
        &self.constants
    }

    fn encrypt(&self, h: F, m: F) -> F {
        let mut x = m;
        for c in self.constants.iter() {
            let t = x + h + c;
            let t2 = t.square();
            x = t2.square() * t;
        }
        x + h
    }

    /// Native hash of `inputs`, identical to the in-circuit [`Mimc::sum`].
    pub fn hash(&self, inputs: &[F]) -> F {
        inputs.iter().fold(F::ZERO, |h, m| h + self.encrypt(h, *m) + m)
    }

    pub fn hasher(&self) -> Mimc<F> {
        Mimc { params: self.clone(), data: Vec::new() }
    }
}

/// In-circuit hasher: `write` elements, then `sum`.
pub struct Mimc<F: PrimeField> {
    params: MimcParams<F>,
    data: Vec<Wire<F>>,
}

impl<F: PrimeField> Mimc<F> {
    pub fn write(&mut self, w: &Wire<F>) {
        self.data.push(w.clone());
    }

    fn pow5<D: Driver<F = F>>(dr: &mut D, x: &Wire<F>) -> Result<Wire<F>> {
        let x2 = mul(dr, x, x)?;
        let x4 = mul(dr, &x2, &x2)?;
        mul(dr, &x4, x)
    }

    /// Hash everything written so far and reset the written data.
    pub fn sum<D: Driver<F = F>>(&mut self, dr: &mut D) -> Result<Wire<F>> {
        let mut h = Wire::zero();
        for m in std::mem::take(&mut self.data) {
            let mut x = m.clone();
            for c in self.params.constants.iter() {
                x = Self::pow5(dr, &(&x + &h).add_constant(*c))?;
            }
            let r = &x + &h;
            h = &h + &(&r + &m);
        }
        Ok(h)
    }
}
