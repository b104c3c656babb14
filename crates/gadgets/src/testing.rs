//! A driver that lets tests replace named hints, to build witnesses a dishonest prover would.

use anyhow::Result;
use ff::PrimeField;
use r1cs::field::to_biguint;
use r1cs::{Driver, Hint, R1csDriver, Wire};

pub(crate) struct ForgingDriver<F: PrimeField> {
    pub(crate) inner: R1csDriver<F>,
    swaps: Vec<(&'static str, Hint<F>)>,
}

impl<F: PrimeField> ForgingDriver<F> {
    /// Every hint named in `swaps` runs the replacement instead.
    pub(crate) fn new(swaps: &[(&'static str, Hint<F>)]) -> Self {
        Self { inner: R1csDriver::prove(), swaps: swaps.to_vec() }
    }
}

/// Bit decomposition that keeps the low `n` bits instead of failing on values that do not fit.
pub(crate) fn truncated_bits<F: PrimeField>(inputs: &[F]) -> Result<Vec<F>> {
    let n = to_biguint(&inputs[1]).to_u64_digits().first().copied().unwrap_or(0);
    let v = to_biguint(&inputs[0]);
    Ok((0..n).map(|i| if v.bit(i) { F::ONE } else { F::ZERO }).collect())
}

impl<F: PrimeField> Driver for ForgingDriver<F> {
    type F = F;

    fn has_witness(&self) -> bool {
        self.inner.has_witness()
    }

    fn alloc_witness(&mut self, value: impl FnOnce() -> Result<F>) -> Result<Wire<F>> {
        self.inner.alloc_witness(value)
    }

    fn alloc_instance(&mut self, value: impl FnOnce() -> Result<F>) -> Result<Wire<F>> {
        self.inner.alloc_instance(value)
    }

    fn value(&self, wire: &Wire<F>) -> Option<F> {
        self.inner.value(wire)
    }

    fn enforce_mul(&mut self, label: &'static str, a: &Wire<F>, b: &Wire<F>, c: &Wire<F>) -> Result<()> {
        self.inner.enforce_mul(label, a, b, c)
    }

    fn hint(&mut self, name: &'static str, f: Hint<F>, inputs: &[Wire<F>], outputs: usize) -> Result<Vec<Wire<F>>> {
        let f = self.swaps.iter().find(|(n, _)| *n == name).map_or(f, |(_, g)| *g);
        self.inner.hint(name, f, inputs, outputs)
    }
}
