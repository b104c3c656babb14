//! Core gadgets over the driver: arithmetic, booleanity, zero tests, select, bit decomposition
//! and comparisons.
//!
//! Operands that are compile-time constants are folded: no constraint is emitted, and a check
//! that can never hold is reported as an error while the circuit is being built.

use anyhow::{anyhow, bail, ensure, Result};
use ff::{Field, PrimeField};
use num_bigint::BigUint;

use crate::circuit::Driver;
use crate::field::{modulus, to_biguint, to_u64};
use crate::r1cs::Wire;

/// Allocate a witness whose value was derived from other wires.
fn derived<D: Driver>(dr: &mut D, value: Option<D::F>, what: &'static str) -> Result<Wire<D::F>> {
    dr.alloc_witness(move || value.ok_or_else(|| anyhow!("{}: operand has no assigned value", what)))
}

/// Enforce c = a * b
pub fn mul<D: Driver>(dr: &mut D, a: &Wire<D::F>, b: &Wire<D::F>) -> Result<Wire<D::F>> {
    if let Some(k) = a.as_constant() {
        return Ok(b.scale(k));
    }
    if let Some(k) = b.as_constant() {
        return Ok(a.scale(k));
    }
    let v = dr.value(a).zip(dr.value(b)).map(|(x, y)| x * y);
    let out = derived(dr, v, "mul")?;
    dr.enforce_mul("mul", a, b, &out)?;
    Ok(out)
}

pub fn square<D: Driver>(dr: &mut D, a: &Wire<D::F>) -> Result<Wire<D::F>> {
    mul(dr, a, a)
}

/// Enforce a * inv = 1. Fails while assigning the witness when a = 0.
pub fn inverse<D: Driver>(dr: &mut D, a: &Wire<D::F>) -> Result<Wire<D::F>> {
    if let Some(k) = a.as_constant() {
        let inv = Option::<D::F>::from(k.invert()).ok_or_else(|| anyhow!("inverse of constant zero"))?;
        return Ok(Wire::constant(inv));
    }
    let va = dr.value(a);
    let inv = dr.alloc_witness(move || {
        let v = va.ok_or_else(|| anyhow!("inverse: operand has no assigned value"))?;
        Option::<D::F>::from(v.invert()).ok_or_else(|| anyhow!("inverse of zero"))
    })?;
    dr.enforce_mul("inverse", a, &inv, &Wire::one())?;
    Ok(inv)
}

/// Field division a / b, enforced as q * b = a. A zero divisor fails at witness time.
pub fn div<D: Driver>(dr: &mut D, a: &Wire<D::F>, b: &Wire<D::F>) -> Result<Wire<D::F>> {
    if let Some(k) = b.as_constant() {
        let inv = Option::<D::F>::from(k.invert()).ok_or_else(|| anyhow!("division by constant zero"))?;
        return Ok(a.scale(inv));
    }
    let (va, vb) = (dr.value(a), dr.value(b));
    let q = dr.alloc_witness(move || {
        let (x, y) = va.zip(vb).ok_or_else(|| anyhow!("div: operand has no assigned value"))?;
        let inv = Option::<D::F>::from(y.invert()).ok_or_else(|| anyhow!("division by zero"))?;
        Ok(x * inv)
    })?;
    dr.enforce_mul("div", &q, b, a)?;
    Ok(q)
}

/// Enforce a = b. Two constants that differ are rejected while building.
pub fn assert_equal<D: Driver>(dr: &mut D, label: &'static str, a: &Wire<D::F>, b: &Wire<D::F>) -> Result<()> {
    let diff = a - b;
    if let Some(k) = diff.as_constant() {
        ensure!(bool::from(k.is_zero()), "{}: constant operands are never equal", label);
        return Ok(());
    }
    dr.enforce_equal(label, a, b)
}

/// Constrain `b` to be boolean: b * (b - 1) = 0
pub fn assert_boolean<D: Driver>(dr: &mut D, b: &Wire<D::F>) -> Result<()> {
    if let Some(k) = b.as_constant() {
        ensure!(k == D::F::ZERO || k == D::F::ONE, "constant is not boolean");
        return Ok(());
    }
    dr.enforce_mul("boolean", b, &b.add_constant(-D::F::ONE), &Wire::zero())
}

/// 1 if a = 0, else 0.
pub fn is_zero<D: Driver>(dr: &mut D, a: &Wire<D::F>) -> Result<Wire<D::F>> {
    if let Some(k) = a.as_constant() {
        let bit = if bool::from(k.is_zero()) { D::F::ONE } else { D::F::ZERO };
        return Ok(Wire::constant(bit));
    }
    let va = dr.value(a);
    let inv = derived(dr, va.map(|v| Option::<D::F>::from(v.invert()).unwrap_or(D::F::ZERO)), "is_zero")?;
    let out = derived(dr, va.map(|v| if bool::from(v.is_zero()) { D::F::ONE } else { D::F::ZERO }), "is_zero")?;
    // a * inv = 1 - out ; a * out = 0
    dr.enforce_mul("is_zero_inv", a, &inv, &(&Wire::one() - &out))?;
    dr.enforce_mul("is_zero_out", a, &out, &Wire::zero())?;
    Ok(out)
}

/// 1 if a = b, else 0.
pub fn is_equal<D: Driver>(dr: &mut D, a: &Wire<D::F>, b: &Wire<D::F>) -> Result<Wire<D::F>> {
    is_zero(dr, &(a - b))
}

/// Select: returns cond ? a : b. Enforces out = b + cond * (a - b)
pub fn select<D: Driver>(dr: &mut D, cond: &Wire<D::F>, a: &Wire<D::F>, b: &Wire<D::F>) -> Result<Wire<D::F>> {
    let prod = mul(dr, cond, &(a - b))?;
    Ok(prod + b)
}

/// Little-endian bits of inputs[0], padded to inputs[1] bits.
fn bit_decomposition<F: PrimeField>(inputs: &[F]) -> Result<Vec<F>> {
    let [value, width] = inputs else {
        bail!("expected value and width, got {} inputs", inputs.len());
    };
    let n = to_u64(width).ok_or_else(|| anyhow!("bit width out of range"))?;
    let v = to_biguint(value);
    ensure!(v.bits() <= n, "value does not fit in {} bits", n);
    Ok((0..n).map(|i| if v.bit(i) { F::ONE } else { F::ZERO }).collect())
}

/// Little-endian decomposition of `a` into `n` boolean wires.
///
/// Emits `n` boolean constraints and one recomposition constraint, so it also proves
/// `a < 2^n`. A constant operand is decomposed directly; one that does not fit is an error.
pub fn to_bits<D: Driver>(dr: &mut D, a: &Wire<D::F>, n: usize) -> Result<Vec<Wire<D::F>>> {
    ensure!(n <= D::F::NUM_BITS as usize, "cannot decompose into {} bits", n);
    if let Some(k) = a.as_constant() {
        let v = to_biguint(&k);
        ensure!(v.bits() <= n as u64, "constant {} does not fit in {} bits", v, n);
        return Ok((0..n as u64)
            .map(|i| if v.bit(i) { Wire::one() } else { Wire::zero() })
            .collect());
    }

    let width = Wire::constant(D::F::from(n as u64));
    let bits = dr.hint("bit_decomposition", bit_decomposition::<D::F>, &[a.clone(), width], n)?;
    for b in &bits {
        assert_boolean(dr, b)?;
    }
    let recomposed = from_bits(&bits);
    dr.enforce_equal("bits_recompose", &recomposed, a)?;
    Ok(bits)
}

/// Σ bits_i · 2^i
pub fn from_bits<F: PrimeField>(bits: &[Wire<F>]) -> Wire<F> {
    let mut coeff = F::ONE;
    let mut weighted = Vec::with_capacity(bits.len());
    for b in bits {
        weighted.push((b, coeff));
        coeff = coeff.double();
    }
    Wire::linear_sum(weighted)
}

/// Assert `0 <= a < 2^n`.
pub fn assert_fits<D: Driver>(dr: &mut D, a: &Wire<D::F>, n: usize) -> Result<()> {
    to_bits(dr, a, n).map(|_| ())
}

/// Full-width decomposition that is unique: the bits are also checked to encode a value `< p`.
pub fn to_bits_canonical<D: Driver>(dr: &mut D, a: &Wire<D::F>) -> Result<Vec<Wire<D::F>>> {
    let bits = to_bits(dr, a, D::F::NUM_BITS as usize)?;
    let p_minus_one = modulus::<D::F>() - 1u32;
    let overflow = is_greater_than_constant(dr, &bits, &p_minus_one)?;
    assert_equal(dr, "bits_canonical", &overflow, &Wire::zero())?;
    Ok(bits)
}

/// 1 if the little-endian boolean `bits` encode an integer greater than `c`, else 0.
///
/// Scans from the most significant bit tracking whether the prefix so far equals `c`;
/// costs one multiplication per bit.
pub fn is_greater_than_constant<D: Driver>(dr: &mut D, bits: &[Wire<D::F>], c: &BigUint) -> Result<Wire<D::F>> {
    if c.bits() > bits.len() as u64 {
        return Ok(Wire::zero());
    }
    let mut eq = Wire::one();
    let mut gt = Wire::zero();
    for (i, b) in bits.iter().enumerate().rev() {
        if c.bit(i as u64) {
            eq = mul(dr, &eq, b)?;
        } else {
            let t = mul(dr, &eq, b)?;
            gt = gt + &t;
            eq = eq - &t;
        }
    }
    Ok(gt)
}

/// Assert `a <= b` for operands already known to lie in `[0, 2^n)`.
pub fn assert_le_bounded<D: Driver>(dr: &mut D, a: &Wire<D::F>, b: &Wire<D::F>, n: usize) -> Result<()> {
    ensure!(n < D::F::CAPACITY as usize, "comparison width {} leaves no room for wraparound", n);
    assert_fits(dr, &(b - a), n)
}
