//! Hint-assisted Euclidean division over signed field values.
//!
//! Values in the upper half of the field read as negative. The remainder is computed out of
//! circuit and then pinned down by the defining equation plus range checks on every operand.

use anyhow::{anyhow, bail, ensure, Context, Result};
use ff::{Field, PrimeField};
use num_bigint::BigUint;
use num_traits::Zero;
use r1cs::field::{from_biguint, half_modulus, modulus, to_biguint};
use r1cs::gadgets::{assert_fits, assert_le_bounded, div, is_greater_than_constant, mul, to_bits_canonical};
use r1cs::{Driver, Wire};

use crate::range_proof::multi_range_proof;

/// `⌊√p⌋`, the magnitude bound on every Modulo operand.
pub fn sqrt_modulus<F: PrimeField>() -> BigUint {
    modulus::<F>().sqrt()
}

/// 1 if `x` lies in the upper half of the field, i.e. canonical(x) > ⌊p/2⌋.
pub fn is_negative<D: Driver>(dr: &mut D, x: &Wire<D::F>) -> Result<Wire<D::F>> {
    let bits = to_bits_canonical(dr, x)?;
    is_greater_than_constant(dr, &bits, &half_modulus::<D::F>())
}

/// inputs: `[|dividend|, divisor, dividend_is_negative]`; output: the non-negative remainder.
fn modulo_remainder<F: PrimeField>(inputs: &[F]) -> Result<Vec<F>> {
    let [abs_dividend, divisor, negative] = inputs else {
        bail!("expected 3 inputs, got {}", inputs.len());
    };
    let divisor = to_biguint(divisor);
    ensure!(!divisor.is_zero(), "modulo by zero");
    let mut remainder = to_biguint(abs_dividend) % &divisor;
    if *negative == F::ONE && !remainder.is_zero() {
        remainder = &divisor - remainder;
    }
    Ok(vec![from_biguint(&remainder)])
}

/// `(quotient, remainder)` with `dividend = divisor · quotient + remainder` and
/// `0 <= remainder < divisor`, for `|dividend|, |divisor|, |quotient| <= ⌊√p⌋`.
pub fn modulo<D: Driver>(dr: &mut D, dividend: &Wire<D::F>, divisor: &Wire<D::F>) -> Result<(Wire<D::F>, Wire<D::F>)> {
    let negative = is_negative(dr, dividend)?;
    // |dividend| = dividend · (1 - 2·negative)
    let sign = Wire::one() - &negative.scale(D::F::from(2u64));
    let abs_dividend = mul(dr, dividend, &sign)?;

    let remainder = dr
        .hint("modulo_remainder", modulo_remainder::<D::F>, &[abs_dividend, divisor.clone(), negative], 1)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("modulo hint produced no remainder"))?;

    let quotient = div(dr, &(dividend - &remainder), divisor)?;
    let product = mul(dr, divisor, &quotient)?;
    r1cs::gadgets::assert_equal(dr, "modulo_recompose", dividend, &(product + &remainder))?;

    let sqrt_p = sqrt_modulus::<D::F>();
    let bits = sqrt_p.bits() as usize;
    let bound = Wire::constant(from_biguint(&sqrt_p));
    multi_range_proof(dr, bits, &bound, &[dividend.clone(), divisor.clone(), quotient.clone()])
        .context("modulo operand exceeds ⌊√p⌋")?;

    // 0 <= remainder <= divisor - 1
    assert_fits(dr, &remainder, bits).context("modulo remainder is negative")?;
    assert_le_bounded(dr, &remainder, &divisor.add_constant(-D::F::ONE), bits)
        .context("modulo remainder not below divisor")?;

    Ok((quotient, remainder))
}
