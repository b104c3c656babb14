//! Conversions between field elements and integers.
//!
//! The fields used with this crate (BN254 and Pasta scalars) expose their canonical
//! representation little-endian; everything here relies on that.

use ff::PrimeField;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;

/// Canonical integer value of `value`, in `[0, p)`.
pub fn to_biguint<F: PrimeField>(value: &F) -> BigUint {
    BigUint::from_bytes_le(value.to_repr().as_ref())
}

/// Reduce an arbitrary integer into the field.
pub fn from_biguint<F: PrimeField>(value: &BigUint) -> F {
    from_be_bytes_mod_order(&value.to_bytes_be())
}

/// Interpret `bytes` as a big-endian integer and reduce it modulo p.
pub fn from_be_bytes_mod_order<F: PrimeField>(bytes: &[u8]) -> F {
    let radix = F::from(256u64);
    bytes
        .iter()
        .fold(F::ZERO, |acc, b| acc * radix + F::from(u64::from(*b)))
}

/// Canonical big-endian encoding, padded to the representation width.
pub fn to_be_bytes<F: PrimeField>(value: &F) -> Vec<u8> {
    let mut bytes = value.to_repr().as_ref().to_vec();
    bytes.reverse();
    bytes
}

/// Parse a canonical big-endian encoding; rejects wrong widths and values `>= p`.
pub fn from_be_bytes_canonical<F: PrimeField>(bytes: &[u8]) -> Option<F> {
    let mut repr = F::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return None;
    }
    for (dst, src) in repr.as_mut().iter_mut().zip(bytes.iter().rev()) {
        *dst = *src;
    }
    F::from_repr(repr).into()
}

/// The field modulus p.
pub fn modulus<F: PrimeField>() -> BigUint {
    to_biguint(&(-F::ONE)) + 1u32
}

/// `⌊p/2⌋`; canonical values above it read as negative.
pub fn half_modulus<F: PrimeField>() -> BigUint {
    modulus::<F>() >> 1
}

/// 2^k as a field element.
pub fn pow2<F: PrimeField>(k: u32) -> F {
    F::from(2u64).pow_vartime([u64::from(k)])
}

pub fn from_i64<F: PrimeField>(value: i64) -> F {
    let magnitude = F::from(value.unsigned_abs());
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

pub fn from_bigint<F: PrimeField>(value: &BigInt) -> F {
    let magnitude = from_biguint::<F>(value.magnitude());
    if value.sign() == Sign::Minus {
        -magnitude
    } else {
        magnitude
    }
}

/// Signed reading of a field element: values in the upper half of the field are negative.
pub fn to_bigint<F: PrimeField>(value: &F) -> BigInt {
    let n = to_biguint(value);
    let p = modulus::<F>();
    if n > (&p >> 1) {
        BigInt::from(n) - BigInt::from(p)
    } else {
        BigInt::from(n)
    }
}

pub fn to_i64<F: PrimeField>(value: &F) -> Option<i64> {
    to_bigint(value).to_i64()
}

pub fn to_u64<F: PrimeField>(value: &F) -> Option<u64> {
    to_biguint(value).to_u64()
}
