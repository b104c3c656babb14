//! Bounded-magnitude proofs: `-max_abs <= v <= max_abs`.

use anyhow::{ensure, Context, Result};
use ff::PrimeField;
use r1cs::gadgets::assert_fits;
use r1cs::{Driver, Wire};

/// Constrain `0 <= v + max_abs <= 2 * max_abs`.
///
/// `v + max_abs` must fit in `num_bits + 1` bits and `max_abs` in `num_bits` bits; with both pinned
/// the remaining slack `2 * max_abs - (v + max_abs)` fitting in `num_bits + 1` bits is exactly the
/// upper bound. A constant `max_abs` wider than `num_bits` is rejected while building.
pub fn range_proof<D: Driver>(dr: &mut D, num_bits: usize, max_abs: &Wire<D::F>, v: &Wire<D::F>) -> Result<()> {
    ensure!(
        num_bits + 1 < D::F::CAPACITY as usize,
        "range proof width {} too large for the field",
        num_bits
    );
    assert_fits(dr, max_abs, num_bits).context("range proof bound does not fit its width")?;

    let shifted = v + max_abs;
    assert_fits(dr, &shifted, num_bits + 1).context("value below range proof bound")?;

    let slack = &max_abs.scale(D::F::from(2u64)) - &shifted;
    assert_fits(dr, &slack, num_bits + 1).context("value above range proof bound")
}

/// [`range_proof`] for every value in `values` with one shared bound.
pub fn multi_range_proof<D: Driver>(
    dr: &mut D,
    num_bits: usize,
    max_abs: &Wire<D::F>,
    values: &[Wire<D::F>],
) -> Result<()> {
    for v in values {
        range_proof(dr, num_bits, max_abs, v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo2curves::bn256::Fr;
    use r1cs::field::from_i64;
    use r1cs::{check_satisfied, R1csDriver};

    fn prove(max_abs: i64, v: i64) -> Result<()> {
        let mut dr = R1csDriver::<Fr>::prove();
        let m = dr.alloc_witness(|| Ok(from_i64(max_abs)))?;
        let x = dr.alloc_witness(|| Ok(from_i64(v)))?;
        range_proof(&mut dr, 64, &m, &x)?;
        check_satisfied(&dr.r1cs)?;
        Ok(())
    }

    #[test]
    fn accepts_values_inside_bound() {
        prove(3, 2).unwrap();
        prove(3, -3).unwrap();
        prove(3, 3).unwrap();
        prove(0, 0).unwrap();
        prove(1 << 40, -(1 << 40)).unwrap();
    }

    #[test]
    fn rejects_values_outside_bound() {
        assert!(prove(2, 3).is_err());
        assert!(prove(2, -3).is_err());
        assert!(prove(0, 1).is_err());
        assert!(prove(-1, 0).is_err());
    }

    #[test]
    fn error_names_the_violated_side() {
        let err = prove(2, 3).unwrap_err();
        assert!(format!("{:#}", err).contains("above"));
        let err = prove(2, -3).unwrap_err();
        assert!(format!("{:#}", err).contains("below"));
    }

    #[test]
    fn oversized_constant_bound_is_a_build_error() {
        let mut dr = R1csDriver::<Fr>::compile();
        let x = dr.alloc_witness(|| Ok(Fr::from(1u64))).unwrap();
        let bound = Wire::constant(Fr::from(1u64 << 8));
        assert!(range_proof(&mut dr, 8, &bound, &x).is_err());
        let bound = Wire::constant(Fr::from((1u64 << 8) - 1));
        assert!(range_proof(&mut dr, 8, &bound, &x).is_ok());
    }

    #[test]
    fn shared_bound_over_many_values() {
        let mut dr = R1csDriver::<Fr>::prove();
        let bound = Wire::constant(Fr::from(1u64 << 31));
        let values: Vec<_> = [0i64, -(1 << 31), (1 << 31), 12345]
            .iter()
            .map(|v| dr.alloc_witness(|| Ok(from_i64(*v))).unwrap())
            .collect();
        multi_range_proof(&mut dr, 35, &bound, &values).unwrap();
        check_satisfied(&dr.r1cs).unwrap();

        let over = dr.alloc_witness(|| Ok(from_i64((1 << 31) + 1))).unwrap();
        assert!(multi_range_proof(&mut dr, 35, &bound, &[over]).is_err());
    }
}
