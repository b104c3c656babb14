//! Branch-free table lookup by an in-circuit index.

use anyhow::{ensure, Context, Result};
use ff::PrimeField;
use r1cs::gadgets::{assert_fits, is_equal, mul};
use r1cs::{Driver, Wire};

/// Largest table a selector accepts; the table length must fit in [`INDEX_BITS`] bits.
pub const MAX_CHOICES: usize = 31;
pub const INDEX_BITS: usize = 5;

/// Equality indicators `[index == i]` for `i` in `0..n`, with `index < n` enforced.
///
/// Building the indicators once lets several tables share one index.
pub struct QuinSelector<F: PrimeField> {
    hits: Vec<Wire<F>>,
}

impl<F: PrimeField> QuinSelector<F> {
    pub fn new<D: Driver<F = F>>(dr: &mut D, index: &Wire<F>, n: usize) -> Result<Self> {
        ensure!(
            (1..=MAX_CHOICES).contains(&n),
            "quin selector needs between 1 and {} choices, got {}",
            MAX_CHOICES,
            n
        );
        assert_fits(dr, index, INDEX_BITS).context("selector index out of range")?;
        // index <= n - 1
        let last = Wire::constant(F::from((n - 1) as u64));
        assert_fits(dr, &(&last - index), INDEX_BITS).context("selector index past the end of the table")?;

        let mut hits = Vec::with_capacity(n);
        for i in 0..n {
            hits.push(is_equal(dr, index, &Wire::constant(F::from(i as u64)))?);
        }
        Ok(Self { hits })
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// `Σ choices[i] · [index == i]`. Constant choices cost no constraints.
    pub fn select<D: Driver<F = F>>(&self, dr: &mut D, choices: &[Wire<F>]) -> Result<Wire<F>> {
        ensure!(
            choices.len() == self.hits.len(),
            "selector built for {} choices, table has {}",
            self.hits.len(),
            choices.len()
        );
        let mut picked = Vec::with_capacity(choices.len());
        for (hit, choice) in self.hits.iter().zip(choices) {
            picked.push(mul(dr, hit, choice)?);
        }
        Ok(Wire::linear_sum(picked.iter().map(|w| (w, F::ONE))))
    }
}

/// `choices[index]` for `0 <= index < choices.len() <= 31`; any other index is unprovable.
pub fn quin_select<D: Driver>(dr: &mut D, index: &Wire<D::F>, choices: &[Wire<D::F>]) -> Result<Wire<D::F>> {
    QuinSelector::new(dr, index, choices.len())?.select(dr, choices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo2curves::bn256::Fr;
    use r1cs::{check_satisfied, R1csDriver, SatisfactionError};

    use crate::testing::{truncated_bits, ForgingDriver};

    fn table(values: &[u64]) -> Vec<Wire<Fr>> {
        values.iter().map(|v| Wire::constant(Fr::from(*v))).collect()
    }

    #[test]
    fn selects_every_index() {
        let choices = table(&[10, 20, 30, 40, 50]);
        for i in 0..choices.len() {
            let mut dr = R1csDriver::<Fr>::prove();
            let idx = dr.alloc_witness(|| Ok(Fr::from(i as u64))).unwrap();
            let out = quin_select(&mut dr, &idx, &choices).unwrap();
            assert_eq!(dr.value(&out), Some(Fr::from(10 * (i as u64 + 1))));
            check_satisfied(&dr.r1cs).unwrap();
        }
    }

    #[test]
    fn index_at_or_past_the_end_is_unprovable() {
        let choices = table(&[1, 2, 3]);
        for i in [3u64, 4, 31, 32, 1000] {
            let mut dr = R1csDriver::<Fr>::prove();
            let idx = dr.alloc_witness(|| Ok(Fr::from(i))).unwrap();
            assert!(quin_select(&mut dr, &idx, &choices).is_err(), "index {}", i);
        }
    }

    #[test]
    fn index_past_the_end_violates_the_bound() {
        let mut dr = ForgingDriver::<Fr>::new(&[("bit_decomposition", truncated_bits::<Fr>)]);
        let idx = dr.alloc_witness(|| Ok(Fr::from(3u64))).unwrap();
        let out = quin_select(&mut dr, &idx, &table(&[1, 2, 3])).unwrap();
        assert_eq!(dr.value(&out), Some(Fr::from(0u64)));

        // each decomposition is INDEX_BITS booleans and a recomposition; the second covers (n - 1) - index
        let rec = &dr.inner.r1cs;
        let id = 2 * (INDEX_BITS as u64 + 1) - 1;
        assert_eq!(
            check_satisfied(rec),
            Err(SatisfactionError::Unsatisfied { id, label: "bits_recompose".into() })
        );
    }

    #[test]
    fn table_size_is_checked_while_building() {
        let mut dr = R1csDriver::<Fr>::compile();
        let idx = dr.alloc_witness(|| Ok(Fr::from(0u64))).unwrap();
        assert!(quin_select(&mut dr, &idx, &table(&[7; 32])).is_err());
        assert!(quin_select(&mut dr, &idx, &[]).is_err());
        assert!(quin_select(&mut dr, &idx, &table(&[7; 31])).is_ok());
    }

    #[test]
    fn shared_selector_over_two_tables() {
        let mut dr = R1csDriver::<Fr>::prove();
        let idx = dr.alloc_witness(|| Ok(Fr::from(2u64))).unwrap();
        let sel = QuinSelector::new(&mut dr, &idx, 4).unwrap();
        let xs = sel.select(&mut dr, &table(&[0, 1, 2, 3])).unwrap();
        let ys = sel.select(&mut dr, &table(&[9, 8, 7, 6])).unwrap();
        assert_eq!(dr.value(&xs), Some(Fr::from(2u64)));
        assert_eq!(dr.value(&ys), Some(Fr::from(7u64)));
        assert!(sel.select(&mut dr, &table(&[1])).is_err());
        check_satisfied(&dr.r1cs).unwrap();
    }

    #[test]
    fn variable_choices_are_selected() {
        let mut dr = R1csDriver::<Fr>::prove();
        let idx = dr.alloc_witness(|| Ok(Fr::from(1u64))).unwrap();
        let a = dr.alloc_witness(|| Ok(Fr::from(5u64))).unwrap();
        let b = dr.alloc_witness(|| Ok(Fr::from(6u64))).unwrap();
        let out = quin_select(&mut dr, &idx, &[a, b]).unwrap();
        assert_eq!(dr.value(&out), Some(Fr::from(6u64)));
        check_satisfied(&dr.r1cs).unwrap();
    }
}
