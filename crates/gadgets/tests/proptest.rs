//! Property-based tests for the gadgets using proptest

use anyhow::Result;
use gadgets::perlin::reference;
use gadgets::{modulo, multi_scale_perlin, quin_select, range_proof, NoiseParams};
use halo2curves::bn256::Fr;
use num_bigint::BigInt;
use num_integer::Integer;
use proptest::prelude::*;
use r1cs::field::{from_i64, to_i64};
use r1cs::{check_satisfied, Driver, R1csDriver, Wire};

fn modulo_in_circuit(dividend: i64, divisor: i64) -> Result<(i64, i64)> {
    let mut dr = R1csDriver::<Fr>::prove();
    let a = dr.alloc_witness(|| Ok(from_i64(dividend)))?;
    let b = dr.alloc_witness(|| Ok(from_i64(divisor)))?;
    let (q, r) = modulo(&mut dr, &a, &b)?;
    check_satisfied(&dr.r1cs)?;
    let q = dr.value(&q).and_then(|v| to_i64(&v)).ok_or_else(|| anyhow::anyhow!("quotient"))?;
    let r = dr.value(&r).and_then(|v| to_i64(&v)).ok_or_else(|| anyhow::anyhow!("remainder"))?;
    Ok((q, r))
}

fn range_in_circuit(max_abs: i64, v: i64) -> bool {
    let mut dr = R1csDriver::<Fr>::prove();
    let built = (|| -> Result<()> {
        let m = dr.alloc_witness(|| Ok(from_i64(max_abs)))?;
        let x = dr.alloc_witness(|| Ok(from_i64(v)))?;
        range_proof(&mut dr, 40, &m, &x)
    })();
    built.is_ok() && check_satisfied(&dr.r1cs).is_ok()
}

fn bucket_in_circuit(params: &NoiseParams<Fr>, x: i64, y: i64, scale: u64, xm: bool, ym: bool) -> Result<Fr> {
    let mut dr = R1csDriver::<Fr>::prove();
    let px = dr.alloc_witness(|| Ok(from_i64(x)))?;
    let py = dr.alloc_witness(|| Ok(from_i64(y)))?;
    let s = dr.alloc_instance(|| Ok(Fr::from(scale)))?;
    let xm = dr.alloc_instance(|| Ok(Fr::from(u64::from(xm))))?;
    let ym = dr.alloc_instance(|| Ok(Fr::from(u64::from(ym))))?;
    let out = multi_scale_perlin(&mut dr, params, &[px, py], &s, &xm, &ym)?;
    check_satisfied(&dr.r1cs)?;
    dr.value(&out).ok_or_else(|| anyhow::anyhow!("bucket unassigned"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn modulo_matches_floor_division(dividend in -(1i64 << 62)..(1i64 << 62), divisor in 1i64..(1i64 << 40)) {
        let (q, r) = modulo_in_circuit(dividend, divisor).unwrap();
        prop_assert_eq!(dividend, divisor * q + r);
        prop_assert!(0 <= r && r < divisor);
        prop_assert_eq!(q, dividend.div_floor(&divisor));
        prop_assert_eq!(r, dividend.mod_floor(&divisor));
    }

    #[test]
    fn range_proof_holds_iff_within_bound(max_abs in 0i64..(1 << 20), v in -(1i64 << 21)..(1i64 << 21)) {
        prop_assert_eq!(range_in_circuit(max_abs, v), v.abs() <= max_abs);
    }

    #[test]
    fn quin_selector_picks_the_indexed_choice(choices in prop::collection::vec(any::<u64>(), 1..=31), seed in any::<usize>()) {
        let idx = seed % choices.len();
        let table: Vec<Wire<Fr>> = choices.iter().map(|c| Wire::constant(Fr::from(*c))).collect();
        let mut dr = R1csDriver::<Fr>::prove();
        let index = dr.alloc_witness(|| Ok(Fr::from(idx as u64))).unwrap();
        let out = quin_select(&mut dr, &index, &table).unwrap();
        prop_assert_eq!(dr.value(&out), Some(Fr::from(choices[idx])));
        prop_assert!(check_satisfied(&dr.r1cs).is_ok());
    }

    #[test]
    fn quin_selector_rejects_out_of_range_index(len in 1usize..=31, extra in 0u64..64) {
        let table: Vec<Wire<Fr>> = (0..len as u64).map(|c| Wire::constant(Fr::from(c))).collect();
        let mut dr = R1csDriver::<Fr>::prove();
        let index = dr.alloc_witness(|| Ok(Fr::from(len as u64 + extra))).unwrap();
        prop_assert!(quin_select(&mut dr, &index, &table).is_err());
    }
}

proptest! {
    // Each case synthesizes the full three-octave pipeline.
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn noise_in_circuit_matches_reference(
        x in -(1i64 << 31)..=(1i64 << 31),
        y in -(1i64 << 31)..=(1i64 << 31),
        log_scale in 4u32..=12,
        xm in any::<bool>(),
        ym in any::<bool>(),
    ) {
        let params = NoiseParams::<Fr>::new("7").unwrap();
        let scale = 1u64 << log_scale;
        let want = reference::multi_scale_perlin(&params, x, y, scale, xm, ym).unwrap();
        let got = bucket_in_circuit(&params, x, y, scale, xm, ym).unwrap();
        prop_assert_eq!(got, Fr::from(want));
    }

    #[test]
    fn single_octave_reference_is_exact(x in -5000i64..5000, y in -5000i64..5000, log_scale in 4u32..=14) {
        let params = NoiseParams::<Fr>::new("1").unwrap();
        let v = reference::single_scale_perlin(&params, x, y, 1u64 << log_scale).unwrap();
        // unit gradients keep every octave below D
        let bound = BigInt::from(gadgets::DENOMINATOR);
        prop_assert!(v.magnitude() <= bound.magnitude());
    }
}
