//! Multi-octave gradient noise built from field operations.
//!
//! Fixed-point values carry an implicit [`DENOMINATOR`]; every division below is a field
//! division that is exact for power-of-two scales up to [`MAX_SCALE`], which keeps the
//! in-circuit result identical to the integer arithmetic in [`reference`].

use anyhow::{anyhow, Result};
use ff::PrimeField;
use r1cs::field::{from_i64, pow2};
use r1cs::gadgets::{assert_boolean, div, from_bits, mul, to_bits_canonical};
use r1cs::{Driver, Wire};

use crate::mimc::{MimcParams, NOISE_ROUNDS};
use crate::modulo::{is_negative, modulo};
use crate::quin_selector::QuinSelector;
use crate::range_proof::multi_range_proof;

/// 2^50 · 1000: fixed-point denominator, good for scales up to 16384.
pub const DENOMINATOR: u64 = 1_125_899_906_842_624_000;

/// Largest supported base scale.
pub const MAX_SCALE: u64 = 16384;

/// Coordinates are bounded by `|c| <= 2^COORD_BOUND_LOG2`.
pub const COORD_BOUND_LOG2: u32 = 31;

/// Width of the coordinate range proof.
pub const COORD_RANGE_BITS: usize = 35;

/// Unit vectors at 22.5° steps, numerators over 1000.
pub const GRADIENTS: [(i64, i64); 16] = [
    (1000, 0),
    (923, 382),
    (707, 707),
    (382, 923),
    (0, 1000),
    (-383, 923),
    (-708, 707),
    (-924, 382),
    (-1000, 0),
    (-924, -383),
    (-708, -708),
    (-383, -924),
    (-1, -1000),
    (382, -924),
    (707, -708),
    (923, -383),
];

/// Noise configuration: the keyed MiMC used for corner nibbles.
#[derive(Clone, Debug)]
pub struct NoiseParams<F: PrimeField> {
    mimc: MimcParams<F>,
}

impl<F: PrimeField> NoiseParams<F> {
    /// Noise keyed by `key` with the standard [`NOISE_ROUNDS`].
    pub fn new(key: &str) -> Result<Self> {
        Self::with_rounds(key, NOISE_ROUNDS)
    }

    pub fn with_rounds(key: &str, rounds: usize) -> Result<Self> {
        Ok(Self { mimc: MimcParams::new(key, rounds)? })
    }

    pub fn key(&self) -> &str {
        self.mimc.seed()
    }

    pub fn mimc(&self) -> &MimcParams<F> {
        &self.mimc
    }
}

type Point<F> = [Wire<F>; 2];

fn denominator<F: PrimeField>() -> Wire<F> {
    Wire::constant(F::from(DENOMINATOR))
}

/// Pseudo-random integer in `[0, 16)`: the low 4 bits of `MiMC(x, y, scale)`.
pub fn random_nibble<D: Driver>(
    dr: &mut D,
    params: &NoiseParams<D::F>,
    x: &Wire<D::F>,
    y: &Wire<D::F>,
    scale: &Wire<D::F>,
) -> Result<Wire<D::F>> {
    let mut hasher = params.mimc.hasher();
    hasher.write(x);
    hasher.write(y);
    hasher.write(scale);
    let digest = hasher.sum(dr)?;
    let bits = to_bits_canonical(dr, &digest)?;
    Ok(from_bits(&bits[..4]))
}

/// Gradient numerators (over [`DENOMINATOR`]) at a grid point.
pub fn gradient_at<D: Driver>(
    dr: &mut D,
    params: &NoiseParams<D::F>,
    x: &Wire<D::F>,
    y: &Wire<D::F>,
    scale: &Wire<D::F>,
) -> Result<Point<D::F>> {
    let nibble = random_nibble(dr, params, x, y, scale)?;
    let unit = from_i64::<D::F>((DENOMINATOR / 1000) as i64);
    let xs: Vec<_> = GRADIENTS.iter().map(|g| Wire::constant(from_i64::<D::F>(g.0) * unit)).collect();
    let ys: Vec<_> = GRADIENTS.iter().map(|g| Wire::constant(from_i64::<D::F>(g.1) * unit)).collect();
    let selector = QuinSelector::new(dr, &nibble, GRADIENTS.len())?;
    Ok([selector.select(dr, &xs)?, selector.select(dr, &ys)?])
}

/// Corners of the `scale`-sided cell containing `p` (bottom-left, bottom-right, top-left,
/// top-right) and the gradient at each.
pub fn corners_and_gradients<D: Driver>(
    dr: &mut D,
    params: &NoiseParams<D::F>,
    p: &Point<D::F>,
    scale: &Wire<D::F>,
) -> Result<([Point<D::F>; 4], [Point<D::F>; 4])> {
    let (_, rx) = modulo(dr, &p[0], scale)?;
    let (_, ry) = modulo(dr, &p[1], scale)?;
    let left = &p[0] - &rx;
    let bottom = &p[1] - &ry;
    let right = &left + scale;
    let top = &bottom + scale;

    let corners = [
        [left.clone(), bottom.clone()],
        [right.clone(), bottom],
        [left, top.clone()],
        [right, top],
    ];
    let mut grads = Vec::with_capacity(4);
    for c in &corners {
        grads.push(gradient_at(dr, params, &c[0], &c[1], scale)?);
    }
    let grads: [Point<D::F>; 4] = grads.try_into().map_err(|_| anyhow!("expected four gradients"))?;
    Ok((corners, grads))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::BottomLeft, Corner::BottomRight, Corner::TopLeft, Corner::TopRight];

    /// Distance of the point from this corner, oriented towards the cell interior.
    fn diff<F: PrimeField>(self, corner: &Point<F>, point: &Point<F>) -> Point<F> {
        let dx = &point[0] - &corner[0];
        let dy = &point[1] - &corner[1];
        match self {
            Corner::BottomLeft => [dx, dy],
            Corner::BottomRight => [-&dx, dy],
            Corner::TopLeft => [dx, -&dy],
            Corner::TopRight => [-&dx, -&dy],
        }
    }
}

/// Bilinear weight `(D - diff.x)(D - diff.y) / D`.
pub fn weight<D: Driver>(dr: &mut D, diff: &Point<D::F>) -> Result<Wire<D::F>> {
    let d = denominator::<D::F>();
    let prod = mul(dr, &(&d - &diff[0]), &(&d - &diff[1]))?;
    div(dr, &prod, &d)
}

/// Fixed-point dot product `(a · b) / D`.
pub fn dot<D: Driver>(dr: &mut D, a: &Point<D::F>, b: &Point<D::F>) -> Result<Wire<D::F>> {
    let x = mul(dr, &a[0], &b[0])?;
    let y = mul(dr, &a[1], &b[1])?;
    div(dr, &(x + &y), &denominator())
}

/// Interpolated noise value for `p` from the four cell corners. `p` and `corners` are already
/// multiplied by [`DENOMINATOR`]; `grads` are numerators.
pub fn perlin_value<D: Driver>(
    dr: &mut D,
    corners: &[Point<D::F>; 4],
    grads: &[Point<D::F>; 4],
    scale: &Wire<D::F>,
    p: &Point<D::F>,
) -> Result<Wire<D::F>> {
    let d = denominator::<D::F>();
    let q = [div(dr, &p[0], scale)?, div(dr, &p[1], scale)?];
    let mut total = Wire::zero();
    for ((corner, c), g) in Corner::ALL.iter().zip(corners).zip(grads) {
        let k = [div(dr, &c[0], scale)?, div(dr, &c[1], scale)?];
        let w = weight(dr, &corner.diff(&k, &q))?;
        // (p - c) / scale == q - k
        let dist = [&q[0] - &k[0], &q[1] - &k[1]];
        let dp = dot(dr, g, &dist)?;
        let contribution = mul(dr, &dp, &w)?;
        total = total + &div(dr, &contribution, &d)?;
    }
    Ok(total)
}

/// Noise value of `p` at one octave.
pub fn single_scale_perlin<D: Driver>(
    dr: &mut D,
    params: &NoiseParams<D::F>,
    p: &Point<D::F>,
    scale: &Wire<D::F>,
) -> Result<Wire<D::F>> {
    let (corners, grads) = corners_and_gradients(dr, params, p, scale)?;
    let d = D::F::from(DENOMINATOR);
    let scaled_p = [p[0].scale(d), p[1].scale(d)];
    let scaled_corners = corners.map(|c| [c[0].scale(d), c[1].scale(d)]);
    perlin_value(dr, &scaled_corners, &grads, scale, &scaled_p)
}

/// Terrain bucket of `p`.
///
/// Mirror flags must be boolean. `x` is reflected when it is negative and `y_mirror` is set,
/// `y` when it is negative and `x_mirror` is set. Octaves `scale`, `2·scale` and `4·scale` are
/// summed with the base octave counted twice, averaged, and mapped to
/// `⌊16 · average / D⌋ + 16`.
pub fn multi_scale_perlin<D: Driver>(
    dr: &mut D,
    params: &NoiseParams<D::F>,
    p: &Point<D::F>,
    scale: &Wire<D::F>,
    x_mirror: &Wire<D::F>,
    y_mirror: &Wire<D::F>,
) -> Result<Wire<D::F>> {
    assert_boolean(dr, x_mirror)?;
    assert_boolean(dr, y_mirror)?;
    let bound = Wire::constant(pow2::<D::F>(COORD_BOUND_LOG2));
    multi_range_proof(dr, COORD_RANGE_BITS, &bound, p)?;

    let two = D::F::from(2u64);
    let x_neg = is_negative(dr, &p[0])?;
    let flip_x = mul(dr, &x_neg, y_mirror)?;
    let x = mul(dr, &p[0], &(Wire::one() - &flip_x.scale(two)))?;
    let y_neg = is_negative(dr, &p[1])?;
    let flip_y = mul(dr, &y_neg, x_mirror)?;
    let y = mul(dr, &p[1], &(Wire::one() - &flip_y.scale(two)))?;
    let adjusted = [x, y];

    let base = single_scale_perlin(dr, params, &adjusted, scale)?;
    let mut total = base.scale(two);
    for shift in 1..3u32 {
        let octave = scale.scale(pow2(shift));
        let v = single_scale_perlin(dr, params, &adjusted, &octave)?;
        total = total + &v;
    }

    let average = div(dr, &total, &Wire::constant(D::F::from(4u64)))?;
    let (quotient, _) = modulo(dr, &average.scale(D::F::from(16u64)), &denominator())?;
    Ok(quotient.add_constant(D::F::from(16u64)))
}

/// Integer evaluation of the same pipeline, used to produce public inputs off-circuit.
pub mod reference {
    use super::{NoiseParams, COORD_BOUND_LOG2, DENOMINATOR, GRADIENTS, MAX_SCALE};
    use anyhow::{bail, ensure, Result};
    use ff::PrimeField;
    use num_bigint::BigInt;
    use num_integer::Integer;
    use num_traits::{ToPrimitive, Zero};
    use r1cs::field::{from_bigint, to_biguint};

    fn exact_div(a: &BigInt, b: &BigInt) -> Result<BigInt> {
        let (q, r) = a.div_rem(b);
        ensure!(r.is_zero(), "{} is not divisible by {}", a, b);
        Ok(q)
    }

    fn check_scale(scale: u64, max: u64) -> Result<()> {
        ensure!(scale.is_power_of_two() && scale <= max, "scale {} must be a power of two at most {}", scale, max);
        Ok(())
    }

    pub fn check_coordinate(c: i64) -> Result<()> {
        let bound = 1i64 << COORD_BOUND_LOG2;
        ensure!((-bound..=bound).contains(&c), "coordinate {} outside ±2^{}", c, COORD_BOUND_LOG2);
        Ok(())
    }

    pub fn random_nibble<F: PrimeField>(params: &NoiseParams<F>, x: &BigInt, y: &BigInt, scale: u64) -> u8 {
        let digest = params.mimc().hash(&[from_bigint(x), from_bigint(y), F::from(scale)]);
        let low = to_biguint(&digest) % 16u32;
        low.to_u8().unwrap_or_default()
    }

    pub fn gradient_at<F: PrimeField>(params: &NoiseParams<F>, x: &BigInt, y: &BigInt, scale: u64) -> [BigInt; 2] {
        let (gx, gy) = GRADIENTS[random_nibble(params, x, y, scale) as usize];
        let unit = BigInt::from(DENOMINATOR / 1000);
        [&unit * gx, &unit * gy]
    }

    /// Noise value of `(x, y)` at one octave; `scale` is a power of two up to `4 · MAX_SCALE`.
    pub fn single_scale_perlin<F: PrimeField>(params: &NoiseParams<F>, x: i64, y: i64, scale: u64) -> Result<BigInt> {
        check_scale(scale, 4 * MAX_SCALE)?;
        let d = BigInt::from(DENOMINATOR);
        let s = BigInt::from(scale);
        let p = [BigInt::from(x), BigInt::from(y)];
        let left = &p[0] - p[0].mod_floor(&s);
        let bottom = &p[1] - p[1].mod_floor(&s);
        let right = &left + &s;
        let top = &bottom + &s;
        let corners = [
            [left.clone(), bottom.clone()],
            [right.clone(), bottom],
            [left, top.clone()],
            [right, top],
        ];

        let q = [exact_div(&(&d * &p[0]), &s)?, exact_div(&(&d * &p[1]), &s)?];
        let mut total = BigInt::zero();
        for (i, c) in corners.iter().enumerate() {
            let g = gradient_at(params, &c[0], &c[1], scale);
            let k = [exact_div(&(&d * &c[0]), &s)?, exact_div(&(&d * &c[1]), &s)?];
            let dist = [&q[0] - &k[0], &q[1] - &k[1]];
            let diff = match i {
                0 => [dist[0].clone(), dist[1].clone()],
                1 => [-&dist[0], dist[1].clone()],
                2 => [dist[0].clone(), -&dist[1]],
                3 => [-&dist[0], -&dist[1]],
                _ => bail!("a cell has four corners"),
            };
            let w = exact_div(&((&d - &diff[0]) * (&d - &diff[1])), &d)?;
            let dot = exact_div(&(&g[0] * &dist[0] + &g[1] * &dist[1]), &d)?;
            total += exact_div(&(dot * w), &d)?;
        }
        Ok(total)
    }

    /// Terrain bucket of `(x, y)`, matching the in-circuit [`super::multi_scale_perlin`].
    pub fn multi_scale_perlin<F: PrimeField>(
        params: &NoiseParams<F>,
        x: i64,
        y: i64,
        scale: u64,
        x_mirror: bool,
        y_mirror: bool,
    ) -> Result<u64> {
        check_coordinate(x)?;
        check_coordinate(y)?;
        check_scale(scale, MAX_SCALE)?;
        let x = if x < 0 && y_mirror { -x } else { x };
        let y = if y < 0 && x_mirror { -y } else { y };

        let total = single_scale_perlin(params, x, y, scale)? * 2u32
            + single_scale_perlin(params, x, y, 2 * scale)?
            + single_scale_perlin(params, x, y, 4 * scale)?;
        // 16 · (total / 4) in the field is exactly 4 · total
        let bucket = (total * 4u32).div_floor(&BigInt::from(DENOMINATOR)) + 16u32;
        bucket.to_u64().ok_or_else(|| anyhow::anyhow!("bucket {} out of range", bucket))
    }
}
