//! Constraint fragments shared by the spawn and move circuits.

use anyhow::{anyhow, Context, Result};
use gadgets::MimcParams;
use r1cs::field::{from_i64, pow2};
use r1cs::gadgets::{assert_fits, assert_le_bounded, square};
use r1cs::{Driver, Wire};

use crate::types::Point;

/// Width of the shifted coordinate `c + 2^31`.
pub(crate) const COORD_BITS: usize = 32;
/// Width of `r²`, `distMax²` and the disc comparison.
pub(crate) const SQUARE_BITS: usize = 64;
/// Width of the travel comparison; a squared distance between valid points fits 66 bits.
pub(crate) const DISTANCE_BITS: usize = 66;

/// Allocate `n` public inputs in order. `values` is only read when assigning a witness.
pub(crate) fn alloc_public<D: Driver>(dr: &mut D, values: Option<&[D::F]>, n: usize) -> Result<Vec<Wire<D::F>>> {
    (0..n)
        .map(|i| {
            dr.alloc_instance(|| {
                values
                    .and_then(|v| v.get(i).copied())
                    .ok_or_else(|| anyhow!("public input {} has no value", i))
            })
        })
        .collect()
}

pub(crate) fn alloc_point<D: Driver>(dr: &mut D, p: Option<Point>) -> Result<[Wire<D::F>; 2]> {
    let x = dr.alloc_witness(|| p.map(|p| from_i64(p.x)).ok_or_else(|| anyhow!("point has no value")))?;
    let y = dr.alloc_witness(|| p.map(|p| from_i64(p.y)).ok_or_else(|| anyhow!("point has no value")))?;
    Ok([x, y])
}

/// `-2^31 <= c < 2^31` for both coordinates.
pub(crate) fn assert_coordinates<D: Driver>(dr: &mut D, p: &[Wire<D::F>; 2]) -> Result<()> {
    let shift = pow2::<D::F>(COORD_BITS as u32 - 1);
    for c in p {
        assert_fits(dr, &c.add_constant(shift), COORD_BITS).context("coordinate out of range")?;
    }
    Ok(())
}

/// `x² + y² <= r² - 1`, with `r²` limited to 64 bits.
pub(crate) fn assert_inside_disc<D: Driver>(dr: &mut D, p: &[Wire<D::F>; 2], r: &Wire<D::F>) -> Result<()> {
    let r2 = square(dr, r)?;
    assert_fits(dr, &r2, SQUARE_BITS).context("radius too large")?;
    let norm = square(dr, &p[0])? + &square(dr, &p[1])?;
    assert_le_bounded(dr, &norm, &r2.add_constant(from_i64(-1)), SQUARE_BITS).context("point outside the world disc")
}

/// `|a - b|² <= distMax²`, with `distMax²` limited to 64 bits.
pub(crate) fn assert_within_distance<D: Driver>(
    dr: &mut D,
    a: &[Wire<D::F>; 2],
    b: &[Wire<D::F>; 2],
    dist_max: &Wire<D::F>,
) -> Result<()> {
    let max2 = square(dr, dist_max)?;
    assert_fits(dr, &max2, SQUARE_BITS).context("travel budget too large")?;
    let dx = &a[0] - &b[0];
    let dy = &a[1] - &b[1];
    let dist2 = square(dr, &dx)? + &square(dr, &dy)?;
    assert_le_bounded(dr, &dist2, &max2, DISTANCE_BITS).context("move exceeds the travel budget")
}

pub(crate) fn commit<D: Driver>(dr: &mut D, params: &MimcParams<D::F>, p: &[Wire<D::F>; 2]) -> Result<Wire<D::F>> {
    let mut hasher = params.hasher();
    hasher.write(&p[0]);
    hasher.write(&p[1]);
    hasher.sum(dr)
}
