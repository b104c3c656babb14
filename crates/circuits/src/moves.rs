//! Move validity: two hidden points match their public commitments, the destination lies inside
//! the world disc and within the travel budget of the origin, and sits in the claimed bucket.
//!
//! The origin is not re-checked against the disc; it was certified when it was entered.

use anyhow::{anyhow, Result};
use gadgets::multi_scale_perlin;
use halo2curves::bn256::Fr;
use r1cs::gadgets::assert_equal;
use r1cs::{Circuit, Driver, Wire};

use crate::config::World;
use crate::rules::{alloc_point, alloc_public, assert_coordinates, assert_inside_disc, assert_within_distance, commit};
use crate::types::{MovePublic, Point};

pub const MOVE_PUBLIC_INPUTS: usize = 8;

#[derive(Clone, Copy, Debug)]
struct MoveWitness {
    from: Point,
    to: Point,
    public: MovePublic,
}

pub struct MoveCircuit<'a> {
    world: &'a World,
    witness: Option<MoveWitness>,
}

impl<'a> MoveCircuit<'a> {
    pub const NAME: &'static str = "umbra-move";

    /// Structure only, for compilation and key generation.
    pub fn shape(world: &'a World) -> Self {
        Self { world, witness: None }
    }

    pub fn new(world: &'a World, from: Point, to: Point, public: MovePublic) -> Self {
        Self { world, witness: Some(MoveWitness { from, to, public }) }
    }
}

impl Circuit<Fr> for MoveCircuit<'_> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn synthesize<D: Driver<F = Fr>>(&self, dr: &mut D) -> Result<()> {
        let inputs = self.witness.map(|w| w.public.to_field_elements());
        let public = alloc_public(dr, inputs.as_deref(), MOVE_PUBLIC_INPUTS)?;
        let [r, dist_max, scale, x_mirror, y_mirror, from_hash, to_hash, bucket]: [Wire<Fr>; MOVE_PUBLIC_INPUTS] =
            public.try_into().map_err(|_| anyhow!("move public input count"))?;
        let from = alloc_point(dr, self.witness.map(|w| w.from))?;
        let to = alloc_point(dr, self.witness.map(|w| w.to))?;

        assert_coordinates(dr, &from)?;
        assert_coordinates(dr, &to)?;
        assert_inside_disc(dr, &to, &r)?;
        assert_within_distance(dr, &from, &to, &dist_max)?;

        let params = self.world.commitment_params();
        let hash = commit(dr, params, &from)?;
        assert_equal(dr, "move_commitment_from", &hash, &from_hash)?;
        let hash = commit(dr, params, &to)?;
        assert_equal(dr, "move_commitment_to", &hash, &to_hash)?;

        let perlin = multi_scale_perlin(dr, self.world.noise_params(), &to, &scale, &x_mirror, &y_mirror)?;
        assert_equal(dr, "move_bucket", &perlin, &bucket)
    }
}
