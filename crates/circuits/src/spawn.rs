//! Spawn validity: a hidden point lies inside the world disc, matches a public commitment and
//! sits in the claimed terrain bucket.

use anyhow::{anyhow, Result};
use gadgets::multi_scale_perlin;
use halo2curves::bn256::Fr;
use r1cs::gadgets::assert_equal;
use r1cs::{Circuit, Driver, Wire};

use crate::config::World;
use crate::rules::{alloc_point, alloc_public, assert_coordinates, assert_inside_disc, commit};
use crate::types::{Point, SpawnPublic};

pub const SPAWN_PUBLIC_INPUTS: usize = 6;

pub struct SpawnCircuit<'a> {
    world: &'a World,
    witness: Option<(Point, SpawnPublic)>,
}

impl<'a> SpawnCircuit<'a> {
    pub const NAME: &'static str = "umbra-spawn";

    /// Structure only, for compilation and key generation.
    pub fn shape(world: &'a World) -> Self {
        Self { world, witness: None }
    }

    pub fn new(world: &'a World, point: Point, public: SpawnPublic) -> Self {
        Self { world, witness: Some((point, public)) }
    }
}

impl Circuit<Fr> for SpawnCircuit<'_> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn synthesize<D: Driver<F = Fr>>(&self, dr: &mut D) -> Result<()> {
        let inputs = self.witness.map(|(_, public)| public.to_field_elements());
        let public = alloc_public(dr, inputs.as_deref(), SPAWN_PUBLIC_INPUTS)?;
        let [r, scale, x_mirror, y_mirror, commitment, bucket]: [Wire<Fr>; SPAWN_PUBLIC_INPUTS] =
            public.try_into().map_err(|_| anyhow!("spawn public input count"))?;
        let p = alloc_point(dr, self.witness.map(|(p, _)| p))?;

        assert_coordinates(dr, &p)?;
        assert_inside_disc(dr, &p, &r)?;

        let hash = commit(dr, self.world.commitment_params(), &p)?;
        assert_equal(dr, "spawn_commitment", &hash, &commitment)?;

        let perlin = multi_scale_perlin(dr, self.world.noise_params(), &p, &scale, &x_mirror, &y_mirror)?;
        assert_equal(dr, "spawn_bucket", &perlin, &bucket)
    }
}
