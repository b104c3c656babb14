#![forbid(unsafe_code)]
//! # circuits
//!
//! Spawn and move validity proofs for hidden world coordinates.
//!
//! A player proves that a point they keep private lies inside the world disc, hashes to a public
//! commitment and falls into a public terrain bucket (spawn), or that a second private point
//! additionally lies within a travel budget of the first (move). Proofs are Groth16 over BN254.

use std::path::Path;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, warn};

pub mod config;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod moves;
mod rules;
pub mod spawn;
pub mod types;

pub use crate::config::{World, WorldConfig};
pub use crate::envelope::{MoveClaim, SpawnClaim};
pub use crate::error::{Error, Result};
pub use crate::keys::CircuitKeys;
pub use crate::moves::MoveCircuit;
pub use crate::spawn::SpawnCircuit;
pub use crate::types::{Commitment, MovePublic, Point, SpawnPublic, Terrain};

/// A spawn proof with the public inputs it was made for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnProof {
    pub public: SpawnPublic,
    pub proof: Vec<u8>,
}

/// A move proof with the public inputs it was made for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveProof {
    pub public: MovePublic,
    pub proof: Vec<u8>,
}

/// World parameters bundled with spawn and move keys.
#[derive(Clone)]
pub struct Prover {
    world: World,
    spawn: CircuitKeys,
    moves: CircuitKeys,
}

impl Prover {
    pub fn setup(config: WorldConfig) -> Result<Self> {
        Self::setup_with_rng(config, &mut OsRng)
    }

    pub fn setup_with_rng<R: RngCore + CryptoRng>(config: WorldConfig, rng: &mut R) -> Result<Self> {
        let world = World::new(config)?;
        let spawn = CircuitKeys::setup(&SpawnCircuit::shape(&world), rng)?;
        let moves = CircuitKeys::setup(&MoveCircuit::shape(&world), rng)?;
        Ok(Self { world, spawn, moves })
    }

    /// Load keys from `dir`, generating and saving any that are missing.
    pub fn load_or_setup<P: AsRef<Path>>(dir: P, config: WorldConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let world = World::new(config)?;
        let spawn = CircuitKeys::load_or_setup(dir, &SpawnCircuit::shape(&world), &mut OsRng)?;
        let moves = CircuitKeys::load_or_setup(dir, &MoveCircuit::shape(&world), &mut OsRng)?;
        Ok(Self { world, spawn, moves })
    }

    /// Load keys from `dir` without generating any; verifiers use this.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P, config: WorldConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let world = World::new(config)?;
        let spawn = CircuitKeys::load_from_dir(dir, &SpawnCircuit::shape(&world))?;
        let moves = CircuitKeys::load_from_dir(dir, &MoveCircuit::shape(&world))?;
        Ok(Self { world, spawn, moves })
    }

    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        self.spawn.save_to_dir(dir, &SpawnCircuit::shape(&self.world))?;
        self.moves.save_to_dir(dir, &MoveCircuit::shape(&self.world))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn spawn_keys(&self) -> &CircuitKeys {
        &self.spawn
    }

    pub fn move_keys(&self) -> &CircuitKeys {
        &self.moves
    }

    fn check_radius(&self, radius: u64) -> Result<()> {
        let max = self.world.config().radius_max;
        if radius == 0 || radius > max {
            return Err(Error::InvalidInput(format!("radius {} outside 1..={}", radius, max)));
        }
        Ok(())
    }

    /// Prove that `point` is a valid spawn inside `radius` under `terrain`.
    pub fn prove_spawn(&self, point: Point, radius: u64, terrain: Terrain) -> Result<SpawnProof> {
        self.prove_spawn_with_rng(point, radius, terrain, &mut OsRng)
    }

    pub fn prove_spawn_with_rng<R: RngCore + CryptoRng>(
        &self,
        point: Point,
        radius: u64,
        terrain: Terrain,
        rng: &mut R,
    ) -> Result<SpawnProof> {
        point.validate()?;
        self.check_radius(radius)?;
        let public = SpawnPublic {
            radius,
            terrain,
            commitment: self.world.commit(&point),
            bucket: self.world.bucket(&point, &terrain)?,
        };
        debug!(commitment = %public.commitment, bucket = public.bucket, "proving spawn");
        let proof = self.spawn.prove(&SpawnCircuit::new(&self.world, point, public), rng)?;
        Ok(SpawnProof { public, proof })
    }

    /// `false` also when the claimed radius exceeds this world's `radius_max`.
    pub fn verify_spawn(&self, public: &SpawnPublic, proof: &[u8]) -> bool {
        if let Err(e) = self.check_radius(public.radius) {
            warn!(error = %e, "spawn claim rejected");
            return false;
        }
        let ok = self.spawn.verify(&public.to_field_elements(), proof);
        if !ok {
            warn!(commitment = %public.commitment, "spawn proof rejected");
        }
        ok
    }

    /// Prove a move from `from` to `to` within `dist_max`, landing inside `radius`.
    pub fn prove_move(&self, from: Point, to: Point, radius: u64, dist_max: u64, terrain: Terrain) -> Result<MoveProof> {
        self.prove_move_with_rng(from, to, radius, dist_max, terrain, &mut OsRng)
    }

    pub fn prove_move_with_rng<R: RngCore + CryptoRng>(
        &self,
        from: Point,
        to: Point,
        radius: u64,
        dist_max: u64,
        terrain: Terrain,
        rng: &mut R,
    ) -> Result<MoveProof> {
        from.validate()?;
        to.validate()?;
        self.check_radius(radius)?;
        let public = MovePublic {
            radius,
            dist_max,
            terrain,
            from: self.world.commit(&from),
            to: self.world.commit(&to),
            bucket_to: self.world.bucket(&to, &terrain)?,
        };
        debug!(from = %public.from, to = %public.to, bucket = public.bucket_to, "proving move");
        let proof = self.moves.prove(&MoveCircuit::new(&self.world, from, to, public), rng)?;
        Ok(MoveProof { public, proof })
    }

    pub fn verify_move(&self, public: &MovePublic, proof: &[u8]) -> bool {
        if let Err(e) = self.check_radius(public.radius) {
            warn!(error = %e, "move claim rejected");
            return false;
        }
        let ok = self.moves.verify(&public.to_field_elements(), proof);
        if !ok {
            warn!(from = %public.from, to = %public.to, "move proof rejected");
        }
        ok
    }
}
