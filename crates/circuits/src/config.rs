//! World configuration: hash and noise keys plus the terrain settings every proof is checked
//! against.

use std::path::Path;

use gadgets::perlin::reference;
use gadgets::{MimcParams, NoiseParams, MAX_SCALE};
use halo2curves::bn256::Fr;
use r1cs::field::from_i64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Commitment, Point, Terrain};

/// World constants shared by provers and verifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// MiMC seed for coordinate commitments
    pub planet_hash_key: String,
    pub planet_hash_rounds: usize,
    /// MiMC seed for the terrain noise
    pub space_type_key: String,
    pub space_type_rounds: usize,
    pub scale: u64,
    pub x_mirror: bool,
    pub y_mirror: bool,
    /// Largest radius a prover may claim
    pub radius_max: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            planet_hash_key: "1".to_string(),
            planet_hash_rounds: gadgets::COMMITMENT_ROUNDS,
            space_type_key: "1".to_string(),
            space_type_rounds: gadgets::NOISE_ROUNDS,
            scale: 256,
            x_mirror: false,
            y_mirror: false,
            radius_max: 2000,
        }
    }
}

impl WorldConfig {
    /// Defaults overlaid with environment variables, see [`WorldConfig::with_env_overrides`].
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay environment variables onto `self`. Unset or unparsable values keep the current one.
    ///
    /// Supported variables:
    /// - UMBRA_PLANET_HASH_KEY
    /// - UMBRA_PLANET_HASH_ROUNDS
    /// - UMBRA_SPACE_TYPE_KEY
    /// - UMBRA_SPACE_TYPE_ROUNDS
    /// - UMBRA_SCALE
    /// - UMBRA_X_MIRROR / UMBRA_Y_MIRROR ("1" or "true")
    /// - UMBRA_RADIUS_MAX
    pub fn with_env_overrides(mut self) -> Self {
        let get = |key: &str| std::env::var(key).ok();
        let flag = |s: String| matches!(s.trim(), "1" | "true");

        if let Some(v) = get("UMBRA_PLANET_HASH_KEY") {
            self.planet_hash_key = v;
        }
        if let Some(v) = get("UMBRA_PLANET_HASH_ROUNDS").and_then(|s| s.parse().ok()) {
            self.planet_hash_rounds = v;
        }
        if let Some(v) = get("UMBRA_SPACE_TYPE_KEY") {
            self.space_type_key = v;
        }
        if let Some(v) = get("UMBRA_SPACE_TYPE_ROUNDS").and_then(|s| s.parse().ok()) {
            self.space_type_rounds = v;
        }
        if let Some(v) = get("UMBRA_SCALE").and_then(|s| s.parse().ok()) {
            self.scale = v;
        }
        if let Some(v) = get("UMBRA_X_MIRROR") {
            self.x_mirror = flag(v);
        }
        if let Some(v) = get("UMBRA_Y_MIRROR") {
            self.y_mirror = flag(v);
        }
        if let Some(v) = get("UMBRA_RADIUS_MAX").and_then(|s| s.parse().ok()) {
            self.radius_max = v;
        }
        self
    }

    /// Load a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Deserialize(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.planet_hash_key.is_empty() || self.space_type_key.is_empty() {
            return Err(Error::Config("hash keys must not be empty".into()));
        }
        if self.planet_hash_rounds == 0 || self.space_type_rounds == 0 {
            return Err(Error::Config("round counts must be positive".into()));
        }
        if !self.scale.is_power_of_two() || self.scale > MAX_SCALE {
            return Err(Error::Config(format!(
                "scale {} must be a power of two no larger than {}",
                self.scale, MAX_SCALE
            )));
        }
        // r² must fit the 64-bit disc comparison
        if self.radius_max == 0 || self.radius_max > u64::from(u32::MAX) {
            return Err(Error::Config(format!("radius_max {} out of range", self.radius_max)));
        }
        Ok(())
    }

    pub fn terrain(&self) -> Terrain {
        Terrain { scale: self.scale, x_mirror: self.x_mirror, y_mirror: self.y_mirror }
    }
}

/// Validated configuration together with the hash tables derived from it.
#[derive(Clone, Debug)]
pub struct World {
    config: WorldConfig,
    commitment: MimcParams<Fr>,
    noise: NoiseParams<Fr>,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let commitment = MimcParams::new(&config.planet_hash_key, config.planet_hash_rounds)?;
        let noise = NoiseParams::with_rounds(&config.space_type_key, config.space_type_rounds)?;
        Ok(Self { config, commitment, noise })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn commitment_params(&self) -> &MimcParams<Fr> {
        &self.commitment
    }

    pub fn noise_params(&self) -> &NoiseParams<Fr> {
        &self.noise
    }

    /// Commitment to `p`, equal to the hash the circuits compute.
    pub fn commit(&self, p: &Point) -> Commitment {
        Commitment::from_field(self.commitment.hash(&[from_i64(p.x), from_i64(p.y)]))
    }

    /// Terrain bucket of `p`, equal to the value the circuits compute.
    pub fn bucket(&self, p: &Point, terrain: &Terrain) -> Result<u64> {
        reference::multi_scale_perlin(&self.noise, p.x, p.y, terrain.scale, terrain.x_mirror, terrain.y_mirror)
            .map_err(|e| Error::InvalidInput(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorldConfig::default();
        config.validate().unwrap();
        assert_eq!(config.planet_hash_rounds, 110);
        assert_eq!(config.space_type_rounds, 4);
        assert_eq!(config.terrain(), Terrain { scale: 256, x_mirror: false, y_mirror: false });
    }

    #[test]
    fn rejects_bad_scales_keys_and_rounds() {
        let bad = [
            WorldConfig { scale: 100, ..Default::default() },
            WorldConfig { scale: 32768, ..Default::default() },
            WorldConfig { scale: 0, ..Default::default() },
            WorldConfig { planet_hash_key: String::new(), ..Default::default() },
            WorldConfig { space_type_rounds: 0, ..Default::default() },
            WorldConfig { radius_max: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{:?}", config);
            assert!(World::new(config).is_err());
        }
    }

    #[test]
    fn json_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, r#"{ "space_type_key": "7", "scale": 16, "x_mirror": true }"#).unwrap();
        let config = WorldConfig::from_json_file(&path).unwrap();
        assert_eq!(config.space_type_key, "7");
        assert_eq!(config.scale, 16);
        assert!(config.x_mirror);
        assert_eq!(config.planet_hash_key, "1");
        assert_eq!(config.radius_max, 2000);

        std::fs::write(&path, r#"{ "scale": 17 }"#).unwrap();
        assert!(matches!(WorldConfig::from_json_file(&path), Err(Error::Config(_))));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(WorldConfig::from_json_file(&path), Err(Error::Deserialize(_))));
    }

    #[test]
    fn world_derives_both_tables() {
        let world = World::new(WorldConfig { space_type_key: "7".into(), ..Default::default() }).unwrap();
        assert_eq!(world.commitment_params().rounds(), 110);
        assert_eq!(world.noise_params().key(), "7");
        assert_eq!(world.noise_params().mimc().rounds(), 4);
    }

    fn keyed_world(key: &str) -> World {
        World::new(WorldConfig {
            planet_hash_key: key.into(),
            space_type_key: key.into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn native_commitments_match_published_vectors() {
        let world = keyed_world("7");
        assert_eq!(
            world.commit(&Point::new(3, -3)).to_hex(),
            "0d01f8778431d6f04310bf3f02fb6e85a173624241fc8d8185c528306f57ca68"
        );
        assert_eq!(
            world.commit(&Point::new(11, -10)).to_hex(),
            "0d00974b8d6df596c0eaf0c8fb15a45dc2da397c3f2d2107661feea02d200e27"
        );
    }

    #[test]
    fn native_buckets_match_known_values() {
        let plain = |scale| Terrain { scale, x_mirror: false, y_mirror: false };
        let world = keyed_world("7");
        assert_eq!(world.bucket(&Point::new(11, -10), &plain(16)).unwrap(), 16);
        assert_eq!(world.bucket(&Point::new(-1900, 1662), &plain(16)).unwrap(), 16);
        assert_eq!(world.bucket(&Point::new(-2035, 1058), &plain(16)).unwrap(), 17);
        let both = Terrain { scale: 4096, x_mirror: true, y_mirror: true };
        assert_eq!(world.bucket(&Point::new(-1426, 366), &both).unwrap(), 13);
        let xm = Terrain { scale: 256, x_mirror: true, y_mirror: false };
        assert_eq!(world.bucket(&Point::new(682, 868), &xm).unwrap(), 19);

        assert_eq!(keyed_world("1").bucket(&Point::new(11, -10), &plain(16)).unwrap(), 15);
        assert!(matches!(world.bucket(&Point::new(1 << 32, 0), &plain(16)), Err(Error::InvalidInput(_))));
    }
}
