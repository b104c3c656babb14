//! # cli
//!
//! Command-line interface for generating keys, proving and verifying umbra spawn and move claims.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use circuits::{MoveCircuit, MoveClaim, Point, Prover, SpawnCircuit, SpawnClaim, World, WorldConfig};
use clap::{Parser, Subcommand};
use halo2curves::bn256::Fr;
use r1cs::{compile, Circuit};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// umbra CLI application
#[derive(Parser)]
#[command(name = "umbra")]
#[command(about = "Zero-knowledge spawn and move proofs for hidden world coordinates")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Key directory
    #[arg(short, long, global = true, default_value = "./umbra_keys")]
    pub data_dir: PathBuf,

    /// World configuration (JSON); UMBRA_* environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate spawn and move keys and write them to the key directory
    Setup,
    /// Show constraint counts and structure digests of both circuits
    Info,
    /// Print the commitment to a point
    Hash {
        #[arg(long, allow_hyphen_values = true)]
        x: i64,
        #[arg(long, allow_hyphen_values = true)]
        y: i64,
    },
    /// Print the terrain bucket of a point
    Perlin {
        #[arg(long, allow_hyphen_values = true)]
        x: i64,
        #[arg(long, allow_hyphen_values = true)]
        y: i64,
    },
    /// Prove a spawn and print the claim as JSON
    ProveSpawn {
        #[arg(long, allow_hyphen_values = true)]
        x: i64,
        #[arg(long, allow_hyphen_values = true)]
        y: i64,
        /// Radius of the world disc
        #[arg(long)]
        radius: u64,
        /// Write the claim here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Verify a spawn claim
    VerifySpawn {
        /// Claim JSON file
        #[arg(long)]
        claim: PathBuf,
    },
    /// Prove a move and print the claim as JSON
    ProveMove {
        #[arg(long, allow_hyphen_values = true)]
        x1: i64,
        #[arg(long, allow_hyphen_values = true)]
        y1: i64,
        #[arg(long, allow_hyphen_values = true)]
        x2: i64,
        #[arg(long, allow_hyphen_values = true)]
        y2: i64,
        /// Radius of the world disc
        #[arg(long)]
        radius: u64,
        /// Travel budget
        #[arg(long)]
        dist_max: u64,
        /// Write the claim here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Verify a move claim
    VerifyMove {
        /// Claim JSON file
        #[arg(long)]
        claim: PathBuf,
    },
}

/// Parse arguments, install logging and run the command.
///
/// Returns `false` when a verification command rejected its claim.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;
    execute(cli.command, &cli.data_dir, config)
}

/// World configuration from `path` (or defaults), overlaid with the environment.
pub fn load_config(path: Option<&Path>) -> Result<WorldConfig> {
    let base = match path {
        Some(p) => WorldConfig::from_json_file(p).with_context(|| format!("loading {}", p.display()))?,
        None => WorldConfig::default(),
    };
    let config = base.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn emit(json: String, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "claim written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn describe<C: Circuit<Fr>>(circuit: &C) -> Result<()> {
    let rec = compile(circuit)?;
    println!("{}:", circuit.name());
    println!("  variables:     {}", rec.num_vars());
    println!("  public inputs: {}", rec.num_instances());
    println!("  constraints:   {}", rec.num_constraints());
    println!("  digest:        {}", hex::encode(rec.digest(circuit.name().as_bytes())));
    Ok(())
}

/// Execute one command against `data_dir` and `config`.
pub fn execute(command: Commands, data_dir: &Path, config: WorldConfig) -> Result<bool> {
    match command {
        Commands::Setup => {
            let prover = Prover::setup(config)?;
            prover.save_to_dir(data_dir)?;
            println!("Keys written to {}", data_dir.display());
            println!("  spawn: {} constraints, digest {}", prover.spawn_keys().num_constraints(), prover.spawn_keys().digest_hex());
            println!("  move:  {} constraints, digest {}", prover.move_keys().num_constraints(), prover.move_keys().digest_hex());
        }
        Commands::Info => {
            let world = World::new(config)?;
            describe(&SpawnCircuit::shape(&world))?;
            describe(&MoveCircuit::shape(&world))?;
        }
        Commands::Hash { x, y } => {
            let p = Point::new(x, y);
            p.validate()?;
            println!("{}", World::new(config)?.commit(&p));
        }
        Commands::Perlin { x, y } => {
            let terrain = config.terrain();
            println!("{}", World::new(config)?.bucket(&Point::new(x, y), &terrain)?);
        }
        Commands::ProveSpawn { x, y, radius, out } => {
            let terrain = config.terrain();
            let prover = Prover::load_or_setup(data_dir, config)?;
            let proof = prover.prove_spawn(Point::new(x, y), radius, terrain)?;
            emit(SpawnClaim::from_proof(&proof).to_json()?, out.as_deref())?;
        }
        Commands::VerifySpawn { claim } => {
            let text = std::fs::read_to_string(&claim).with_context(|| format!("reading {}", claim.display()))?;
            let claim = SpawnClaim::from_json(&text)?;
            let prover = Prover::load_from_dir(data_dir, config)
                .with_context(|| format!("loading keys from {} (run `umbra setup` first)", data_dir.display()))?;
            let ok = claim.verify(&prover);
            println!("{}", if ok { "valid" } else { "invalid" });
            return Ok(ok);
        }
        Commands::ProveMove { x1, y1, x2, y2, radius, dist_max, out } => {
            let terrain = config.terrain();
            let prover = Prover::load_or_setup(data_dir, config)?;
            let proof = prover.prove_move(Point::new(x1, y1), Point::new(x2, y2), radius, dist_max, terrain)?;
            emit(MoveClaim::from_proof(&proof).to_json()?, out.as_deref())?;
        }
        Commands::VerifyMove { claim } => {
            let text = std::fs::read_to_string(&claim).with_context(|| format!("reading {}", claim.display()))?;
            let claim = MoveClaim::from_json(&text)?;
            let prover = Prover::load_from_dir(data_dir, config)
                .with_context(|| format!("loading keys from {} (run `umbra setup` first)", data_dir.display()))?;
            let ok = claim.verify(&prover);
            println!("{}", if ok { "valid" } else { "invalid" });
            return Ok(ok);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_parse() {
        let cli = Cli::try_parse_from(["umbra", "prove-move", "--x1", "-1900", "--y1", "1662", "--x2", "-2035", "--y2", "1058", "--radius", "4000", "--dist-max", "200"]).unwrap();
        match cli.command {
            Commands::ProveMove { x1, y2, dist_max, out, .. } => {
                assert_eq!((x1, y2, dist_max), (-1900, 1058, 200));
                assert!(out.is_none());
            }
            _ => panic!("wrong subcommand"),
        }
        assert_eq!(cli.data_dir, PathBuf::from("./umbra_keys"));
    }

    #[test]
    fn radius_is_required() {
        assert!(Cli::try_parse_from(["umbra", "prove-spawn", "--x", "1", "--y", "2"]).is_err());
    }

    #[test]
    fn config_file_is_loaded_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, r#"{"space_type_key": "7", "scale": 16}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.scale, 16);

        std::fs::write(&path, r#"{"scale": 100}"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn lookups_do_not_need_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig { space_type_key: "7".into(), scale: 16, ..Default::default() };
        assert!(execute(Commands::Hash { x: 3, y: -3 }, dir.path(), config.clone()).unwrap());
        assert!(execute(Commands::Perlin { x: 11, y: -10 }, dir.path(), config).unwrap());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn verifying_without_keys_does_not_generate_them() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        let claim = dir.path().join("claim.json");
        let body = serde_json::json!({
            "locationHash": "0a".repeat(32),
            "perlin": 16,
            "radius": 2000,
            "proof": "AQID",
        });
        std::fs::write(&claim, body.to_string()).unwrap();
        assert!(execute(Commands::VerifySpawn { claim }, &keys, WorldConfig::default()).is_err());
        assert!(!keys.exists());
    }

    #[test]
    fn malformed_claim_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let claim = dir.path().join("claim.json");
        std::fs::write(&claim, serde_json::json!({ "locationHash": "00" }).to_string()).unwrap();
        assert!(execute(Commands::VerifySpawn { claim }, dir.path(), WorldConfig::default()).is_err());
    }
}
