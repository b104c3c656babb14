//! Groth16 key material per circuit, with on-disk persistence.
//!
//! A key directory holds, per circuit name, `<name>.pk`, `<name>.vk`, `<name>.r1cs` and
//! `<name>_meta.json`. The metadata records the structure digest the keys were generated for;
//! loading refuses keys whose digest does not match the circuit compiled for the current world.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

use halo2curves::bn256::Fr;
use r1cs::{check_satisfied, compile, synthesize_witness, Circuit, R1csGroth16Backend, R1csRecorder, SatisfactionError};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

const META_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
struct KeyMeta {
    version: u32,
    circuit: String,
    digest: String,
    constraints: usize,
    public_inputs: usize,
}

/// Proving and verifying keys for one compiled circuit.
#[derive(Clone)]
pub struct CircuitKeys {
    name: &'static str,
    digest: [u8; 32],
    num_constraints: usize,
    backend: R1csGroth16Backend,
}

fn structure_digest(name: &str, rec: &R1csRecorder<Fr>) -> [u8; 32] {
    rec.digest(name.as_bytes())
}

impl CircuitKeys {
    /// Compile `circuit` and run a circuit-specific Groth16 setup.
    pub fn setup<C: Circuit<Fr>, R: RngCore + CryptoRng>(circuit: &C, rng: &mut R) -> Result<Self> {
        let rec = compile(circuit)?;
        Self::setup_compiled(circuit.name(), &rec, rng)
    }

    fn setup_compiled<R: RngCore + CryptoRng>(name: &'static str, rec: &R1csRecorder<Fr>, rng: &mut R) -> Result<Self> {
        let start = Instant::now();
        let backend = R1csGroth16Backend::setup(rec, rng).map_err(|e| Error::Backend(format!("{:#}", e)))?;
        let keys = Self { name, digest: structure_digest(name, rec), num_constraints: rec.num_constraints(), backend };
        info!(
            circuit = name,
            constraints = keys.num_constraints,
            digest = %keys.digest_hex(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "keys generated"
        );
        Ok(keys)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    pub fn num_public_inputs(&self) -> usize {
        self.backend.num_public_inputs()
    }

    /// Synthesize a witness for `circuit`, check it, and prove it.
    pub fn prove<C: Circuit<Fr>, R: RngCore + CryptoRng>(&self, circuit: &C, rng: &mut R) -> Result<Vec<u8>> {
        let start = Instant::now();
        let rec = synthesize_witness(circuit).map_err(|e| Error::Witness(format!("{:#}", e)))?;
        check_satisfied(&rec).map_err(|e| match e {
            SatisfactionError::Unsatisfied { label, .. } => Error::Unsatisfied { circuit: self.name, constraint: label },
            other => Error::Witness(other.to_string()),
        })?;
        if structure_digest(self.name, &rec) != self.digest {
            return Err(Error::Config(format!("{}: circuit structure does not match the keys", self.name)));
        }
        let proof = self.backend.prove(&rec, rng).map_err(|e| Error::Backend(format!("{:#}", e)))?;
        debug!(circuit = self.name, elapsed_ms = start.elapsed().as_millis() as u64, "proved");
        Ok(proof)
    }

    /// `false` for malformed proofs, wrong input counts and invalid proofs alike.
    pub fn verify(&self, public_inputs: &[Fr], proof: &[u8]) -> bool {
        let start = Instant::now();
        let ok = self.backend.verify(public_inputs, proof);
        debug!(circuit = self.name, ok, elapsed_ms = start.elapsed().as_millis() as u64, "verified");
        ok
    }

    fn meta(&self) -> KeyMeta {
        KeyMeta {
            version: META_VERSION,
            circuit: self.name.to_string(),
            digest: self.digest_hex(),
            constraints: self.num_constraints,
            public_inputs: self.num_public_inputs(),
        }
    }

    /// Write keys, structure and metadata for `circuit` under `dir`.
    pub fn save_to_dir<C: Circuit<Fr>, P: AsRef<Path>>(&self, dir: P, circuit: &C) -> Result<()> {
        let structure = compile(circuit)?;
        if circuit.name() != self.name || structure_digest(self.name, &structure) != self.digest {
            return Err(Error::Config(format!("{}: keys do not belong to circuit {}", self.name, circuit.name())));
        }
        self.persist(dir.as_ref(), &structure)
    }

    fn persist(&self, dir: &Path, structure: &R1csRecorder<Fr>) -> Result<()> {
        fs::create_dir_all(dir)?;
        let write = |file: String, bytes: &[u8]| -> Result<()> {
            File::create(dir.join(file))?.write_all(bytes)?;
            Ok(())
        };
        let ser = |e: anyhow::Error| Error::Serialize(format!("{:#}", e));
        write(format!("{}.pk", self.name), &self.backend.proving_key_bytes().map_err(ser)?)?;
        write(format!("{}.vk", self.name), &self.backend.verifying_key_bytes().map_err(ser)?)?;
        write(format!("{}.r1cs", self.name), &structure.serialize_constraints().map_err(ser)?)?;
        let meta = serde_json::to_string_pretty(&self.meta()).map_err(|e| Error::Serialize(e.to_string()))?;
        write(format!("{}_meta.json", self.name), meta.as_bytes())?;
        info!(circuit = self.name, dir = %dir.display(), "keys saved");
        Ok(())
    }

    /// Load keys for `circuit` from `dir`, checking them against the compiled structure.
    pub fn load_from_dir<C: Circuit<Fr>, P: AsRef<Path>>(dir: P, circuit: &C) -> Result<Self> {
        let dir = dir.as_ref();
        let name = circuit.name();
        let read = |file: String| -> Result<Vec<u8>> {
            let mut bytes = Vec::new();
            File::open(dir.join(file))?.read_to_end(&mut bytes)?;
            Ok(bytes)
        };
        let de = |e: anyhow::Error| Error::Deserialize(format!("{:#}", e));

        let meta: KeyMeta = serde_json::from_slice(&read(format!("{}_meta.json", name))?)
            .map_err(|e| Error::Deserialize(format!("{}_meta.json: {}", name, e)))?;
        if meta.version != META_VERSION || meta.circuit != name {
            return Err(Error::Config(format!(
                "{}: stored metadata is for {} v{}",
                name, meta.circuit, meta.version
            )));
        }

        let compiled = compile(circuit)?;
        let digest = structure_digest(name, &compiled);
        if meta.digest != hex::encode(digest) {
            return Err(Error::Config(format!(
                "{}: stored keys were generated for structure {}, current structure is {}",
                name,
                meta.digest,
                hex::encode(digest)
            )));
        }
        let stored = R1csRecorder::<Fr>::deserialize_constraints(&read(format!("{}.r1cs", name))?).map_err(de)?;
        if structure_digest(name, &stored) != digest {
            return Err(Error::Config(format!("{}: stored constraint file does not match its metadata", name)));
        }

        let backend = R1csGroth16Backend::from_bytes(&read(format!("{}.pk", name))?, &read(format!("{}.vk", name))?)
            .map_err(de)?;
        if backend.num_public_inputs() != compiled.num_instances() {
            return Err(Error::Config(format!("{}: verifying key expects a different input count", name)));
        }
        info!(circuit = name, dir = %dir.display(), "keys loaded");
        Ok(Self { name, digest, num_constraints: compiled.num_constraints(), backend })
    }

    /// Load keys from `dir` if present, otherwise generate and persist them.
    pub fn load_or_setup<C: Circuit<Fr>, P: AsRef<Path>, R: RngCore + CryptoRng>(
        dir: P,
        circuit: &C,
        rng: &mut R,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.join(format!("{}_meta.json", circuit.name())).exists() {
            return Self::load_from_dir(dir, circuit);
        }
        let structure = compile(circuit)?;
        let keys = Self::setup_compiled(circuit.name(), &structure, rng)?;
        keys.persist(dir, &structure)?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r1cs::Driver;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Product(Option<(u64, u64)>);

    impl Circuit<Fr> for Product {
        fn name(&self) -> &'static str {
            "product"
        }

        fn synthesize<D: Driver<F = Fr>>(&self, dr: &mut D) -> anyhow::Result<()> {
            let v = self.0;
            let out = dr.alloc_instance(|| v.map(|(a, b)| Fr::from(a * b)).ok_or_else(|| anyhow::anyhow!("no value")))?;
            let a = dr.alloc_witness(|| v.map(|(a, _)| Fr::from(a)).ok_or_else(|| anyhow::anyhow!("no value")))?;
            let b = dr.alloc_witness(|| v.map(|(_, b)| Fr::from(b)).ok_or_else(|| anyhow::anyhow!("no value")))?;
            dr.enforce_mul("product", &a, &b, &out)
        }
    }

    #[test]
    fn unwritable_key_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let res = CircuitKeys::load_or_setup(&blocker, &Product(None), &mut ChaCha20Rng::seed_from_u64(1));
        assert!(matches!(res, Err(Error::Io(_))), "{:?}", res.err());
    }

    #[test]
    fn generated_keys_are_persisted_and_reloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let keys = CircuitKeys::load_or_setup(tmp.path(), &Product(None), &mut rng).unwrap();
        assert!(tmp.path().join("product_meta.json").exists());

        let loaded = CircuitKeys::load_from_dir(tmp.path(), &Product(None)).unwrap();
        assert_eq!(loaded.digest(), keys.digest());
        let proof = keys.prove(&Product(Some((6, 7))), &mut rng).unwrap();
        assert!(loaded.verify(&[Fr::from(42u64)], &proof));
        assert!(!loaded.verify(&[Fr::from(43u64)], &proof));
    }
}
