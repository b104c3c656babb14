//! Groth16 (BN254) backend for the R1CS recorder.
//!
//! A recorded system is replayed into an arkworks constraint system: every recorder variable
//! becomes an arkworks instance or witness variable in allocation order, and every constraint
//! `(<A,x> + a0) * (<B,x> + b0) = (<C,x> + c0)` is enforced with the constants carried on
//! `Variable::One`. Public inputs are therefore the recorder's instance variables, in order.
//!
//! Proofs use arkworks' compressed canonical encoding; keys use the uncompressed encoding.

use anyhow::{anyhow, ensure, Result};
use ark_bn254::{Bn254, Fr as ArkFr};
use ark_ff::PrimeField as ArkPrimeField;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystemRef, LinearCombination as ArkLc, SynthesisError, Variable,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ff::PrimeField;
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use tracing::{debug, warn};

use crate::field::modulus;
use crate::r1cs::{LinearCombination, R1csRecorder, VarKind};

fn to_ark<F: PrimeField>(f: &F) -> ArkFr {
    ArkFr::from_le_bytes_mod_order(f.to_repr().as_ref())
}

fn ensure_bn254<F: PrimeField>() -> Result<()> {
    let ark_modulus: BigUint = ArkFr::MODULUS.into();
    ensure!(modulus::<F>() == ark_modulus, "groth16 backend requires the BN254 scalar field");
    Ok(())
}

/// Adapter replaying a recorder into arkworks.
struct RecordedCircuit<'a, F: PrimeField> {
    recorder: &'a R1csRecorder<F>,
}

impl<'a, F: PrimeField> RecordedCircuit<'a, F> {
    fn lc(vars: &[Variable], lc: &LinearCombination<F>) -> ArkLc<ArkFr> {
        let mut terms: Vec<(ArkFr, Variable)> = lc.terms.iter().map(|t| (to_ark(&t.coeff), vars[t.var.0])).collect();
        if !bool::from(lc.constant.is_zero()) {
            terms.push((to_ark(&lc.constant), Variable::One));
        }
        ArkLc(terms)
    }
}

impl<'a, F: PrimeField> ConstraintSynthesizer<ArkFr> for RecordedCircuit<'a, F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<ArkFr>) -> Result<(), SynthesisError> {
        let rec = self.recorder;
        let mut vars = Vec::with_capacity(rec.num_vars());
        for (i, kind) in rec.vars.iter().enumerate() {
            let value = || {
                rec.get_assignment(crate::r1cs::Var(i))
                    .map(|v| to_ark(&v))
                    .ok_or(SynthesisError::AssignmentMissing)
            };
            let v = match kind {
                VarKind::Instance => cs.new_input_variable(value)?,
                VarKind::Witness => cs.new_witness_variable(value)?,
            };
            vars.push(v);
        }
        for c in &rec.constraints {
            cs.enforce_constraint(Self::lc(&vars, &c.a), Self::lc(&vars, &c.b), Self::lc(&vars, &c.c))?;
        }
        Ok(())
    }
}

/// Groth16 keys for one recorded constraint structure.
#[derive(Clone)]
pub struct R1csGroth16Backend {
    pk: ProvingKey<Bn254>,
    vk: VerifyingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl R1csGroth16Backend {
    /// Circuit-specific setup from a compiled (structure-only) recorder.
    pub fn setup<F: PrimeField, R: RngCore + CryptoRng>(recorder: &R1csRecorder<F>, rng: &mut R) -> Result<Self> {
        ensure_bn254::<F>()?;
        let start = std::time::Instant::now();
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(RecordedCircuit { recorder }, rng)
            .map_err(|e| anyhow!("groth16 setup: {}", e))?;
        let pvk = Groth16::<Bn254>::process_vk(&vk).map_err(|e| anyhow!("groth16 process vk: {}", e))?;
        debug!(constraints = recorder.num_constraints(), elapsed_ms = start.elapsed().as_millis() as u64, "groth16 setup");
        Ok(Self { pk, vk, pvk })
    }

    /// Prove a recorder carrying a full assignment. Returns the compressed proof bytes.
    pub fn prove<F: PrimeField, R: RngCore + CryptoRng>(&self, recorder: &R1csRecorder<F>, rng: &mut R) -> Result<Vec<u8>> {
        ensure_bn254::<F>()?;
        let start = std::time::Instant::now();
        let proof = Groth16::<Bn254>::prove(&self.pk, RecordedCircuit { recorder }, rng)
            .map_err(|e| anyhow!("groth16 prove: {}", e))?;
        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes)?;
        debug!(proof_len = bytes.len(), elapsed_ms = start.elapsed().as_millis() as u64, "groth16 prove");
        Ok(bytes)
    }

    /// Number of public inputs the verifying key expects.
    pub fn num_public_inputs(&self) -> usize {
        self.vk.gamma_abc_g1.len().saturating_sub(1)
    }

    /// Verify a compressed proof. Malformed bytes or a wrong input count verify as `false`.
    pub fn verify<F: PrimeField>(&self, public_inputs: &[F], proof: &[u8]) -> bool {
        if ensure_bn254::<F>().is_err() {
            warn!("verify called over a foreign field");
            return false;
        }
        if public_inputs.len() != self.num_public_inputs() {
            warn!(expected = self.num_public_inputs(), got = public_inputs.len(), "public input count mismatch");
            return false;
        }
        let mut reader = proof;
        let proof = match Proof::<Bn254>::deserialize_compressed(&mut reader) {
            Ok(p) if reader.is_empty() => p,
            Ok(_) => {
                warn!("trailing bytes after proof");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "malformed proof");
                return false;
            }
        };
        let inputs: Vec<ArkFr> = public_inputs.iter().map(to_ark).collect();
        Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, &inputs, &proof).unwrap_or(false)
    }

    pub fn proving_key_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pk.serialize_uncompressed(&mut bytes)?;
        Ok(bytes)
    }

    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.vk.serialize_uncompressed(&mut bytes)?;
        Ok(bytes)
    }

    /// Rebuild from persisted keys. The proving key is trusted local material and loaded unchecked.
    pub fn from_bytes(pk: &[u8], vk: &[u8]) -> Result<Self> {
        let pk = ProvingKey::<Bn254>::deserialize_uncompressed_unchecked(pk)?;
        let vk = VerifyingKey::<Bn254>::deserialize_uncompressed(vk)?;
        ensure!(pk.vk == vk, "proving key and verifying key do not belong together");
        let pvk = Groth16::<Bn254>::process_vk(&vk).map_err(|e| anyhow!("groth16 process vk: {}", e))?;
        Ok(Self { pk, vk, pvk })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{compile, public_inputs, synthesize_witness};
    use crate::circuit::{Circuit, Driver};
    use crate::gadgets::{assert_fits, mul};
    use ff::Field;
    use halo2curves::bn256::Fr;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    /// Public c = a * b + 5 with a < 2^8.
    struct Product {
        a: Option<u64>,
        b: Option<u64>,
    }

    impl Circuit<Fr> for Product {
        fn name(&self) -> &'static str { "product" }

        fn synthesize<D: Driver<F = Fr>>(&self, dr: &mut D) -> anyhow::Result<()> {
            let (a, b) = (self.a, self.b);
            let c = dr.alloc_instance(|| {
                a.zip(b).map(|(a, b)| Fr::from(a * b + 5)).ok_or_else(|| anyhow!("missing"))
            })?;
            let aw = dr.alloc_witness(|| a.map(Fr::from).ok_or_else(|| anyhow!("missing")))?;
            let bw = dr.alloc_witness(|| b.map(Fr::from).ok_or_else(|| anyhow!("missing")))?;
            assert_fits(dr, &aw, 8)?;
            let prod = mul(dr, &aw, &bw)?;
            dr.enforce_equal("product", &prod.add_constant(Fr::from(5u64)), &c)
        }
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    #[test]
    fn prove_and_verify_roundtrip() {
        let structure = compile(&Product { a: None, b: None }).unwrap();
        let backend = R1csGroth16Backend::setup(&structure, &mut rng()).unwrap();
        assert_eq!(backend.num_public_inputs(), 1);

        let rec = synthesize_witness(&Product { a: Some(7), b: Some(9) }).unwrap();
        let proof = backend.prove(&rec, &mut rng()).unwrap();
        let inputs = public_inputs(&rec).unwrap();
        assert_eq!(inputs, vec![Fr::from(68u64)]);
        assert!(backend.verify(&inputs, &proof));

        assert!(!backend.verify(&[Fr::from(69u64)], &proof));
        assert!(!backend.verify(&[Fr::from(68u64), Fr::ONE], &proof));
        assert!(!backend.verify::<Fr>(&[], &proof));

        let mut corrupted = proof.clone();
        corrupted[3] ^= 0x40;
        assert!(!backend.verify(&inputs, &corrupted));
        assert!(!backend.verify(&inputs, &proof[..proof.len() - 1]));
        let mut extended = proof.clone();
        extended.push(0);
        assert!(!backend.verify(&inputs, &extended));
    }

    #[test]
    fn keys_roundtrip_through_bytes() {
        let structure = compile(&Product { a: None, b: None }).unwrap();
        let backend = R1csGroth16Backend::setup(&structure, &mut rng()).unwrap();
        let restored =
            R1csGroth16Backend::from_bytes(&backend.proving_key_bytes().unwrap(), &backend.verifying_key_bytes().unwrap())
                .unwrap();

        let rec = synthesize_witness(&Product { a: Some(3), b: Some(4) }).unwrap();
        let proof = restored.prove(&rec, &mut rng()).unwrap();
        assert!(backend.verify(&public_inputs(&rec).unwrap(), &proof));
        assert!(R1csGroth16Backend::from_bytes(&[1, 2, 3], &backend.verifying_key_bytes().unwrap()).is_err());
    }

    #[test]
    fn rejects_foreign_field() {
        type Fp = pasta_curves::Fp;
        let rec: R1csRecorder<Fp> = R1csRecorder::new();
        assert!(R1csGroth16Backend::setup(&rec, &mut rng()).is_err());
    }
}
