//! JSON claim envelopes carrying a proof and its public values between client and verifier.
//!
//! Scale and mirror flags are not part of an envelope; the verifier supplies them from its world
//! configuration.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{Commitment, MovePublic, SpawnPublic};
use crate::{MoveProof, Prover, SpawnProof};

fn decode_proof(proof: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(proof)
        .map_err(|e| Error::Deserialize(format!("proof base64: {}", e)))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnClaim {
    pub location_hash: String,
    pub perlin: u64,
    pub radius: u64,
    pub proof: String,
}

impl SpawnClaim {
    pub fn from_proof(p: &SpawnProof) -> Self {
        Self {
            location_hash: p.public.commitment.to_hex(),
            perlin: p.public.bucket,
            radius: p.public.radius,
            proof: STANDARD.encode(&p.proof),
        }
    }

    pub fn validate(&self) -> Result<()> {
        Commitment::from_hex(&self.location_hash)?;
        decode_proof(&self.proof)?;
        Ok(())
    }

    /// Public inputs of this claim under the verifier's world configuration.
    pub fn public(&self, prover: &Prover) -> Result<SpawnPublic> {
        Ok(SpawnPublic {
            radius: self.radius,
            terrain: prover.world().config().terrain(),
            commitment: Commitment::from_hex(&self.location_hash)?,
            bucket: self.perlin,
        })
    }

    pub fn verify(&self, prover: &Prover) -> bool {
        let checked = self.public(prover).and_then(|public| Ok((public, decode_proof(&self.proof)?)));
        match checked {
            Ok((public, proof)) => prover.verify_spawn(&public, &proof),
            Err(e) => {
                warn!(error = %e, "malformed spawn claim");
                false
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialize(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let claim: Self = serde_json::from_str(s).map_err(|e| Error::Deserialize(e.to_string()))?;
        claim.validate()?;
        Ok(claim)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveClaim {
    pub location_hash_from: String,
    pub location_hash_to: String,
    pub perlin_to: u64,
    pub radius_to: u64,
    pub max_distance: u64,
    pub proof: String,
}

impl MoveClaim {
    pub fn from_proof(p: &MoveProof) -> Self {
        Self {
            location_hash_from: p.public.from.to_hex(),
            location_hash_to: p.public.to.to_hex(),
            perlin_to: p.public.bucket_to,
            radius_to: p.public.radius,
            max_distance: p.public.dist_max,
            proof: STANDARD.encode(&p.proof),
        }
    }

    pub fn validate(&self) -> Result<()> {
        Commitment::from_hex(&self.location_hash_from)?;
        Commitment::from_hex(&self.location_hash_to)?;
        decode_proof(&self.proof)?;
        Ok(())
    }

    pub fn public(&self, prover: &Prover) -> Result<MovePublic> {
        Ok(MovePublic {
            radius: self.radius_to,
            dist_max: self.max_distance,
            terrain: prover.world().config().terrain(),
            from: Commitment::from_hex(&self.location_hash_from)?,
            to: Commitment::from_hex(&self.location_hash_to)?,
            bucket_to: self.perlin_to,
        })
    }

    pub fn verify(&self, prover: &Prover) -> bool {
        let checked = self.public(prover).and_then(|public| Ok((public, decode_proof(&self.proof)?)));
        match checked {
            Ok((public, proof)) => prover.verify_move(&public, &proof),
            Err(e) => {
                warn!(error = %e, "malformed move claim");
                false
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialize(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let claim: Self = serde_json::from_str(s).map_err(|e| Error::Deserialize(e.to_string()))?;
        claim.validate()?;
        Ok(claim)
    }
}
