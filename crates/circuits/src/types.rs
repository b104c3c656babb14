//! Plain values exchanged with the circuits: coordinates, terrain settings, commitments and the
//! public-input sets of both circuits.

use std::fmt;
use std::str::FromStr;

use halo2curves::bn256::Fr;
use r1cs::field::{from_be_bytes_canonical, to_be_bytes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Smallest accepted coordinate, `-2^31`.
pub const COORD_MIN: i64 = -(1 << 31);
/// Largest accepted coordinate, `2^31 - 1`.
pub const COORD_MAX: i64 = (1 << 31) - 1;

/// A point on the world grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn validate(&self) -> Result<()> {
        for c in [self.x, self.y] {
            if !(COORD_MIN..=COORD_MAX).contains(&c) {
                return Err(Error::InvalidInput(format!(
                    "coordinate {} outside [{}, {}]",
                    c, COORD_MIN, COORD_MAX
                )));
            }
        }
        Ok(())
    }

    /// `x² + y²`, exact for every valid point.
    pub fn norm_squared(&self) -> u128 {
        let (x, y) = (i128::from(self.x), i128::from(self.y));
        (x * x + y * y) as u128
    }

    pub fn distance_squared(&self, other: &Point) -> u128 {
        let dx = i128::from(self.x) - i128::from(other.x);
        let dy = i128::from(self.y) - i128::from(other.y);
        (dx * dx + dy * dy) as u128
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Octave scale and mirror flags shared by every bucket of one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    pub scale: u64,
    pub x_mirror: bool,
    pub y_mirror: bool,
}

/// Hash commitment to a point, carried as 64 lowercase hex characters (big-endian).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Commitment(Fr);

impl Commitment {
    pub fn from_field(value: Fr) -> Self {
        Self(value)
    }

    pub fn to_field(&self) -> Fr {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&to_be_bytes(&self.0));
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse exactly 64 hex characters (optional `0x` prefix) encoding a canonical field element.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 64 {
            return Err(Error::InvalidInput(format!(
                "commitment must be 64 hex characters, got {}",
                digits.len()
            )));
        }
        let bytes = hex::decode(digits).map_err(|e| Error::InvalidInput(format!("commitment hex: {}", e)))?;
        from_be_bytes_canonical(&bytes)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput("commitment is not a canonical field element".into()))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl FromStr for Commitment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn flag(b: bool) -> Fr {
    Fr::from(u64::from(b))
}

/// Public inputs of the spawn circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPublic {
    pub radius: u64,
    pub terrain: Terrain,
    pub commitment: Commitment,
    pub bucket: u64,
}

impl SpawnPublic {
    /// `[r, scale, xMirror, yMirror, commitment, bucket]`
    pub fn to_field_elements(&self) -> Vec<Fr> {
        vec![
            Fr::from(self.radius),
            Fr::from(self.terrain.scale),
            flag(self.terrain.x_mirror),
            flag(self.terrain.y_mirror),
            self.commitment.to_field(),
            Fr::from(self.bucket),
        ]
    }
}

/// Public inputs of the move circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePublic {
    pub radius: u64,
    pub dist_max: u64,
    pub terrain: Terrain,
    pub from: Commitment,
    pub to: Commitment,
    pub bucket_to: u64,
}

impl MovePublic {
    /// `[r, distMax, scale, xMirror, yMirror, commitment1, commitment2, bucket2]`
    pub fn to_field_elements(&self) -> Vec<Fr> {
        vec![
            Fr::from(self.radius),
            Fr::from(self.dist_max),
            Fr::from(self.terrain.scale),
            flag(self.terrain.x_mirror),
            flag(self.terrain.y_mirror),
            self.from.to_field(),
            self.to.to_field(),
            Fr::from(self.bucket_to),
        ]
    }
}

/// Canonical 32-byte big-endian encodings of a public-input vector.
pub fn encode_public_inputs(inputs: &[Fr]) -> Vec<[u8; 32]> {
    inputs.iter().map(|f| Commitment::from_field(*f).to_bytes()).collect()
}
