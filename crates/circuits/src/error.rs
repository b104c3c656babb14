use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// The witness was built but violates a constraint of the circuit.
    #[error("{circuit}: constraint `{constraint}` unsatisfied")]
    Unsatisfied { circuit: &'static str, constraint: String },
    /// Witness generation aborted, e.g. a hint or a range decomposition failed.
    #[error("cannot construct witness: {0}")]
    Witness(String),
    #[error("proving backend: {0}")]
    Backend(String),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("deserialization failed: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
