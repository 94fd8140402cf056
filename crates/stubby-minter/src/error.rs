use stubby_generator::GenerateError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MintError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MintError {
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("{kind} quota exceeded: used {used} of {limit}")]
    QuotaExceeded { kind: String, used: u64, limit: u64 },
    #[error(transparent)]
    Generate(#[from] GenerateError),
}
