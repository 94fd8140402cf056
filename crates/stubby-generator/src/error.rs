use stubby_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Failure to produce a token.
///
/// Both variants point at misconfiguration or a broken clock and are passed
/// straight to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("id allocation failed: {0}")]
    Allocation(#[from] stubby_snowflake::Error),
    #[error("token encoding failed: {0}")]
    Encoding(#[from] CoreError),
}
