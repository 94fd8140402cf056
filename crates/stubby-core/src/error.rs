use thiserror::Error;

/// Errors related to the core functionality of the token service.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures inside a quota backend.
///
/// These never cross the [`UsageQuota`](crate::UsageQuota) boundary; backends
/// log them and fall back to a safe default.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}
