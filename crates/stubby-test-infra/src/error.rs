use thiserror::Error;

pub type Result<T> = std::result::Result<T, TestInfraError>;

/// Failures while provisioning throwaway backends for integration tests.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to run redis container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("failed to reach redis fixture: {0}")]
    Redis(#[from] redis::RedisError),
}
