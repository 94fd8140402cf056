use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult, Script};
use std::future::Future;
use std::time::Duration;
use stubby_core::{CacheError, QuotaKey, UsageQuota};
use tracing::{debug, info_span, trace, warn, Span};
use typed_builder::TypedBuilder;

use crate::MAX_WINDOW;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

pub const DEFAULT_KEY_PREFIX: &str = "stubby:usage:";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// `INCR` only when the counter exists, so an uninitialized key stays absent
/// instead of being created without an expiry.
const INCREMENT_IF_PRESENT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('INCR', KEYS[1])
end
return false
";

/// Configuration for creating a [`RedisUsageQuota`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisQuotaConfig {
    /// Prefix for counter keys (e.g., "myapp:usage:").
    #[builder(default = DEFAULT_KEY_PREFIX.to_string(), setter(into))]
    pub key_prefix: String,
    /// Upper bound for a single Redis round trip.
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
    /// Span every log event of the cache is attached to.
    #[builder(default, setter(strip_option))]
    pub span: Option<Span>,
}

impl Default for RedisQuotaConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A Redis-based implementation of [`UsageQuota`].
///
/// Counters are plain integer keys created with a `PX` expiry, so Redis
/// discards them at the end of their window. Every call is bounded by the
/// configured timeout; failures are logged and answered with a count of zero
/// or a dropped increment.
#[derive(Debug, Clone)]
pub struct RedisUsageQuota {
    conn: MultiplexedConnection,
    key_prefix: String,
    timeout: Duration,
    increment_script: Script,
    span: Span,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

/// `PX` argument for `window`, clamped to `1..=MAX_WINDOW` in milliseconds.
fn expiry_millis(window: Duration) -> u64 {
    u64::try_from(window.min(MAX_WINDOW).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

impl RedisUsageQuota {
    /// Creates a Redis usage quota with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_config(conn, RedisQuotaConfig::default())
    }

    /// Creates a Redis usage quota with a custom configuration.
    pub fn with_config(conn: MultiplexedConnection, config: RedisQuotaConfig) -> Self {
        Self {
            conn,
            key_prefix: config.key_prefix,
            timeout: config.timeout,
            increment_script: Script::new(INCREMENT_IF_PRESENT),
            span: config.span.unwrap_or_else(|| info_span!("redis_usage_quota")),
        }
    }

    /// Opens a multiplexed connection to `url` and wraps it.
    pub async fn connect(url: &str, config: RedisQuotaConfig) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid redis url '{url}': {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Unavailable(format!("failed to connect to redis: {e}")))?;
        Ok(Self::with_config(conn, config))
    }

    /// Generates the Redis key for a quota key.
    fn cache_key(&self, key: &QuotaKey) -> String {
        format!("{}{}", self.key_prefix, key.storage_key())
    }

    /// Runs one round trip under the configured timeout.
    async fn bounded<T, F>(&self, operation: &str, request: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(map_redis_error(operation, e)),
            Err(_) => Err(CacheError::Timeout(format!(
                "{operation}: no reply within {:?}",
                self.timeout
            ))),
        }
    }

    async fn try_get_or_init(&self, key: &str, window: Duration) -> Result<u64> {
        let mut conn = self.conn.clone();

        let current: Option<String> = self
            .bounded("failed to read counter", conn.get(key))
            .await?;
        if let Some(raw) = current {
            return raw.trim().parse::<u64>().map_err(|e| {
                CacheError::InvalidData(format!("invalid counter value for key '{key}': {e}"))
            });
        }

        let window_ms = expiry_millis(window);
        // NX: a concurrent reader may have created the counter in between
        let _: Option<String> = self
            .bounded(
                "failed to initialize counter",
                redis::cmd("SET")
                    .arg(key)
                    .arg(0)
                    .arg("PX")
                    .arg(window_ms)
                    .arg("NX")
                    .query_async(&mut conn),
            )
            .await?;
        Ok(0)
    }

    async fn try_increment(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let invocation = self.increment_script.key(key);
        self.bounded("failed to increment counter", invocation.invoke_async(&mut conn))
            .await
    }
}

#[async_trait]
impl UsageQuota for RedisUsageQuota {
    async fn get_or_init(&self, key: &QuotaKey, window: Duration) -> u64 {
        let redis_key = self.cache_key(key);
        trace!(parent: &self.span, key = %key, "reading usage counter from Redis");

        match self.try_get_or_init(&redis_key, window).await {
            Ok(count) => count,
            Err(e) => {
                warn!(parent: &self.span, key = %key, error = %e, "usage counter unavailable, assuming 0");
                0
            }
        }
    }

    async fn increment(&self, key: &QuotaKey) {
        let redis_key = self.cache_key(key);
        trace!(parent: &self.span, key = %key, "incrementing usage counter in Redis");

        match self.try_increment(&redis_key).await {
            Ok(Some(count)) => {
                debug!(parent: &self.span, key = %key, count, "incremented usage counter");
            }
            Ok(None) => {
                debug!(parent: &self.span, key = %key, "usage counter not initialized, increment ignored");
            }
            Err(e) => {
                warn!(parent: &self.span, key = %key, error = %e, "failed to increment usage counter, dropping");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_window_in_millis() {
        assert_eq!(expiry_millis(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn expiry_is_at_least_one_millisecond() {
        assert_eq!(expiry_millis(Duration::ZERO), 1);
        assert_eq!(expiry_millis(Duration::from_micros(10)), 1);
    }

    #[test]
    fn expiry_is_clamped_like_the_memory_backend() {
        let max = MAX_WINDOW.as_millis() as u64;
        assert_eq!(expiry_millis(Duration::MAX), max);
        assert_eq!(expiry_millis(MAX_WINDOW + Duration::from_secs(1)), max);
    }
}
