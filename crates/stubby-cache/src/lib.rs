//! Usage quota backends for Stubby.
//!
//! [`MemoryUsageQuota`] keeps counters in process and sweeps expired ones on
//! a timer; [`RedisUsageQuota`] keeps them in Redis and relies on key expiry.
//! Both implement [`stubby_core::UsageQuota`] with the same degraded-mode
//! behaviour, and [`UsageTracker`] layers subscription windows and limits on
//! top of either.

use std::time::Duration;

pub mod memory;
pub mod redis;
pub mod tracker;

pub use memory::{MemoryQuotaConfig, MemoryUsageQuota};
pub use self::redis::{RedisQuotaConfig, RedisUsageQuota};
pub use tracker::{QuotaDecision, UsageTracker};

/// Longest counter window either backend honours; longer windows are cut to it.
pub const MAX_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);
