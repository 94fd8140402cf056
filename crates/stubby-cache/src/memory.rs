use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use stubby_core::{QuotaKey, UsageQuota};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info_span, trace, Span};
use typed_builder::TypedBuilder;

use crate::MAX_WINDOW;

/// How often expired counters are swept by default.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

type Counters = DashMap<String, Counter>;

/// Configuration for creating a [`MemoryUsageQuota`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct MemoryQuotaConfig {
    /// Period of the background sweep.
    #[builder(default = DEFAULT_SWEEP_INTERVAL)]
    pub sweep_interval: Duration,
    /// Span every log event of the cache is attached to.
    #[builder(default, setter(strip_option))]
    pub span: Option<Span>,
}

impl Default for MemoryQuotaConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// An in-process implementation of [`UsageQuota`].
///
/// Counters live in a sharded concurrent map. A background task removes
/// counters whose window has passed every `sweep_interval`; until it runs, an
/// expired counter keeps answering with its old count.
///
/// Clones share the same counters. The sweep task stops once the last clone
/// is dropped.
#[derive(Debug, Clone)]
pub struct MemoryUsageQuota {
    counters: Arc<Counters>,
    span: Span,
    _sweeper: Arc<Sweeper>,
}

#[derive(Debug)]
struct Sweeper(JoinHandle<()>);

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl MemoryUsageQuota {
    /// Creates the cache and starts its sweep task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: MemoryQuotaConfig) -> Self {
        let span = config
            .span
            .unwrap_or_else(|| info_span!("memory_usage_quota"));
        let counters = Arc::new(Counters::new());
        let sweeper = spawn_sweeper(
            Arc::downgrade(&counters),
            config.sweep_interval,
            span.clone(),
        );

        Self {
            counters,
            span,
            _sweeper: Arc::new(Sweeper(sweeper)),
        }
    }

    /// Removes every counter whose window has passed and returns how many
    /// were removed.
    pub fn sweep_expired(&self) -> usize {
        evict_expired(&self.counters, Instant::now())
    }

    /// Number of counters currently held, expired or not.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

fn spawn_sweeper(counters: Weak<Counters>, interval: Duration, span: Span) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(live) = counters.upgrade() else {
                break;
            };
            let evicted = evict_expired(&live, Instant::now());
            if evicted > 0 {
                debug!(parent: &span, evicted, "evicted expired usage counters");
            }
        }
    })
}

fn evict_expired(counters: &Counters, now: Instant) -> usize {
    let mut evicted = 0;
    counters.retain(|_, counter| {
        let live = now < counter.expires_at;
        if !live {
            evicted += 1;
        }
        live
    });
    evicted
}

#[async_trait]
impl UsageQuota for MemoryUsageQuota {
    async fn get_or_init(&self, key: &QuotaKey, window: Duration) -> u64 {
        let now = Instant::now();
        let entry = self.counters.entry(key.storage_key()).or_insert_with(|| {
            trace!(parent: &self.span, key = %key, ?window, "initializing usage counter");
            Counter {
                count: 0,
                expires_at: now + window.min(MAX_WINDOW),
            }
        });
        entry.count
    }

    async fn increment(&self, key: &QuotaKey) {
        match self.counters.get_mut(&key.storage_key()) {
            Some(mut counter) => {
                counter.count += 1;
                trace!(parent: &self.span, key = %key, count = counter.count, "incremented usage counter");
            }
            None => {
                debug!(parent: &self.span, key = %key, "usage counter not initialized, increment ignored");
            }
        }
    }
}
