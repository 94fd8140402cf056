use jiff::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use stubby_core::{QuotaKey, UsageQuota};
use tracing::{info, info_span, Span};

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { used: u64, limit: u64 },
    Exceeded { used: u64, limit: u64 },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }

    pub fn used(&self) -> u64 {
        match self {
            QuotaDecision::Allowed { used, .. } | QuotaDecision::Exceeded { used, .. } => *used,
        }
    }
}

/// Tracks per-user usage against subscription windows.
///
/// Counters are opened with a window lasting until the end of the caller's
/// current subscription period, so they reset when the period rolls over.
#[derive(Debug)]
pub struct UsageTracker<Q> {
    quota: Arc<Q>,
    span: Span,
}

impl<Q> Clone for UsageTracker<Q> {
    fn clone(&self) -> Self {
        Self {
            quota: Arc::clone(&self.quota),
            span: self.span.clone(),
        }
    }
}

impl<Q: UsageQuota> UsageTracker<Q> {
    pub fn new(quota: Q) -> Self {
        Self::with_span(quota, info_span!("usage_tracker"))
    }

    pub fn with_span(quota: Q, span: Span) -> Self {
        Self {
            quota: Arc::new(quota),
            span,
        }
    }

    /// Returns the underlying quota backend.
    pub fn quota(&self) -> &Q {
        &self.quota
    }

    /// Current usage for `key` in the window ending at `window_end`.
    pub async fn current_usage(&self, key: &QuotaKey, window_end: Timestamp) -> u64 {
        let window = remaining_window(window_end, Timestamp::now());
        info!(parent: &self.span, key = %key, ?window, "reading current usage");
        self.quota.get_or_init(key, window).await
    }

    /// Records one unit of usage for `key`.
    pub async fn record_usage(&self, key: &QuotaKey) {
        info!(parent: &self.span, key = %key, "recording usage");
        self.quota.increment(key).await;
    }

    /// Checks whether one more unit fits under `limit`.
    pub async fn check(&self, key: &QuotaKey, limit: u64, window_end: Timestamp) -> QuotaDecision {
        let used = self.current_usage(key, window_end).await;
        if used < limit {
            QuotaDecision::Allowed { used, limit }
        } else {
            QuotaDecision::Exceeded { used, limit }
        }
    }
}

/// Time left until `window_end`, never shorter than one millisecond.
fn remaining_window(window_end: Timestamp, now: Timestamp) -> Duration {
    let millis = window_end.as_millisecond() - now.as_millisecond();
    Duration::from_millis(u64::try_from(millis).unwrap_or(0).max(1))
}
