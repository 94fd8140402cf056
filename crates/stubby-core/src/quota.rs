use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

const CUSTOM_ALIAS_KIND: &str = "custom_alias";
const SHORT_URL_KIND: &str = "custom_url";

/// Identifies one usage counter: a resource kind and the subject consuming it.
///
/// Neither part is interpreted; together they only name the counter. The
/// kind never contains `:`, so the `kind:subject` storage form is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotaKey {
    kind: String,
    subject: String,
}

impl QuotaKey {
    /// Builds a key for a caller-defined kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] when `kind` contains `:`.
    pub fn new(kind: impl Into<String>, subject: impl Into<String>) -> Result<Self> {
        let kind = kind.into();
        if kind.contains(':') {
            return Err(CoreError::InvalidArgument(format!(
                "quota kind must not contain ':': '{kind}'"
            )));
        }
        Ok(Self::known(kind, subject))
    }

    fn known(kind: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            subject: subject.into(),
        }
    }

    /// Counter for custom aliases created by `user_id`.
    pub fn custom_alias(user_id: impl Into<String>) -> Self {
        Self::known(CUSTOM_ALIAS_KIND, user_id)
    }

    /// Counter for short URLs created by `user_id`.
    pub fn short_url(user_id: impl Into<String>) -> Self {
        Self::known(SHORT_URL_KIND, user_id)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Flat `kind:subject` form used as the storage key.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.kind, self.subject)
    }
}

impl Display for QuotaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.subject)
    }
}

/// A windowed usage counter store.
///
/// Implementations never fail towards the caller: a backend that cannot
/// answer reports a count of zero and drops increments, so quota checks can
/// not block resource creation.
#[async_trait]
pub trait UsageQuota: Send + Sync + 'static {
    /// Returns the current count for `key`.
    ///
    /// A missing counter is created with a count of zero that expires
    /// `window` from now, and zero is returned.
    async fn get_or_init(&self, key: &QuotaKey, window: Duration) -> u64;

    /// Adds one to the counter for `key`.
    ///
    /// Does nothing when no counter exists: usage only counts once the key
    /// has been read through [`get_or_init`](UsageQuota::get_or_init) in the
    /// current window.
    async fn increment(&self, key: &QuotaKey);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct TestQuota {
        counters: Mutex<HashMap<String, u64>>,
    }

    #[async_trait]
    impl UsageQuota for TestQuota {
        async fn get_or_init(&self, key: &QuotaKey, _window: Duration) -> u64 {
            let mut counters = self.counters.lock().await;
            *counters.entry(key.storage_key()).or_insert(0)
        }

        async fn increment(&self, key: &QuotaKey) {
            let mut counters = self.counters.lock().await;
            if let Some(count) = counters.get_mut(&key.storage_key()) {
                *count += 1;
            }
        }
    }

    #[test]
    fn storage_key_joins_kind_and_subject() {
        assert_eq!(QuotaKey::custom_alias("u1").storage_key(), "custom_alias:u1");
        assert_eq!(QuotaKey::short_url("u1").storage_key(), "custom_url:u1");
        assert_eq!(QuotaKey::new("k", "s").unwrap().to_string(), "k:s");
    }

    #[test]
    fn kind_with_separator_is_rejected() {
        assert!(matches!(
            QuotaKey::new("a:b", "c"),
            Err(CoreError::InvalidArgument(_))
        ));
        // the separator is fine in the subject
        let key = QuotaKey::new("a", "b:c").unwrap();
        assert_eq!(key.storage_key(), "a:b:c");
        assert_eq!(key.subject(), "b:c");
    }

    #[test]
    fn kinds_are_distinct_keys() {
        assert_ne!(QuotaKey::custom_alias("u1"), QuotaKey::short_url("u1"));
        assert_eq!(QuotaKey::short_url("u1").kind(), "custom_url");
        assert_eq!(QuotaKey::short_url("u1").subject(), "u1");
    }

    #[tokio::test]
    async fn trait_object_usage() {
        let quota: Box<dyn UsageQuota> = Box::new(TestQuota::default());
        let key = QuotaKey::short_url("u1");

        quota.increment(&key).await;
        assert_eq!(quota.get_or_init(&key, Duration::from_secs(1)).await, 0);

        quota.increment(&key).await;
        assert_eq!(quota.get_or_init(&key, Duration::from_secs(1)).await, 1);
    }
}
