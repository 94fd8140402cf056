use crate::code::MintedCode;
use crate::error::{MintError, Result};
use jiff::Timestamp;
use std::sync::Arc;
use stubby_cache::{QuotaDecision, UsageTracker};
use stubby_core::{QuotaKey, UsageQuota};
use stubby_generator::Generator;
use tracing::{info, info_span, Span};
use typed_builder::TypedBuilder;

/// Per-window limits of a user's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub short_urls: u64,
    pub custom_aliases: u64,
}

/// Parameters for minting one code.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MintRequest {
    #[builder(setter(into))]
    pub user_id: String,
    /// Custom alias to use instead of a generated token.
    #[builder(default, setter(strip_option, into))]
    pub custom_alias: Option<String>,
    pub limits: QuotaLimits,
    /// End of the user's current subscription window.
    pub window_end: Timestamp,
}

/// Mints short codes on behalf of users, enforcing their quotas.
///
/// Note: the `Generator` implementation is responsible for ensuring
/// uniqueness of generated tokens. Alias conflicts are not checked here.
#[derive(Debug)]
pub struct Minter<G, Q> {
    generator: Arc<G>,
    tracker: UsageTracker<Q>,
    span: Span,
}

impl<G, Q> Clone for Minter<G, Q> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            tracker: self.tracker.clone(),
            span: self.span.clone(),
        }
    }
}

impl<G: Generator, Q: UsageQuota> Minter<G, Q> {
    pub fn new(generator: G, tracker: UsageTracker<Q>) -> Self {
        Self::with_span(generator, tracker, info_span!("minter"))
    }

    pub fn with_span(generator: G, tracker: UsageTracker<Q>, span: Span) -> Self {
        Self {
            generator: Arc::new(generator),
            tracker,
            span,
        }
    }

    pub fn tracker(&self) -> &UsageTracker<Q> {
        &self.tracker
    }

    /// Mints one code for `request.user_id`.
    ///
    /// Every short URL counts against `limits.short_urls`; a custom alias
    /// additionally counts against `limits.custom_aliases`. Nothing is
    /// recorded when any check fails.
    pub async fn mint(&self, request: MintRequest) -> Result<MintedCode> {
        let alias = request
            .custom_alias
            .map(MintedCode::custom)
            .transpose()?;

        let url_key = QuotaKey::short_url(&request.user_id);
        self.ensure_allowed(&url_key, request.limits.short_urls, request.window_end)
            .await?;

        let alias_key = QuotaKey::custom_alias(&request.user_id);
        if alias.is_some() {
            self.ensure_allowed(&alias_key, request.limits.custom_aliases, request.window_end)
                .await?;
        }

        let code = match alias {
            Some(alias) => alias,
            None => MintedCode::Generated(self.generator.generate()?),
        };

        self.tracker.record_usage(&url_key).await;
        if code.is_custom() {
            self.tracker.record_usage(&alias_key).await;
        }

        info!(parent: &self.span, user_id = %request.user_id, code = %code, "minted code");
        Ok(code)
    }

    async fn ensure_allowed(&self, key: &QuotaKey, limit: u64, window_end: Timestamp) -> Result<()> {
        match self.tracker.check(key, limit, window_end).await {
            QuotaDecision::Allowed { .. } => Ok(()),
            QuotaDecision::Exceeded { used, limit } => {
                info!(parent: &self.span, key = %key, used, limit, "quota exceeded");
                Err(MintError::QuotaExceeded {
                    kind: key.kind().to_string(),
                    used,
                    limit,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use stubby_cache::{MemoryQuotaConfig, MemoryUsageQuota};
    use stubby_core::ShortToken;
    use stubby_generator::{GenerateError, SeqGenerator};

    const LIMITS: QuotaLimits = QuotaLimits {
        short_urls: 3,
        custom_aliases: 1,
    };

    fn minter() -> Minter<SeqGenerator, MemoryUsageQuota> {
        let quota = MemoryUsageQuota::new(MemoryQuotaConfig::default());
        Minter::new(SeqGenerator::new(), UsageTracker::new(quota))
    }

    fn request(user_id: &str) -> MintRequest {
        MintRequest::builder()
            .user_id(user_id)
            .limits(LIMITS)
            .window_end(Timestamp::now() + SignedDuration::from_hours(24))
            .build()
    }

    fn alias_request(user_id: &str, alias: &str) -> MintRequest {
        MintRequest::builder()
            .user_id(user_id)
            .custom_alias(alias)
            .limits(LIMITS)
            .window_end(Timestamp::now() + SignedDuration::from_hours(24))
            .build()
    }

    async fn usage(minter: &Minter<SeqGenerator, MemoryUsageQuota>, key: QuotaKey) -> u64 {
        let end = Timestamp::now() + SignedDuration::from_hours(24);
        minter.tracker().current_usage(&key, end).await
    }

    #[tokio::test]
    async fn mints_generated_tokens_in_sequence() {
        let minter = minter();

        let first = minter.mint(request("u1")).await.unwrap();
        let second = minter.mint(request("u1")).await.unwrap();

        assert_eq!(first.as_str(), "gGTF51");
        assert_eq!(second.as_str(), "hGTF51");
        assert!(!first.is_custom());
    }

    #[tokio::test]
    async fn short_url_quota_is_enforced() {
        let minter = minter();
        for _ in 0..3 {
            minter.mint(request("u1")).await.unwrap();
        }

        let err = minter.mint(request("u1")).await.unwrap_err();

        assert_eq!(
            err,
            MintError::QuotaExceeded {
                kind: "custom_url".to_string(),
                used: 3,
                limit: 3,
            }
        );
    }

    #[tokio::test]
    async fn quotas_are_per_user() {
        let minter = minter();
        for _ in 0..3 {
            minter.mint(request("u1")).await.unwrap();
        }

        assert!(minter.mint(request("u2")).await.is_ok());
    }

    #[tokio::test]
    async fn custom_alias_is_used_verbatim() {
        let minter = minter();

        let code = minter.mint(alias_request("u1", "my-link_1")).await.unwrap();

        assert_eq!(code, MintedCode::Custom("my-link_1".to_string()));
        assert_eq!(usage(&minter, QuotaKey::short_url("u1")).await, 1);
        assert_eq!(usage(&minter, QuotaKey::custom_alias("u1")).await, 1);
    }

    #[tokio::test]
    async fn custom_alias_quota_is_enforced() {
        let minter = minter();
        minter.mint(alias_request("u1", "first")).await.unwrap();

        let err = minter.mint(alias_request("u1", "second")).await.unwrap_err();

        assert_eq!(
            err,
            MintError::QuotaExceeded {
                kind: "custom_alias".to_string(),
                used: 1,
                limit: 1,
            }
        );
        // the rejected mint consumed nothing
        assert_eq!(usage(&minter, QuotaKey::short_url("u1")).await, 1);
        // generated tokens still fit under the short URL limit
        assert!(minter.mint(request("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_alias_is_rejected_before_quota() {
        let minter = minter();

        let err = minter.mint(alias_request("u1", "a b")).await.unwrap_err();

        assert!(matches!(err, MintError::InvalidAlias(_)));
        assert_eq!(usage(&minter, QuotaKey::short_url("u1")).await, 0);
    }

    #[tokio::test]
    async fn generator_failure_records_nothing() {
        struct Failing;
        impl Generator for Failing {
            fn generate(&self) -> stubby_generator::Result<ShortToken> {
                Err(GenerateError::Allocation(
                    stubby_snowflake::Error::OverTimeLimit,
                ))
            }
        }

        let quota = MemoryUsageQuota::new(MemoryQuotaConfig::default());
        let minter = Minter::new(Failing, UsageTracker::new(quota));

        let err = minter.mint(request("u1")).await.unwrap_err();

        assert!(matches!(err, MintError::Generate(_)));
        let end = Timestamp::now() + SignedDuration::from_hours(24);
        let used = minter
            .tracker()
            .current_usage(&QuotaKey::short_url("u1"), end)
            .await;
        assert_eq!(used, 0);
    }
}
