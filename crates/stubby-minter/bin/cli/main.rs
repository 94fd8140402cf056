mod cli;

use crate::cli::{LogFormatArg, QuotaBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::{SignedDuration, Timestamp};
use std::time::Duration;
use stubby_cache::{
    MemoryQuotaConfig, MemoryUsageQuota, RedisQuotaConfig, RedisUsageQuota, UsageTracker,
};
use stubby_core::UsageQuota;
use stubby_minter::{MintError, MintRequest, Minter, QuotaLimits};
use stubby_snowflake::{Snowflake, SnowflakeSettings, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    init_tracing(config.log_format);

    info!(
        node_id = config.node_id,
        quota_backend = %config.quota_backend,
        user_id = %config.user_id,
        count = config.count,
        "starting minter"
    );

    let settings = SnowflakeSettings::builder().node_id(config.node_id).build();
    let snowflake = Snowflake::new(settings).context("failed to create id allocator")?;

    match config.quota_backend {
        QuotaBackendArg::InMemory => {
            let quota = MemoryUsageQuota::new(
                MemoryQuotaConfig::builder()
                    .sweep_interval(Duration::from_secs(config.sweep_interval_secs))
                    .build(),
            );
            run(&config, Minter::new(snowflake, UsageTracker::new(quota))).await
        }
        QuotaBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("redis url is required when quota backend is redis")?;
            let quota = RedisUsageQuota::connect(
                redis_url,
                RedisQuotaConfig::builder()
                    .timeout(Duration::from_millis(config.redis_timeout_ms))
                    .build(),
            )
            .await
            .context("failed to connect to redis")?;
            run(&config, Minter::new(snowflake, UsageTracker::new(quota))).await
        }
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

/// End of a subscription window of `window_secs` starting at `now`.
fn window_end(now: Timestamp, window_secs: u64) -> anyhow::Result<Timestamp> {
    let window_secs = i64::try_from(window_secs).context("window is too long")?;
    now.checked_add(SignedDuration::from_secs(window_secs))
        .context("window is too long")
}

async fn run<Q: UsageQuota>(config: &CLI, minter: Minter<Snowflake<SystemClock>, Q>) -> anyhow::Result<()> {
    let ends_at = window_end(Timestamp::now(), config.window_secs)?;
    let limits = QuotaLimits {
        short_urls: config.limit,
        custom_aliases: config.alias_limit,
    };

    for n in 0..config.count {
        let builder = MintRequest::builder()
            .user_id(config.user_id.clone())
            .limits(limits)
            .window_end(ends_at);
        let request = match (n, &config.custom_alias) {
            (0, Some(alias)) => builder.custom_alias(alias.clone()).build(),
            _ => builder.build(),
        };

        match minter.mint(request).await {
            Ok(code) => println!("{code}"),
            Err(e @ MintError::QuotaExceeded { .. }) => {
                warn!(error = %e, minted = n, "stopping early");
                break;
            }
            Err(e) => return Err(e).context("failed to mint code"),
        }
    }

    Ok(())
}
