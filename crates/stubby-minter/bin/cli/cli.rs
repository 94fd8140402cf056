use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use stubby_snowflake::MAX_NODE_ID;

pub const NODE_ID_ENV: &str = "STUBBY_NODE_ID";
pub const QUOTA_BACKEND_ENV: &str = "STUBBY_QUOTA_BACKEND";
pub const REDIS_URL_ENV: &str = "STUBBY_REDIS_URL";
pub const SWEEP_INTERVAL_SECS_ENV: &str = "STUBBY_SWEEP_INTERVAL_SECS";
pub const REDIS_TIMEOUT_MS_ENV: &str = "STUBBY_REDIS_TIMEOUT_MS";
pub const USER_ID_ENV: &str = "STUBBY_USER_ID";
pub const SHORT_URL_LIMIT_ENV: &str = "STUBBY_SHORT_URL_LIMIT";
pub const CUSTOM_ALIAS_LIMIT_ENV: &str = "STUBBY_CUSTOM_ALIAS_LIMIT";
pub const WINDOW_SECS_ENV: &str = "STUBBY_WINDOW_SECS";
pub const LOG_FORMAT_ENV: &str = "STUBBY_LOG_FORMAT";

pub const DEFAULT_USER_ID: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuotaBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for QuotaBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaBackendArg::InMemory => write!(f, "in-memory"),
            QuotaBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "stubby-minter", about = "Mint short tokens under a usage quota")]
pub struct CLI {
    #[arg(
        long,
        env = NODE_ID_ENV,
        default_value_t = 0,
        value_parser = clap::value_parser!(u16).range(0..=MAX_NODE_ID as i64)
    )]
    pub node_id: u16,

    #[arg(
        long,
        env = QUOTA_BACKEND_ENV,
        value_enum,
        default_value_t = QuotaBackendArg::InMemory
    )]
    pub quota_backend: QuotaBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("quota_backend", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = SWEEP_INTERVAL_SECS_ENV, default_value_t = 30)]
    pub sweep_interval_secs: u64,

    #[arg(long, env = REDIS_TIMEOUT_MS_ENV, default_value_t = 250)]
    pub redis_timeout_ms: u64,

    #[arg(long, env = USER_ID_ENV, default_value = DEFAULT_USER_ID)]
    pub user_id: String,

    /// Alias used for the first minted code.
    #[arg(long)]
    pub custom_alias: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub count: u32,

    #[arg(long, env = SHORT_URL_LIMIT_ENV, default_value_t = 100)]
    pub limit: u64,

    #[arg(long, env = CUSTOM_ALIAS_LIMIT_ENV, default_value_t = 10)]
    pub alias_limit: u64,

    #[arg(long, env = WINDOW_SECS_ENV, default_value_t = 86_400)]
    pub window_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(["stubby-minter"]).unwrap();
        assert_eq!(cli.node_id, 0);
        assert_eq!(cli.quota_backend, QuotaBackendArg::InMemory);
        assert_eq!(cli.count, 1);
        assert_eq!(cli.window_secs, 86_400);
        assert_eq!(cli.log_format, LogFormatArg::Text);
    }

    #[test]
    fn redis_backend_requires_url() {
        assert!(CLI::try_parse_from(["stubby-minter", "--quota-backend", "redis"]).is_err());

        let cli = CLI::try_parse_from([
            "stubby-minter",
            "--quota-backend",
            "redis",
            "--redis-url",
            "redis://127.0.0.1:6379",
        ])
        .unwrap();
        assert_eq!(cli.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn node_id_out_of_range_is_rejected() {
        assert!(CLI::try_parse_from(["stubby-minter", "--node-id", "1023"]).is_ok());
        assert!(CLI::try_parse_from(["stubby-minter", "--node-id", "1024"]).is_err());
    }
}
