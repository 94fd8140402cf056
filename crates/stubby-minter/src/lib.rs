//! Token minting workflow.
//!
//! Combines a [`Generator`](stubby_generator::Generator) with a
//! [`UsageTracker`](stubby_cache::UsageTracker): quotas are checked first,
//! then a token is generated (or the caller's alias accepted) and the usage
//! recorded.

pub mod code;
pub mod error;
pub mod minter;

pub use code::MintedCode;
pub use error::{MintError, Result};
pub use minter::{MintRequest, Minter, QuotaLimits};
