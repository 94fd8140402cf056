//! Core types and traits for the Stubby token service.
//!
//! This crate provides the base-62 token encoder and the usage quota
//! contract shared by the generator, cache and minter crates.

pub mod base62;
pub mod error;
pub mod quota;

pub use base62::{encode, ShortToken, ALPHABET};
pub use error::{CacheError, CoreError, Result};
pub use quota::{QuotaKey, UsageQuota};
