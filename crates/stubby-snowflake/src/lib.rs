//! Node-partitioned, time-ordered 64-bit identifier allocation.
//!
//! Every id packs the milliseconds elapsed since a custom epoch, the node id
//! and a per-millisecond sequence into one integer, so ids minted by one
//! [`Snowflake`] instance are strictly increasing.

mod clock;
pub mod error;
mod flake_id;
mod snowflake;

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use flake_id::FlakeId;
pub use snowflake::{Snowflake, SnowflakeSettings, DEFAULT_EPOCH, MAX_NODE_ID, MAX_SEQUENCE};
