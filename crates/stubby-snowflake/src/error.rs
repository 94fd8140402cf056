use jiff::Timestamp;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by Snowflake initialization and id allocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid node id {node_id}; expected 0..={max_node_id}")]
    InvalidNodeId { node_id: u16, max_node_id: u16 },
    #[error("epoch is ahead of current clock time: epoch={epoch}, now={now}")]
    EpochAhead { epoch: Timestamp, now: Timestamp },
    /// The clock reads earlier than the last minted millisecond.
    ///
    /// Both values are milliseconds since the custom epoch; `now` is negative
    /// when the clock fell behind the epoch itself.
    #[error("clock moved backwards: last={last}ms, now={now}ms")]
    ClockRegression { last: u64, now: i64 },
    #[error("clock did not advance within {waited:?} after sequence exhaustion")]
    ClockStalled { waited: Duration },
    #[error("overtime limit")]
    OverTimeLimit,
    #[error("generator state lock is poisoned")]
    StatePoisoned,
}
