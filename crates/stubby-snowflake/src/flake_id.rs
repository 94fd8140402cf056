use modular_bitfield::prelude::*;
use std::cmp::Ordering;
use std::fmt;

pub(crate) const SEQUENCE_BITS: u32 = 12;
pub(crate) const NODE_ID_BITS: u32 = 10;
pub(crate) const TIMESTAMP_BITS: u32 = 41;

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlakeId {
    /// 12 bits for sequence number (resets every millisecond).
    pub sequence: B12,
    /// 10 bits for node ID (allows up to 1024 nodes).
    pub node_id: B10,
    /// 41 bits for timestamp (milliseconds since a custom epoch).
    pub timestamp: B41,
    #[skip]
    __: B1,
}

impl FlakeId {
    /// Returns the id as `timestamp << 22 | node_id << 12 | sequence`.
    ///
    /// The reserved top bit is always zero, so the value also fits an `i64`.
    pub fn as_u64(&self) -> u64 {
        (self.timestamp() << (NODE_ID_BITS + SEQUENCE_BITS))
            | (u64::from(self.node_id()) << SEQUENCE_BITS)
            | u64::from(self.sequence())
    }

    /// Splits a composed value back into its fields. The reserved bit is dropped.
    pub fn from_u64(value: u64) -> Self {
        FlakeId::new()
            .with_sequence((value & ((1 << SEQUENCE_BITS) - 1)) as u16)
            .with_node_id(((value >> SEQUENCE_BITS) & ((1 << NODE_ID_BITS) - 1)) as u16)
            .with_timestamp(
                (value >> (NODE_ID_BITS + SEQUENCE_BITS)) & ((1 << TIMESTAMP_BITS) - 1),
            )
    }
}

impl From<FlakeId> for u64 {
    fn from(id: FlakeId) -> Self {
        id.as_u64()
    }
}

impl PartialOrd for FlakeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlakeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_u64().cmp(&other.as_u64())
    }
}

impl fmt::Debug for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakeId")
            .field("timestamp", &self.timestamp())
            .field("node_id", &self.node_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl fmt::Display for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}
