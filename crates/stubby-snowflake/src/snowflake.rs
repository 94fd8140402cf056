use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    flake_id::{FlakeId, NODE_ID_BITS, SEQUENCE_BITS, TIMESTAMP_BITS},
};
use jiff::Timestamp;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, trace, Span};
use typed_builder::TypedBuilder;

pub const MAX_NODE_ID: u16 = (1 << NODE_ID_BITS) - 1;
pub const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP_MILLIS: u64 = (1 << TIMESTAMP_BITS) - 1;

/// 2024-01-01T00:00:00Z.
pub const DEFAULT_EPOCH: Timestamp = Timestamp::constant(1_704_067_200, 0);

/// Configures a Snowflake allocator instance.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SnowflakeSettings {
    /// A unique node index in the range `[0, 1023]`.
    pub node_id: u16,
    /// Custom epoch used as the zero point for the 41-bit timestamp field.
    #[builder(default = DEFAULT_EPOCH)]
    pub epoch: Timestamp,
    /// Upper bound on spinning for the next millisecond once the sequence
    /// space of the current one is used up.
    #[builder(default = Duration::from_millis(50))]
    pub max_spin: Duration,
    /// Span every log event of the allocator is attached to.
    #[builder(default, setter(strip_option))]
    pub span: Option<Span>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: Option<u64>,
    sequence: u16,
}

/// Snowflake id allocator: 41 bits of milliseconds, 10 bits of node id and a
/// 12 bit sequence.
///
/// Clock regression fails the call instead of waiting, and exhausting the
/// sequence spins for the next millisecond for at most `max_spin`.
pub struct Snowflake<C: Clock> {
    epoch: Timestamp,
    node_id: u16,
    max_spin: Duration,
    clock: C,
    span: Span,
    state: Mutex<GeneratorState>,
}

impl Snowflake<SystemClock> {
    /// Creates an allocator backed by the real system clock.
    pub fn new(settings: SnowflakeSettings) -> Result<Self> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Snowflake<C> {
    /// Creates an allocator reading time from `clock`.
    pub fn with_clock(settings: SnowflakeSettings, clock: C) -> Result<Self> {
        let span = settings
            .span
            .unwrap_or_else(|| info_span!("snowflake", node_id = settings.node_id));

        if settings.node_id > MAX_NODE_ID {
            error!(parent: &span, node_id = settings.node_id, "node id out of range");
            return Err(Error::InvalidNodeId {
                node_id: settings.node_id,
                max_node_id: MAX_NODE_ID,
            });
        }

        let now = clock.now();
        if settings.epoch > now {
            return Err(Error::EpochAhead {
                epoch: settings.epoch,
                now,
            });
        }

        info!(
            parent: &span,
            node_id = settings.node_id,
            epoch = %settings.epoch,
            "snowflake allocator initialized"
        );

        Ok(Self {
            epoch: settings.epoch,
            node_id: settings.node_id,
            max_spin: settings.max_spin,
            clock,
            span,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    pub fn epoch(&self) -> Timestamp {
        self.epoch
    }

    /// Allocates the next id as a plain integer.
    pub fn allocate(&self) -> Result<u64> {
        self.next_id().map(|id| id.as_u64())
    }

    /// Allocates the next id.
    ///
    /// The whole read-compare-update runs under the state lock, and the state
    /// is only written once the id is known to be valid, so a failed call
    /// leaves the allocator exactly as it was.
    pub fn next_id(&self) -> Result<FlakeId> {
        let mut state = self.state.lock().map_err(|_| Error::StatePoisoned)?;

        let mut now = self.elapsed_millis(state.last_timestamp)?;
        let sequence = match state.last_timestamp {
            None => 0,
            Some(last) if now < last => {
                error!(parent: &self.span, last, now, "clock moved backwards");
                // below `last`, so it fits 41 bits
                return Err(Error::ClockRegression {
                    last,
                    now: now as i64,
                });
            }
            Some(last) if now == last => {
                let sequence = (state.sequence + 1) & MAX_SEQUENCE;
                if sequence == 0 {
                    now = self.wait_next_millis(last)?;
                }
                sequence
            }
            Some(_) => 0,
        };

        if now > MAX_TIMESTAMP_MILLIS {
            return Err(Error::OverTimeLimit);
        }

        state.last_timestamp = Some(now);
        state.sequence = sequence;

        Ok(FlakeId::new()
            .with_timestamp(now)
            .with_node_id(self.node_id)
            .with_sequence(sequence))
    }

    /// Milliseconds elapsed since the custom epoch.
    ///
    /// A clock behind the epoch is a regression once `last` exists.
    fn elapsed_millis(&self, last: Option<u64>) -> Result<u64> {
        let now = self.clock.now();
        let elapsed = now.as_millisecond() - self.epoch.as_millisecond();
        match (u64::try_from(elapsed), last) {
            (Ok(elapsed), _) => Ok(elapsed),
            (Err(_), Some(last)) => {
                error!(parent: &self.span, last, now = elapsed, "clock moved behind the epoch");
                Err(Error::ClockRegression { last, now: elapsed })
            }
            (Err(_), None) => Err(Error::EpochAhead {
                epoch: self.epoch,
                now,
            }),
        }
    }

    /// Spins until the clock passes `last`.
    fn wait_next_millis(&self, last: u64) -> Result<u64> {
        trace!(parent: &self.span, last, "sequence exhausted, spinning for next millisecond");

        let started = Instant::now();
        loop {
            self.clock.relax();
            let now = self.elapsed_millis(Some(last))?;
            if now > last {
                return Ok(now);
            }
            if now < last {
                error!(parent: &self.span, last, now, "clock moved backwards while spinning");
                return Err(Error::ClockRegression {
                    last,
                    now: now as i64,
                });
            }

            let waited = started.elapsed();
            if waited >= self.max_spin {
                error!(parent: &self.span, last, ?waited, "clock stalled");
                return Err(Error::ClockStalled { waited });
            }
        }
    }
}
