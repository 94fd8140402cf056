use jiff::Timestamp;

/// Time source of an allocator.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
    /// Called once per iteration while spinning for the next millisecond.
    fn relax(&self);
}

/// Wall clock, spinning with a CPU hint.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn relax(&self) {
        std::hint::spin_loop();
    }
}
