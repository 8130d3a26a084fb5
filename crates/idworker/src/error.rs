//! Error types for the ID worker.
//!
//! Two kinds of failure exist:
//! - configuration errors (`InvalidWorkerId`, `InvalidDatacenterId`,
//!   `InvalidSequence`, `EpochInFuture`), raised once at construction and
//!   never on the generation path.
//! - clock errors (`ClockRegression`, `TimestampOverflow`), raised per call.
//!   The worker never retries them on the caller's behalf.

use crate::id::SnowflakeId;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `idworker` can emit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The worker id does not fit in its 5-bit field.
    #[error("worker id can't be greater than {max} or less than 0, got {worker_id}", max = SnowflakeId::MAX_WORKER_ID)]
    InvalidWorkerId { worker_id: u64 },

    /// The datacenter id does not fit in its 5-bit field.
    #[error("datacenter id can't be greater than {max} or less than 0, got {datacenter_id}", max = SnowflakeId::MAX_DATACENTER_ID)]
    InvalidDatacenterId { datacenter_id: u64 },

    /// The initial sequence does not fit in its 12-bit field.
    ///
    /// Stricter than the id checks require: the first ID always resets the
    /// sequence to 0, but an out-of-range value is still a configuration
    /// mistake and is rejected rather than ignored.
    #[error("sequence can't be greater than {max}, got {sequence}", max = SnowflakeId::MAX_SEQUENCE)]
    InvalidSequence { sequence: u64 },

    /// The configured epoch lies after the current wall-clock time.
    #[error("epoch {epoch_millis} is later than the current time {now_millis}")]
    EpochInFuture { epoch_millis: u64, now_millis: u64 },

    /// The clock reading no longer fits in the 41-bit timestamp field.
    ///
    /// Packing it would wrap the timestamp and break ordering, so no ID is
    /// produced.
    #[error("timestamp {timestamp} exceeds the maximum of {max}", max = SnowflakeId::MAX_TIMESTAMP)]
    TimestampOverflow { timestamp: u64 },

    /// The clock reported a time earlier than the last issued ID.
    ///
    /// `backward_millis` is how far the clock has to catch up before the
    /// worker will issue IDs again.
    #[error(
        "clock moved backwards, refusing to generate id for {backward_millis} milliseconds (last timestamp {last_timestamp})"
    )]
    ClockRegression {
        backward_millis: u64,
        last_timestamp: u64,
    },

    /// The worker's lock was poisoned by a panicking thread.
    ///
    /// Not available with `parking-lot`, whose mutexes do not poison.
    #[cfg(not(feature = "parking-lot"))]
    #[error("id worker lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}
