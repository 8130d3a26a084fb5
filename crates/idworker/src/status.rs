use crate::SnowflakeId;

/// Represents the result of polling an [`IdWorker`] for a new ID.
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means 4096 IDs were already issued this
///   millisecond and no ID can be produced until the clock reaches
///   `yield_until`.
///
/// This allows non-blocking generation loops and custom backoff strategies.
/// [`IdWorker::next_id`] spins on `Pending` for you.
///
/// # Example
///
/// ```
/// use idworker::{IdGenStatus, IdWorker, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let worker = IdWorker::new(1, 1, FixedTime);
/// match worker.try_poll_id().unwrap() {
///     IdGenStatus::Ready { id } => println!("ID: {}", id.timestamp()),
///     IdGenStatus::Pending { yield_until } => println!("Back off until: {yield_until}"),
/// }
/// ```
///
/// [`IdWorker`]: crate::IdWorker
/// [`IdWorker::next_id`]: crate::IdWorker::next_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated because the sequence has been exhausted for the
    /// current millisecond.
    Pending {
        /// The next timestamp (inclusive) at which you may resume generating
        /// IDs.
        yield_until: u64,
    },
}
