use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, IdGenStatus, Result, SnowflakeId, SystemClock, TimeSource, WorkerConfig,
    mutex::{Mutex, MutexGuard},
};

/// Mutable half of the worker, always read and written under the lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct State {
    /// Timestamp of the last issued ID. `None` until the first ID.
    pub(crate) last_timestamp: Option<u64>,
    pub(crate) sequence: u64,
}

/// A lock-based Snowflake ID worker for a fixed worker and datacenter id.
///
/// The worker keeps `(sequence, last_timestamp)` behind a single mutex, so one
/// instance can be shared (e.g. in an [`Arc`]) and called from many threads.
/// Every call samples the clock, updates the state and packs the ID while
/// holding the lock.
///
/// ## Guarantees
/// - IDs from one worker are strictly increasing while the clock does not go
///   backwards.
/// - IDs are unique across workers as long as each running worker has its
///   own `(worker_id, datacenter_id)` pair.
/// - At most 4096 IDs are issued per millisecond; beyond that the worker
///   waits for the next millisecond.
/// - A backwards clock is reported as [`Error::ClockRegression`] and never
///   produces an ID.
///
/// [`Arc`]: std::sync::Arc
#[derive(Debug)]
pub struct IdWorker<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Mutex<State>,
    worker_id: u64,
    datacenter_id: u64,
    time: T,
}

impl<T> IdWorker<T>
where
    T: TimeSource,
{
    /// Creates a new worker with an initial sequence of zero.
    ///
    /// # Panics
    ///
    /// Panics if `worker_id` or `datacenter_id` is greater than 31. An
    /// out-of-range id is a deployment mistake, so it stops the process at
    /// startup instead of reaching the generation path. Use
    /// [`Self::try_new`] to handle it as a value.
    ///
    /// # Example
    /// ```
    /// use idworker::{IdWorker, SystemClock};
    ///
    /// let worker = IdWorker::new(1, 1, SystemClock::default());
    /// let id = worker.next_id().unwrap();
    /// assert_eq!(id.worker_id(), 1);
    /// ```
    pub fn new(worker_id: u64, datacenter_id: u64, time: T) -> Self {
        Self::with_sequence(worker_id, datacenter_id, 0, time)
    }

    /// Creates a new worker with an explicit initial sequence.
    ///
    /// # Panics
    ///
    /// Panics on an invalid worker id, datacenter id or sequence. See
    /// [`Self::new`].
    pub fn with_sequence(worker_id: u64, datacenter_id: u64, sequence: u64, time: T) -> Self {
        match Self::try_with_sequence(worker_id, datacenter_id, sequence, time) {
            Ok(worker) => worker,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible counterpart to [`Self::new`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`] or [`Error::InvalidDatacenterId`]
    /// if either id does not fit in 5 bits.
    pub fn try_new(worker_id: u64, datacenter_id: u64, time: T) -> Result<Self> {
        Self::try_with_sequence(worker_id, datacenter_id, 0, time)
    }

    /// Fallible counterpart to [`Self::with_sequence`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`], [`Error::InvalidDatacenterId`] or
    /// [`Error::InvalidSequence`]. The sequence is range-checked too, even
    /// though the first ID always resets it to 0.
    pub fn try_with_sequence(
        worker_id: u64,
        datacenter_id: u64,
        sequence: u64,
        time: T,
    ) -> Result<Self> {
        WorkerConfig {
            worker_id,
            datacenter_id,
            sequence,
            ..WorkerConfig::default()
        }
        .validate_ids()?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            timestamp_left_shift = SnowflakeId::TIMESTAMP_SHIFT,
            datacenter_id_bits = SnowflakeId::DATACENTER_ID_BITS,
            worker_id_bits = SnowflakeId::WORKER_ID_BITS,
            sequence_bits = SnowflakeId::SEQUENCE_BITS,
            worker_id,
            datacenter_id,
            "IdWorker starting"
        );

        let state = Mutex::new(State {
            last_timestamp: None,
            sequence,
        });
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            worker_id,
            datacenter_id,
            time,
        })
    }

    /// The worker ID packed into every ID from this worker.
    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// The datacenter ID packed into every ID from this worker.
    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    /// Generates the next ID, waiting out sequence exhaustion.
    ///
    /// When 4096 IDs have already been issued in the current millisecond,
    /// this spins on the clock until it advances. The lock is held while
    /// spinning, so other callers queue behind it for at most about a
    /// millisecond.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock reads earlier than the last
    ///   issued ID. No ID is produced and the state is left as it was, so
    ///   every call fails until the clock catches up.
    /// - [`Error::TimestampOverflow`] once the clock no longer fits in 41
    ///   bits.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding
    ///   the lock (not with `parking-lot`).
    ///
    /// # Example
    /// ```
    /// use idworker::{Error, IdWorker, SystemClock};
    ///
    /// let worker = IdWorker::new(0, 0, SystemClock::default());
    /// match worker.next_id() {
    ///     Ok(id) => println!("{id}"),
    ///     Err(Error::ClockRegression { backward_millis, .. }) => {
    ///         eprintln!("clock went back {backward_millis}ms");
    ///     }
    ///     Err(e) => panic!("{e}"),
    /// }
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.lock()?;
        loop {
            let now = self.time.current_millis();
            match self.advance(&mut state, now)? {
                IdGenStatus::Ready { id } => break Ok(id),
                IdGenStatus::Pending { .. } => core::hint::spin_loop(),
            }
        }
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// Returns [`IdGenStatus::Pending`] instead of spinning when the
    /// sequence is exhausted for the current millisecond. A pending poll
    /// consumes nothing.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    ///
    /// # Example
    /// ```
    /// use idworker::{IdGenStatus, IdWorker, SystemClock};
    ///
    /// let worker = IdWorker::new(0, 0, SystemClock::default());
    /// let id = loop {
    ///     match worker.try_poll_id() {
    ///         Ok(IdGenStatus::Ready { id }) => break id,
    ///         Ok(IdGenStatus::Pending { .. }) => std::thread::yield_now(),
    ///         Err(e) => panic!("Generator error: {e}"),
    ///     }
    /// };
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();
        self.advance(&mut state, now)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    /// Moves `state` to the next `(sequence, last_timestamp)` pair for a
    /// clock reading of `now`. State is only written when an ID is issued.
    fn advance(&self, state: &mut State, now: u64) -> Result<IdGenStatus> {
        if now > SnowflakeId::MAX_TIMESTAMP {
            return Err(Self::cold_timestamp_overflow(now));
        }

        let Some(last) = state.last_timestamp else {
            return Ok(self.rollover(state, now));
        };

        match now.cmp(&last) {
            Ordering::Equal => {
                if state.sequence < SnowflakeId::MAX_SEQUENCE {
                    state.sequence += 1;
                    Ok(IdGenStatus::Ready {
                        id: self.compose(now, state.sequence),
                    })
                } else {
                    Ok(IdGenStatus::Pending {
                        yield_until: last + 1,
                    })
                }
            }
            Ordering::Greater => Ok(self.rollover(state, now)),
            Ordering::Less => Err(Self::cold_clock_behind(now, last)),
        }
    }

    fn rollover(&self, state: &mut State, now: u64) -> IdGenStatus {
        state.last_timestamp = Some(now);
        state.sequence = 0;
        IdGenStatus::Ready {
            id: self.compose(now, 0),
        }
    }

    fn compose(&self, timestamp: u64, sequence: u64) -> SnowflakeId {
        debug_assert!(timestamp <= SnowflakeId::MAX_TIMESTAMP, "timestamp overflow");
        SnowflakeId::from_components(timestamp, self.datacenter_id, self.worker_id, sequence)
    }

    #[cold]
    #[inline(never)]
    fn cold_timestamp_overflow(timestamp: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::error!(timestamp, "timestamp no longer fits in 41 bits");
        Error::TimestampOverflow { timestamp }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_timestamp: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::error!(
            last_timestamp,
            now,
            "clock is moving backwards, rejecting requests until {last_timestamp}"
        );
        Error::ClockRegression {
            backward_millis: last_timestamp - now,
            last_timestamp,
        }
    }
}

impl IdWorker<SystemClock> {
    /// Creates a wall-clock worker from a [`WorkerConfig`].
    ///
    /// # Errors
    ///
    /// Returns the validation error of [`WorkerConfig::validate`].
    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        config.validate_ids()?;
        Self::try_with_sequence(
            config.worker_id,
            config.datacenter_id,
            config.sequence,
            config.clock()?,
        )
    }
}
