use crate::{Error, Result};
use core::time::Duration;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH_MILLIS: u64 = 1_288_834_974_657;

/// [`TWITTER_EPOCH_MILLIS`] as a [`Duration`] since the Unix epoch.
pub const TWITTER_EPOCH: Duration = Duration::from_millis(TWITTER_EPOCH_MILLIS);

/// A source of millisecond timestamps relative to some fixed epoch.
///
/// This abstraction allows you to plug in the real wall clock or a mocked
/// time source in tests. The worker compares successive readings to detect a
/// clock that moved backwards, so implementations must not smooth over
/// regressions themselves.
///
/// # Example
///
/// ```
/// use idworker::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The host's wall clock, offset by a custom epoch.
///
/// Every call reads `SystemTime::now()`, so adjustments to the system clock
/// (NTP steps, manual changes) are visible to the worker and a backwards step
/// surfaces as [`Error::ClockRegression`].
///
/// The epoch must not lie in the future: the constructors check it against
/// the wall clock once. A reading earlier than the epoch after that can only
/// come from the clock stepping back past it, and reads as 0.
///
/// [`Error::ClockRegression`]: crate::Error::ClockRegression
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch_millis: u64,
}

impl Default for SystemClock {
    /// Constructs a wall clock aligned to [`TWITTER_EPOCH`].
    fn default() -> Self {
        Self {
            epoch_millis: TWITTER_EPOCH_MILLIS,
        }
    }
}

impl SystemClock {
    /// Constructs a wall clock whose zero point is `epoch`, given as a
    /// [`Duration`] since 1970-01-01 UTC.
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than `epoch`. Use
    /// [`Self::try_with_epoch`] to handle it as a value.
    ///
    /// # Example
    ///
    /// ```
    /// use idworker::{SystemClock, TimeSource, TWITTER_EPOCH};
    ///
    /// let clock = SystemClock::with_epoch(TWITTER_EPOCH);
    /// assert!(clock.current_millis() > 0);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Self {
        Self::with_epoch_millis(epoch.as_millis() as u64)
    }

    /// Same as [`Self::with_epoch`] with the epoch in Unix milliseconds.
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than `epoch_millis`.
    pub fn with_epoch_millis(epoch_millis: u64) -> Self {
        match Self::try_with_epoch_millis(epoch_millis) {
            Ok(clock) => clock,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible counterpart to [`Self::with_epoch`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if the current system time is earlier
    /// than `epoch`.
    pub fn try_with_epoch(epoch: Duration) -> Result<Self> {
        Self::try_with_epoch_millis(epoch.as_millis() as u64)
    }

    /// Fallible counterpart to [`Self::with_epoch_millis`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if the current system time is earlier
    /// than `epoch_millis`.
    pub fn try_with_epoch_millis(epoch_millis: u64) -> Result<Self> {
        let now_millis = Self::unix_millis();
        if epoch_millis > now_millis {
            return Err(Error::EpochInFuture {
                epoch_millis,
                now_millis,
            });
        }
        Ok(Self { epoch_millis })
    }

    /// The epoch this clock measures from, in Unix milliseconds.
    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }

    /// Milliseconds since the Unix epoch, or zero if the system clock reports
    /// a time before 1970.
    pub fn unix_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // Only below the epoch after a backwards step past it.
        Self::unix_millis().saturating_sub(self.epoch_millis)
    }
}
