use crate::{Error, Result, SnowflakeId, SystemClock, TWITTER_EPOCH_MILLIS};

/// Construction input for an [`IdWorker`] running on the wall clock.
///
/// With the `serde` feature enabled this can be embedded in an application's
/// own configuration file; missing fields fall back to [`Default`].
///
/// ```
/// use idworker::{IdWorker, WorkerConfig};
///
/// let config = WorkerConfig {
///     worker_id: 3,
///     datacenter_id: 7,
///     ..WorkerConfig::default()
/// };
/// let worker = IdWorker::from_config(&config).unwrap();
/// let id = worker.next_id().unwrap();
/// assert_eq!(id.worker_id(), 3);
/// assert_eq!(id.datacenter_id(), 7);
/// ```
///
/// [`IdWorker`]: crate::IdWorker
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Worker within the datacenter, `0..=31`.
    pub worker_id: u64,
    /// Datacenter (deployment site), `0..=31`.
    pub datacenter_id: u64,
    /// Initial sequence, `0..=4095`.
    pub sequence: u64,
    /// Custom epoch in Unix milliseconds. Must stay fixed for the lifetime of
    /// a deployment.
    pub epoch_millis: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            datacenter_id: 0,
            sequence: 0,
            epoch_millis: TWITTER_EPOCH_MILLIS,
        }
    }
}

impl WorkerConfig {
    /// Checks every field. Out-of-range values are rejected, never clamped.
    ///
    /// # Errors
    ///
    /// Returns the first of [`Error::InvalidWorkerId`],
    /// [`Error::InvalidDatacenterId`], [`Error::InvalidSequence`] or
    /// [`Error::EpochInFuture`] that applies.
    pub fn validate(&self) -> Result<()> {
        self.validate_ids()?;
        self.clock().map(|_| ())
    }

    /// Checks the fields packed into IDs against their bit widths.
    ///
    /// The sequence is checked even though the first ID always starts it at
    /// 0.
    pub(crate) fn validate_ids(&self) -> Result<()> {
        if self.worker_id > SnowflakeId::MAX_WORKER_ID {
            return Err(Error::InvalidWorkerId {
                worker_id: self.worker_id,
            });
        }
        if self.datacenter_id > SnowflakeId::MAX_DATACENTER_ID {
            return Err(Error::InvalidDatacenterId {
                datacenter_id: self.datacenter_id,
            });
        }
        if self.sequence > SnowflakeId::MAX_SEQUENCE {
            return Err(Error::InvalidSequence {
                sequence: self.sequence,
            });
        }
        Ok(())
    }

    /// The wall clock anchored at [`Self::epoch_millis`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if the epoch is later than now.
    pub fn clock(&self) -> Result<SystemClock> {
        SystemClock::try_with_epoch_millis(self.epoch_millis)
    }
}
