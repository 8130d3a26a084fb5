use crate::{Error, IdGenStatus, IdWorker, SnowflakeId, SystemClock, TimeSource, WorkerConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::scope;

#[derive(Debug)]
struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock the test moves by hand, including backwards.
#[derive(Debug)]
struct ManualTime {
    millis: AtomicU64,
}

impl ManualTime {
    fn new(millis: u64) -> Arc<Self> {
        Arc::new(Self {
            millis: AtomicU64::new(millis),
        })
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Relaxed);
    }
}

impl TimeSource for ManualTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}

/// Reports `at` for the first `stall_reads` readings, then `at + 1`.
#[derive(Debug)]
struct StallThenAdvance {
    at: u64,
    stall_reads: u64,
    reads: AtomicU64,
}

impl TimeSource for StallThenAdvance {
    fn current_millis(&self) -> u64 {
        if self.reads.fetch_add(1, Ordering::Relaxed) < self.stall_reads {
            self.at
        } else {
            self.at + 1
        }
    }
}

/// Reports `at` for the first `stall_reads` readings, then `at - 1`.
#[derive(Debug)]
struct StallThenStepBack {
    at: u64,
    stall_reads: u64,
    reads: AtomicU64,
}

impl TimeSource for StallThenStepBack {
    fn current_millis(&self) -> u64 {
        if self.reads.fetch_add(1, Ordering::Relaxed) < self.stall_reads {
            self.at
        } else {
            self.at - 1
        }
    }
}

trait IdGenStatusExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl IdGenStatusExt for IdGenStatus {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_until } => {
                panic!("unexpected pending (yield until: {yield_until})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_until } => yield_until,
        }
    }
}

#[test]
fn construction_accepts_every_valid_pair() {
    for worker_id in 0..=SnowflakeId::MAX_WORKER_ID {
        for datacenter_id in 0..=SnowflakeId::MAX_DATACENTER_ID {
            let worker = IdWorker::try_new(worker_id, datacenter_id, MockTime { millis: 1 })
                .expect("valid ids");
            assert_eq!(worker.worker_id(), worker_id);
            assert_eq!(worker.datacenter_id(), datacenter_id);
        }
    }
}

#[test]
fn construction_rejects_out_of_range_ids() {
    for bad in [32, 33, 1_000, u64::MAX] {
        assert_eq!(
            IdWorker::try_new(bad, 0, MockTime { millis: 1 }).unwrap_err(),
            Error::InvalidWorkerId { worker_id: bad }
        );
        assert_eq!(
            IdWorker::try_new(0, bad, MockTime { millis: 1 }).unwrap_err(),
            Error::InvalidDatacenterId { datacenter_id: bad }
        );
    }
    assert_eq!(
        IdWorker::try_with_sequence(0, 0, 4096, MockTime { millis: 1 }).unwrap_err(),
        Error::InvalidSequence { sequence: 4096 }
    );
}

#[test]
#[should_panic(expected = "worker id can't be greater than 31")]
fn new_panics_on_invalid_worker_id() {
    let _ = IdWorker::new(32, 0, MockTime { millis: 1 });
}

#[test]
#[should_panic(expected = "datacenter id can't be greater than 31")]
fn new_panics_on_invalid_datacenter_id() {
    let _ = IdWorker::new(0, 32, MockTime { millis: 1 });
}

#[test]
fn ids_carry_worker_and_datacenter_bits() {
    let worker = IdWorker::new(1, 1, MockTime { millis: 42 });

    let id1 = worker.next_id().unwrap();
    let id2 = worker.next_id().unwrap();

    assert_eq!(id1.to_raw() & 0xfff, 0);
    assert_eq!((id1.to_raw() >> 12) & 0x1f, 1);
    assert_eq!((id1.to_raw() >> 17) & 0x1f, 1);
    assert_eq!(id1.to_raw() >> 22, 42);
    assert_eq!(id2.to_raw(), id1.to_raw() | 1);
}

#[test]
fn sequence_increments_within_same_tick() {
    let worker = IdWorker::new(3, 5, MockTime { millis: 42 });

    let id1 = worker.next_id().unwrap();
    let id2 = worker.next_id().unwrap();
    let id3 = worker.next_id().unwrap();

    for id in [id1, id2, id3] {
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.worker_id(), 3);
        assert_eq!(id.datacenter_id(), 5);
    }
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn initial_sequence_is_reset_by_first_id() {
    let worker = IdWorker::with_sequence(0, 0, 4000, MockTime { millis: 42 });
    let id = worker.next_id().unwrap();
    assert_eq!(id.sequence(), 0);
    assert_eq!(id.timestamp(), 42);
}

#[test]
fn sequence_resets_when_clock_advances() {
    let time = ManualTime::new(100);
    let worker = IdWorker::new(0, 0, Arc::clone(&time));

    worker.next_id().unwrap();
    let last_in_tick = worker.next_id().unwrap();
    assert_eq!(last_in_tick.sequence(), 1);

    time.set(105);
    let id = worker.next_id().unwrap();
    assert_eq!(id.timestamp(), 105);
    assert_eq!(id.sequence(), 0);
    assert!(id > last_in_tick);
}

#[test]
fn next_id_waits_for_next_millisecond_when_sequence_exhausted() {
    const PER_TICK: u64 = SnowflakeId::MAX_SEQUENCE + 1;

    // One reading per issued ID, then a few stalled readings while spinning.
    let time = StallThenAdvance {
        at: 42,
        stall_reads: PER_TICK + 3,
        reads: AtomicU64::new(0),
    };
    let worker = IdWorker::new(1, 2, time);

    for i in 0..PER_TICK {
        let id = worker.next_id().unwrap();
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.sequence(), i);
    }

    let id = worker.next_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
    assert_eq!(id.worker_id(), 1);
    assert_eq!(id.datacenter_id(), 2);
}

#[test]
fn poll_returns_pending_without_consuming_sequence() {
    let time = ManualTime::new(42);
    let worker = IdWorker::new(0, 0, Arc::clone(&time));

    for i in 0..=SnowflakeId::MAX_SEQUENCE {
        let id = worker.try_poll_id().unwrap().unwrap_ready();
        assert_eq!(id.sequence(), i);
    }

    assert_eq!(worker.try_poll_id().unwrap().unwrap_pending(), 43);
    assert_eq!(worker.try_poll_id().unwrap().unwrap_pending(), 43);

    time.set(43);
    let id = worker.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn backwards_clock_is_rejected() {
    let time = ManualTime::new(100);
    let worker = IdWorker::new(0, 0, Arc::clone(&time));

    let first = worker.next_id().unwrap();

    time.set(90);
    let expected = Error::ClockRegression {
        backward_millis: 10,
        last_timestamp: 100,
    };
    assert_eq!(worker.next_id().unwrap_err(), expected);
    assert_eq!(worker.try_poll_id().unwrap_err(), expected);

    // The failed calls left the state untouched.
    time.set(100);
    let id = worker.next_id().unwrap();
    assert_eq!(id.timestamp(), 100);
    assert_eq!(id.sequence(), first.sequence() + 1);
}

#[test]
fn backwards_clock_while_waiting_on_exhaustion_is_rejected() {
    const PER_TICK: u64 = SnowflakeId::MAX_SEQUENCE + 1;

    let time = StallThenStepBack {
        at: 42,
        stall_reads: PER_TICK + 3,
        reads: AtomicU64::new(0),
    };
    let worker = IdWorker::new(0, 0, time);

    for _ in 0..PER_TICK {
        worker.next_id().unwrap();
    }

    assert_eq!(
        worker.next_id().unwrap_err(),
        Error::ClockRegression {
            backward_millis: 1,
            last_timestamp: 42,
        }
    );
}

#[test]
fn timestamp_past_41_bits_is_rejected() {
    let time = ManualTime::new(SnowflakeId::MAX_TIMESTAMP);
    let worker = IdWorker::new(0, 0, Arc::clone(&time));

    let last = worker.next_id().unwrap();
    assert_eq!(last.timestamp(), SnowflakeId::MAX_TIMESTAMP);

    time.set(SnowflakeId::MAX_TIMESTAMP + 1);
    let expected = Error::TimestampOverflow {
        timestamp: SnowflakeId::MAX_TIMESTAMP + 1,
    };
    assert_eq!(worker.next_id().unwrap_err(), expected);
    assert_eq!(worker.try_poll_id().unwrap_err(), expected);

    // The last good ID's millisecond is still usable.
    time.set(SnowflakeId::MAX_TIMESTAMP);
    let id = worker.next_id().unwrap();
    assert!(id > last);
    assert_eq!(id.sequence(), 1);
}

#[test]
fn from_config_rejects_epoch_in_the_future() {
    let epoch_millis = SystemClock::unix_millis() + 3_600_000;
    let config = WorkerConfig {
        worker_id: 1,
        datacenter_id: 1,
        epoch_millis,
        ..WorkerConfig::default()
    };

    match IdWorker::from_config(&config) {
        Err(Error::EpochInFuture {
            epoch_millis: rejected,
            ..
        }) => assert_eq!(rejected, epoch_millis),
        other => panic!("expected EpochInFuture, got {other:?}"),
    }
}

#[test]
fn from_config_with_past_epoch_issues_current_timestamps() {
    let epoch_millis = SystemClock::unix_millis() - 1_000;
    let config = WorkerConfig {
        worker_id: 2,
        datacenter_id: 3,
        epoch_millis,
        ..WorkerConfig::default()
    };
    let worker = IdWorker::from_config(&config).unwrap();

    let id = worker.next_id().unwrap();
    assert!(id.timestamp() >= 1_000);
    assert_eq!(id.worker_id(), 2);
    assert_eq!(id.datacenter_id(), 3);
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn poisoned_lock_is_reported() {
    let worker = IdWorker::new(0, 0, MockTime { millis: 1 });

    scope(|s| {
        let result = s
            .spawn(|| {
                let _guard = worker.state.lock().unwrap();
                panic!("poison the worker lock");
            })
            .join();
        assert!(result.is_err());
    });

    assert_eq!(worker.next_id().unwrap_err(), Error::LockPoisoned);
}

#[test]
fn system_clock_ids_are_unique_and_ordered() {
    const TOTAL_IDS: usize = 4096 * 64;

    let worker = IdWorker::new(1, 1, SystemClock::default());
    let mut seen = HashSet::with_capacity(TOTAL_IDS);
    let mut last: Option<SnowflakeId> = None;

    for _ in 0..TOTAL_IDS {
        let id = worker.next_id().unwrap();
        assert_eq!(id.worker_id(), 1);
        assert_eq!(id.datacenter_id(), 1);

        if let Some(prev) = last {
            assert!(id > prev);
            assert!(id.timestamp() >= prev.timestamp());
            if id.timestamp() == prev.timestamp() {
                assert_eq!(id.sequence(), prev.sequence() + 1);
            } else {
                assert_eq!(id.sequence(), 0);
            }
        }

        assert!(seen.insert(id));
        last = Some(id);
    }
}

#[test]
fn threaded_ids_are_unique() {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 4096 * 32;

    let worker = IdWorker::new(7, 9, SystemClock::default());

    let batches: Vec<Vec<SnowflakeId>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..IDS_PER_THREAD)
                        .map(|_| worker.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::with_capacity(THREADS * IDS_PER_THREAD);
    for batch in &batches {
        // Each thread observes its own IDs in increasing order.
        assert!(batch.windows(2).all(|w| w[0] < w[1]));
        for id in batch {
            assert!(seen.insert(*id), "duplicate id {id:?}");
        }
    }
    assert_eq!(seen.len(), THREADS * IDS_PER_THREAD);
}
