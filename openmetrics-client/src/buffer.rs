//! Collector/observer coordination during snapshots.
//!
//! While a snapshot reads a series' storage, concurrent observers keep
//! running: their observations are parked in a lock-free queue and replayed
//! into storage once the snapshot is taken. The protocol gives the ordering
//! guarantee of a linearizable snapshot: an observation that completed
//! before the snapshot began is included, one that starts after it ends
//! lands in the next snapshot, and one that overlaps is included in exactly
//! one of the two.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::SegQueue;
use openmetrics_model::Labels;
use parking_lot::Mutex;

// High bit flags "snapshot in progress"; the low 63 bits count started
// observations.
const BUFFERING_BIT: u64 = 1 << 63;
const COUNT_MASK: u64 = BUFFERING_BIT - 1;

struct Parked {
    value: f64,
    exemplar_labels: Option<Labels>,
}

/// Per-series observation buffer.
///
/// Series that use the buffer must increment their completed-observation
/// counter as the final step of every direct write, so the counter acts as
/// the watermark `run` spins on.
pub(crate) struct ObservationBuffer {
    state: AtomicU64,
    queue: SegQueue<Parked>,
    snapshot_lock: Mutex<()>,
}

impl ObservationBuffer {
    pub fn new() -> ObservationBuffer {
        ObservationBuffer {
            state: AtomicU64::new(0),
            queue: SegQueue::new(),
            snapshot_lock: Mutex::new(()),
        }
    }

    /// Registers the start of an observation.
    ///
    /// Returns `Some` when no snapshot is in progress and the caller must
    /// write to storage directly; returns `None` when the observation was
    /// parked for replay.
    pub fn append(
        &self,
        value: f64,
        exemplar_labels: Option<Labels>,
    ) -> Option<(f64, Option<Labels>)> {
        let before = self.state.fetch_add(1, Ordering::AcqRel);
        if before & BUFFERING_BIT == 0 {
            Some((value, exemplar_labels))
        } else {
            self.queue.push(Parked { value, exemplar_labels });
            None
        }
    }

    /// Takes a consistent snapshot of the owning series.
    ///
    /// `is_complete` is passed the number of observations started before the
    /// buffer was switched on and must report whether that many have
    /// completed. `snapshot` runs against quiescent storage. `replay` is
    /// invoked for every observation parked while the snapshot was taken.
    pub fn run<S>(
        &self,
        is_complete: impl Fn(u64) -> bool,
        snapshot: impl FnOnce() -> S,
        mut replay: impl FnMut(f64, Option<Labels>),
    ) -> S {
        let _guard = self.snapshot_lock.lock();

        let started_before = self.state.fetch_add(BUFFERING_BIT, Ordering::AcqRel) & COUNT_MASK;
        while !is_complete(started_before) {
            std::hint::spin_loop();
        }

        let result = snapshot();

        let started_after = self.state.fetch_sub(BUFFERING_BIT, Ordering::AcqRel) & COUNT_MASK;
        let parked = started_after - started_before;

        // Entries may still be in flight between the observer's fetch_add and
        // its push, so pop until all of them have arrived.
        let mut drained = 0;
        while drained < parked {
            match self.queue.pop() {
                Some(obs) => {
                    replay(obs.value, obs.exemplar_labels);
                    drained += 1;
                }
                None => std::hint::spin_loop(),
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::ObservationBuffer;

    #[test]
    fn test_direct_write_outside_snapshot() {
        let buffer = ObservationBuffer::new();
        assert_eq!(buffer.append(1.5, None), Some((1.5, None)));
        assert_eq!(buffer.append(2.5, None), Some((2.5, None)));
    }

    #[test]
    fn test_observations_parked_during_snapshot_are_replayed() {
        let buffer = ObservationBuffer::new();
        let completed = AtomicU64::new(0);

        // Two completed observations before the snapshot.
        for value in [1.0, 2.0] {
            assert!(buffer.append(value, None).is_some());
            completed.fetch_add(1, Ordering::Release);
        }

        let mut replayed = Vec::new();
        let seen = buffer.run(
            |expected| {
                // Simulate an overlapping observer: it starts (and parks)
                // while the snapshotter waits for quiescence.
                if completed.load(Ordering::Acquire) == expected {
                    assert!(buffer.append(3.0, None).is_none());
                    true
                } else {
                    false
                }
            },
            || completed.load(Ordering::Acquire),
            |value, _| replayed.push(value),
        );

        assert_eq!(seen, 2);
        assert_eq!(replayed, vec![3.0]);

        // The buffer is back in direct-write mode.
        assert!(buffer.append(4.0, None).is_some());
    }
}
