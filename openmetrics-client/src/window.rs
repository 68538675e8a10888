//! Sliding-window quantile estimation.
//!
//! A summary's quantiles cover the last `max_age` of observations, not the
//! process lifetime. The window is a ring of CKMS instances: every insert
//! goes to all of them, and on a cadence of `max_age / age_buckets` the
//! oldest instance is replaced by a fresh one. Queries read the oldest live
//! instance, which has seen close to the full window.

use std::sync::Arc;
use std::time::Duration;

use quanta::{Clock, Instant};

use crate::ckms::{CkmsQuantiles, QuantileTarget};

pub(crate) struct TimeWindowQuantiles {
    targets: Arc<[QuantileTarget]>,
    ring: Vec<CkmsQuantiles>,
    head: usize,
    rotation_interval: Duration,
    max_age: Duration,
    clock: Clock,
    last_rotate: Instant,
}

impl TimeWindowQuantiles {
    /// Callers validate `max_age > 0` and `age_buckets > 0` at build time.
    pub fn new(
        targets: Arc<[QuantileTarget]>,
        max_age: Duration,
        age_buckets: usize,
        clock: Clock,
    ) -> TimeWindowQuantiles {
        let ring = (0..age_buckets).map(|_| CkmsQuantiles::new(targets.clone())).collect();
        let last_rotate = clock.now();
        TimeWindowQuantiles {
            targets,
            ring,
            head: 0,
            rotation_interval: max_age / age_buckets as u32,
            max_age,
            clock,
            last_rotate,
        }
    }

    pub fn insert(&mut self, value: f64) {
        self.rotate();
        for bucket in &mut self.ring {
            bucket.insert(value);
        }
    }

    pub fn get(&mut self, q: f64) -> f64 {
        self.rotate();
        self.ring[self.head].get(q)
    }

    fn rotate(&mut self) {
        let now = self.clock.now();
        let mut elapsed = now.saturating_duration_since(self.last_rotate);

        // A gap longer than the whole window means every bucket is stale.
        if elapsed >= self.max_age {
            for bucket in &mut self.ring {
                *bucket = CkmsQuantiles::new(self.targets.clone());
            }
            self.head = 0;
            self.last_rotate = now;
            return;
        }

        while elapsed >= self.rotation_interval {
            self.ring[self.head] = CkmsQuantiles::new(self.targets.clone());
            self.head = (self.head + 1) % self.ring.len();
            self.last_rotate = self.last_rotate + self.rotation_interval;
            elapsed -= self.rotation_interval;
        }
    }
}
