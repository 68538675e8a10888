//! Exemplar sampling.
//!
//! Every observation may update the exemplar attached to its series (or to
//! the bucket it lands in, for histograms). The policy deciding whether to
//! keep or replace an exemplar is a plain function value invoked with the
//! observed value, the exclusive lower and inclusive upper bounds of the
//! landing bucket, and the previous exemplar.

use std::sync::Arc;
use std::time::Duration;

use openmetrics_model::{Exemplar, Labels};
use parking_lot::Mutex;

use crate::common::now_unix_millis;

/// Decides whether an observation replaces the current exemplar.
///
/// Returning `None` keeps the previous exemplar.
pub type ExemplarSampler =
    Arc<dyn Fn(f64, f64, f64, Option<&Exemplar>) -> Option<Exemplar> + Send + Sync>;

/// How long the default sampler keeps an exemplar before allowing a
/// replacement.
pub const DEFAULT_EXEMPLAR_MIN_RETENTION: Duration = Duration::from_secs(7);

/// The default sampling policy.
///
/// Accepts the first observation per bucket, then replaces the exemplar only
/// once `min_retention` has elapsed since the previous exemplar's timestamp.
pub fn default_exemplar_sampler(min_retention: Duration) -> ExemplarSampler {
    let min_retention_millis = min_retention.as_millis() as u64;
    Arc::new(move |value, _lower, _upper, previous| {
        let now = now_unix_millis();
        match previous {
            Some(previous)
                if now.saturating_sub(previous.timestamp_millis().unwrap_or(0))
                    < min_retention_millis =>
            {
                None
            }
            _ => Some(Exemplar::new(value, Labels::empty(), Some(now))),
        }
    })
}

/// A sampler that never records exemplars.
pub fn no_exemplars() -> ExemplarSampler {
    Arc::new(|_, _, _, _| None)
}

/// Storage for one exemplar.
///
/// `offer` uses `try_lock` so an observer never blocks behind a scrape or
/// another observer; exemplars are best effort.
pub(crate) struct ExemplarSlot {
    inner: Mutex<Option<Exemplar>>,
}

impl ExemplarSlot {
    pub fn new() -> ExemplarSlot {
        ExemplarSlot { inner: Mutex::new(None) }
    }

    /// Runs the sampler for an observation.
    pub fn offer(&self, value: f64, lower: f64, upper: f64, sampler: &ExemplarSampler) {
        if let Some(mut slot) = self.inner.try_lock() {
            if let Some(next) = sampler(value, lower, upper, slot.as_ref()) {
                *slot = Some(next);
            }
        }
    }

    /// Direct injection: bypasses the sampler and always overwrites.
    pub fn store(&self, value: f64, labels: Labels) {
        *self.inner.lock() = Some(Exemplar::new(value, labels, Some(now_unix_millis())));
    }

    pub fn get(&self) -> Option<Exemplar> {
        self.inner.lock().clone()
    }
}
