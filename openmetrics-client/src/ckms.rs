//! CKMS streaming quantile estimation.
//!
//! Implements the targeted-quantile variant of the Cormode, Korn,
//! Muthukrishnan, and Srivastava algorithm: the caller declares the
//! quantiles it will ask for, each with an allowed error, and the sample
//! list is compressed as aggressively as those targets permit.

use std::sync::Arc;

use openmetrics_model::MetricsError;

/// A targeted quantile: estimate `quantile` to within `epsilon`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantileTarget {
    quantile: f64,
    epsilon: f64,
}

impl QuantileTarget {
    /// Creates a target; both values must be within `[0, 1]`.
    pub fn new(quantile: f64, epsilon: f64) -> Result<QuantileTarget, MetricsError> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(MetricsError::InvalidArgument(format!(
                "quantile {} outside [0, 1]",
                quantile
            )));
        }
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(MetricsError::InvalidArgument(format!(
                "allowed error {} outside [0, 1]",
                epsilon
            )));
        }
        Ok(QuantileTarget { quantile, epsilon })
    }

    /// The targeted quantile.
    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    /// The allowed rank error at the target.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

#[derive(Debug)]
struct Sample {
    value: f64,
    // Number of observations merged into this sample.
    g: u64,
    // Uncertainty of this sample's rank.
    delta: u64,
}

// Inserts are batched: the batch is sorted and merged into the sample list
// in one pass, followed by a compression sweep.
const BATCH_CAPACITY: usize = 128;

pub(crate) struct CkmsQuantiles {
    targets: Arc<[QuantileTarget]>,
    samples: Vec<Sample>,
    count: u64,
    batch: Vec<f64>,
}

impl CkmsQuantiles {
    pub fn new(targets: Arc<[QuantileTarget]>) -> CkmsQuantiles {
        CkmsQuantiles { targets, samples: Vec::new(), count: 0, batch: Vec::with_capacity(BATCH_CAPACITY) }
    }

    pub fn insert(&mut self, value: f64) {
        self.batch.push(value);
        if self.batch.len() >= BATCH_CAPACITY {
            self.flush();
        }
    }

    /// Estimated value at quantile `q`, or `NaN` when no values were
    /// observed.
    pub fn get(&mut self, q: f64) -> f64 {
        self.flush();
        if self.samples.is_empty() {
            return f64::NAN;
        }
        let desired = (q * self.count as f64).ceil() as u64;
        let allowed = self.allowable_error(desired) / 2.0;

        let mut rank = 0u64;
        for i in 0..self.samples.len() - 1 {
            rank += self.samples[i].g;
            let next = &self.samples[i + 1];
            if (rank + next.g + next.delta) as f64 > desired as f64 + allowed {
                return self.samples[i].value;
            }
        }
        self.samples[self.samples.len() - 1].value
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        self.batch.sort_by(f64::total_cmp);
        self.insert_batch();
        self.compress();
        self.batch.clear();
    }

    // Merges the sorted batch into the sorted sample list.
    fn insert_batch(&mut self) {
        let mut merged = Vec::with_capacity(self.samples.len() + self.batch.len());
        let mut existing = std::mem::take(&mut self.samples).into_iter().peekable();
        let mut rank = 0u64;

        for &value in &self.batch {
            while let Some(sample) = existing.peek() {
                if sample.value <= value {
                    rank += sample.g;
                    merged.push(existing.next().expect("peeked"));
                } else {
                    break;
                }
            }
            // New samples at either end of the list have an exact rank.
            let delta = if merged.is_empty() || existing.peek().is_none() {
                0
            } else {
                (self.allowable_error_for(rank + 1, self.count + 1) as u64).saturating_sub(1)
            };
            merged.push(Sample { value, g: 1, delta });
            self.count += 1;
            rank += 1;
        }
        merged.extend(existing);
        self.samples = merged;
    }

    // Merges adjacent samples whose combined uncertainty stays within the
    // invariant.
    fn compress(&mut self) {
        if self.samples.len() < 3 {
            return;
        }
        let samples = std::mem::take(&mut self.samples);
        let mut out = Vec::with_capacity(samples.len());
        let mut iter = samples.into_iter();
        let mut current = iter.next().expect("len checked above");
        let mut rank = 0u64;

        for next in iter {
            let merged_g = current.g + next.g;
            if (merged_g + next.delta) as f64 <= self.allowable_error(rank + current.g) {
                current = Sample { value: next.value, g: merged_g, delta: next.delta };
            } else {
                rank += current.g;
                out.push(current);
                current = next;
            }
        }
        out.push(current);
        self.samples = out;
    }

    fn allowable_error(&self, rank: u64) -> f64 {
        self.allowable_error_for(rank, self.count)
    }

    // f(r, n): the slack the invariant allows at rank r, the minimum over
    // all targets, at least 1.
    fn allowable_error_for(&self, rank: u64, count: u64) -> f64 {
        let n = count as f64;
        let r = rank as f64;
        let mut min_error = n + 1.0;
        for target in self.targets.iter() {
            let error = if r <= target.quantile * n {
                if target.quantile >= 1.0 {
                    n + 1.0
                } else {
                    2.0 * target.epsilon * (n - r) / (1.0 - target.quantile)
                }
            } else if target.quantile <= 0.0 {
                n + 1.0
            } else {
                2.0 * target.epsilon * r / target.quantile
            };
            if error < min_error {
                min_error = error;
            }
        }
        min_error.max(1.0)
    }

    #[cfg(test)]
    fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
