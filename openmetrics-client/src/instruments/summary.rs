//! The summary instrument: count, sum, and sliding-window quantiles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use openmetrics_model::{
    Labels, MetricMetadata, MetricSnapshot, MetricsError, Quantile, SummaryData, SummarySnapshot,
    Unit, SUMMARY_RESERVED_SUFFIXES,
};
use parking_lot::Mutex;
use quanta::Clock;

use crate::atomics::AtomicF64;
use crate::buffer::ObservationBuffer;
use crate::ckms::QuantileTarget;
use crate::common::{now_unix_millis, CommonOpts};
use crate::exemplars::{default_exemplar_sampler, ExemplarSampler, ExemplarSlot,
    DEFAULT_EXEMPLAR_MIN_RETENTION};
use crate::instruments::family::SeriesMap;
use crate::instruments::Observer;
use crate::registry::{Collector, CollectorError, Registry};
use crate::window::TimeWindowQuantiles;

const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);
const DEFAULT_AGE_BUCKETS: usize = 5;

/// A distribution summarised as count, sum, and configured ϕ-quantiles.
///
/// Quantiles are CKMS estimates over a sliding window of `max_age`,
/// maintained as `age_buckets` rotating estimator instances. With no
/// quantile targets the summary degenerates to count and sum only.
#[derive(Clone)]
pub struct Summary {
    inner: Arc<SummaryInner>,
}

struct SummaryInner {
    metadata: MetricMetadata,
    series: SeriesMap<SummarySeries>,
    sampler: ExemplarSampler,
    targets: Arc<[QuantileTarget]>,
    max_age: Duration,
    age_buckets: usize,
    clock: Clock,
}

impl SummaryInner {
    fn new_series(&self) -> SummarySeries {
        SummarySeries::new(
            self.targets.clone(),
            self.max_age,
            self.age_buckets,
            self.clock.clone(),
        )
    }
}

pub(crate) struct SummarySeries {
    created_timestamp_millis: u64,
    completed: AtomicU64,
    sum: AtomicF64,
    // The estimator's own lock; held only for one insert or query.
    quantiles: Option<Mutex<TimeWindowQuantiles>>,
    targets: Arc<[QuantileTarget]>,
    exemplar: ExemplarSlot,
    buffer: ObservationBuffer,
}

impl SummarySeries {
    fn new(
        targets: Arc<[QuantileTarget]>,
        max_age: Duration,
        age_buckets: usize,
        clock: Clock,
    ) -> SummarySeries {
        let quantiles = if targets.is_empty() {
            None
        } else {
            Some(Mutex::new(TimeWindowQuantiles::new(
                targets.clone(),
                max_age,
                age_buckets,
                clock,
            )))
        };
        SummarySeries {
            created_timestamp_millis: now_unix_millis(),
            completed: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            quantiles,
            targets,
            exemplar: ExemplarSlot::new(),
            buffer: ObservationBuffer::new(),
        }
    }

    fn observe(&self, value: f64, exemplar_labels: Option<Labels>, sampler: &ExemplarSampler) {
        if let Some((value, exemplar_labels)) = self.buffer.append(value, exemplar_labels) {
            self.write(value, exemplar_labels, sampler);
        }
    }

    fn write(&self, value: f64, exemplar_labels: Option<Labels>, sampler: &ExemplarSampler) {
        self.sum.add(value);
        if let Some(quantiles) = &self.quantiles {
            quantiles.lock().insert(value);
        }
        match exemplar_labels {
            Some(labels) => self.exemplar.store(value, labels),
            None => self.exemplar.offer(value, f64::NEG_INFINITY, f64::INFINITY, sampler),
        }
        // Last: this is the completion watermark the snapshot spins on.
        self.completed.fetch_add(1, Ordering::Release);
    }

    fn snapshot(
        &self,
        labels: Labels,
        sampler: &ExemplarSampler,
    ) -> Result<SummaryData, MetricsError> {
        self.buffer.run(
            |started| self.completed.load(Ordering::Acquire) == started,
            || {
                let mut data = SummaryData::builder()
                    .count(self.completed.load(Ordering::Acquire))
                    .sum(self.sum.get())
                    .labels(labels.clone())
                    .created_timestamp_millis(self.created_timestamp_millis);
                if let Some(quantiles) = &self.quantiles {
                    let mut estimator = quantiles.lock();
                    for target in self.targets.iter() {
                        let value = estimator.get(target.quantile());
                        data = data.quantile(Quantile::new(target.quantile(), value)?);
                    }
                }
                if let Some(exemplar) = self.exemplar.get() {
                    data = data.exemplar(exemplar);
                }
                data.build()
            },
            |value, exemplar_labels| self.write(value, exemplar_labels, sampler),
        )
    }
}

/// The per-series observer of a [`Summary`].
#[derive(Clone)]
pub struct SummaryHandle {
    series: Arc<SummarySeries>,
    sampler: ExemplarSampler,
}

impl Observer for SummaryHandle {
    fn observe(&self, value: f64) {
        self.series.observe(value, None, &self.sampler);
    }

    fn observe_with_exemplar(&self, value: f64, labels: Labels) {
        self.series.observe(value, Some(labels), &self.sampler);
    }
}

impl Summary {
    /// Starts building a summary.
    pub fn builder() -> SummaryBuilder {
        SummaryBuilder::new()
    }

    /// Resolves the observer for a label value tuple, creating the series on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<SummaryHandle, MetricsError> {
        let series = self.inner.series.get_or_create(values, || self.inner.new_series())?;
        Ok(SummaryHandle { series, sampler: self.inner.sampler.clone() })
    }
}

impl Observer for Summary {
    /// Observes on the default series. Panics when the summary has label
    /// names.
    fn observe(&self, value: f64) {
        self.inner.series.default_series().observe(value, None, &self.inner.sampler);
    }

    fn observe_with_exemplar(&self, value: f64, labels: Labels) {
        self.inner.series.default_series().observe(value, Some(labels), &self.inner.sampler);
    }
}

impl Collector for Summary {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = SummarySnapshot::builder().name(self.inner.metadata.name());
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        if let Some(unit) = self.inner.metadata.unit() {
            builder = builder.unit(unit.clone());
        }
        for (labels, series) in self.inner.series.all() {
            builder = builder.data(series.snapshot(labels, &self.inner.sampler)?);
        }
        Ok(MetricSnapshot::Summary(builder.build()?))
    }
}

/// Builder for [`Summary`].
pub struct SummaryBuilder {
    opts: CommonOpts,
    sampler: ExemplarSampler,
    quantiles: Vec<(f64, f64)>,
    max_age: Duration,
    age_buckets: usize,
}

impl SummaryBuilder {
    fn new() -> SummaryBuilder {
        SummaryBuilder {
            opts: CommonOpts::new(),
            sampler: default_exemplar_sampler(DEFAULT_EXEMPLAR_MIN_RETENTION),
            quantiles: Vec::new(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
        }
    }

    /// Sets the family name. Required; must not end in `_count`, `_sum`, or
    /// `_created`.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.opts.name = Some(name.into());
        self
    }

    /// Sets the help text.
    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.opts.help = Some(help.into());
        self
    }

    /// Sets the unit; the name must then end in `_<unit>`.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.opts.unit = Some(unit);
        self
    }

    /// Declares the label names observations will provide values for.
    /// `quantile` is reserved.
    pub fn label_names(mut self, names: &[&str]) -> Self {
        self.opts.label_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Attaches constant labels to every series.
    pub fn const_labels(mut self, labels: Labels) -> Self {
        self.opts.const_labels = labels;
        self
    }

    /// Adds a quantile target: estimate `quantile` to within `epsilon`.
    ///
    /// Both must lie in `[0, 1]`; validated at build time.
    pub fn quantile(mut self, quantile: f64, epsilon: f64) -> Self {
        self.quantiles.push((quantile, epsilon));
        self
    }

    /// Sets the sliding window covered by the quantile estimates.
    ///
    /// Must be non-zero. Defaults to 10 minutes.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Sets the number of rotating estimator instances backing the window.
    ///
    /// Must be non-zero. Defaults to 5.
    pub fn age_buckets(mut self, age_buckets: usize) -> Self {
        self.age_buckets = age_buckets;
        self
    }

    /// Replaces the default exemplar sampling policy.
    pub fn exemplar_sampler(mut self, sampler: ExemplarSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Builds the summary.
    pub fn build(self) -> Result<Summary, MetricsError> {
        let (metadata, label_names, const_labels) =
            self.opts.validate(SUMMARY_RESERVED_SUFFIXES, &["quantile"])?;
        if self.max_age.is_zero() {
            return Err(MetricsError::InvalidArgument(
                "max_age must be greater than zero".to_string(),
            ));
        }
        if self.age_buckets == 0 {
            return Err(MetricsError::InvalidArgument(
                "age_buckets must be greater than zero".to_string(),
            ));
        }
        let mut targets = self
            .quantiles
            .iter()
            .map(|&(q, e)| QuantileTarget::new(q, e))
            .collect::<Result<Vec<_>, _>>()?;
        targets.sort_by(|a, b| a.quantile().total_cmp(&b.quantile()));
        let targets: Arc<[QuantileTarget]> = targets.into();

        let clock = Clock::new();
        let max_age = self.max_age;
        let age_buckets = self.age_buckets;
        let default_targets = targets.clone();
        let default_clock = clock.clone();
        let inner = Arc::new(SummaryInner {
            metadata,
            series: SeriesMap::new(label_names, const_labels, move || {
                SummarySeries::new(default_targets, max_age, age_buckets, default_clock)
            }),
            sampler: self.sampler,
            targets,
            max_age,
            age_buckets,
            clock,
        });
        Ok(Summary { inner })
    }

    /// Builds the summary and registers it.
    pub fn register(self, registry: &Registry) -> Result<Summary, MetricsError> {
        let summary = self.build()?;
        registry.register(Arc::new(summary.clone()))?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use openmetrics_model::MetricSnapshot;

    use super::Summary;
    use crate::instruments::Observer;
    use crate::registry::Collector;

    fn data_of(summary: &Summary) -> Vec<openmetrics_model::SummaryData> {
        match summary.collect().unwrap() {
            MetricSnapshot::Summary(snapshot) => snapshot.data().to_vec(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_count_and_sum_coherence() {
        let summary = Summary::builder().name("latency_seconds").build().unwrap();
        summary.observe(0.4);
        summary.observe(0.5);
        summary.observe(0.3);
        let data = data_of(&summary);
        assert_eq!(data[0].count(), 3);
        assert!((data[0].sum() - 1.2).abs() < 1e-9);
        // No targets configured: count and sum only.
        assert!(data[0].quantiles().is_empty());
    }

    #[test]
    fn test_quantile_estimates() {
        let summary = Summary::builder()
            .name("request_duration_seconds")
            .unit(openmetrics_model::Unit::SECONDS)
            .quantile(0.5, 0.01)
            .quantile(0.9, 0.01)
            .build()
            .unwrap();
        for i in 1..=1_000 {
            summary.observe(i as f64);
        }
        let data = data_of(&summary);
        assert_eq!(data[0].count(), 1_000);
        let quantiles = data[0].quantiles();
        assert_eq!(quantiles.len(), 2);
        assert_eq!(quantiles[0].quantile(), 0.5);
        assert!((quantiles[0].value() - 500.0).abs() <= 20.0, "p50: {}", quantiles[0].value());
        assert!((quantiles[1].value() - 900.0).abs() <= 20.0, "p90: {}", quantiles[1].value());
    }

    #[test]
    fn test_builder_validation() {
        assert!(Summary::builder().name("s").quantile(1.5, 0.01).build().is_err());
        assert!(Summary::builder().name("s").quantile(0.5, -0.1).build().is_err());
        assert!(Summary::builder()
            .name("s")
            .max_age(std::time::Duration::ZERO)
            .build()
            .is_err());
        assert!(Summary::builder().name("s").age_buckets(0).build().is_err());
        assert!(Summary::builder().name("s").label_names(&["quantile"]).build().is_err());
        assert!(Summary::builder().name("latency_count").build().is_err());
    }

    #[test]
    fn test_labelled_series() {
        let summary = Summary::builder()
            .name("request_duration_seconds")
            .unit(openmetrics_model::Unit::SECONDS)
            .quantile(0.5, 0.05)
            .label_names(&["status"])
            .build()
            .unwrap();
        let ok = summary.with_labels(&["200"]).unwrap();
        let err = summary.with_labels(&["500"]).unwrap();
        ok.observe(0.1);
        ok.observe(0.2);
        err.observe(1.5);

        let data = data_of(&summary);
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].labels().get("status"), Some("200"));
        assert_eq!(data[0].count(), 2);
        assert_eq!(data[1].count(), 1);
    }
}
