//! The fixed-bucket histogram instrument.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use openmetrics_model::{
    HistogramBucket, HistogramData, HistogramSnapshot, Labels, MetricMetadata, MetricSnapshot,
    MetricsError, Unit, HISTOGRAM_RESERVED_SUFFIXES,
};

use crate::atomics::AtomicF64;
use crate::buffer::ObservationBuffer;
use crate::common::{now_unix_millis, CommonOpts};
use crate::exemplars::{default_exemplar_sampler, ExemplarSampler, ExemplarSlot,
    DEFAULT_EXEMPLAR_MIN_RETENTION};
use crate::instruments::family::SeriesMap;
use crate::instruments::Observer;
use crate::registry::{Collector, CollectorError, Registry};

/// The classic Prometheus default buckets.
pub const DEFAULT_BUCKETS: [f64; 14] =
    [0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0];

/// A distribution counted into a fixed set of buckets.
///
/// Storage keeps one non-cumulative atomic counter per bucket: an
/// observation binary-searches its bucket, bumps that counter, adds to the
/// sum, and bumps the observation count. Cumulative counts are derived at
/// snapshot time, which is also where the `+Inf` bucket is guaranteed to
/// equal the series count.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

struct HistogramInner {
    metadata: MetricMetadata,
    gauge_histogram: bool,
    upper_bounds: Arc<[f64]>,
    series: SeriesMap<HistogramSeries>,
    sampler: ExemplarSampler,
}

pub(crate) struct HistogramSeries {
    created_timestamp_millis: u64,
    completed: AtomicU64,
    sum: AtomicF64,
    bucket_counts: Box<[AtomicU64]>,
    exemplars: Box<[ExemplarSlot]>,
    upper_bounds: Arc<[f64]>,
    buffer: ObservationBuffer,
}

impl HistogramSeries {
    fn new(upper_bounds: Arc<[f64]>) -> HistogramSeries {
        let len = upper_bounds.len();
        HistogramSeries {
            created_timestamp_millis: now_unix_millis(),
            completed: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            bucket_counts: (0..len).map(|_| AtomicU64::new(0)).collect(),
            exemplars: (0..len).map(|_| ExemplarSlot::new()).collect(),
            upper_bounds,
            buffer: ObservationBuffer::new(),
        }
    }

    // Smallest bound >= value; NaN counts into the +Inf bucket.
    fn bucket_index(&self, value: f64) -> usize {
        if value.is_nan() {
            self.upper_bounds.len() - 1
        } else {
            self.upper_bounds.partition_point(|bound| *bound < value)
        }
    }

    fn observe(&self, value: f64, exemplar_labels: Option<Labels>, sampler: &ExemplarSampler) {
        if let Some((value, exemplar_labels)) = self.buffer.append(value, exemplar_labels) {
            self.write(value, exemplar_labels, sampler);
        }
    }

    fn write(&self, value: f64, exemplar_labels: Option<Labels>, sampler: &ExemplarSampler) {
        let index = self.bucket_index(value);
        self.bucket_counts[index].fetch_add(1, Ordering::Relaxed);
        self.sum.add(value);
        match exemplar_labels {
            Some(labels) => self.exemplars[index].store(value, labels),
            None => {
                let lower =
                    if index == 0 { f64::NEG_INFINITY } else { self.upper_bounds[index - 1] };
                self.exemplars[index].offer(value, lower, self.upper_bounds[index], sampler);
            }
        }
        // Last: this is the completion watermark the snapshot spins on.
        self.completed.fetch_add(1, Ordering::Release);
    }

    fn snapshot(
        &self,
        labels: Labels,
        sampler: &ExemplarSampler,
    ) -> Result<HistogramData, MetricsError> {
        self.buffer.run(
            |started| self.completed.load(Ordering::Acquire) == started,
            || {
                let mut data = HistogramData::builder()
                    .sum(self.sum.get())
                    .labels(labels.clone())
                    .created_timestamp_millis(self.created_timestamp_millis);
                let mut cumulative = 0u64;
                for (index, bound) in self.upper_bounds.iter().enumerate() {
                    cumulative += self.bucket_counts[index].load(Ordering::Acquire);
                    data = data.bucket(HistogramBucket::new(
                        *bound,
                        cumulative,
                        self.exemplars[index].get(),
                    )?);
                }
                data.build()
            },
            |value, exemplar_labels| self.write(value, exemplar_labels, sampler),
        )
    }
}

/// The per-series observer of a [`Histogram`].
#[derive(Clone)]
pub struct HistogramHandle {
    series: Arc<HistogramSeries>,
    sampler: ExemplarSampler,
}

impl Observer for HistogramHandle {
    fn observe(&self, value: f64) {
        self.series.observe(value, None, &self.sampler);
    }

    fn observe_with_exemplar(&self, value: f64, labels: Labels) {
        self.series.observe(value, Some(labels), &self.sampler);
    }
}

impl Histogram {
    /// Starts building a histogram.
    pub fn builder() -> HistogramBuilder {
        HistogramBuilder::new()
    }

    /// Resolves the observer for a label value tuple, creating the series on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<HistogramHandle, MetricsError> {
        let bounds = self.inner.upper_bounds.clone();
        let series = self.inner.series.get_or_create(values, || HistogramSeries::new(bounds))?;
        Ok(HistogramHandle { series, sampler: self.inner.sampler.clone() })
    }
}

impl Observer for Histogram {
    /// Observes on the default series. Panics when the histogram has label
    /// names.
    fn observe(&self, value: f64) {
        self.inner.series.default_series().observe(value, None, &self.inner.sampler);
    }

    fn observe_with_exemplar(&self, value: f64, labels: Labels) {
        self.inner.series.default_series().observe(value, Some(labels), &self.inner.sampler);
    }
}

impl Collector for Histogram {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = HistogramSnapshot::builder()
            .name(self.inner.metadata.name())
            .gauge_histogram(self.inner.gauge_histogram);
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        if let Some(unit) = self.inner.metadata.unit() {
            builder = builder.unit(unit.clone());
        }
        for (labels, series) in self.inner.series.all() {
            builder = builder.data(series.snapshot(labels, &self.inner.sampler)?);
        }
        Ok(MetricSnapshot::Histogram(builder.build()?))
    }
}

/// Builder for [`Histogram`].
pub struct HistogramBuilder {
    opts: CommonOpts,
    sampler: ExemplarSampler,
    buckets: Option<Vec<f64>>,
    gauge_histogram: bool,
}

impl HistogramBuilder {
    fn new() -> HistogramBuilder {
        HistogramBuilder {
            opts: CommonOpts::new(),
            sampler: default_exemplar_sampler(DEFAULT_EXEMPLAR_MIN_RETENTION),
            buckets: None,
            gauge_histogram: false,
        }
    }

    /// Sets the family name. Required; must not end in a histogram sample
    /// suffix (`_bucket`, `_count`, `_sum`, `_created`, `_gcount`, `_gsum`).
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
    /// `le` is reserved.
    pub fn label_names(mut self, names: &[&str]) -> Self {
        self.opts.label_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Attaches constant labels to every series.
    pub fn const_labels(mut self, labels: Labels) -> Self {
        self.opts.const_labels = labels;
        self
    }

    /// Sets explicit bucket upper bounds.
    ///
    /// Bounds are deduplicated and sorted; `+Inf` is appended when missing.
    /// Defaults to [`DEFAULT_BUCKETS`] when no bucket method is called.
    pub fn buckets(mut self, bounds: &[f64]) -> Self {
        self.buckets = Some(bounds.to_vec());
        self
    }

    /// Sets `count` buckets of `width` starting at `start`.
    pub fn linear_buckets(mut self, start: f64, width: f64, count: usize) -> Self {
        self.buckets = Some((0..count).map(|i| start + width * i as f64).collect());
        self
    }

    /// Sets `count` buckets growing by `factor` from `start`.
    pub fn exponential_buckets(mut self, start: f64, factor: f64, count: usize) -> Self {
        self.buckets = Some((0..count).map(|i| start * factor.powi(i as i32)).collect());
        self
    }

    /// Marks the family as a gauge histogram: identical storage, but emitted
    /// with the `gaugehistogram` type and `_gcount`/`_gsum` suffixes.
    pub fn gauge_histogram(mut self) -> Self {
        self.gauge_histogram = true;
        self
    }

    /// Replaces the default exemplar sampling policy.
    pub fn exemplar_sampler(mut self, sampler: ExemplarSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Builds the histogram.
    pub fn build(self) -> Result<Histogram, MetricsError> {
        let (metadata, label_names, const_labels) =
            self.opts.validate(HISTOGRAM_RESERVED_SUFFIXES, &["le"])?;
        let upper_bounds =
            sanitize_buckets(self.buckets.unwrap_or_else(|| DEFAULT_BUCKETS.to_vec()))?;
        let series_bounds = upper_bounds.clone();
        Ok(Histogram {
            inner: Arc::new(HistogramInner {
                metadata,
                gauge_histogram: self.gauge_histogram,
                upper_bounds,
                series: SeriesMap::new(label_names, const_labels, move || {
                    HistogramSeries::new(series_bounds)
                }),
                sampler: self.sampler,
            }),
        })
    }

    /// Builds the histogram and registers it.
    pub fn register(self, registry: &Registry) -> Result<Histogram, MetricsError> {
        let histogram = self.build()?;
        registry.register(Arc::new(histogram.clone()))?;
        Ok(histogram)
    }
}

fn sanitize_buckets(mut bounds: Vec<f64>) -> Result<Arc<[f64]>, MetricsError> {
    if bounds.iter().any(|bound| bound.is_nan()) {
        return Err(MetricsError::InvalidArgument(
            "histogram bucket bound must not be NaN".to_string(),
        ));
    }
    bounds.sort_by(f64::total_cmp);
    bounds.dedup();
    if bounds.last() != Some(&f64::INFINITY) {
        bounds.push(f64::INFINITY);
    }
    Ok(bounds.into())
}

#[cfg(test)]
mod tests {
    use openmetrics_model::{Labels, MetricSnapshot};

    use super::{Histogram, DEFAULT_BUCKETS};
    use crate::instruments::Observer;
    use crate::registry::Collector;

    fn data_of(histogram: &Histogram) -> Vec<openmetrics_model::HistogramData> {
        match histogram.collect().unwrap() {
            MetricSnapshot::Histogram(snapshot) => snapshot.data().to_vec(),
            _ => unreachable!(),
        }
    }

    fn bucket_count(data: &openmetrics_model::HistogramData, le: f64) -> u64 {
        data.buckets()
            .iter()
            .find(|b| b.upper_bound() == le)
            .map(|b| b.cumulative_count())
            .expect("bucket exists")
    }

    fn bounds_of(histogram: &Histogram) -> Vec<f64> {
        data_of(histogram)[0].buckets().iter().map(|b| b.upper_bound()).collect()
    }

    #[test]
    fn test_bucket_sanitisation() {
        let histogram =
            Histogram::builder().name("test").buckets(&[0.0, 3.0, 17.0, 3.0, 21.0]).build().unwrap();
        assert_eq!(bounds_of(&histogram), vec![0.0, 3.0, 17.0, 21.0, f64::INFINITY]);

        let unsorted = Histogram::builder().name("test").buckets(&[0.2, 0.1]).build().unwrap();
        assert_eq!(bounds_of(&unsorted), vec![0.1, 0.2, f64::INFINITY]);

        let empty = Histogram::builder().name("test").buckets(&[]).build().unwrap();
        assert_eq!(bounds_of(&empty), vec![f64::INFINITY]);

        let explicit_inf = Histogram::builder()
            .name("test")
            .buckets(&[0.01, 0.1, 1.0, f64::INFINITY])
            .build()
            .unwrap();
        assert_eq!(bounds_of(&explicit_inf), vec![0.01, 0.1, 1.0, f64::INFINITY]);

        assert!(Histogram::builder().name("test").buckets(&[0.1, f64::NAN]).build().is_err());
    }

    #[test]
    fn test_linear_and_exponential_buckets() {
        let linear =
            Histogram::builder().name("test").linear_buckets(0.1, 0.1, 10).build().unwrap();
        let bounds = bounds_of(&linear);
        assert_eq!(bounds.len(), 11);
        assert!((bounds[0] - 0.1).abs() < 1e-9);
        assert!((bounds[9] - 1.0).abs() < 1e-9);
        assert_eq!(bounds[10], f64::INFINITY);

        let exponential =
            Histogram::builder().name("test").exponential_buckets(2.0, 2.5, 3).build().unwrap();
        assert_eq!(bounds_of(&exponential), vec![2.0, 5.0, 12.5, f64::INFINITY]);
    }

    #[test]
    fn test_default_buckets() {
        let histogram = Histogram::builder().name("test").build().unwrap();
        let bounds = bounds_of(&histogram);
        assert_eq!(bounds.len(), DEFAULT_BUCKETS.len() + 1);
        assert_eq!(bounds[0], 0.005);
        assert_eq!(bounds[bounds.len() - 1], f64::INFINITY);
    }

    #[test]
    fn test_observe_boundaries() {
        let histogram = Histogram::builder().name("test").build().unwrap();
        histogram.observe(2.0);
        let data = &data_of(&histogram)[0];
        assert_eq!(data.count(), 1);
        assert_eq!(data.sum(), 2.0);
        assert_eq!(bucket_count(data, 1.0), 0);
        assert_eq!(bucket_count(data, 2.5), 1);

        histogram.observe(2.5);
        histogram.observe(f64::INFINITY);
        let data = &data_of(&histogram)[0];
        assert_eq!(bucket_count(data, 1.0), 0);
        assert_eq!(bucket_count(data, 2.5), 2);
        assert_eq!(bucket_count(data, 5.0), 2);
        assert_eq!(bucket_count(data, f64::INFINITY), 3);
        assert_eq!(data.count(), 3);
    }

    #[test]
    fn test_negative_observations() {
        let histogram = Histogram::builder()
            .name("histogram")
            .buckets(&[-10.0, -5.0, 0.0, 5.0, 10.0])
            .build()
            .unwrap();
        let mut expected_sum = 0.0;
        for i in (-11..=10).rev() {
            histogram.observe(i as f64);
            expected_sum += i as f64;
        }
        let data = &data_of(&histogram)[0];
        assert_eq!(data.count(), 22);
        assert!((data.sum() - expected_sum).abs() < 1e-9);
        let counts: Vec<u64> =
            data.buckets().iter().map(|b| b.cumulative_count()).collect();
        assert_eq!(counts, vec![2, 7, 12, 17, 22, 22]);
    }

    #[test]
    fn test_labelled_with_const_labels() {
        let histogram = Histogram::builder()
            .name("test")
            .const_labels(Labels::of(&["env", "prod"]).unwrap())
            .label_names(&["path", "status"])
            .build()
            .unwrap();
        histogram.with_labels(&["/hello", "200"]).unwrap().observe(0.11);
        histogram.with_labels(&["/hello", "200"]).unwrap().observe(0.2);
        histogram.with_labels(&["/hello", "500"]).unwrap().observe(0.19);

        let data = data_of(&histogram);
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].labels().get("env"), Some("prod"));
        assert_eq!(data[0].labels().get("status"), Some("200"));
        assert_eq!(data[0].count(), 2);
        assert!((data[0].sum() - 0.31).abs() < 1e-9);
        assert_eq!(data[1].count(), 1);
    }

    #[test]
    fn test_nan_lands_in_inf_bucket() {
        let histogram = Histogram::builder().name("test").buckets(&[1.0]).build().unwrap();
        histogram.observe(f64::NAN);
        let data = &data_of(&histogram)[0];
        assert_eq!(bucket_count(data, 1.0), 0);
        assert_eq!(bucket_count(data, f64::INFINITY), 1);
        assert_eq!(data.count(), 1);
    }

    #[test]
    fn test_reserved_label_and_suffixes() {
        assert!(Histogram::builder().name("test").label_names(&["le"]).build().is_err());
        assert!(Histogram::builder()
            .name("test")
            .const_labels(Labels::of(&["le", "0.3"]).unwrap())
            .build()
            .is_err());
        assert!(Histogram::builder().name("latency_bucket").build().is_err());
        assert!(Histogram::builder().name("latency_gcount").build().is_err());
    }

    #[test]
    fn test_exemplar_sampler_sees_bucket_bounds() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let histogram = Histogram::builder()
            .name("test")
            .buckets(&[1.0, 2.0, 3.0])
            .exemplar_sampler(Arc::new(move |value, lower, upper, _prev| {
                match seen.fetch_add(1, Ordering::SeqCst) {
                    0 => {
                        assert_eq!(value, 1.1);
                        assert_eq!(lower, 1.0);
                        assert_eq!(upper, 2.0);
                    }
                    1 => {
                        assert_eq!(value, 2.1);
                        assert_eq!(lower, 2.0);
                        assert_eq!(upper, 3.0);
                    }
                    _ => {}
                }
                None
            }))
            .build()
            .unwrap();
        histogram.observe(1.1);
        histogram.observe(2.1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_gauge_histogram_flag() {
        let histogram =
            Histogram::builder().name("cache_size_bytes").unit(openmetrics_model::Unit::BYTES)
                .gauge_histogram().build().unwrap();
        histogram.observe(1.0);
        match histogram.collect().unwrap() {
            MetricSnapshot::Histogram(snapshot) => assert!(snapshot.is_gauge_histogram()),
            _ => unreachable!(),
        }
    }
}
