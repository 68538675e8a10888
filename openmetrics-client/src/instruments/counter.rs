//! The counter instrument.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use openmetrics_model::{
    CounterData, CounterSnapshot, Labels, MetricMetadata, MetricSnapshot, MetricsError, Unit,
    COUNTER_RESERVED_SUFFIXES,
};

use crate::atomics::AtomicF64;
use crate::buffer::ObservationBuffer;
use crate::common::{now_unix_millis, CommonOpts};
use crate::exemplars::{default_exemplar_sampler, ExemplarSampler, ExemplarSlot,
    DEFAULT_EXEMPLAR_MIN_RETENTION};
use crate::instruments::family::SeriesMap;
use crate::registry::{Collector, CollectorError, Registry};

// Whole increments up to 2^53 go through the integer accumulator; beyond
// that an f64 cannot represent them exactly anyway.
const MAX_EXACT_WHOLE: f64 = 9_007_199_254_740_992.0;

/// A monotonically increasing value.
///
/// Internally a split accumulator: whole-number increments hit a plain
/// atomic add, fractional increments go through a compare-and-swap loop on
/// an atomic double. The two are summed at snapshot time.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    metadata: MetricMetadata,
    series: SeriesMap<CounterSeries>,
    sampler: ExemplarSampler,
}

pub(crate) struct CounterSeries {
    created_timestamp_millis: u64,
    completed: AtomicU64,
    whole: AtomicU64,
    fractional: AtomicF64,
    exemplar: ExemplarSlot,
    buffer: ObservationBuffer,
}

impl CounterSeries {
    fn new() -> CounterSeries {
        CounterSeries {
            created_timestamp_millis: now_unix_millis(),
            completed: AtomicU64::new(0),
            whole: AtomicU64::new(0),
            fractional: AtomicF64::new(0.0),
            exemplar: ExemplarSlot::new(),
            buffer: ObservationBuffer::new(),
        }
    }

    fn observe(&self, delta: f64, exemplar_labels: Option<Labels>, sampler: &ExemplarSampler) {
        if let Some((delta, exemplar_labels)) = self.buffer.append(delta, exemplar_labels) {
            self.write(delta, exemplar_labels, sampler);
        }
    }

    fn write(&self, delta: f64, exemplar_labels: Option<Labels>, sampler: &ExemplarSampler) {
        if delta == delta.trunc() && delta < MAX_EXACT_WHOLE {
            self.whole.fetch_add(delta as u64, Ordering::Relaxed);
        } else {
            self.fractional.add(delta);
        }
        match exemplar_labels {
            Some(labels) => self.exemplar.store(delta, labels),
            None => self.exemplar.offer(delta, f64::NEG_INFINITY, f64::INFINITY, sampler),
        }
        // Last: this is the completion watermark the snapshot spins on.
        self.completed.fetch_add(1, Ordering::Release);
    }

    fn value(&self) -> f64 {
        self.whole.load(Ordering::Acquire) as f64 + self.fractional.get()
    }

    fn snapshot(
        &self,
        labels: Labels,
        sampler: &ExemplarSampler,
    ) -> Result<CounterData, MetricsError> {
        self.buffer.run(
            |started| self.completed.load(Ordering::Acquire) == started,
            || {
                let mut data = CounterData::builder()
                    .value(self.value())
                    .labels(labels.clone())
                    .created_timestamp_millis(self.created_timestamp_millis);
                if let Some(exemplar) = self.exemplar.get() {
                    data = data.exemplar(exemplar);
                }
                data.build()
            },
            |delta, exemplar_labels| self.write(delta, exemplar_labels, sampler),
        )
    }
}

/// The per-series observer of a [`Counter`].
#[derive(Clone)]
pub struct CounterHandle {
    series: Arc<CounterSeries>,
    sampler: ExemplarSampler,
}

impl CounterHandle {
    /// Increments by one.
    pub fn inc(&self) {
        self.series.observe(1.0, None, &self.sampler);
    }

    /// Increments by `delta`, which must be non-negative and not NaN.
    pub fn inc_by(&self, delta: f64) -> Result<(), MetricsError> {
        validate_delta(delta)?;
        self.series.observe(delta, None, &self.sampler);
        Ok(())
    }

    /// Increments by one, attaching `labels` as the exemplar.
    ///
    /// Bypasses the exemplar sampler and always overwrites.
    pub fn inc_with_exemplar(&self, labels: Labels) {
        self.series.observe(1.0, Some(labels), &self.sampler);
    }

    /// Increments by `delta`, attaching `labels` as the exemplar.
    pub fn inc_by_with_exemplar(&self, delta: f64, labels: Labels) -> Result<(), MetricsError> {
        validate_delta(delta)?;
        self.series.observe(delta, Some(labels), &self.sampler);
        Ok(())
    }
}

fn validate_delta(delta: f64) -> Result<(), MetricsError> {
    if delta.is_nan() || delta < 0.0 {
        return Err(MetricsError::InvalidArgument(format!(
            "counter increment must be non-negative, got {}",
            delta
        )));
    }
    Ok(())
}

impl Counter {
    /// Starts building a counter.
    pub fn builder() -> CounterBuilder {
        CounterBuilder::new()
    }

    /// Resolves the observer for a label value tuple, creating the series on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<CounterHandle, MetricsError> {
        let series = self.inner.series.get_or_create(values, CounterSeries::new)?;
        Ok(CounterHandle { series, sampler: self.inner.sampler.clone() })
    }

    /// Increments the default series by one.
    ///
    /// Panics when the counter was declared with label names.
    pub fn inc(&self) {
        self.inner.series.default_series().observe(1.0, None, &self.inner.sampler);
    }

    /// Increments the default series by `delta`.
    pub fn inc_by(&self, delta: f64) -> Result<(), MetricsError> {
        validate_delta(delta)?;
        self.inner.series.default_series().observe(delta, None, &self.inner.sampler);
        Ok(())
    }

    /// Increments the default series by one with an exemplar.
    pub fn inc_with_exemplar(&self, labels: Labels) {
        self.inner.series.default_series().observe(1.0, Some(labels), &self.inner.sampler);
    }

    /// Increments the default series by `delta` with an exemplar.
    pub fn inc_by_with_exemplar(&self, delta: f64, labels: Labels) -> Result<(), MetricsError> {
        validate_delta(delta)?;
        self.inner.series.default_series().observe(delta, Some(labels), &self.inner.sampler);
        Ok(())
    }
}

impl Collector for Counter {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = CounterSnapshot::builder().name(self.inner.metadata.name());
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        if let Some(unit) = self.inner.metadata.unit() {
            builder = builder.unit(unit.clone());
        }
        for (labels, series) in self.inner.series.all() {
            builder = builder.data(series.snapshot(labels, &self.inner.sampler)?);
        }
        Ok(MetricSnapshot::Counter(builder.build()?))
    }
}

/// Builder for [`Counter`].
pub struct CounterBuilder {
    opts: CommonOpts,
    sampler: ExemplarSampler,
}

impl CounterBuilder {
    fn new() -> CounterBuilder {
        CounterBuilder {
            opts: CommonOpts::new(),
            sampler: default_exemplar_sampler(DEFAULT_EXEMPLAR_MIN_RETENTION),
        }
    }

    /// Sets the family name. Required; must not end in `_total` or
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
    pub fn label_names(mut self, names: &[&str]) -> Self {
        self.opts.label_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Attaches constant labels to every series.
    pub fn const_labels(mut self, labels: Labels) -> Self {
        self.opts.const_labels = labels;
        self
    }

    /// Replaces the default exemplar sampling policy.
    pub fn exemplar_sampler(mut self, sampler: ExemplarSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Builds the counter.
    pub fn build(self) -> Result<Counter, MetricsError> {
        let (metadata, label_names, const_labels) =
            self.opts.validate(COUNTER_RESERVED_SUFFIXES, &[])?;
        Ok(Counter {
            inner: Arc::new(CounterInner {
                metadata,
                series: SeriesMap::new(label_names, const_labels, CounterSeries::new),
                sampler: self.sampler,
            }),
        })
    }

    /// Builds the counter and registers it.
    pub fn register(self, registry: &Registry) -> Result<Counter, MetricsError> {
        let counter = self.build()?;
        registry.register(Arc::new(counter.clone()))?;
        Ok(counter)
    }
}
