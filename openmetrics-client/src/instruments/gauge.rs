//! The gauge instrument.

use std::sync::Arc;

use openmetrics_model::{
    GaugeData, GaugeSnapshot, Labels, MetricMetadata, MetricSnapshot, MetricsError, Unit,
};

use crate::atomics::AtomicF64;
use crate::common::{now_unix_millis, CommonOpts};
use crate::exemplars::{default_exemplar_sampler, ExemplarSampler, ExemplarSlot,
    DEFAULT_EXEMPLAR_MIN_RETENTION};
use crate::instruments::family::SeriesMap;
use crate::registry::{Collector, CollectorError, Registry};

/// A value that can go up and down.
///
/// A single atomic double per series; snapshots are one atomic read, so
/// gauges need no observation buffer.
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

struct GaugeInner {
    metadata: MetricMetadata,
    series: SeriesMap<GaugeSeries>,
    sampler: ExemplarSampler,
}

pub(crate) struct GaugeSeries {
    value: AtomicF64,
    exemplar: ExemplarSlot,
}

impl GaugeSeries {
    fn new() -> GaugeSeries {
        GaugeSeries { value: AtomicF64::new(0.0), exemplar: ExemplarSlot::new() }
    }

    fn snapshot(&self, labels: Labels) -> Result<GaugeData, MetricsError> {
        let mut data = GaugeData::builder().value(self.value.get()).labels(labels);
        if let Some(exemplar) = self.exemplar.get() {
            data = data.exemplar(exemplar);
        }
        data.build()
    }
}

/// The per-series observer of a [`Gauge`].
#[derive(Clone)]
pub struct GaugeHandle {
    series: Arc<GaugeSeries>,
    sampler: ExemplarSampler,
}

impl GaugeHandle {
    /// Sets the gauge.
    pub fn set(&self, value: f64) {
        self.series.value.set(value);
        self.series.exemplar.offer(value, f64::NEG_INFINITY, f64::INFINITY, &self.sampler);
    }

    /// Sets the gauge with an exemplar, bypassing the sampler.
    pub fn set_with_exemplar(&self, value: f64, labels: Labels) {
        self.series.value.set(value);
        self.series.exemplar.store(value, labels);
    }

    /// Increments by one.
    pub fn inc(&self) {
        self.series.value.add(1.0);
    }

    /// Increments by `delta`, which may be negative.
    pub fn inc_by(&self, delta: f64) {
        self.series.value.add(delta);
    }

    /// Decrements by one.
    pub fn dec(&self) {
        self.series.value.add(-1.0);
    }

    /// Decrements by `delta`.
    pub fn dec_by(&self, delta: f64) {
        self.series.value.add(-delta);
    }

    /// Sets the gauge to the current unix time in seconds.
    pub fn set_to_current_time(&self) {
        self.series.value.set(now_unix_millis() as f64 / 1_000.0);
    }
}

impl Gauge {
    /// Starts building a gauge.
    pub fn builder() -> GaugeBuilder {
        GaugeBuilder::new()
    }

    /// Resolves the observer for a label value tuple, creating the series on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<GaugeHandle, MetricsError> {
        let series = self.inner.series.get_or_create(values, GaugeSeries::new)?;
        Ok(GaugeHandle { series, sampler: self.inner.sampler.clone() })
    }

    fn default_handle(&self) -> GaugeHandle {
        GaugeHandle {
            series: self.inner.series.default_series(),
            sampler: self.inner.sampler.clone(),
        }
    }

    /// Sets the default series. Panics when the gauge has label names.
    pub fn set(&self, value: f64) {
        self.default_handle().set(value);
    }

    /// Sets the default series with an exemplar.
    pub fn set_with_exemplar(&self, value: f64, labels: Labels) {
        self.default_handle().set_with_exemplar(value, labels);
    }

    /// Increments the default series by one.
    pub fn inc(&self) {
        self.default_handle().inc();
    }

    /// Increments the default series by `delta` (any sign).
    pub fn inc_by(&self, delta: f64) {
        self.default_handle().inc_by(delta);
    }

    /// Decrements the default series by one.
    pub fn dec(&self) {
        self.default_handle().dec();
    }

    /// Decrements the default series by `delta`.
    pub fn dec_by(&self, delta: f64) {
        self.default_handle().dec_by(delta);
    }

    /// Sets the default series to the current unix time in seconds.
    pub fn set_to_current_time(&self) {
        self.default_handle().set_to_current_time();
    }
}

impl Collector for Gauge {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = GaugeSnapshot::builder().name(self.inner.metadata.name());
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        if let Some(unit) = self.inner.metadata.unit() {
            builder = builder.unit(unit.clone());
        }
        for (labels, series) in self.inner.series.all() {
            builder = builder.data(series.snapshot(labels)?);
        }
        Ok(MetricSnapshot::Gauge(builder.build()?))
    }
}

/// Builder for [`Gauge`].
pub struct GaugeBuilder {
    opts: CommonOpts,
    sampler: ExemplarSampler,
}

impl GaugeBuilder {
    fn new() -> GaugeBuilder {
        GaugeBuilder {
            opts: CommonOpts::new(),
            sampler: default_exemplar_sampler(DEFAULT_EXEMPLAR_MIN_RETENTION),
        }
    }

    /// Sets the family name. Required.
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

    /// Builds the gauge.
    pub fn build(self) -> Result<Gauge, MetricsError> {
        let (metadata, label_names, const_labels) = self.opts.validate(&[], &[])?;
        Ok(Gauge {
            inner: Arc::new(GaugeInner {
                metadata,
                series: SeriesMap::new(label_names, const_labels, GaugeSeries::new),
                sampler: self.sampler,
            }),
        })
    }

    /// Builds the gauge and registers it.
    pub fn register(self, registry: &Registry) -> Result<Gauge, MetricsError> {
        let gauge = self.build()?;
        registry.register(Arc::new(gauge.clone()))?;
        Ok(gauge)
    }
}
