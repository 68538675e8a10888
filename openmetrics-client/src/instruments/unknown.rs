//! The unknown instrument, for values with no better type.

use std::sync::Arc;

use openmetrics_model::{
    Labels, MetricMetadata, MetricSnapshot, MetricsError, Unit, UnknownData, UnknownSnapshot,
};

use crate::atomics::AtomicF64;
use crate::common::CommonOpts;
use crate::exemplars::{default_exemplar_sampler, ExemplarSampler, ExemplarSlot,
    DEFAULT_EXEMPLAR_MIN_RETENTION};
use crate::instruments::family::SeriesMap;
use crate::registry::{Collector, CollectorError, Registry};

/// A single double value of unknown semantics, usually mirrored from a
/// third-party system.
#[derive(Clone)]
pub struct Unknown {
    inner: Arc<UnknownInner>,
}

struct UnknownInner {
    metadata: MetricMetadata,
    series: SeriesMap<UnknownSeries>,
    sampler: ExemplarSampler,
}

pub(crate) struct UnknownSeries {
    value: AtomicF64,
    exemplar: ExemplarSlot,
}

impl UnknownSeries {
    fn new() -> UnknownSeries {
        UnknownSeries { value: AtomicF64::new(0.0), exemplar: ExemplarSlot::new() }
    }
}

/// The per-series observer of an [`Unknown`].
#[derive(Clone)]
pub struct UnknownHandle {
    series: Arc<UnknownSeries>,
    sampler: ExemplarSampler,
}

impl UnknownHandle {
    /// Sets the value.
    pub fn set(&self, value: f64) {
        self.series.value.set(value);
        self.series.exemplar.offer(value, f64::NEG_INFINITY, f64::INFINITY, &self.sampler);
    }

    /// Sets the value with an exemplar, bypassing the sampler.
    pub fn set_with_exemplar(&self, value: f64, labels: Labels) {
        self.series.value.set(value);
        self.series.exemplar.store(value, labels);
    }
}

impl Unknown {
    /// Starts building an unknown metric.
    pub fn builder() -> UnknownBuilder {
        UnknownBuilder::new()
    }

    /// Resolves the observer for a label value tuple, creating the series on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<UnknownHandle, MetricsError> {
        let series = self.inner.series.get_or_create(values, UnknownSeries::new)?;
        Ok(UnknownHandle { series, sampler: self.inner.sampler.clone() })
    }

    /// Sets the default series. Panics when declared with label names.
    pub fn set(&self, value: f64) {
        UnknownHandle {
            series: self.inner.series.default_series(),
            sampler: self.inner.sampler.clone(),
        }
        .set(value);
    }

    /// Sets the default series with an exemplar.
    pub fn set_with_exemplar(&self, value: f64, labels: Labels) {
        UnknownHandle {
            series: self.inner.series.default_series(),
            sampler: self.inner.sampler.clone(),
        }
        .set_with_exemplar(value, labels);
    }
}

impl Collector for Unknown {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = UnknownSnapshot::builder().name(self.inner.metadata.name());
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        if let Some(unit) = self.inner.metadata.unit() {
            builder = builder.unit(unit.clone());
        }
        for (labels, series) in self.inner.series.all() {
            let mut data = UnknownData::builder().value(series.value.get()).labels(labels);
            if let Some(exemplar) = series.exemplar.get() {
                data = data.exemplar(exemplar);
            }
            builder = builder.data(data.build()?);
        }
        Ok(MetricSnapshot::Unknown(builder.build()?))
    }
}

/// Builder for [`Unknown`].
pub struct UnknownBuilder {
    opts: CommonOpts,
    sampler: ExemplarSampler,
}

impl UnknownBuilder {
    fn new() -> UnknownBuilder {
        UnknownBuilder {
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

    /// Declares the label names series will provide values for.
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

    /// Builds the unknown metric.
    pub fn build(self) -> Result<Unknown, MetricsError> {
        let (metadata, label_names, const_labels) = self.opts.validate(&[], &[])?;
        Ok(Unknown {
            inner: Arc::new(UnknownInner {
                metadata,
                series: SeriesMap::new(label_names, const_labels, UnknownSeries::new),
                sampler: self.sampler,
            }),
        })
    }

    /// Builds the unknown metric and registers it.
    pub fn register(self, registry: &Registry) -> Result<Unknown, MetricsError> {
        let unknown = self.build()?;
        registry.register(Arc::new(unknown.clone()))?;
        Ok(unknown)
    }
}

#[cfg(test)]
mod tests {
    use openmetrics_model::MetricSnapshot;

    use super::Unknown;
    use crate::registry::Collector;

    #[test]
    fn test_set() {
        let unknown = Unknown::builder().name("my_special_thing").build().unwrap();
        unknown.set(22.3);
        match unknown.collect().unwrap() {
            MetricSnapshot::Unknown(snapshot) => {
                assert_eq!(snapshot.data()[0].value(), 22.3);
            }
            _ => unreachable!(),
        }
    }
}
