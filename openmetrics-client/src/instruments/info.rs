//! The info instrument: label-valued metadata at a constant value of 1.

use std::sync::Arc;

use openmetrics_model::{
    InfoData, InfoSnapshot, Labels, MetricMetadata, MetricSnapshot, MetricsError,
    INFO_RESERVED_SUFFIXES,
};

use crate::common::CommonOpts;
use crate::instruments::family::SeriesMap;
use crate::registry::{Collector, CollectorError, Registry};

/// Publishes build or version information as labels.
///
/// An info series has no state beyond its labels; the exposed value is
/// always `1.0` and the writer appends the `_info` suffix.
#[derive(Clone)]
pub struct Info {
    inner: Arc<InfoInner>,
}

struct InfoInner {
    metadata: MetricMetadata,
    series: SeriesMap<()>,
}

impl Info {
    /// Starts building an info metric.
    pub fn builder() -> InfoBuilder {
        InfoBuilder::new()
    }

    /// Creates (or keeps) the series for a label value tuple.
    pub fn with_labels(&self, values: &[&str]) -> Result<(), MetricsError> {
        self.inner.series.get_or_create(values, || ())?;
        Ok(())
    }
}

impl Collector for Info {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = InfoSnapshot::builder().name(self.inner.metadata.name());
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        for (labels, _) in self.inner.series.all() {
            builder = builder.data(InfoData::new(labels));
        }
        Ok(MetricSnapshot::Info(builder.build()?))
    }
}

/// Builder for [`Info`].
pub struct InfoBuilder {
    opts: CommonOpts,
}

impl InfoBuilder {
    fn new() -> InfoBuilder {
        InfoBuilder { opts: CommonOpts::new() }
    }

    /// Sets the family name. Required; must not end in `_info`.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.opts.name = Some(name.into());
        self
    }

    /// Sets the help text.
    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.opts.help = Some(help.into());
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

    /// Builds the info metric.
    pub fn build(self) -> Result<Info, MetricsError> {
        let (metadata, label_names, const_labels) =
            self.opts.validate(INFO_RESERVED_SUFFIXES, &[])?;
        Ok(Info {
            inner: Arc::new(InfoInner {
                metadata,
                series: SeriesMap::new(label_names, const_labels, || ()),
            }),
        })
    }

    /// Builds the info metric and registers it.
    pub fn register(self, registry: &Registry) -> Result<Info, MetricsError> {
        let info = self.build()?;
        registry.register(Arc::new(info.clone()))?;
        Ok(info)
    }
}
