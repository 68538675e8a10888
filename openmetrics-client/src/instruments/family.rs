//! Label-set indexing shared by all instruments.

use std::sync::Arc;

use dashmap::DashMap;
use openmetrics_model::{Labels, MetricsError};

/// The labels → series map under one instrument.
///
/// Label names are fixed at construction. Series are created lazily on the
/// first observation for a value tuple and live for the lifetime of the
/// instrument; a racing pair of first-time observers resolves to a single
/// series through the map's atomic entry insertion. Instruments without
/// label names get their default series eagerly.
pub(crate) struct SeriesMap<S> {
    label_names: Arc<[String]>,
    const_labels: Labels,
    series: DashMap<Labels, Arc<S>>,
    default_series: Option<Arc<S>>,
}

impl<S> SeriesMap<S> {
    pub fn new(
        label_names: Arc<[String]>,
        const_labels: Labels,
        init: impl FnOnce() -> S,
    ) -> SeriesMap<S> {
        let default_series =
            if label_names.is_empty() { Some(Arc::new(init())) } else { None };
        SeriesMap { label_names, const_labels, series: DashMap::new(), default_series }
    }

    /// Resolves the series for a label value tuple, creating it on first use.
    ///
    /// The tuple arity must match the declared label names.
    pub fn get_or_create(
        &self,
        values: &[&str],
        init: impl FnOnce() -> S,
    ) -> Result<Arc<S>, MetricsError> {
        if self.label_names.is_empty() {
            if !values.is_empty() {
                return Err(MetricsError::InvalidArgument(
                    "metric was declared without label names".to_string(),
                ));
            }
            return Ok(Arc::clone(self.default_series.as_ref().expect("created eagerly")));
        }
        if values.len() != self.label_names.len() {
            return Err(MetricsError::InvalidArgument(format!(
                "expected {} label value(s), got {}",
                self.label_names.len(),
                values.len()
            )));
        }
        let labels = Labels::new(
            self.label_names.iter().map(String::as_str).zip(values.iter().copied()),
        )?
        .merge(&self.const_labels)?;

        if let Some(existing) = self.series.get(&labels) {
            return Ok(Arc::clone(existing.value()));
        }
        let entry = self.series.entry(labels).or_insert_with(|| Arc::new(init()));
        Ok(Arc::clone(entry.value()))
    }

    /// The default series of a label-less instrument.
    ///
    /// Panics when the instrument was declared with label names; callers
    /// must go through `with_labels` instead.
    pub fn default_series(&self) -> Arc<S> {
        match &self.default_series {
            Some(series) => Arc::clone(series),
            None => panic!("metric has label names; call with_labels to get a series"),
        }
    }

    /// All live series with their full (user + constant) label sets.
    pub fn all(&self) -> Vec<(Labels, Arc<S>)> {
        match &self.default_series {
            Some(series) => vec![(self.const_labels.clone(), Arc::clone(series))],
            None => self
                .series
                .iter()
                .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
                .collect(),
        }
    }
}
