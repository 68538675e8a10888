//! The stateset instrument: named boolean states as separate series.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use openmetrics_model::{
    Labels, MetricMetadata, MetricSnapshot, MetricsError, StateSetData, StateSetSnapshot,
};

use crate::common::CommonOpts;
use crate::instruments::family::SeriesMap;
use crate::registry::{Collector, CollectorError, Registry};

/// Models a set of boolean states, conventionally mutually exclusive.
///
/// Each state is exposed as one sample with a label named after the family;
/// user labels must therefore not collide with the family name.
#[derive(Clone)]
pub struct StateSet {
    inner: Arc<StateSetInner>,
}

struct StateSetInner {
    metadata: MetricMetadata,
    // Sorted at build time; snapshots emit states in this order.
    state_names: Arc<[String]>,
    series: SeriesMap<StateSetSeries>,
}

pub(crate) struct StateSetSeries {
    flags: Box<[AtomicBool]>,
}

impl StateSetSeries {
    fn new(len: usize) -> StateSetSeries {
        StateSetSeries { flags: (0..len).map(|_| AtomicBool::new(false)).collect() }
    }
}

/// The per-series observer of a [`StateSet`].
#[derive(Clone)]
pub struct StateSetHandle {
    state_names: Arc<[String]>,
    series: Arc<StateSetSeries>,
}

impl StateSetHandle {
    /// Sets one state to `enabled`.
    pub fn set(&self, state: &str, enabled: bool) -> Result<(), MetricsError> {
        let index = self
            .state_names
            .binary_search_by(|name| name.as_str().cmp(state))
            .map_err(|_| MetricsError::InvalidArgument(format!("unknown state: {}", state)))?;
        self.series.flags[index].store(enabled, Ordering::Release);
        Ok(())
    }

    /// Enables `state` and disables every other state.
    pub fn set_exclusive(&self, state: &str) -> Result<(), MetricsError> {
        let index = self
            .state_names
            .binary_search_by(|name| name.as_str().cmp(state))
            .map_err(|_| MetricsError::InvalidArgument(format!("unknown state: {}", state)))?;
        for (i, flag) in self.series.flags.iter().enumerate() {
            flag.store(i == index, Ordering::Release);
        }
        Ok(())
    }
}

impl StateSet {
    /// Starts building a stateset.
    pub fn builder() -> StateSetBuilder {
        StateSetBuilder::new()
    }

    /// Resolves the observer for a label value tuple, creating the series on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Result<StateSetHandle, MetricsError> {
        let len = self.inner.state_names.len();
        let series = self.inner.series.get_or_create(values, || StateSetSeries::new(len))?;
        Ok(StateSetHandle { state_names: self.inner.state_names.clone(), series })
    }

    /// Sets one state on the default series.
    ///
    /// Panics when the stateset was declared with label names.
    pub fn set(&self, state: &str, enabled: bool) -> Result<(), MetricsError> {
        StateSetHandle {
            state_names: self.inner.state_names.clone(),
            series: self.inner.series.default_series(),
        }
        .set(state, enabled)
    }

    /// Enables `state` and disables the rest on the default series.
    pub fn set_exclusive(&self, state: &str) -> Result<(), MetricsError> {
        StateSetHandle {
            state_names: self.inner.state_names.clone(),
            series: self.inner.series.default_series(),
        }
        .set_exclusive(state)
    }
}

impl Collector for StateSet {
    fn name(&self) -> &str {
        self.inner.metadata.name()
    }

    fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
        let mut builder = StateSetSnapshot::builder().name(self.inner.metadata.name());
        if let Some(help) = self.inner.metadata.help() {
            builder = builder.help(help);
        }
        for (labels, series) in self.inner.series.all() {
            let mut data = StateSetData::builder().labels(labels);
            for (index, name) in self.inner.state_names.iter().enumerate() {
                data = data.state(name.clone(), series.flags[index].load(Ordering::Acquire));
            }
            builder = builder.data(data.build()?);
        }
        Ok(MetricSnapshot::StateSet(builder.build()?))
    }
}

/// Builder for [`StateSet`].
pub struct StateSetBuilder {
    opts: CommonOpts,
    states: Vec<String>,
}

impl StateSetBuilder {
    fn new() -> StateSetBuilder {
        StateSetBuilder { opts: CommonOpts::new(), states: Vec::new() }
    }

    /// Sets the family name. Required; it doubles as the state label name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.opts.name = Some(name.into());
        self
    }

    /// Sets the help text.
    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.opts.help = Some(help.into());
        self
    }

    /// Declares the states. Required, at least one.
    pub fn states(mut self, states: &[&str]) -> Self {
        self.states = states.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Declares the label names series will provide values for. The family
    /// name itself is reserved for the state label.
    pub fn label_names(mut self, names: &[&str]) -> Self {
        self.opts.label_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Attaches constant labels to every series.
    pub fn const_labels(mut self, labels: Labels) -> Self {
        self.opts.const_labels = labels;
        self
    }

    /// Builds the stateset.
    pub fn build(self) -> Result<StateSet, MetricsError> {
        let name = self.opts.name.clone().unwrap_or_default();
        let (metadata, label_names, const_labels) =
            self.opts.validate(&[], &[name.as_str()])?;
        if self.states.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "a stateset requires at least one state".to_string(),
            ));
        }
        let mut states = self.states;
        states.sort();
        for window in states.windows(2) {
            if window[0] == window[1] {
                return Err(MetricsError::InvalidArgument(format!(
                    "duplicate state name: {}",
                    window[0]
                )));
            }
        }
        let state_names: Arc<[String]> = states.into();
        let len = state_names.len();
        Ok(StateSet {
            inner: Arc::new(StateSetInner {
                metadata,
                state_names,
                series: SeriesMap::new(label_names, const_labels, move || {
                    StateSetSeries::new(len)
                }),
            }),
        })
    }

    /// Builds the stateset and registers it.
    pub fn register(self, registry: &Registry) -> Result<StateSet, MetricsError> {
        let stateset = self.build()?;
        registry.register(Arc::new(stateset.clone()))?;
        Ok(stateset)
    }
}
