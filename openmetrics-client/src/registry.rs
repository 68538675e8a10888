//! The collector registry: the single entry point for scraping.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use openmetrics_model::{validate_metric_name, MetricSnapshot, MetricSnapshots, MetricsError};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::error;

/// A source of one metric family snapshot.
///
/// All instruments implement this; custom collectors can too, to bridge
/// external data into a scrape.
pub trait Collector: Send + Sync {
    /// The family name this collector produces. Fixed for its lifetime.
    fn name(&self) -> &str;

    /// Produces a snapshot of every series in the family.
    fn collect(&self) -> Result<MetricSnapshot, CollectorError>;
}

/// An error raised by a collector during `collect`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CollectorError {
    message: String,
}

impl CollectorError {
    /// Creates a collector error from a message.
    pub fn new<S: Into<String>>(message: S) -> CollectorError {
        CollectorError { message: message.into() }
    }
}

impl From<MetricsError> for CollectorError {
    fn from(err: MetricsError) -> CollectorError {
        CollectorError::new(err.to_string())
    }
}

/// A soft failure recorded while scraping: the collector was skipped, the
/// scrape went on.
#[derive(Debug)]
pub struct ScrapeError {
    /// Family name of the failing collector.
    pub collector: String,
    /// What went wrong.
    pub error: CollectorError,
}

/// A name-unique collection of collectors.
///
/// The registry owns its collectors; a scrape walks them in family-name
/// order and assembles their snapshots. Cloning is shallow: clones share
/// the same collector table.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    collectors: RwLock<BTreeMap<String, Arc<dyn Collector>>>,
}

impl Registry {
    /// Creates an empty registry, independent of the default one.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Adds a collector.
    ///
    /// Fails with [`MetricsError::InvalidName`] when the family name is
    /// invalid and [`MetricsError::DuplicateName`] when a collector with the
    /// same name is already registered.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<(), MetricsError> {
        let name = collector.name().to_string();
        validate_metric_name(&name)?;
        let mut collectors = self.inner.collectors.write();
        if collectors.contains_key(&name) {
            return Err(MetricsError::DuplicateName(name));
        }
        collectors.insert(name, collector);
        Ok(())
    }

    /// Removes a collector by identity.
    ///
    /// Returns `false` when the collector is not registered here (or a
    /// different collector holds its name).
    pub fn unregister(&self, collector: &Arc<dyn Collector>) -> bool {
        let mut collectors = self.inner.collectors.write();
        match collectors.get(collector.name()) {
            Some(existing) if Arc::ptr_eq(existing, collector) => {
                collectors.remove(collector.name());
                true
            }
            _ => false,
        }
    }

    /// Scrapes all collectors, dropping soft errors after logging them.
    pub fn scrape(&self) -> MetricSnapshots {
        self.scrape_with_diagnostics().0
    }

    /// Scrapes all collectors.
    ///
    /// A collector that fails is skipped and reported in the diagnostics
    /// list; the scrape itself never fails.
    pub fn scrape_with_diagnostics(&self) -> (MetricSnapshots, Vec<ScrapeError>) {
        // Collectors run outside the table lock, so registration never waits
        // on a slow scrape and cancellation can take effect between
        // collectors.
        let collectors: Vec<(String, Arc<dyn Collector>)> = self
            .inner
            .collectors
            .read()
            .iter()
            .map(|(name, collector)| (name.clone(), Arc::clone(collector)))
            .collect();

        let mut snapshots = Vec::with_capacity(collectors.len());
        let mut errors = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for (name, collector) in collectors {
            match collector.collect() {
                Ok(snapshot) => {
                    if seen.insert(snapshot.name().to_string()) {
                        snapshots.push(snapshot);
                    } else {
                        error!(collector = %name, "collector returned a duplicate family name");
                        errors.push(ScrapeError {
                            collector: name,
                            error: CollectorError::new("duplicate family name in scrape"),
                        });
                    }
                }
                Err(err) => {
                    error!(collector = %name, error = %err, "collector failed during scrape");
                    errors.push(ScrapeError { collector: name, error: err });
                }
            }
        }
        let snapshots =
            MetricSnapshots::new(snapshots).expect("family names deduplicated during assembly");
        (snapshots, errors)
    }
}

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide default registry, created on first access.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use openmetrics_model::{CounterSnapshot, MetricSnapshot, MetricsError};

    use super::{default_registry, Collector, CollectorError, Registry};

    struct StaticCounter {
        name: &'static str,
        value: f64,
    }

    impl Collector for StaticCounter {
        fn name(&self) -> &str {
            self.name
        }

        fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
            let snapshot = CounterSnapshot::builder()
                .name(self.name)
                .data(
                    openmetrics_model::CounterData::builder()
                        .value(self.value)
                        .build()
                        .map_err(CollectorError::from)?,
                )
                .build()
                .map_err(CollectorError::from)?;
            Ok(MetricSnapshot::Counter(snapshot))
        }
    }

    struct Failing;

    impl Collector for Failing {
        fn name(&self) -> &str {
            "broken"
        }

        fn collect(&self) -> Result<MetricSnapshot, CollectorError> {
            Err(CollectorError::new("backing store unavailable"))
        }
    }

    #[test]
    fn test_register_rejects_duplicates_and_invalid_names() {
        let registry = Registry::new();
        registry.register(Arc::new(StaticCounter { name: "requests", value: 1.0 })).unwrap();
        let duplicate =
            registry.register(Arc::new(StaticCounter { name: "requests", value: 2.0 }));
        assert!(matches!(duplicate, Err(MetricsError::DuplicateName(_))));

        let invalid = registry.register(Arc::new(StaticCounter { name: "a.b", value: 0.0 }));
        assert!(matches!(invalid, Err(MetricsError::InvalidName(_))));
    }

    #[test]
    fn test_scrape_is_name_ordered() {
        let registry = Registry::new();
        for name in ["zzz", "aaa", "mmm"] {
            registry.register(Arc::new(StaticCounter { name, value: 1.0 })).unwrap();
        }
        let snapshots = registry.scrape();
        let names: Vec<&str> = snapshots.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["aaa", "mmm", "zzz"]);
    }

    #[test]
    fn test_failing_collector_is_skipped_and_reported() {
        let registry = Registry::new();
        registry.register(Arc::new(StaticCounter { name: "good", value: 1.0 })).unwrap();
        registry.register(Arc::new(Failing)).unwrap();

        let (snapshots, errors) = registry.scrape_with_diagnostics();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].collector, "broken");
    }

    #[test]
    fn test_unregister_by_identity() {
        let registry = Registry::new();
        let collector: Arc<dyn Collector> = Arc::new(StaticCounter { name: "one", value: 1.0 });
        registry.register(Arc::clone(&collector)).unwrap();

        let imposter: Arc<dyn Collector> = Arc::new(StaticCounter { name: "one", value: 2.0 });
        assert!(!registry.unregister(&imposter));
        assert!(registry.unregister(&collector));
        assert!(registry.scrape().is_empty());

        // The name is free again.
        registry.register(imposter).unwrap();
    }

    #[test]
    fn test_default_registry_is_shared() {
        let a = default_registry();
        let b = default_registry();
        assert!(std::ptr::eq(a, b));
    }
}
