//! In-process metric instrumentation with Prometheus/OpenMetrics semantics.
//!
//! The crate provides the instrument runtime: counters, gauges, summaries
//! with sliding-window CKMS quantiles, fixed-bucket histograms, info,
//! stateset, and unknown metrics, each safe for high-frequency observation
//! from many threads. A [`Registry`] collects instruments by family name and
//! turns them into an ordered set of immutable snapshots on demand; the
//! exposition crate renders those snapshots as Prometheus or OpenMetrics
//! text.
//!
//! The hot path is allocation-free after a series exists: counters and
//! gauges are one atomic op, histograms a binary search plus two atomic
//! ops, summaries an atomic add plus one short-lived estimator lock. While
//! a scrape snapshots a series, concurrent observations are parked in a
//! lock-free buffer and replayed afterwards, so observers never block and
//! snapshots stay consistent.
//!
//! ```
//! use openmetrics_client::{Counter, Registry};
//!
//! let registry = Registry::new();
//! let requests = Counter::builder()
//!     .name("requests")
//!     .help("Requests served.")
//!     .label_names(&["status"])
//!     .register(&registry)
//!     .unwrap();
//!
//! requests.with_labels(&["200"]).unwrap().inc();
//! let snapshots = registry.scrape();
//! assert_eq!(snapshots.len(), 1);
//! ```

mod atomics;
pub use atomics::AtomicF64;

mod buffer;

mod ckms;
pub use ckms::QuantileTarget;

mod common;

mod exemplars;
pub use exemplars::{
    default_exemplar_sampler, no_exemplars, ExemplarSampler, DEFAULT_EXEMPLAR_MIN_RETENTION,
};

mod instruments;
pub use instruments::{
    Counter, CounterBuilder, CounterHandle, Gauge, GaugeBuilder, GaugeHandle, Histogram,
    HistogramBuilder, HistogramHandle, Info, InfoBuilder, Observer, StateSet, StateSetBuilder,
    StateSetHandle, Summary, SummaryBuilder, SummaryHandle, Unknown, UnknownBuilder,
    UnknownHandle, DEFAULT_BUCKETS,
};

mod registry;
pub use registry::{default_registry, Collector, CollectorError, Registry, ScrapeError};

mod window;

// The shared data model, re-exported for convenience.
pub use openmetrics_model::{
    Exemplar, Label, Labels, MetricMetadata, MetricSnapshot, MetricSnapshots, MetricsError, Unit,
};
