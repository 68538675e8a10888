//! The immutable data model of the openmetrics client.
//!
//! This crate defines everything that crosses the boundary between the
//! instrument runtime and the exposition writers: label tuples, metric
//! metadata, exemplars, and the per-family snapshot types a collector
//! produces during a scrape.
//!
//! Snapshots are plain value objects. Once built they are immutable, carry
//! no references into live series storage, and keep their per-series data
//! sorted by label tuple so writers can emit them in a deterministic order.

mod error;
pub use self::error::MetricsError;

mod label;
pub use self::label::{validate_label_name, Label, Labels};

mod unit;
pub use self::unit::Unit;

mod metadata;
pub use self::metadata::{validate_metric_name, MetricMetadata, RESERVED_SUFFIXES};

mod exemplar;
pub use self::exemplar::{Exemplar, ExemplarBuilder, SPAN_ID_LABEL, TRACE_ID_LABEL};

mod snapshots;
pub use self::snapshots::{
    CounterData, CounterDataBuilder, CounterSnapshot, CounterSnapshotBuilder, GaugeData,
    GaugeDataBuilder, GaugeSnapshot, GaugeSnapshotBuilder, HistogramBucket, HistogramData,
    HistogramDataBuilder, HistogramSnapshot, HistogramSnapshotBuilder, InfoData, InfoSnapshot,
    InfoSnapshotBuilder, MetricSnapshot, MetricSnapshots, Quantile, State, StateSetData,
    StateSetDataBuilder, StateSetSnapshot, StateSetSnapshotBuilder, SummaryData,
    SummaryDataBuilder, SummarySnapshot, SummarySnapshotBuilder, UnknownData, UnknownDataBuilder,
    UnknownSnapshot, UnknownSnapshotBuilder, COUNTER_RESERVED_SUFFIXES,
    HISTOGRAM_RESERVED_SUFFIXES, INFO_RESERVED_SUFFIXES, SUMMARY_RESERVED_SUFFIXES,
};
