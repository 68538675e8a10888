//! Immutable value objects produced by collectors during a scrape.
//!
//! Snapshots never share mutable state with live series. Every family
//! snapshot sorts its per-series data by label tuple at construction, and
//! [`MetricSnapshots`] keeps families sorted by name, so a writer can render
//! the whole set without further bookkeeping.

use crate::error::MetricsError;
use crate::exemplar::Exemplar;
use crate::label::Labels;
use crate::metadata::MetricMetadata;
use crate::unit::Unit;

/// Writer-appended suffixes a counter family name must not end in.
pub const COUNTER_RESERVED_SUFFIXES: &[&str] = &["_total", "_created"];
/// Writer-appended suffixes a summary family name must not end in.
pub const SUMMARY_RESERVED_SUFFIXES: &[&str] = &["_count", "_sum", "_created"];
/// Writer-appended suffixes a histogram family name must not end in.
pub const HISTOGRAM_RESERVED_SUFFIXES: &[&str] =
    &["_bucket", "_count", "_sum", "_created", "_gcount", "_gsum"];
/// Writer-appended suffixes an info family name must not end in.
pub const INFO_RESERVED_SUFFIXES: &[&str] = &["_info"];

/// A snapshot of one metric family.
#[derive(Clone, Debug)]
pub enum MetricSnapshot {
    /// A counter family.
    Counter(CounterSnapshot),
    /// A gauge family.
    Gauge(GaugeSnapshot),
    /// A summary family.
    Summary(SummarySnapshot),
    /// A classic or gauge histogram family.
    Histogram(HistogramSnapshot),
    /// An info family.
    Info(InfoSnapshot),
    /// A stateset family.
    StateSet(StateSetSnapshot),
    /// A family of unknown type.
    Unknown(UnknownSnapshot),
}

impl MetricSnapshot {
    /// Metadata of the family.
    pub fn metadata(&self) -> &MetricMetadata {
        match self {
            MetricSnapshot::Counter(s) => &s.metadata,
            MetricSnapshot::Gauge(s) => &s.metadata,
            MetricSnapshot::Summary(s) => &s.metadata,
            MetricSnapshot::Histogram(s) => &s.metadata,
            MetricSnapshot::Info(s) => &s.metadata,
            MetricSnapshot::StateSet(s) => &s.metadata,
            MetricSnapshot::Unknown(s) => &s.metadata,
        }
    }

    /// Family name.
    pub fn name(&self) -> &str {
        self.metadata().name()
    }
}

/// An ordered collection of family snapshots, sorted by family name.
#[derive(Clone, Debug, Default)]
pub struct MetricSnapshots {
    snapshots: Vec<MetricSnapshot>,
}

impl MetricSnapshots {
    /// Creates a sorted collection, rejecting duplicate family names.
    pub fn new(mut snapshots: Vec<MetricSnapshot>) -> Result<MetricSnapshots, MetricsError> {
        snapshots.sort_by(|a, b| a.name().cmp(b.name()));
        for window in snapshots.windows(2) {
            if window[0].name() == window[1].name() {
                return Err(MetricsError::DuplicateName(window[0].name().to_string()));
            }
        }
        Ok(MetricSnapshots { snapshots })
    }

    /// Number of families.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iterates families in name order.
    pub fn iter(&self) -> std::slice::Iter<'_, MetricSnapshot> {
        self.snapshots.iter()
    }
}

impl<'a> IntoIterator for &'a MetricSnapshots {
    type Item = &'a MetricSnapshot;
    type IntoIter = std::slice::Iter<'a, MetricSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A counter family snapshot.
#[derive(Clone, Debug)]
pub struct CounterSnapshot {
    metadata: MetricMetadata,
    data: Vec<CounterData>,
}

impl CounterSnapshot {
    /// Starts building a counter snapshot.
    pub fn builder() -> CounterSnapshotBuilder {
        CounterSnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[CounterData] {
        &self.data
    }
}

/// Builder for [`CounterSnapshot`].
#[derive(Default)]
pub struct CounterSnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    unit: Option<Unit>,
    data: Vec<CounterData>,
}

impl CounterSnapshotBuilder {
    /// Sets the family name. Required.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the help text.
    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Sets the unit.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Adds one series.
    pub fn data(mut self, data: CounterData) -> Self {
        self.data.push(data);
        self
    }

    /// Builds the snapshot, validating the name against counter suffix rules.
    pub fn build(mut self) -> Result<CounterSnapshot, MetricsError> {
        let metadata = build_metadata(self.name, self.help, self.unit, COUNTER_RESERVED_SUFFIXES)?;
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(CounterSnapshot { metadata, data: self.data })
    }
}

/// One counter series.
#[derive(Clone, Debug)]
pub struct CounterData {
    value: f64,
    labels: Labels,
    exemplar: Option<Exemplar>,
    created_timestamp_millis: u64,
    scrape_timestamp_millis: Option<u64>,
}

impl CounterData {
    pub fn builder() -> CounterDataBuilder {
        CounterDataBuilder::default()
    }

    /// Current value. Never negative.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn exemplar(&self) -> Option<&Exemplar> {
        self.exemplar.as_ref()
    }

    /// Series creation time in unix milliseconds; `0` means unknown.
    pub fn created_timestamp_millis(&self) -> u64 {
        self.created_timestamp_millis
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// Builder for [`CounterData`].
#[derive(Default)]
pub struct CounterDataBuilder {
    value: f64,
    labels: Option<Labels>,
    exemplar: Option<Exemplar>,
    created_timestamp_millis: u64,
    scrape_timestamp_millis: Option<u64>,
}

impl CounterDataBuilder {
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn exemplar(mut self, exemplar: Exemplar) -> Self {
        self.exemplar = Some(exemplar);
        self
    }

    pub fn created_timestamp_millis(mut self, millis: u64) -> Self {
        self.created_timestamp_millis = millis;
        self
    }

    pub fn scrape_timestamp_millis(mut self, millis: u64) -> Self {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    pub fn build(self) -> Result<CounterData, MetricsError> {
        if self.value.is_nan() || self.value < 0.0 {
            return Err(MetricsError::InvalidArgument(format!(
                "counter value must be non-negative, got {}",
                self.value
            )));
        }
        Ok(CounterData {
            value: self.value,
            labels: self.labels.unwrap_or_else(Labels::empty),
            exemplar: self.exemplar,
            created_timestamp_millis: self.created_timestamp_millis,
            scrape_timestamp_millis: self.scrape_timestamp_millis,
        })
    }
}

/// A gauge family snapshot.
#[derive(Clone, Debug)]
pub struct GaugeSnapshot {
    metadata: MetricMetadata,
    data: Vec<GaugeData>,
}

impl GaugeSnapshot {
    pub fn builder() -> GaugeSnapshotBuilder {
        GaugeSnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[GaugeData] {
        &self.data
    }
}

/// Builder for [`GaugeSnapshot`].
#[derive(Default)]
pub struct GaugeSnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    unit: Option<Unit>,
    data: Vec<GaugeData>,
}

impl GaugeSnapshotBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn data(mut self, data: GaugeData) -> Self {
        self.data.push(data);
        self
    }

    pub fn build(mut self) -> Result<GaugeSnapshot, MetricsError> {
        let metadata = build_metadata(self.name, self.help, self.unit, &[])?;
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(GaugeSnapshot { metadata, data: self.data })
    }
}

/// One gauge series.
#[derive(Clone, Debug)]
pub struct GaugeData {
    value: f64,
    labels: Labels,
    exemplar: Option<Exemplar>,
    scrape_timestamp_millis: Option<u64>,
}

impl GaugeData {
    pub fn builder() -> GaugeDataBuilder {
        GaugeDataBuilder::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn exemplar(&self) -> Option<&Exemplar> {
        self.exemplar.as_ref()
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// Builder for [`GaugeData`].
#[derive(Default)]
pub struct GaugeDataBuilder {
    value: f64,
    labels: Option<Labels>,
    exemplar: Option<Exemplar>,
    scrape_timestamp_millis: Option<u64>,
}

impl GaugeDataBuilder {
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn exemplar(mut self, exemplar: Exemplar) -> Self {
        self.exemplar = Some(exemplar);
        self
    }

    pub fn scrape_timestamp_millis(mut self, millis: u64) -> Self {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    pub fn build(self) -> Result<GaugeData, MetricsError> {
        Ok(GaugeData {
            value: self.value,
            labels: self.labels.unwrap_or_else(Labels::empty),
            exemplar: self.exemplar,
            scrape_timestamp_millis: self.scrape_timestamp_millis,
        })
    }
}

/// A quantile estimate within a summary series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantile {
    quantile: f64,
    value: f64,
}

impl Quantile {
    /// Creates a quantile estimate; `quantile` must be within `[0, 1]`.
    pub fn new(quantile: f64, value: f64) -> Result<Quantile, MetricsError> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(MetricsError::InvalidArgument(format!(
                "quantile {} outside [0, 1]",
                quantile
            )));
        }
        Ok(Quantile { quantile, value })
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// A summary family snapshot.
#[derive(Clone, Debug)]
pub struct SummarySnapshot {
    metadata: MetricMetadata,
    data: Vec<SummaryData>,
}

impl SummarySnapshot {
    pub fn builder() -> SummarySnapshotBuilder {
        SummarySnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[SummaryData] {
        &self.data
    }
}

/// Builder for [`SummarySnapshot`].
#[derive(Default)]
pub struct SummarySnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    unit: Option<Unit>,
    data: Vec<SummaryData>,
}

impl SummarySnapshotBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn data(mut self, data: SummaryData) -> Self {
        self.data.push(data);
        self
    }

    pub fn build(mut self) -> Result<SummarySnapshot, MetricsError> {
        let metadata = build_metadata(self.name, self.help, self.unit, SUMMARY_RESERVED_SUFFIXES)?;
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(SummarySnapshot { metadata, data: self.data })
    }
}

/// One summary series.
#[derive(Clone, Debug)]
pub struct SummaryData {
    count: u64,
    sum: f64,
    quantiles: Vec<Quantile>,
    labels: Labels,
    exemplars: Vec<Exemplar>,
    created_timestamp_millis: u64,
    scrape_timestamp_millis: Option<u64>,
}

impl SummaryData {
    pub fn builder() -> SummaryDataBuilder {
        SummaryDataBuilder::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Quantile estimates, ascending by quantile.
    pub fn quantiles(&self) -> &[Quantile] {
        &self.quantiles
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }

    /// The newest exemplar, by timestamp.
    pub fn latest_exemplar(&self) -> Option<&Exemplar> {
        self.exemplars.iter().max_by_key(|e| e.timestamp_millis().unwrap_or(0))
    }

    /// Series creation time in unix milliseconds; `0` means unknown.
    pub fn created_timestamp_millis(&self) -> u64 {
        self.created_timestamp_millis
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// Builder for [`SummaryData`].
#[derive(Default)]
pub struct SummaryDataBuilder {
    count: u64,
    sum: f64,
    quantiles: Vec<Quantile>,
    labels: Option<Labels>,
    exemplars: Vec<Exemplar>,
    created_timestamp_millis: u64,
    scrape_timestamp_millis: Option<u64>,
}

impl SummaryDataBuilder {
    pub fn count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn sum(mut self, sum: f64) -> Self {
        self.sum = sum;
        self
    }

    pub fn quantile(mut self, quantile: Quantile) -> Self {
        self.quantiles.push(quantile);
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn exemplar(mut self, exemplar: Exemplar) -> Self {
        self.exemplars.push(exemplar);
        self
    }

    pub fn created_timestamp_millis(mut self, millis: u64) -> Self {
        self.created_timestamp_millis = millis;
        self
    }

    pub fn scrape_timestamp_millis(mut self, millis: u64) -> Self {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    pub fn build(mut self) -> Result<SummaryData, MetricsError> {
        self.quantiles.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));
        for window in self.quantiles.windows(2) {
            if window[0].quantile == window[1].quantile {
                return Err(MetricsError::InvalidArgument(format!(
                    "duplicate quantile {}",
                    window[0].quantile
                )));
            }
        }
        Ok(SummaryData {
            count: self.count,
            sum: self.sum,
            quantiles: self.quantiles,
            labels: self.labels.unwrap_or_else(Labels::empty),
            exemplars: self.exemplars,
            created_timestamp_millis: self.created_timestamp_millis,
            scrape_timestamp_millis: self.scrape_timestamp_millis,
        })
    }
}

/// One histogram bucket: everything observed at or below `upper_bound`.
#[derive(Clone, Debug)]
pub struct HistogramBucket {
    upper_bound: f64,
    cumulative_count: u64,
    exemplar: Option<Exemplar>,
}

impl HistogramBucket {
    /// Creates a bucket; `NaN` bounds are rejected.
    pub fn new(
        upper_bound: f64,
        cumulative_count: u64,
        exemplar: Option<Exemplar>,
    ) -> Result<HistogramBucket, MetricsError> {
        if upper_bound.is_nan() {
            return Err(MetricsError::InvalidArgument(
                "histogram bucket bound must not be NaN".to_string(),
            ));
        }
        Ok(HistogramBucket { upper_bound, cumulative_count, exemplar })
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn cumulative_count(&self) -> u64 {
        self.cumulative_count
    }

    pub fn exemplar(&self) -> Option<&Exemplar> {
        self.exemplar.as_ref()
    }
}

/// A histogram family snapshot, classic or gauge variant.
#[derive(Clone, Debug)]
pub struct HistogramSnapshot {
    metadata: MetricMetadata,
    gauge_histogram: bool,
    data: Vec<HistogramData>,
}

impl HistogramSnapshot {
    pub fn builder() -> HistogramSnapshotBuilder {
        HistogramSnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Whether this is a gauge histogram (`gaugehistogram` type,
    /// `_gcount`/`_gsum` suffixes).
    pub fn is_gauge_histogram(&self) -> bool {
        self.gauge_histogram
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[HistogramData] {
        &self.data
    }
}

/// Builder for [`HistogramSnapshot`].
#[derive(Default)]
pub struct HistogramSnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    unit: Option<Unit>,
    gauge_histogram: bool,
    data: Vec<HistogramData>,
}

impl HistogramSnapshotBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Marks the family as a gauge histogram.
    pub fn gauge_histogram(mut self, gauge_histogram: bool) -> Self {
        self.gauge_histogram = gauge_histogram;
        self
    }

    pub fn data(mut self, data: HistogramData) -> Self {
        self.data.push(data);
        self
    }

    pub fn build(mut self) -> Result<HistogramSnapshot, MetricsError> {
        let metadata =
            build_metadata(self.name, self.help, self.unit, HISTOGRAM_RESERVED_SUFFIXES)?;
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(HistogramSnapshot { metadata, gauge_histogram: self.gauge_histogram, data: self.data })
    }
}

/// One histogram series.
#[derive(Clone, Debug)]
pub struct HistogramData {
    buckets: Vec<HistogramBucket>,
    count: u64,
    sum: f64,
    labels: Labels,
    created_timestamp_millis: u64,
    scrape_timestamp_millis: Option<u64>,
}

impl HistogramData {
    pub fn builder() -> HistogramDataBuilder {
        HistogramDataBuilder::default()
    }

    /// Buckets in ascending bound order, ending in `+Inf`.
    pub fn buckets(&self) -> &[HistogramBucket] {
        &self.buckets
    }

    /// Total number of observations; equals the `+Inf` bucket count.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Series creation time in unix milliseconds; `0` means unknown.
    pub fn created_timestamp_millis(&self) -> u64 {
        self.created_timestamp_millis
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// Builder for [`HistogramData`].
#[derive(Default)]
pub struct HistogramDataBuilder {
    buckets: Vec<HistogramBucket>,
    sum: f64,
    labels: Option<Labels>,
    created_timestamp_millis: u64,
    scrape_timestamp_millis: Option<u64>,
}

impl HistogramDataBuilder {
    pub fn bucket(mut self, bucket: HistogramBucket) -> Self {
        self.buckets.push(bucket);
        self
    }

    pub fn sum(mut self, sum: f64) -> Self {
        self.sum = sum;
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn created_timestamp_millis(mut self, millis: u64) -> Self {
        self.created_timestamp_millis = millis;
        self
    }

    pub fn scrape_timestamp_millis(mut self, millis: u64) -> Self {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    /// Builds the series, checking bucket ordering and the `+Inf` terminator.
    ///
    /// The series count is taken from the `+Inf` bucket.
    pub fn build(self) -> Result<HistogramData, MetricsError> {
        if self.buckets.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "histogram data requires at least the +Inf bucket".to_string(),
            ));
        }
        for window in self.buckets.windows(2) {
            if window[0].upper_bound >= window[1].upper_bound {
                return Err(MetricsError::InvalidArgument(
                    "histogram bucket bounds must be strictly ascending".to_string(),
                ));
            }
            if window[0].cumulative_count > window[1].cumulative_count {
                return Err(MetricsError::InvalidArgument(
                    "histogram bucket counts must be cumulative".to_string(),
                ));
            }
        }
        let last = self.buckets.last().expect("checked non-empty above");
        if last.upper_bound != f64::INFINITY {
            return Err(MetricsError::InvalidArgument(
                "histogram buckets must end in +Inf".to_string(),
            ));
        }
        let count = last.cumulative_count;
        Ok(HistogramData {
            buckets: self.buckets,
            count,
            sum: self.sum,
            labels: self.labels.unwrap_or_else(Labels::empty),
            created_timestamp_millis: self.created_timestamp_millis,
            scrape_timestamp_millis: self.scrape_timestamp_millis,
        })
    }
}

/// An info family snapshot. Series carry only labels; the value is `1.0`.
#[derive(Clone, Debug)]
pub struct InfoSnapshot {
    metadata: MetricMetadata,
    data: Vec<InfoData>,
}

impl InfoSnapshot {
    pub fn builder() -> InfoSnapshotBuilder {
        InfoSnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[InfoData] {
        &self.data
    }
}

/// Builder for [`InfoSnapshot`]. Info families carry no unit.
#[derive(Default)]
pub struct InfoSnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    data: Vec<InfoData>,
}

impl InfoSnapshotBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn data(mut self, data: InfoData) -> Self {
        self.data.push(data);
        self
    }

    pub fn build(mut self) -> Result<InfoSnapshot, MetricsError> {
        let metadata = build_metadata(self.name, self.help, None, INFO_RESERVED_SUFFIXES)?;
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(InfoSnapshot { metadata, data: self.data })
    }
}

/// One info series.
#[derive(Clone, Debug)]
pub struct InfoData {
    labels: Labels,
    scrape_timestamp_millis: Option<u64>,
}

impl InfoData {
    pub fn new(labels: Labels) -> InfoData {
        InfoData { labels, scrape_timestamp_millis: None }
    }

    pub fn with_scrape_timestamp_millis(mut self, millis: u64) -> InfoData {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// One named state within a stateset series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    name: String,
    enabled: bool,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// A stateset family snapshot.
#[derive(Clone, Debug)]
pub struct StateSetSnapshot {
    metadata: MetricMetadata,
    data: Vec<StateSetData>,
}

impl StateSetSnapshot {
    pub fn builder() -> StateSetSnapshotBuilder {
        StateSetSnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[StateSetData] {
        &self.data
    }
}

/// Builder for [`StateSetSnapshot`].
#[derive(Default)]
pub struct StateSetSnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    data: Vec<StateSetData>,
}

impl StateSetSnapshotBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn data(mut self, data: StateSetData) -> Self {
        self.data.push(data);
        self
    }

    /// Builds the snapshot. Series labels must not collide with the state
    /// label, which is named after the family.
    pub fn build(mut self) -> Result<StateSetSnapshot, MetricsError> {
        let metadata = build_metadata(self.name, self.help, None, &[])?;
        for data in &self.data {
            if data.labels.contains(metadata.name()) {
                return Err(MetricsError::InvalidArgument(format!(
                    "label {} collides with the stateset state label",
                    metadata.name()
                )));
            }
        }
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(StateSetSnapshot { metadata, data: self.data })
    }
}

/// One stateset series.
#[derive(Clone, Debug)]
pub struct StateSetData {
    labels: Labels,
    states: Vec<State>,
    scrape_timestamp_millis: Option<u64>,
}

impl StateSetData {
    pub fn builder() -> StateSetDataBuilder {
        StateSetDataBuilder::default()
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// States in ascending name order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// Builder for [`StateSetData`].
#[derive(Default)]
pub struct StateSetDataBuilder {
    labels: Option<Labels>,
    states: Vec<State>,
    scrape_timestamp_millis: Option<u64>,
}

impl StateSetDataBuilder {
    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn state<S: Into<String>>(mut self, name: S, enabled: bool) -> Self {
        self.states.push(State { name: name.into(), enabled });
        self
    }

    pub fn scrape_timestamp_millis(mut self, millis: u64) -> Self {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    pub fn build(mut self) -> Result<StateSetData, MetricsError> {
        if self.states.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "stateset series requires at least one state".to_string(),
            ));
        }
        self.states.sort_by(|a, b| a.name.cmp(&b.name));
        for window in self.states.windows(2) {
            if window[0].name == window[1].name {
                return Err(MetricsError::InvalidArgument(format!(
                    "duplicate state name: {}",
                    window[0].name
                )));
            }
        }
        Ok(StateSetData {
            labels: self.labels.unwrap_or_else(Labels::empty),
            states: self.states,
            scrape_timestamp_millis: self.scrape_timestamp_millis,
        })
    }
}

/// A family of unknown type.
#[derive(Clone, Debug)]
pub struct UnknownSnapshot {
    metadata: MetricMetadata,
    data: Vec<UnknownData>,
}

impl UnknownSnapshot {
    pub fn builder() -> UnknownSnapshotBuilder {
        UnknownSnapshotBuilder::default()
    }

    pub fn metadata(&self) -> &MetricMetadata {
        &self.metadata
    }

    /// Per-series data, sorted by label tuple.
    pub fn data(&self) -> &[UnknownData] {
        &self.data
    }
}

/// Builder for [`UnknownSnapshot`].
#[derive(Default)]
pub struct UnknownSnapshotBuilder {
    name: Option<String>,
    help: Option<String>,
    unit: Option<Unit>,
    data: Vec<UnknownData>,
}

impl UnknownSnapshotBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn data(mut self, data: UnknownData) -> Self {
        self.data.push(data);
        self
    }

    pub fn build(mut self) -> Result<UnknownSnapshot, MetricsError> {
        let metadata = build_metadata(self.name, self.help, self.unit, &[])?;
        self.data.sort_by(|a, b| a.labels.cmp(&b.labels));
        Ok(UnknownSnapshot { metadata, data: self.data })
    }
}

/// One series of unknown type.
#[derive(Clone, Debug)]
pub struct UnknownData {
    value: f64,
    labels: Labels,
    exemplar: Option<Exemplar>,
    scrape_timestamp_millis: Option<u64>,
}

impl UnknownData {
    pub fn builder() -> UnknownDataBuilder {
        UnknownDataBuilder::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn exemplar(&self) -> Option<&Exemplar> {
        self.exemplar.as_ref()
    }

    pub fn scrape_timestamp_millis(&self) -> Option<u64> {
        self.scrape_timestamp_millis
    }
}

/// Builder for [`UnknownData`].
#[derive(Default)]
pub struct UnknownDataBuilder {
    value: f64,
    labels: Option<Labels>,
    exemplar: Option<Exemplar>,
    scrape_timestamp_millis: Option<u64>,
}

impl UnknownDataBuilder {
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn exemplar(mut self, exemplar: Exemplar) -> Self {
        self.exemplar = Some(exemplar);
        self
    }

    pub fn scrape_timestamp_millis(mut self, millis: u64) -> Self {
        self.scrape_timestamp_millis = Some(millis);
        self
    }

    pub fn build(self) -> Result<UnknownData, MetricsError> {
        Ok(UnknownData {
            value: self.value,
            labels: self.labels.unwrap_or_else(Labels::empty),
            exemplar: self.exemplar,
            scrape_timestamp_millis: self.scrape_timestamp_millis,
        })
    }
}

fn build_metadata(
    name: Option<String>,
    help: Option<String>,
    unit: Option<Unit>,
    reserved_suffixes: &[&str],
) -> Result<MetricMetadata, MetricsError> {
    let name = name.ok_or_else(|| MetricsError::InvalidName("metric name is required".to_string()))?;
    let metadata = MetricMetadata::new(&name, help, unit)?;
    metadata.reject_suffixes(reserved_suffixes)?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Labels;

    #[test]
    fn test_data_sorted_by_labels() {
        let snapshot = GaugeSnapshot::builder()
            .name("disk_usage_ratio")
            .data(
                GaugeData::builder()
                    .value(0.7)
                    .labels(Labels::of(&["device", "/dev/sda2"]).unwrap())
                    .build()
                    .unwrap(),
            )
            .data(
                GaugeData::builder()
                    .value(0.2)
                    .labels(Labels::of(&["device", "/dev/sda1"]).unwrap())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let devices: Vec<&str> =
            snapshot.data().iter().map(|d| d.labels().get("device").unwrap()).collect();
        assert_eq!(devices, vec!["/dev/sda1", "/dev/sda2"]);
    }

    #[test]
    fn test_families_sorted_and_unique() {
        let counter = |name: &str| {
            MetricSnapshot::Counter(CounterSnapshot::builder().name(name).build().unwrap())
        };
        let snapshots =
            MetricSnapshots::new(vec![counter("zzz"), counter("aaa"), counter("mmm")]).unwrap();
        let names: Vec<&str> = snapshots.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["aaa", "mmm", "zzz"]);

        let duplicate = MetricSnapshots::new(vec![counter("aaa"), counter("aaa")]);
        assert!(matches!(duplicate, Err(MetricsError::DuplicateName(_))));
    }

    #[test]
    fn test_counter_rejects_reserved_suffix_and_negative_value() {
        assert!(CounterSnapshot::builder().name("requests_total").build().is_err());
        assert!(CounterSnapshot::builder().name("requests_created").build().is_err());
        assert!(CounterData::builder().value(-1.0).build().is_err());
        assert!(CounterData::builder().value(f64::NAN).build().is_err());
    }

    #[test]
    fn test_histogram_bucket_validation() {
        let bucket = |le: f64, count: u64| HistogramBucket::new(le, count, None).unwrap();

        // Missing +Inf terminator.
        assert!(HistogramDataBuilder::default().bucket(bucket(1.0, 2)).build().is_err());

        // Out of order.
        assert!(HistogramDataBuilder::default()
            .bucket(bucket(2.0, 1))
            .bucket(bucket(1.0, 2))
            .bucket(bucket(f64::INFINITY, 3))
            .build()
            .is_err());

        // Non-cumulative counts.
        assert!(HistogramDataBuilder::default()
            .bucket(bucket(1.0, 5))
            .bucket(bucket(f64::INFINITY, 3))
            .build()
            .is_err());

        let data = HistogramDataBuilder::default()
            .bucket(bucket(1.0, 2))
            .bucket(bucket(f64::INFINITY, 4))
            .sum(4.1)
            .build()
            .unwrap();
        assert_eq!(data.count(), 4);

        assert!(HistogramBucket::new(f64::NAN, 0, None).is_err());
    }

    #[test]
    fn test_stateset_states_sorted_and_label_collision() {
        let data = StateSetData::builder().state("bb", false).state("a", true).build().unwrap();
        let names: Vec<&str> = data.states().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "bb"]);

        let colliding = StateSetSnapshot::builder()
            .name("my_states")
            .data(
                StateSetData::builder()
                    .labels(Labels::of(&["my_states", "oops"]).unwrap())
                    .state("a", true)
                    .build()
                    .unwrap(),
            )
            .build();
        assert!(colliding.is_err());

        assert!(StateSetData::builder().build().is_err());
        assert!(StateSetData::builder().state("a", true).state("a", false).build().is_err());
    }

    #[test]
    fn test_summary_quantiles_sorted_and_validated() {
        assert!(Quantile::new(1.5, 0.0).is_err());
        assert!(Quantile::new(-0.1, 0.0).is_err());

        let data = SummaryData::builder()
            .quantile(Quantile::new(0.95, 245.1).unwrap())
            .quantile(Quantile::new(0.5, 225.3).unwrap())
            .build()
            .unwrap();
        let phis: Vec<f64> = data.quantiles().iter().map(|q| q.quantile()).collect();
        assert_eq!(phis, vec![0.5, 0.95]);
    }

    #[test]
    fn test_info_rejects_info_suffix() {
        assert!(InfoSnapshot::builder().name("build_info").build().is_err());
        assert!(InfoSnapshot::builder().name("version").build().is_ok());
    }
}
