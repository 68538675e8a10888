use crate::error::MetricsError;
use crate::label::Labels;

/// Label name carrying the trace id of an exemplar.
pub const TRACE_ID_LABEL: &str = "trace_id";
/// Label name carrying the span id of an exemplar.
pub const SPAN_ID_LABEL: &str = "span_id";

/// A single observed value with attached labels, usually trace context.
///
/// The OpenMetrics format bounds the serialised exemplar label set at 128
/// UTF-8 bytes; the writer enforces that bound at output time.
#[derive(Clone, Debug, PartialEq)]
pub struct Exemplar {
    value: f64,
    labels: Labels,
    timestamp_millis: Option<u64>,
}

impl Exemplar {
    /// Starts building an exemplar.
    pub fn builder() -> ExemplarBuilder {
        ExemplarBuilder::default()
    }

    /// Creates an exemplar without trace context.
    pub fn new(value: f64, labels: Labels, timestamp_millis: Option<u64>) -> Exemplar {
        Exemplar { value, labels, timestamp_millis }
    }

    /// The observed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Labels, including `trace_id`/`span_id` when set.
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Unix timestamp in milliseconds, if recorded.
    pub fn timestamp_millis(&self) -> Option<u64> {
        self.timestamp_millis
    }
}

/// Builder for [`Exemplar`].
#[derive(Default)]
pub struct ExemplarBuilder {
    value: Option<f64>,
    labels: Vec<(String, String)>,
    timestamp_millis: Option<u64>,
}

impl ExemplarBuilder {
    /// Sets the observed value. Required.
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Attaches a `trace_id` label.
    pub fn trace_id<S: Into<String>>(mut self, trace_id: S) -> Self {
        self.labels.push((TRACE_ID_LABEL.to_string(), trace_id.into()));
        self
    }

    /// Attaches a `span_id` label.
    pub fn span_id<S: Into<String>>(mut self, span_id: S) -> Self {
        self.labels.push((SPAN_ID_LABEL.to_string(), span_id.into()));
        self
    }

    /// Attaches a user label.
    pub fn label<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }

    /// Sets the observation timestamp in unix milliseconds.
    pub fn timestamp_millis(mut self, millis: u64) -> Self {
        self.timestamp_millis = Some(millis);
        self
    }

    /// Builds the exemplar.
    pub fn build(self) -> Result<Exemplar, MetricsError> {
        let value = self
            .value
            .ok_or_else(|| MetricsError::InvalidArgument("exemplar value is required".to_string()))?;
        let labels = Labels::new(self.labels)?;
        Ok(Exemplar { value, labels, timestamp_millis: self.timestamp_millis })
    }
}
