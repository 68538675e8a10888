//! Text exposition writers for openmetrics snapshots.
//!
//! Two encoders over a shared rendering engine: the OpenMetrics text format
//! (authoritative, with `# UNIT` lines, `_created` samples, exemplars, and a
//! terminating `# EOF`) and the classic Prometheus text format. Both write
//! synchronously to any [`std::io::Write`] sink and render the same snapshot
//! set to identical bytes every time.

mod text;

mod openmetrics;
pub use openmetrics::OpenMetricsTextWriter;

mod prometheus;
pub use prometheus::PrometheusTextWriter;
