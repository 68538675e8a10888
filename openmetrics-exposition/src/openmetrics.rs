//! The OpenMetrics text format writer.

use std::io::{self, Write};

use openmetrics_model::{
    CounterSnapshot, GaugeSnapshot, HistogramSnapshot, InfoSnapshot, MetricMetadata,
    MetricSnapshot, MetricSnapshots, StateSetSnapshot, SummarySnapshot, UnknownSnapshot,
};

use crate::text::{
    format_double, help_of, write_created_line, write_double, write_exemplar, write_help_line,
    write_sample_name, write_scrape_timestamp, write_type_line, write_unit_line, DoubleStyle,
};

/// Renders snapshots in the OpenMetrics text format, version 1.0.0.
///
/// Families are emitted in the (already sorted) snapshot order, each with a
/// `# TYPE` line, then `# UNIT` and `# HELP` when set, then its samples; the
/// stream ends with `# EOF`.
#[derive(Clone, Debug)]
pub struct OpenMetricsTextWriter {
    emit_created: bool,
}

impl OpenMetricsTextWriter {
    /// The content type to serve this format under.
    pub const CONTENT_TYPE: &'static str =
        "application/openmetrics-text; version=1.0.0; charset=utf-8";

    /// Creates a writer that emits `_created` samples.
    pub fn new() -> OpenMetricsTextWriter {
        OpenMetricsTextWriter { emit_created: true }
    }

    /// Creates a writer that suppresses `_created` samples.
    pub fn without_created_timestamps() -> OpenMetricsTextWriter {
        OpenMetricsTextWriter { emit_created: false }
    }

    /// Writes the whole exposition to `out`.
    pub fn write<W: Write>(&self, out: &mut W, snapshots: &MetricSnapshots) -> io::Result<()> {
        for snapshot in snapshots {
            match snapshot {
                MetricSnapshot::Counter(s) => self.write_counter(out, s)?,
                MetricSnapshot::Gauge(s) => self.write_gauge(out, s)?,
                MetricSnapshot::Summary(s) => self.write_summary(out, s)?,
                MetricSnapshot::Histogram(s) => self.write_histogram(out, s)?,
                MetricSnapshot::Info(s) => self.write_info(out, s)?,
                MetricSnapshot::StateSet(s) => self.write_stateset(out, s)?,
                MetricSnapshot::Unknown(s) => self.write_unknown(out, s)?,
            }
        }
        out.write_all(b"# EOF\n")
    }

    fn write_preamble<W: Write>(
        &self,
        out: &mut W,
        metadata: &MetricMetadata,
        metric_type: &str,
    ) -> io::Result<()> {
        write_type_line(out, metadata.name(), metric_type)?;
        if let Some(unit) = metadata.unit() {
            write_unit_line(out, metadata.name(), unit)?;
        }
        if let Some(help) = help_of(metadata) {
            write_help_line(out, metadata.name(), help)?;
        }
        Ok(())
    }

    fn write_counter<W: Write>(&self, out: &mut W, s: &CounterSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, s.metadata(), "counter")?;
        for data in s.data() {
            write_sample_name(out, name, Some("_total"), data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.value(), DoubleStyle::OpenMetrics)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            write_exemplar(out, data.exemplar())?;
            out.write_all(b"\n")?;
            if self.emit_created {
                write_created_line(out, name, data.labels(), data.created_timestamp_millis())?;
            }
        }
        Ok(())
    }

    fn write_gauge<W: Write>(&self, out: &mut W, s: &GaugeSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, s.metadata(), "gauge")?;
        for data in s.data() {
            write_sample_name(out, name, None, data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.value(), DoubleStyle::OpenMetrics)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            write_exemplar(out, data.exemplar())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, out: &mut W, s: &SummarySnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, s.metadata(), "summary")?;
        for data in s.data() {
            let exemplar = data.latest_exemplar();
            for quantile in data.quantiles() {
                let value = format_double(quantile.quantile());
                write_sample_name(out, name, None, data.labels(), Some(("quantile", &value)))?;
                out.write_all(b" ")?;
                write_double(out, quantile.value(), DoubleStyle::OpenMetrics)?;
                write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
                write_exemplar(out, exemplar)?;
                out.write_all(b"\n")?;
            }
            write_sample_name(out, name, Some("_count"), data.labels(), None)?;
            write!(out, " {}", data.count())?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            write_exemplar(out, exemplar)?;
            out.write_all(b"\n")?;

            write_sample_name(out, name, Some("_sum"), data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.sum(), DoubleStyle::OpenMetrics)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            write_exemplar(out, exemplar)?;
            out.write_all(b"\n")?;

            if self.emit_created {
                write_created_line(out, name, data.labels(), data.created_timestamp_millis())?;
            }
        }
        Ok(())
    }

    fn write_histogram<W: Write>(&self, out: &mut W, s: &HistogramSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        let (metric_type, count_suffix, sum_suffix) = if s.is_gauge_histogram() {
            ("gaugehistogram", "_gcount", "_gsum")
        } else {
            ("histogram", "_count", "_sum")
        };
        self.write_preamble(out, s.metadata(), metric_type)?;
        for data in s.data() {
            for bucket in data.buckets() {
                let le = format_double(bucket.upper_bound());
                write_sample_name(out, name, Some("_bucket"), data.labels(), Some(("le", &le)))?;
                write!(out, " {}", bucket.cumulative_count())?;
                write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
                write_exemplar(out, bucket.exemplar())?;
                out.write_all(b"\n")?;
            }
            write_sample_name(out, name, Some(count_suffix), data.labels(), None)?;
            write!(out, " {}", data.count())?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;

            write_sample_name(out, name, Some(sum_suffix), data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.sum(), DoubleStyle::OpenMetrics)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;

            if self.emit_created {
                write_created_line(out, name, data.labels(), data.created_timestamp_millis())?;
            }
        }
        Ok(())
    }

    fn write_info<W: Write>(&self, out: &mut W, s: &InfoSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, s.metadata(), "info")?;
        for data in s.data() {
            write_sample_name(out, name, Some("_info"), data.labels(), None)?;
            out.write_all(b" 1.0")?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_stateset<W: Write>(&self, out: &mut W, s: &StateSetSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, s.metadata(), "stateset")?;
        for data in s.data() {
            for state in data.states() {
                write_sample_name(out, name, None, data.labels(), Some((name, state.name())))?;
                out.write_all(if state.enabled() { b" 1" } else { b" 0" })?;
                write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    fn write_unknown<W: Write>(&self, out: &mut W, s: &UnknownSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, s.metadata(), "unknown")?;
        for data in s.data() {
            write_sample_name(out, name, None, data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.value(), DoubleStyle::OpenMetrics)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            write_exemplar(out, data.exemplar())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl Default for OpenMetricsTextWriter {
    fn default() -> Self {
        OpenMetricsTextWriter::new()
    }
}
