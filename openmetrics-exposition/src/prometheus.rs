//! The classic Prometheus text format writer (version 0.0.4).

use std::io::{self, Write};

use openmetrics_model::{
    CounterSnapshot, GaugeSnapshot, HistogramSnapshot, InfoSnapshot, MetricMetadata,
    MetricSnapshot, MetricSnapshots, StateSetSnapshot, SummarySnapshot, UnknownSnapshot,
};

use crate::text::{
    format_double, help_of, write_double, write_help_line, write_sample_name,
    write_scrape_timestamp, write_type_line, DoubleStyle,
};

/// Renders snapshots in the Prometheus text format.
///
/// The type set is `counter`, `gauge`, `summary`, `histogram`, and
/// `untyped`: info and stateset families become gauges, unknown becomes
/// untyped, and a gauge histogram is emitted as a histogram. There are no
/// `# UNIT` lines, no `_created` samples, no exemplars, and no trailing
/// `# EOF`.
#[derive(Clone, Debug, Default)]
pub struct PrometheusTextWriter;

impl PrometheusTextWriter {
    /// The content type to serve this format under.
    pub const CONTENT_TYPE: &'static str = "text/plain; version=0.0.4; charset=utf-8";

    /// Creates a writer.
    pub fn new() -> PrometheusTextWriter {
        PrometheusTextWriter
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
        Ok(())
    }

    // HELP precedes TYPE in the classic format.
    fn write_preamble<W: Write>(
        &self,
        out: &mut W,
        sample_name: &str,
        metadata: &MetricMetadata,
        metric_type: &str,
    ) -> io::Result<()> {
        if let Some(help) = help_of(metadata) {
            write_help_line(out, sample_name, help)?;
        }
        write_type_line(out, sample_name, metric_type)
    }

    fn write_counter<W: Write>(&self, out: &mut W, s: &CounterSnapshot) -> io::Result<()> {
        // The sample name carries _total exactly once, whether or not the
        // family name already ends in it.
        let name = crate::text::suffixed(s.metadata().name(), "_total");
        self.write_preamble(out, &name, s.metadata(), "counter")?;
        for data in s.data() {
            write_sample_name(out, &name, None, data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.value(), DoubleStyle::Prometheus)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_gauge<W: Write>(&self, out: &mut W, s: &GaugeSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, name, s.metadata(), "gauge")?;
        for data in s.data() {
            write_sample_name(out, name, None, data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.value(), DoubleStyle::Prometheus)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, out: &mut W, s: &SummarySnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, name, s.metadata(), "summary")?;
        for data in s.data() {
            for quantile in data.quantiles() {
                let value = format_double(quantile.quantile());
                write_sample_name(out, name, None, data.labels(), Some(("quantile", &value)))?;
                out.write_all(b" ")?;
                write_double(out, quantile.value(), DoubleStyle::Prometheus)?;
                write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
                out.write_all(b"\n")?;
            }
            write_sample_name(out, name, Some("_count"), data.labels(), None)?;
            write!(out, " {}", data.count())?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;

            write_sample_name(out, name, Some("_sum"), data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.sum(), DoubleStyle::Prometheus)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_histogram<W: Write>(&self, out: &mut W, s: &HistogramSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        let (count_suffix, sum_suffix) =
            if s.is_gauge_histogram() { ("_gcount", "_gsum") } else { ("_count", "_sum") };
        self.write_preamble(out, name, s.metadata(), "histogram")?;
        for data in s.data() {
            for bucket in data.buckets() {
                let le = format_double(bucket.upper_bound());
                write_sample_name(out, name, Some("_bucket"), data.labels(), Some(("le", &le)))?;
                write!(out, " {}", bucket.cumulative_count())?;
                write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
                out.write_all(b"\n")?;
            }
            write_sample_name(out, name, Some(count_suffix), data.labels(), None)?;
            write!(out, " {}", data.count())?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;

            write_sample_name(out, name, Some(sum_suffix), data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.sum(), DoubleStyle::Prometheus)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_info<W: Write>(&self, out: &mut W, s: &InfoSnapshot) -> io::Result<()> {
        let name = crate::text::suffixed(s.metadata().name(), "_info");
        self.write_preamble(out, &name, s.metadata(), "gauge")?;
        for data in s.data() {
            write_sample_name(out, &name, None, data.labels(), None)?;
            out.write_all(b" 1")?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_stateset<W: Write>(&self, out: &mut W, s: &StateSetSnapshot) -> io::Result<()> {
        let name = s.metadata().name();
        self.write_preamble(out, name, s.metadata(), "gauge")?;
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
        self.write_preamble(out, name, s.metadata(), "untyped")?;
        for data in s.data() {
            write_sample_name(out, name, None, data.labels(), None)?;
            out.write_all(b" ")?;
            write_double(out, data.value(), DoubleStyle::Prometheus)?;
            write_scrape_timestamp(out, data.scrape_timestamp_millis())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}
