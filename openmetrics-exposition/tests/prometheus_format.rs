//! Output checks for the classic Prometheus text writer.

use openmetrics_exposition::PrometheusTextWriter;
use openmetrics_model::{
    CounterData, CounterSnapshot, GaugeData, GaugeSnapshot, HistogramBucket, HistogramData,
    HistogramSnapshot, InfoData, InfoSnapshot, Labels, MetricSnapshot, MetricSnapshots, Quantile,
    StateSetData, StateSetSnapshot, SummaryData, SummarySnapshot, Unit, UnknownData,
    UnknownSnapshot,
};

fn render(snapshots: Vec<MetricSnapshot>) -> String {
    let snapshots = MetricSnapshots::new(snapshots).unwrap();
    let mut out = Vec::new();
    PrometheusTextWriter::new().write(&mut out, &snapshots).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn counter_gets_total_suffix_and_no_created_line() {
    let counter = CounterSnapshot::builder()
        .name("service_time_seconds")
        .help("total time spent serving")
        .unit(Unit::SECONDS)
        .data(
            CounterData::builder()
                .value(0.8)
                .labels(Labels::of(&["path", "/hello", "status", "200"]).unwrap())
                .created_timestamp_millis(1672850585820)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let expected = "# HELP service_time_seconds_total total time spent serving\n\
                    # TYPE service_time_seconds_total counter\n\
                    service_time_seconds_total{path=\"/hello\",status=\"200\"} 0.8\n";
    assert_eq!(render(vec![MetricSnapshot::Counter(counter)]), expected);
}

#[test]
fn integral_values_render_without_dot_zero() {
    let counter = CounterSnapshot::builder()
        .name("requests")
        .data(CounterData::builder().value(80000.0).build().unwrap())
        .build()
        .unwrap();
    let expected = "# TYPE requests_total counter\n\
                    requests_total 80000\n";
    assert_eq!(render(vec![MetricSnapshot::Counter(counter)]), expected);
}

#[test]
fn summary_with_quantiles() {
    let summary = SummarySnapshot::builder()
        .name("http_request_duration_seconds")
        .help("request duration")
        .unit(Unit::SECONDS)
        .data(
            SummaryData::builder()
                .count(7)
                .sum(2.2)
                .quantile(Quantile::new(0.5, 225.3).unwrap())
                .quantile(Quantile::new(0.95, 245.1).unwrap())
                .labels(Labels::of(&["status", "200"]).unwrap())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let expected = "# HELP http_request_duration_seconds request duration\n\
                    # TYPE http_request_duration_seconds summary\n\
                    http_request_duration_seconds{status=\"200\",quantile=\"0.5\"} 225.3\n\
                    http_request_duration_seconds{status=\"200\",quantile=\"0.95\"} 245.1\n\
                    http_request_duration_seconds_count{status=\"200\"} 7\n\
                    http_request_duration_seconds_sum{status=\"200\"} 2.2\n";
    assert_eq!(render(vec![MetricSnapshot::Summary(summary)]), expected);
}

#[test]
fn histogram_without_exemplars() {
    let histogram = HistogramSnapshot::builder()
        .name("response_size_bytes")
        .unit(Unit::BYTES)
        .data(
            HistogramData::builder()
                .sum(4.1)
                .bucket(HistogramBucket::new(2.2, 2, None).unwrap())
                .bucket(HistogramBucket::new(f64::INFINITY, 4, None).unwrap())
                .labels(Labels::of(&["status", "200"]).unwrap())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let expected = "# TYPE response_size_bytes histogram\n\
                    response_size_bytes_bucket{status=\"200\",le=\"2.2\"} 2\n\
                    response_size_bytes_bucket{status=\"200\",le=\"+Inf\"} 4\n\
                    response_size_bytes_count{status=\"200\"} 4\n\
                    response_size_bytes_sum{status=\"200\"} 4.1\n";
    assert_eq!(render(vec![MetricSnapshot::Histogram(histogram)]), expected);
}

#[test]
fn gauge_histogram_renders_as_histogram_type() {
    let histogram = HistogramSnapshot::builder()
        .name("cache_size_bytes")
        .unit(Unit::BYTES)
        .gauge_histogram(true)
        .data(
            HistogramData::builder()
                .sum(17.0)
                .bucket(HistogramBucket::new(2.0, 3, None).unwrap())
                .bucket(HistogramBucket::new(f64::INFINITY, 7, None).unwrap())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let expected = "# TYPE cache_size_bytes histogram\n\
                    cache_size_bytes_bucket{le=\"2.0\"} 3\n\
                    cache_size_bytes_bucket{le=\"+Inf\"} 7\n\
                    cache_size_bytes_gcount 7\n\
                    cache_size_bytes_gsum 17\n";
    assert_eq!(render(vec![MetricSnapshot::Histogram(histogram)]), expected);
}

#[test]
fn info_becomes_a_gauge() {
    let info = InfoSnapshot::builder()
        .name("version")
        .help("version information")
        .data(InfoData::new(Labels::of(&["version", "1.2.3"]).unwrap()))
        .build()
        .unwrap();

    let expected = "# HELP version_info version information\n\
                    # TYPE version_info gauge\n\
                    version_info{version=\"1.2.3\"} 1\n";
    assert_eq!(render(vec![MetricSnapshot::Info(info)]), expected);
}

#[test]
fn stateset_becomes_a_gauge() {
    let stateset = StateSetSnapshot::builder()
        .name("my_states")
        .data(StateSetData::builder().state("a", true).state("bb", false).build().unwrap())
        .build()
        .unwrap();

    let expected = "# TYPE my_states gauge\n\
                    my_states{my_states=\"a\"} 1\n\
                    my_states{my_states=\"bb\"} 0\n";
    assert_eq!(render(vec![MetricSnapshot::StateSet(stateset)]), expected);
}

#[test]
fn unknown_becomes_untyped_and_no_eof_is_written() {
    let unknown = UnknownSnapshot::builder()
        .name("other")
        .data(UnknownData::builder().value(22.3).build().unwrap())
        .build()
        .unwrap();

    let rendered = render(vec![MetricSnapshot::Unknown(unknown)]);
    assert_eq!(rendered, "# TYPE other untyped\nother 22.3\n");
    assert!(!rendered.contains("# EOF"));
}

#[test]
fn scrape_timestamps_keep_millisecond_precision() {
    let gauge = GaugeSnapshot::builder()
        .name("temperature_centigrade")
        .data(
            GaugeData::builder()
                .value(22.3)
                .scrape_timestamp_millis(1672850685829)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let expected = "# TYPE temperature_centigrade gauge\n\
                    temperature_centigrade 22.3 1672850685.829\n";
    assert_eq!(render(vec![MetricSnapshot::Gauge(gauge)]), expected);
}
