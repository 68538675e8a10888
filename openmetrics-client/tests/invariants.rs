//! Property-based checks of the documented instrument invariants.

use openmetrics_client::{Collector, Counter, Histogram, Observer, Summary};
use openmetrics_model::MetricSnapshot;
use proptest::prelude::*;

fn counter_value(counter: &Counter) -> f64 {
    match counter.collect().unwrap() {
        MetricSnapshot::Counter(snapshot) => snapshot.data()[0].value(),
        _ => unreachable!(),
    }
}

fn histogram_data(histogram: &Histogram) -> openmetrics_model::HistogramData {
    match histogram.collect().unwrap() {
        MetricSnapshot::Histogram(snapshot) => snapshot.data()[0].clone(),
        _ => unreachable!(),
    }
}

proptest! {
    // Counter monotonicity: later snapshots never report less.
    #[test]
    fn counter_snapshots_never_decrease(deltas in prop::collection::vec(0.0f64..100.0, 1..50)) {
        let counter = Counter::builder().name("events").build().unwrap();
        let mut previous = 0.0;
        for delta in deltas {
            counter.inc_by(delta).unwrap();
            let value = counter_value(&counter);
            prop_assert!(value >= previous);
            previous = value;
        }
    }

    // Bucket counts are cumulative within a snapshot and non-decreasing
    // across snapshots; the +Inf bucket equals the count.
    #[test]
    fn histogram_bucket_invariants(values in prop::collection::vec(-50.0f64..50.0, 1..100)) {
        let histogram = Histogram::builder()
            .name("spread")
            .buckets(&[-25.0, 0.0, 10.0, 25.0])
            .build()
            .unwrap();
        let mut previous: Vec<u64> = Vec::new();
        for (i, value) in values.iter().enumerate() {
            histogram.observe(*value);
            let data = histogram_data(&histogram);
            let counts: Vec<u64> =
                data.buckets().iter().map(|b| b.cumulative_count()).collect();
            for window in counts.windows(2) {
                prop_assert!(window[0] <= window[1]);
            }
            prop_assert_eq!(*counts.last().unwrap(), data.count());
            prop_assert_eq!(data.count(), i as u64 + 1);
            if !previous.is_empty() {
                for (now, before) in counts.iter().zip(previous.iter()) {
                    prop_assert!(now >= before);
                }
            }
            previous = counts;
        }
    }

    // Summary count/sum coherence after a known sequence.
    #[test]
    fn summary_count_and_sum_match_observations(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..100)) {
        let summary = Summary::builder().name("sizes").build().unwrap();
        let mut expected_sum = 0.0;
        for value in &values {
            summary.observe(*value);
            expected_sum += value;
        }
        match summary.collect().unwrap() {
            MetricSnapshot::Summary(snapshot) => {
                let data = &snapshot.data()[0];
                prop_assert_eq!(data.count(), values.len() as u64);
                prop_assert!((data.sum() - expected_sum).abs() <= expected_sum.abs() * 1e-12 + 1e-6);
            }
            _ => unreachable!(),
        }
    }
}
