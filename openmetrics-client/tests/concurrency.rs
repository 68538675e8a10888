//! Multi-threaded behaviour: no observation is ever lost or double-counted,
//! and snapshots taken mid-traffic stay internally consistent.

use crossbeam_utils::thread;
use openmetrics_client::{Collector, Counter, Histogram, Observer, Summary};
use openmetrics_model::MetricSnapshot;

const THREADS: usize = 8;
const OBSERVATIONS_PER_THREAD: usize = 10_000;

fn counter_value(counter: &Counter) -> f64 {
    match counter.collect().unwrap() {
        MetricSnapshot::Counter(snapshot) => snapshot.data()[0].value(),
        _ => unreachable!(),
    }
}

#[test]
fn concurrent_counter_increments_are_exact() {
    let counter =
        Counter::builder().name("requests").label_names(&["status"]).build().unwrap();
    let handle = counter.with_labels(&["200"]).unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let handle = handle.clone();
            scope.spawn(move |_| {
                for _ in 0..OBSERVATIONS_PER_THREAD {
                    handle.inc();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(counter_value(&counter), (THREADS * OBSERVATIONS_PER_THREAD) as f64);
}

#[test]
fn concurrent_counter_with_interleaved_scrapes() {
    let counter = Counter::builder().name("requests").build().unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let counter = counter.clone();
            scope.spawn(move |_| {
                for i in 0..OBSERVATIONS_PER_THREAD {
                    counter.inc();
                    if i % 1_000 == 0 {
                        // Snapshots mid-traffic must never see a torn value.
                        let value = counter_value(&counter);
                        assert_eq!(value, value.trunc());
                    }
                }
            });
        }
    })
    .unwrap();

    assert_eq!(counter_value(&counter), (THREADS * OBSERVATIONS_PER_THREAD) as f64);
}

#[test]
fn concurrent_histogram_observations_are_exact_and_monotonic() {
    let histogram =
        Histogram::builder().name("latency").label_names(&["status"]).build().unwrap();
    let handle = histogram.with_labels(&["200"]).unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let handle = handle.clone();
            let histogram = histogram.clone();
            scope.spawn(move |_| {
                let mut last_count = 0u64;
                for round in 0..10 {
                    for _ in 0..1_000 {
                        handle.observe(1.1);
                    }
                    let data = match histogram.collect().unwrap() {
                        MetricSnapshot::Histogram(snapshot) => snapshot.data().to_vec(),
                        _ => unreachable!(),
                    };
                    assert_eq!(data.len(), 1);
                    let count = data[0].count();
                    // At least this thread's own observations so far, and
                    // never shrinking.
                    assert!(count >= (round + 1) * 1_000);
                    assert!(count >= last_count);
                    // The +Inf bucket always equals the count, and every
                    // observation of 1.1 lands at or below the 2.5 bucket.
                    let buckets = data[0].buckets();
                    assert_eq!(buckets.last().unwrap().cumulative_count(), count);
                    let le_2_5 = buckets
                        .iter()
                        .find(|b| b.upper_bound() == 2.5)
                        .unwrap()
                        .cumulative_count();
                    assert_eq!(le_2_5, count);
                    last_count = count;
                }
            });
        }
    })
    .unwrap();

    match histogram.collect().unwrap() {
        MetricSnapshot::Histogram(snapshot) => {
            let data = &snapshot.data()[0];
            let total = (THREADS * 10 * 1_000) as u64;
            assert_eq!(data.count(), total);
            assert_eq!(data.buckets().last().unwrap().cumulative_count(), total);
            assert!((data.sum() - 1.1 * total as f64).abs() < 1.0);
        }
        _ => unreachable!(),
    }
}

#[test]
fn concurrent_summary_count_and_sum_stay_coherent() {
    let summary = Summary::builder()
        .name("work_seconds")
        .unit(openmetrics_client::Unit::SECONDS)
        .quantile(0.5, 0.05)
        .build()
        .unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let summary = summary.clone();
            scope.spawn(move |_| {
                for i in 0..1_000 {
                    summary.observe(1.0);
                    if i % 250 == 0 {
                        match summary.collect().unwrap() {
                            MetricSnapshot::Summary(snapshot) => {
                                let data = &snapshot.data()[0];
                                // Under a constant stream of 1.0s the sum of
                                // a consistent snapshot equals its count.
                                assert_eq!(data.sum(), data.count() as f64);
                            }
                            _ => unreachable!(),
                        }
                    }
                }
            });
        }
    })
    .unwrap();

    match summary.collect().unwrap() {
        MetricSnapshot::Summary(snapshot) => {
            let data = &snapshot.data()[0];
            assert_eq!(data.count(), (THREADS * 1_000) as u64);
            assert_eq!(data.sum(), (THREADS * 1_000) as f64);
        }
        _ => unreachable!(),
    }
}
