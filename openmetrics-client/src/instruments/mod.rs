//! The instrument types and their per-series observers.

pub(crate) mod family;

mod counter;
pub use counter::{Counter, CounterBuilder, CounterHandle};

mod gauge;
pub use gauge::{Gauge, GaugeBuilder, GaugeHandle};

mod summary;
pub use summary::{Summary, SummaryBuilder, SummaryHandle};

mod histogram;
pub use histogram::{Histogram, HistogramBuilder, HistogramHandle, DEFAULT_BUCKETS};

mod info;
pub use info::{Info, InfoBuilder};

mod stateset;
pub use stateset::{StateSet, StateSetBuilder, StateSetHandle};

mod unknown;
pub use unknown::{Unknown, UnknownBuilder, UnknownHandle};

use openmetrics_model::Labels;

/// Accepts distribution observations.
///
/// Implemented by [`Summary`], [`Histogram`], and their per-series handles,
/// so timing helpers and adapters can be written against one seam.
pub trait Observer {
    /// Records one observation.
    fn observe(&self, value: f64);

    /// Records one observation, attaching `labels` as the exemplar.
    ///
    /// Bypasses the exemplar sampler and always overwrites.
    fn observe_with_exemplar(&self, value: f64, labels: Labels);
}
