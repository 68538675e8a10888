//! Atomic storage for floating-point metric values.

use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as its bit pattern in an [`AtomicU64`].
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    /// Creates a new atomic with the given value.
    pub fn new(value: f64) -> AtomicF64 {
        AtomicF64 { bits: AtomicU64::new(value.to_bits()) }
    }

    /// Loads the current value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Stores a value.
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Adds `delta` with a compare-and-swap loop.
    pub fn add(&self, delta: f64) {
        let _ = self.bits.fetch_update(Ordering::AcqRel, Ordering::Relaxed, |current| {
            Some((f64::from_bits(current) + delta).to_bits())
        });
    }
}
