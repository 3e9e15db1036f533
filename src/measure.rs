//! Injected measurement collector
//!
//! A [`Measurements`] value is passed by reference into a run and counts
//! kernel invocations, skipped kernels, wavefront waits and hand-offs. All
//! counters are relaxed atomics, so a collector can be shared across worker
//! threads at negligible cost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The four block kernels of a pivot round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelKind {
    Diagonal,
    Vertical,
    Horizontal,
    Peripheral,
}

/// Counters collected while relaxing a matrix
#[derive(Debug, Default)]
pub struct Measurements {
    diagonal: AtomicU64,
    vertical: AtomicU64,
    horizontal: AtomicU64,
    peripheral: AtomicU64,
    skipped: AtomicU64,
    waits: AtomicU64,
    handoffs: AtomicU64,
    rounds: AtomicU64,
    elapsed_nanos: AtomicU64,
}

impl Measurements {
    /// Creates a collector with every counter at zero
    pub fn new() -> Self {
        Measurements::default()
    }

    fn counter(&self, kernel: KernelKind) -> &AtomicU64 {
        match kernel {
            KernelKind::Diagonal => &self.diagonal,
            KernelKind::Vertical => &self.vertical,
            KernelKind::Horizontal => &self.horizontal,
            KernelKind::Peripheral => &self.peripheral,
        }
    }

    /// Counts one invocation of `kernel`
    #[inline]
    pub fn record(&self, kernel: KernelKind) {
        self.counter(kernel).fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one kernel skipped because its intermediate range was empty
    #[inline]
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one wait on a height counter that actually slept
    #[inline]
    pub fn record_wait(&self) {
        self.waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one switch of a worker from one logical rank to another
    #[inline]
    pub fn record_handoff(&self) {
        self.handoffs.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one completed pivot round
    #[inline]
    pub fn record_round(&self) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds wall-clock time spent relaxing
    pub fn record_elapsed(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Invocations of `kernel` so far
    pub fn count(&self, kernel: KernelKind) -> u64 {
        self.counter(kernel).load(Ordering::Relaxed)
    }

    /// Kernels skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Snapshot of every counter
    pub fn report(&self) -> Report {
        Report {
            diagonal: self.count(KernelKind::Diagonal),
            vertical: self.count(KernelKind::Vertical),
            horizontal: self.count(KernelKind::Horizontal),
            peripheral: self.count(KernelKind::Peripheral),
            skipped: self.skipped(),
            waits: self.waits.load(Ordering::Relaxed),
            handoffs: self.handoffs.load(Ordering::Relaxed),
            rounds: self.rounds.load(Ordering::Relaxed),
            elapsed_ms: self.elapsed_nanos.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }

    /// Puts every counter back to zero
    pub fn reset(&self) {
        for counter in [
            &self.diagonal,
            &self.vertical,
            &self.horizontal,
            &self.peripheral,
            &self.skipped,
            &self.waits,
            &self.handoffs,
            &self.rounds,
            &self.elapsed_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Serialisable snapshot of a [`Measurements`] collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub diagonal: u64,
    pub vertical: u64,
    pub horizontal: u64,
    pub peripheral: u64,
    pub skipped: u64,
    pub waits: u64,
    pub handoffs: u64,
    pub rounds: u64,
    pub elapsed_ms: f64,
}

impl Report {
    /// Total kernel invocations, skipped ones excluded
    pub fn kernels(&self) -> u64 {
        self.diagonal + self.vertical + self.horizontal + self.peripheral
    }
}
