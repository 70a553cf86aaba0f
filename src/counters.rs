//! Lock-free counters shared by the pacer, the receiver and the reporter.
//!
//! Each field is its own atomic. Readers tolerate torn views across fields,
//! so no operation here ever locks more than one value at a time.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Values of the windowed counters at the moment they were cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub sent: u64,
    pub received: u64,
    pub received_bytes: u64,
}

/// Lifetime counters, read without resetting anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub sent: u64,
    pub received: u64,
    pub received_bytes: u64,
    pub latency_sum_ms: i64,
    pub latency_samples: u64,
}

#[derive(Debug, Default)]
pub struct CounterSet {
    sent_in_window: AtomicU64,
    received_in_window: AtomicU64,
    received_bytes_in_window: AtomicU64,

    total_sent: AtomicU64,
    total_received: AtomicU64,
    total_received_bytes: AtomicU64,
    total_latency_ms: AtomicI64,
    latency_samples: AtomicU64,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one outgoing probe and returns its sequence number.
    ///
    /// The fetch-add on the lifetime counter hands out the number, so a
    /// single pacer gets 0, 1, 2, ... with no gaps.
    pub fn record_send(&self) -> i64 {
        self.sent_in_window.fetch_add(1, Ordering::Relaxed);
        self.total_sent.fetch_add(1, Ordering::AcqRel) as i64
    }

    /// Counts one incoming probe of `bytes` bytes.
    pub fn record_receive(&self, bytes: usize) {
        let bytes = bytes as u64;
        self.received_in_window.fetch_add(1, Ordering::Relaxed);
        self.received_bytes_in_window.fetch_add(bytes, Ordering::Relaxed);
        self.total_received.fetch_add(1, Ordering::Relaxed);
        self.total_received_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency_ms: i64) {
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads and zeroes the windowed counters. Increments racing with the
    /// swap land in either this window or the next one, never in neither.
    pub fn take_window(&self) -> WindowCounts {
        WindowCounts {
            sent: self.sent_in_window.swap(0, Ordering::AcqRel),
            received: self.received_in_window.swap(0, Ordering::AcqRel),
            received_bytes: self.received_bytes_in_window.swap(0, Ordering::AcqRel),
        }
    }

    /// Cumulative latency sum and sample count.
    pub fn latency_totals(&self) -> (i64, u64) {
        (
            self.total_latency_ms.load(Ordering::Acquire),
            self.latency_samples.load(Ordering::Acquire),
        )
    }

    pub fn totals(&self) -> Totals {
        let (latency_sum_ms, latency_samples) = self.latency_totals();
        Totals {
            sent: self.total_sent.load(Ordering::Acquire),
            received: self.total_received.load(Ordering::Acquire),
            received_bytes: self.total_received_bytes.load(Ordering::Acquire),
            latency_sum_ms,
            latency_samples,
        }
    }
}
