use crate::counters::{Totals, WindowCounts};
use std::time::Duration;

pub const MIB: f64 = 1024.0 * 1024.0;

/// Statistics for one reporting window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    /// Probes sent during the window.
    pub sent: u64,
    /// Probes received during the window.
    pub received: u64,
    /// Bytes received during the window.
    pub received_bytes: u64,
    /// Length of the window.
    pub window: Duration,
    /// `(sent - received) / sent * 100`, `None` when nothing was sent.
    pub loss_percent: Option<f64>,
    /// Received throughput in MiB/sec, `None` for an empty window length.
    pub bandwidth_mib: Option<f64>,
    /// Mean latency over the whole session so far (ms).
    pub avg_latency_ms: Option<f64>,
}

impl WindowResult {
    /// Builds the window statistics from freshly cleared counters and the
    /// lifetime latency accumulators.
    pub fn new(counts: WindowCounts, latency: (i64, u64), window: Duration) -> Self {
        Self {
            sent: counts.sent,
            received: counts.received,
            received_bytes: counts.received_bytes,
            window,
            loss_percent: loss_percent(counts.sent, counts.received),
            bandwidth_mib: bandwidth_mib(counts.received_bytes, window),
            avg_latency_ms: mean(latency.0, latency.1),
        }
    }
}

/// Final statistics over the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Total number of probes sent.
    pub total_sent: u64,
    /// Total number of probes received.
    pub total_received: u64,
    /// Total number of bytes received.
    pub total_received_bytes: u64,
    /// Time since the shared session start.
    pub elapsed: Duration,
    pub loss_percent: Option<f64>,
    pub bandwidth_mib: Option<f64>,
    pub avg_latency_ms: Option<f64>,
}

impl SessionSummary {
    pub fn from_totals(totals: &Totals, elapsed: Duration) -> Self {
        Self {
            total_sent: totals.sent,
            total_received: totals.received,
            total_received_bytes: totals.received_bytes,
            elapsed,
            loss_percent: loss_percent(totals.sent, totals.received),
            bandwidth_mib: bandwidth_mib(totals.received_bytes, elapsed),
            avg_latency_ms: mean(totals.latency_sum_ms, totals.latency_samples),
        }
    }
}

/// Share of sent probes the peer's stream did not match, in percent.
///
/// Compares our send count with what arrived from the peer, so it goes
/// negative when the peer sends faster than we do.
pub fn loss_percent(sent: u64, received: u64) -> Option<f64> {
    if sent == 0 {
        return None;
    }
    Some((sent as f64 - received as f64) / sent as f64 * 100.0)
}

pub fn bandwidth_mib(bytes: u64, over: Duration) -> Option<f64> {
    let secs = over.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some(bytes as f64 / secs / MIB)
}

/// The mean is the sum of a collection of numbers divided by the number of numbers in the collection.
/// (reference)[http://en.wikipedia.org/wiki/Arithmetic_mean]
pub fn mean(sum: i64, count: u64) -> Option<f64> {
    if count == 0 {
        return None;
    }
    Some(sum as f64 / count as f64)
}
