use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::ProbeError;

pub const DEFAULT_PPS: u32 = 10;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);
/// Shortest window the reporter accepts.
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(10);

/// Everything a measurement session needs once the peer is known.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address the peer's probes come from and ours go to.
    pub peer: SocketAddr,
    /// Probes per second the pacer aims for.
    pub pps: u32,
    /// Text embedded in every probe, usually the rendezvous key.
    pub label: String,
    /// Length of a windowed report.
    pub report_interval: Duration,
    /// Send the termination datagram to the peer on a local stop.
    pub notify_peer: bool,
    /// Shared start time from the time-sync handshake (ns since UNIX_EPOCH).
    pub start_nanos: i64,
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidRate`] if `pps` is zero.
    pub fn new(
        peer: SocketAddr,
        pps: u32,
        label: impl Into<String>,
        start_nanos: i64,
    ) -> Result<Self, ProbeError> {
        if pps == 0 {
            return Err(ProbeError::InvalidRate);
        }
        Ok(Self {
            peer,
            pps,
            label: label.into(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            notify_peer: true,
            start_nanos,
        })
    }

    /// Intervals below [`MIN_REPORT_INTERVAL`] are raised to it.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval.max(MIN_REPORT_INTERVAL);
        self
    }

    pub fn with_notify_peer(mut self, notify: bool) -> Self {
        self.notify_peer = notify;
        self
    }
}
