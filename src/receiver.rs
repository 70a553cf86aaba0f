//! Inbound probe handling.
//!
//! This module provides [`ProbeReceiver`]: reads datagrams from the shared
//! socket, counts probes, measures their one-way latency and watches for the
//! peer's termination datagram.

use std::{net::SocketAddr, sync::Arc};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    counters::CounterSet,
    session::{TerminationCause, TerminationGate},
    utils::probe_data::{Datagram, classify, latency_ms, now_nanos, probe_note},
};

/// Large enough for a probe plus anything a non-conforming peer might send.
const RECV_BUF_SIZE: usize = 2048;

#[derive(Debug)]
pub struct ProbeReceiver {
    sock: Arc<UdpSocket>,
    counters: Arc<CounterSet>,
    gate: Arc<TerminationGate>,
    cancel: CancellationToken,
}

impl ProbeReceiver {
    pub fn new(
        sock: Arc<UdpSocket>,
        counters: Arc<CounterSet>,
        gate: Arc<TerminationGate>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sock,
            counters,
            gate,
            cancel,
        }
    }

    /// Receives until cancelled or until the peer asks to stop.
    ///
    /// Receive errors and malformed datagrams are logged and skipped.
    pub async fn run(self) {
        let mut buf = vec![0u8; RECV_BUF_SIZE];

        loop {
            let (len, from) = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                res = self.sock.recv_from(&mut buf) => match res {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "error reading datagram");
                        continue;
                    }
                },
            };

            if self.handle(&buf[..len], from) {
                break;
            }
        }
        debug!("receiver stopped");
    }

    /// Processes one datagram. Returns `true` when it ended the session.
    pub fn handle(&self, datagram: &[u8], from: SocketAddr) -> bool {
        match classify(datagram) {
            Ok(Datagram::Sentinel) => {
                info!(ip = %from.ip(), port = from.port(), "received termination signal from the other client");
                if self.gate.terminate(TerminationCause::Remote) {
                    self.cancel.cancel();
                }
                true
            }
            Ok(Datagram::Probe(header)) => {
                self.counters.record_receive(datagram.len());

                let latency = latency_ms(header.sent_at_nanos, now_nanos());
                self.counters.record_latency(latency);

                info!(
                    seq = header.seq,
                    latency_ms = latency,
                    ip = %from.ip(),
                    port = from.port(),
                    message = %probe_note(datagram),
                    "received probe"
                );
                false
            }
            Err(e) => {
                warn!(ip = %from.ip(), port = from.port(), error = %e, "discarding datagram");
                false
            }
        }
    }
}
