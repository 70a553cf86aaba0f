//! Outbound probe pacing.
//!
//! This module provides [`ProbePacer`]: sends one probe to the peer every
//! `1 / pps` seconds until the session is cancelled.
//!
//! The pacer sleeps a fixed interval after each send rather than keeping a
//! token bucket, so the achieved rate drops below the target when sending is
//! slow or the host is loaded. Treat the rate as approximate.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    counters::CounterSet,
    utils::{net_utils::interval_per_packet, probe_data::encode_probe},
};

#[derive(Debug)]
pub struct ProbePacer {
    sock: Arc<UdpSocket>,
    peer: SocketAddr,
    label: String,
    /// Sleep between two sends.
    interval: Duration,
    counters: Arc<CounterSet>,
    cancel: CancellationToken,
}

impl ProbePacer {
    pub fn new(
        sock: Arc<UdpSocket>,
        peer: SocketAddr,
        label: String,
        pps: u32,
        counters: Arc<CounterSet>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sock,
            peer,
            label,
            interval: interval_per_packet(pps),
            counters,
            cancel,
        }
    }

    /// Sends probes until cancelled.
    ///
    /// A failed send is logged and pacing goes on. Cancellation is checked
    /// before each send and during the sleep, never in the middle of a send.
    pub async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let seq = self.counters.record_send();
            let probe = encode_probe(seq, &self.label);

            match self.sock.send_to(&probe, self.peer).await {
                Ok(_) => debug!(seq, peer = %self.peer, "sent probe"),
                Err(e) => warn!(seq, peer = %self.peer, error = %e, "error sending probe"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.cancel.cancelled() => break,
            }
        }
        debug!("pacer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::probe_data::{PROBE_SIZE, decode_probe};
    use std::time::Instant;

    async fn socket_pair() -> (Arc<UdpSocket>, UdpSocket) {
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (Arc::new(sender), receiver)
    }

    #[tokio::test]
    async fn test_sequence_numbers_increment_correctly() {
        let (sender, receiver) = socket_pair().await;
        let counters = Arc::new(CounterSet::new());
        let cancel = CancellationToken::new();
        let pacer = ProbePacer::new(
            sender,
            receiver.local_addr().unwrap(),
            "tester".to_string(),
            200,
            counters.clone(),
            cancel.clone(),
        );
        let handle = tokio::spawn(pacer.run());

        let mut buf = vec![0u8; 2048];
        let mut seqs = Vec::new();
        while seqs.len() < 10 {
            let len = receiver.recv(&mut buf).await.unwrap();
            assert_eq!(len, PROBE_SIZE);
            seqs.push(decode_probe(&buf[..len]).unwrap().seq);
        }
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(seqs, (0..10).collect::<Vec<_>>());
        assert!(counters.totals().sent >= 10);
    }

    #[tokio::test]
    async fn test_pacer_stops_within_one_interval() {
        let (sender, receiver) = socket_pair().await;
        let cancel = CancellationToken::new();
        let pacer = ProbePacer::new(
            sender,
            receiver.local_addr().unwrap(),
            "tester".to_string(),
            1,
            Arc::new(CounterSet::new()),
            cancel.clone(),
        );
        let handle = tokio::spawn(pacer.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let start = Instant::now();
        cancel.cancel();
        handle.await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancelled_pacer_sends_nothing() {
        let (sender, receiver) = socket_pair().await;
        let counters = Arc::new(CounterSet::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        ProbePacer::new(
            sender,
            receiver.local_addr().unwrap(),
            "tester".to_string(),
            100,
            counters.clone(),
            cancel,
        )
        .run()
        .await;

        assert_eq!(counters.totals().sent, 0);
    }
}
