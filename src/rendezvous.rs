//! Peer discovery through a rendezvous server.
//!
//! A client sends its key to the server in one datagram. Once a second client
//! shows up with the same key, the server tells each one the other's public
//! `"<ip>:<port>"`. The two peers then swap an 8-byte start timestamp directly
//! so both sessions share one start time for the lifetime summary.

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::ProbeError,
    utils::{net_utils::parse_peer_reply, probe_data::now_nanos},
};

pub const DEFAULT_SERVER_PORT: u16 = 8085;

const REPLY_BUF_SIZE: usize = 1024;
const TIME_SYNC_SIZE: usize = 8;
const TIME_SYNC_RESEND: Duration = Duration::from_millis(200);

/// Registers `key` with the rendezvous server and waits for the peer address.
///
/// # Errors
///
/// - [`ProbeError::SendFailed`] / [`ProbeError::RecvFailed`] on socket errors.
/// - [`ProbeError::Timeout`] if no reply arrives within `wait`.
/// - [`ProbeError::InvalidReply`] if the reply is not an address.
pub async fn exchange_key(
    sock: &UdpSocket,
    server: SocketAddr,
    key: &str,
    wait: Duration,
) -> Result<SocketAddr, ProbeError> {
    sock.send_to(key.as_bytes(), server)
        .await
        .map_err(ProbeError::SendFailed)?;
    info!(%server, key, "sent client key, waiting for the other client");

    let mut buf = [0u8; REPLY_BUF_SIZE];
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let (len, from) = tokio::time::timeout_at(deadline, sock.recv_from(&mut buf))
            .await
            .map_err(|_| ProbeError::Timeout(wait))?
            .map_err(ProbeError::RecvFailed)?;

        if from != server {
            debug!(%from, "ignoring datagram from unknown sender during rendezvous");
            continue;
        }

        let peer = parse_peer_reply(&buf[..len])?;
        info!(%peer, "received other client address");
        return Ok(peer);
    }
}

/// Swaps start timestamps with the peer and returns the one it sent.
///
/// Our stamp is resent every [`TIME_SYNC_RESEND`] until the peer's arrives,
/// then sent once more in case the peer dropped the earlier copies while it
/// was still talking to the rendezvous server. Datagrams that are not exactly
/// 8 bytes are skipped, so an early probe from a fast peer does not break the
/// handshake.
pub async fn sync_start_time(
    sock: &UdpSocket,
    peer: SocketAddr,
    wait: Duration,
) -> Result<i64, ProbeError> {
    let ours = now_nanos().to_be_bytes();
    let mut resend = tokio::time::interval(TIME_SYNC_RESEND);

    let mut buf = [0u8; REPLY_BUF_SIZE];
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let len = tokio::select! {
            _ = resend.tick() => {
                sock.send_to(&ours, peer)
                    .await
                    .map_err(ProbeError::SendFailed)?;
                continue;
            }
            res = tokio::time::timeout_at(deadline, sock.recv(&mut buf)) => res
                .map_err(|_| ProbeError::Timeout(wait))?
                .map_err(ProbeError::RecvFailed)?,
        };

        if len != TIME_SYNC_SIZE {
            debug!(len, "ignoring datagram during time sync");
            continue;
        }

        if let Err(e) = sock.send_to(&ours, peer).await {
            warn!(error = %e, "error echoing start time");
        }

        let mut stamp = [0u8; TIME_SYNC_SIZE];
        stamp.copy_from_slice(&buf[..TIME_SYNC_SIZE]);
        let start = i64::from_be_bytes(stamp);
        debug!(start, "synchronized start time with peer");
        return Ok(start);
    }
}

/// Pairs clients that present the same key.
#[derive(Debug)]
pub struct RendezvousServer {
    sock: UdpSocket,
    /// Clients waiting for a partner, by key.
    waiting: HashMap<String, SocketAddr>,
}

impl RendezvousServer {
    /// # Errors
    ///
    /// Returns [`ProbeError::BindFailed`] if the socket could not be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ProbeError> {
        let sock = UdpSocket::bind(addr)
            .await
            .map_err(ProbeError::BindFailed)?;
        Ok(Self {
            sock,
            waiting: HashMap::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProbeError> {
        self.sock.local_addr().map_err(ProbeError::BindFailed)
    }

    /// Serves until `cancel` fires. Socket errors are logged and the loop
    /// keeps going.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let mut buf = vec![0u8; REPLY_BUF_SIZE];
        info!(addr = ?self.sock.local_addr().ok(), "rendezvous server started");

        loop {
            let (len, addr) = tokio::select! {
                _ = cancel.cancelled() => break,
                res = self.sock.recv_from(&mut buf) => match res {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "error reading datagram");
                        continue;
                    }
                },
            };

            let key = String::from_utf8_lossy(&buf[..len]).into_owned();
            info!(key = %key, ip = %addr.ip(), port = addr.port(), "client connected");

            if let Err(e) = self.register(key, addr).await {
                warn!(error = %e, "failed to answer client");
            }
        }
        info!("rendezvous server stopped");
    }

    async fn register(&mut self, key: String, addr: SocketAddr) -> Result<(), ProbeError> {
        match self.waiting.remove(&key) {
            Some(first) if first != addr => {
                self.sock
                    .send_to(first.to_string().as_bytes(), addr)
                    .await
                    .map_err(ProbeError::SendFailed)?;
                self.sock
                    .send_to(addr.to_string().as_bytes(), first)
                    .await
                    .map_err(ProbeError::SendFailed)?;
                info!(key = %key, %first, second = %addr, "paired clients");
            }
            _ => {
                // a client retrying its own key keeps waiting
                self.waiting.insert(key, addr);
            }
        }
        Ok(())
    }
}

/// Registers with the server, then syncs the start time with the peer.
/// Returns the peer address and the shared start time.
pub async fn rendezvous(
    sock: &UdpSocket,
    server: SocketAddr,
    key: &str,
    wait: Duration,
) -> Result<(SocketAddr, i64), ProbeError> {
    let peer = exchange_key(sock, server, key, wait).await?;
    let start = sync_start_time(sock, peer, wait).await?;
    Ok((peer, start))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    async fn spawn_server() -> (SocketAddr, CancellationToken) {
        let mut server = RendezvousServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move { server.run(token).await });
        (addr, cancel)
    }

    #[tokio::test]
    async fn test_two_clients_learn_each_other() {
        let (server, cancel) = spawn_server().await;
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (a_addr, b_addr) = (a.local_addr().unwrap(), b.local_addr().unwrap());

        let (ra, rb) = tokio::join!(
            exchange_key(&a, server, "room", WAIT),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                exchange_key(&b, server, "room", WAIT).await
            }
        );

        assert_eq!(ra.unwrap(), b_addr);
        assert_eq!(rb.unwrap(), a_addr);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_lonely_client_times_out() {
        let (server, cancel) = spawn_server().await;
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let res = exchange_key(&a, server, "alone", Duration::from_millis(100)).await;
        assert!(matches!(res, Err(ProbeError::Timeout(_))));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_time_sync_swaps_stamps() {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (a_addr, b_addr) = (a.local_addr().unwrap(), b.local_addr().unwrap());

        let before = now_nanos();
        let (sa, sb) = tokio::join!(
            sync_start_time(&a, b_addr, WAIT),
            sync_start_time(&b, a_addr, WAIT)
        );
        let (sa, sb) = (sa.unwrap(), sb.unwrap());

        assert!(sa >= before && sb >= before);
        assert!(sa <= now_nanos() && sb <= now_nanos());
    }

    #[tokio::test]
    async fn test_time_sync_skips_other_datagrams() {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let a_addr = a.local_addr().unwrap();

        b.send_to(&[0u8; 1000], a_addr).await.unwrap();
        b.send_to(&42i64.to_be_bytes(), a_addr).await.unwrap();

        let start = sync_start_time(&a, b.local_addr().unwrap(), WAIT).await.unwrap();
        assert_eq!(start, 42);
    }

    #[tokio::test]
    async fn test_full_rendezvous() {
        let (server, cancel) = spawn_server().await;
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let (ra, rb) = tokio::join!(
            rendezvous(&a, server, "pair", WAIT),
            rendezvous(&b, server, "pair", WAIT)
        );
        let ((pa, _), (pb, _)) = (ra.unwrap(), rb.unwrap());

        assert_eq!(pa, b.local_addr().unwrap());
        assert_eq!(pb, a.local_addr().unwrap());
        cancel.cancel();
    }
}
