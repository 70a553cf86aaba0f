use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::lookup_host;

use crate::errors::ProbeError;

/// Gap between two probes for a rate of `pps` packets per second.
pub(crate) fn interval_per_packet(pps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(pps.max(1)))
}

/// Parses the `"<ip>:<port>"` text the rendezvous server sends back.
/// Trailing NULs and whitespace are ignored.
pub fn parse_peer_reply(reply: &[u8]) -> Result<SocketAddr, ProbeError> {
    let text = String::from_utf8_lossy(reply);
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() {
        return Err(ProbeError::InvalidReply(text.to_string()));
    }
    text.parse::<SocketAddr>()
        .map_err(|_| ProbeError::InvalidReply(text.to_string()))
}

/// Resolves `host:port` to the first IPv4 address, falling back to any address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ProbeError> {
    let target = format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = lookup_host(&target)
        .await
        .map_err(|source| ProbeError::Resolve {
            host: target.clone(),
            source,
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ProbeError::Resolve {
            host: target,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
        })
}
