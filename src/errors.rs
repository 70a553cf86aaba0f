use std::{io, net::AddrParseError, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to bind socket address: {0}")]
    BindFailed(io::Error),
    #[error("Udp socket failed to send data: {0}")]
    SendFailed(io::Error),

    #[error("Udp socket failed to receive data: {0}")]
    RecvFailed(io::Error),
    #[error("Failed to resolve host {host}: {source}")]
    Resolve { host: String, source: io::Error },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddrParseError),
    #[error("Rendezvous reply is not a peer address: {0:?}")]
    InvalidReply(String),

    #[error("Malformed datagram of {len} bytes")]
    Malformed { len: usize },
    #[error("Packet rate must be at least one packet per second")]
    InvalidRate,
}
