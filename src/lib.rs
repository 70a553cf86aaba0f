//! [![github]](https://github.com/mahmoudkhera/punchprobe)&ensp;[![crates-io]](https://crates.io/crates/punchprobe)&ensp;[![docs-rs]](https://docs.rs/punchprobe)
//!
//! [github]: https://img.shields.io/badge/github-8da0cb?style=for-the-badge&labelColor=555555&logo=github
//! [crates-io]: https://img.shields.io/badge/crates.io-fc8d62?style=for-the-badge&labelColor=555555&logo=rust
//! [docs-rs]: https://img.shields.io/badge/docs.rs-66c2a5?style=for-the-badge&labelColor=555555&logo=docs.rs
//!
//!  <br>
//!
//!  A peer-to-peer UDP probing toolkit. Two clients meet through a rendezvous
//! server, learn each other's public address, then stream timestamped probes
//! straight to each other to measure packet loss, bandwidth and latency.
//!
//!
//! # Details
//!
//!
//! - Use `punchprobe::Session` to run a measurement against a known peer
//! ```no_run
//! use punchprobe::{Session, SessionConfig};
//! use punchprobe::utils::probe_data::now_nanos;
//! use tokio::net::UdpSocket;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), punchprobe::ProbeError> {
//!     let sock = UdpSocket::bind("0.0.0.0:0").await.map_err(punchprobe::ProbeError::BindFailed)?;
//!
//!     // 10 probes per second, labelled "room-1"
//!     let config = SessionConfig::new("198.51.100.4:40000".parse()?, 10, "room-1", now_nanos())?;
//!
//!     // Run until ctrl-c or until the peer sends its termination datagram
//!     let outcome = Session::new(config, sock)
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!
//!     println!("ended by {:?}", outcome.cause);
//!     Ok(())
//! }
//! ```
//!
//! - Every 5 seconds the session prints a window report
//!
//! ```text
//! Summary over the last 5 seconds:
//!   Sent packets: 50
//!   Received packets: 49
//!   Packet loss rate: 2.00%
//!   Bandwidth throughput: 0.01 MiB/sec
//!   Average latency: 23.41 ms
//! -------------------------------
//! ```
//!
//! - Use `punchprobe::rendezvous` to find the peer first
//!
//! ```no_run
//! use std::time::Duration;
//! use punchprobe::rendezvous::rendezvous;
//! use tokio::net::UdpSocket;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), punchprobe::ProbeError> {
//! let sock = UdpSocket::bind("0.0.0.0:0").await.map_err(punchprobe::ProbeError::BindFailed)?;
//! let (peer, start_nanos) =
//!     rendezvous(&sock, "203.0.113.1:8085".parse()?, "room-1", Duration::from_secs(30)).await?;
//! # let _ = (peer, start_nanos);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub use config::SessionConfig;

mod errors;
pub use errors::ProbeError;

pub mod counters;
pub use counters::CounterSet;

pub mod result;
pub use result::{SessionSummary, WindowResult};

mod pacer;
pub use pacer::ProbePacer;
mod receiver;
pub use receiver::ProbeReceiver;
mod reporter;
pub use reporter::WindowReporter;

pub mod session;
pub use session::{Session, SessionOutcome, TerminationCause, TerminationGate};

pub mod rendezvous;
pub use rendezvous::RendezvousServer;

pub mod utils;
