//! Entry point for `punchprobe`.
//!
//! Parses CLI arguments and dispatches into client, direct-peer or rendezvous
//! server mode. `main.rs` owns only process setup (logging, signal handling,
//! argument parsing); the measurement itself lives in the library.

use std::{net::SocketAddr, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use punchprobe::{
    ProbeError, RendezvousServer, Session, SessionConfig,
    config::DEFAULT_PPS,
    rendezvous::{DEFAULT_SERVER_PORT, rendezvous, sync_start_time},
    utils::net_utils::resolve,
};

/// Peer-to-peer UDP loss, bandwidth and latency probe.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Find the peer through a rendezvous server, then probe it.
    Client {
        /// Rendezvous server host name or IP.
        #[arg(short, long)]
        server: String,
        /// Rendezvous server port.
        #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
        server_port: u16,
        /// Key shared by the two peers; also used as the probe label.
        #[arg(short, long)]
        key: String,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Probe a peer whose address is already known.
    Peer {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        /// Peer address (e.g. 198.51.100.4:40000).
        #[arg(short, long)]
        peer: SocketAddr,
        /// Text embedded in every probe.
        #[arg(short, long, default_value = "peer")]
        label: String,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Run the rendezvous server.
    Server {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:8085")]
        bind: SocketAddr,
    },
}

#[derive(clap::Args)]
struct ProbeArgs {
    /// Packets per second.
    #[arg(long, default_value_t = DEFAULT_PPS)]
    pps: u32,
    /// Seconds per windowed report.
    #[arg(long, default_value_t = 5)]
    interval: u64,
    /// Do not send the termination datagram to the peer on ctrl-c.
    #[arg(long)]
    no_notify: bool,
    /// Seconds to wait for the rendezvous reply and the peer's start time.
    #[arg(long, default_value_t = 60)]
    wait: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity, default is info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let res = match cli.mode {
        Mode::Client {
            server,
            server_port,
            key,
            probe,
        } => run_client(&server, server_port, key, probe).await,
        Mode::Peer {
            bind,
            peer,
            label,
            probe,
        } => run_peer(bind, peer, label, probe).await,
        Mode::Server { bind } => run_server(bind).await,
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "punchprobe failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_client(
    server: &str,
    server_port: u16,
    key: String,
    probe: ProbeArgs,
) -> Result<(), ProbeError> {
    let server = resolve(server, server_port).await?;
    let sock = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(ProbeError::BindFailed)?;

    let (peer, start_nanos) =
        rendezvous(&sock, server, &key, Duration::from_secs(probe.wait)).await?;
    run_session(sock, peer, key, start_nanos, probe).await
}

async fn run_peer(
    bind: SocketAddr,
    peer: SocketAddr,
    label: String,
    probe: ProbeArgs,
) -> Result<(), ProbeError> {
    let sock = UdpSocket::bind(bind)
        .await
        .map_err(ProbeError::BindFailed)?;
    let start_nanos = sync_start_time(&sock, peer, Duration::from_secs(probe.wait)).await?;
    run_session(sock, peer, label, start_nanos, probe).await
}

async fn run_session(
    sock: UdpSocket,
    peer: SocketAddr,
    label: String,
    start_nanos: i64,
    probe: ProbeArgs,
) -> Result<(), ProbeError> {
    let config = SessionConfig::new(peer, probe.pps, label, start_nanos)?
        .with_report_interval(Duration::from_secs(probe.interval.max(1)))
        .with_notify_peer(!probe.no_notify);

    let outcome = Session::new(config, sock).run(shutdown_signal()).await;
    info!(cause = ?outcome.cause, "exiting");
    Ok(())
}

async fn run_server(bind: SocketAddr) -> Result<(), ProbeError> {
    let mut server = RendezvousServer::bind(bind).await?;
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });

    server.run(cancel).await;
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("interrupt received, stopping");
}
