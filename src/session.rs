//! Measurement session lifecycle.
//!
//! This module provides [`Session`]: runs the pacer, the receiver and the
//! windowed reporter as three tasks over one shared socket, and shuts them
//! down when either the local side or the peer asks to stop. The lifetime
//! summary is printed by [`Session::run`] after all three tasks are gone, so
//! it is produced exactly once no matter how many stop requests raced.
//!
//! The socket is shared without a lock: concurrent `send_to` and `recv_from`
//! on one connectionless UDP socket is safe on the platforms tokio supports.

use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use tokio::{net::UdpSocket, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::SessionConfig,
    counters::CounterSet,
    errors::ProbeError,
    pacer::ProbePacer,
    receiver::ProbeReceiver,
    reporter::WindowReporter,
    result::SessionSummary,
    utils::{
        probe_data::{TERMINATION_SENTINEL, now_nanos},
        ui::print_summary,
    },
};

/// Who asked for the session to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// Interrupt or shutdown request on this host.
    Local,
    /// The peer sent the termination datagram.
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Running = 0,
    TerminatingLocal = 1,
    TerminatingRemote = 2,
}

/// Write-once session state. Only the first stop request moves it out of
/// [`SessionState::Running`]; every later one is a no-op.
#[derive(Debug, Default)]
pub struct TerminationGate {
    state: AtomicU8,
}

impl TerminationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call is the one that ended the session.
    pub fn terminate(&self, cause: TerminationCause) -> bool {
        let next = match cause {
            TerminationCause::Local => SessionState::TerminatingLocal,
            TerminationCause::Remote => SessionState::TerminatingRemote,
        };
        self.state
            .compare_exchange(
                SessionState::Running as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            1 => SessionState::TerminatingLocal,
            2 => SessionState::TerminatingRemote,
            _ => SessionState::Running,
        }
    }

    pub fn cause(&self) -> Option<TerminationCause> {
        match self.state() {
            SessionState::Running => None,
            SessionState::TerminatingLocal => Some(TerminationCause::Local),
            SessionState::TerminatingRemote => Some(TerminationCause::Remote),
        }
    }
}

/// How a finished session ended and what it measured.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub cause: TerminationCause,
    pub summary: SessionSummary,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    sock: Arc<UdpSocket>,
    counters: Arc<CounterSet>,
    gate: Arc<TerminationGate>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: SessionConfig, sock: UdpSocket) -> Self {
        Self {
            config,
            sock: Arc::new(sock),
            counters: Arc::new(CounterSet::new()),
            gate: Arc::new(TerminationGate::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn counters(&self) -> Arc<CounterSet> {
        self.counters.clone()
    }

    pub fn gate(&self) -> Arc<TerminationGate> {
        self.gate.clone()
    }

    /// Cancelling this token from outside counts as a local stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the session until `shutdown` resolves or the peer sends the
    /// termination datagram, then prints the lifetime summary once.
    ///
    /// On a local stop the peer is sent the termination datagram (unless
    /// disabled in the config) after the pacer has stopped, so it is the last
    /// thing the peer receives from us.
    pub async fn run<F>(self, shutdown: F) -> SessionOutcome
    where
        F: Future<Output = ()>,
    {
        info!(
            peer = %self.config.peer,
            pps = self.config.pps,
            label = %self.config.label,
            "session started"
        );

        let tasks: [JoinHandle<()>; 3] = [
            tokio::spawn(
                ProbePacer::new(
                    self.sock.clone(),
                    self.config.peer,
                    self.config.label.clone(),
                    self.config.pps,
                    self.counters.clone(),
                    self.cancel.clone(),
                )
                .run(),
            ),
            tokio::spawn(
                ProbeReceiver::new(
                    self.sock.clone(),
                    self.counters.clone(),
                    self.gate.clone(),
                    self.cancel.clone(),
                )
                .run(),
            ),
            tokio::spawn(
                WindowReporter::new(
                    self.config.report_interval,
                    self.counters.clone(),
                    self.cancel.clone(),
                )
                .run(),
            ),
        ];

        tokio::select! {
            _ = shutdown => {
                self.gate.terminate(TerminationCause::Local);
            }
            _ = self.cancel.cancelled() => {
                // cancelled from outside without a recorded cause
                self.gate.terminate(TerminationCause::Local);
            }
        }
        self.cancel.cancel();

        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session task failed");
            }
        }

        let cause = self.gate.cause().unwrap_or(TerminationCause::Local);
        if cause == TerminationCause::Local && self.config.notify_peer {
            if let Err(e) = send_termination(&self.sock, self.config.peer).await {
                warn!(error = %e, "error sending termination packet");
            }
        }

        let summary = SessionSummary::from_totals(
            &self.counters.totals(),
            elapsed_since(self.config.start_nanos),
        );
        info!(?cause, "session finished");
        print_summary(&summary);

        SessionOutcome { cause, summary }
    }
}

/// Tells the peer to end its session.
pub async fn send_termination(sock: &UdpSocket, peer: SocketAddr) -> Result<(), ProbeError> {
    sock.send_to(&TERMINATION_SENTINEL, peer)
        .await
        .map_err(ProbeError::SendFailed)?;
    Ok(())
}

fn elapsed_since(start_nanos: i64) -> Duration {
    Duration::from_nanos(now_nanos().saturating_sub(start_nanos).max(0) as u64)
}
