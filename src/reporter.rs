//! Periodic windowed report.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    counters::CounterSet,
    result::WindowResult,
    utils::ui::print_window,
};

#[derive(Debug)]
pub struct WindowReporter {
    interval: Duration,
    counters: Arc<CounterSet>,
    cancel: CancellationToken,
}

impl WindowReporter {
    pub fn new(interval: Duration, counters: Arc<CounterSet>, cancel: CancellationToken) -> Self {
        Self {
            interval,
            counters,
            cancel,
        }
    }

    /// Clears the window counters and turns them into a report.
    pub fn take_report(&self) -> WindowResult {
        let counts = self.counters.take_window();
        WindowResult::new(counts, self.counters.latency_totals(), self.interval)
    }

    /// Prints a report every interval until cancelled. A window cut short by
    /// cancellation is not reported; the final summary covers it.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.cancel.cancelled() => break,
            }
            print_window(&self.take_report());
        }
        debug!("window reporter stopped");
    }
}
