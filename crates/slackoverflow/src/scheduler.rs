//! Periodic cycle runner.
//!
//! Cycles are awaited inline, so at most one is ever in flight. A tick that
//! fires while a cycle is still running is skipped.

use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::{CycleReport, Engine};
use crate::error::SyncError;

/// Counters of a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub cycles: u64,
    pub timed_out: u64,
    /// Cycles that finished with at least one error.
    pub with_errors: u64,
}

pub struct Scheduler {
    interval: Duration,
    cycle_timeout: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(interval: Duration, cycle_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            cycle_timeout,
            cancel,
        }
    }

    /// One cycle under the watchdog.
    pub async fn run_once(&self, engine: &mut Engine) -> Result<CycleReport, SyncError> {
        timeout(self.cycle_timeout, engine.run_cycle())
            .await
            .map_err(|_| SyncError::Timeout(self.cycle_timeout))
    }

    /// Run cycles every `interval` until cancelled. The first cycle starts
    /// immediately; `on_cycle` sees every outcome.
    pub async fn run<F>(&self, engine: &mut Engine, mut on_cycle: F) -> ScheduleSummary
    where
        F: FnMut(&Result<CycleReport, SyncError>),
    {
        let mut summary = ScheduleSummary::default();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.cycle_timeout.as_secs(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let result = self.run_once(engine).await;
            summary.cycles += 1;
            match &result {
                Ok(report) if !report.is_clean() => summary.with_errors += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Sync cycle failed");
                    summary.timed_out += 1;
                }
            }
            on_cycle(&result);

            if self.cancel.is_cancelled() {
                break;
            }
        }

        info!(cycles = summary.cycles, "Scheduler stopped");
        summary
    }
}
