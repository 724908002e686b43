//! Explicit per-pass ticker loops.
//!
//! Every background pass runs in its own tokio task: interval passes tick on
//! a fixed period, cron passes sleep until the next fire time. One loop runs
//! one pass body at a time, so invocations of the same pass never overlap;
//! different passes only share the store. Each body runs under a timeout, and
//! progress already committed when the timeout hits simply stands until the
//! next invocation re-selects.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// When a pass runs.
#[derive(Debug, Clone)]
pub enum Cadence {
    /// Fixed period between run starts.
    Every(Duration),
    /// Cron-driven fire times (seconds-resolution expressions).
    Cron(Box<Schedule>),
}

impl Cadence {
    pub fn cron(expression: &str) -> Result<Self, cron::error::Error> {
        Ok(Self::Cron(Box::new(Schedule::from_str(expression)?)))
    }
}

/// Handle to a spawned pass loop.
pub struct PassHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PassHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop the loop and wait for the task to unwind.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
        info!(
            target: "application::jobs::scheduler",
            pass = self.name,
            "pass stopped"
        );
    }
}

/// Spawn the ticker loop for one pass.
pub fn spawn_pass<F, Fut, E>(
    name: &'static str,
    cadence: Cadence,
    pass_timeout: Duration,
    mut run: F,
) -> PassHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let handle = tokio::spawn(async move {
        info!(target: "application::jobs::scheduler", pass = name, "pass scheduled");

        match cadence {
            Cadence::Every(period) => {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // Consume the immediate first tick; the first real run waits
                // a full period.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    run_guarded(name, pass_timeout, &mut run).await;
                }
            }
            Cadence::Cron(schedule) => loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    warn!(
                        target: "application::jobs::scheduler",
                        pass = name,
                        "cron schedule has no future fire times; stopping pass"
                    );
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                run_guarded(name, pass_timeout, &mut run).await;
            },
        }
    });

    PassHandle { name, handle }
}

async fn run_guarded<F, Fut, E>(name: &'static str, pass_timeout: Duration, run: &mut F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();

    match tokio::time::timeout(pass_timeout, run()).await {
        Ok(Ok(())) => debug!(
            target: "application::jobs::scheduler",
            pass = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pass completed"
        ),
        Ok(Err(err)) => {
            metrics::counter!("ritaglio_pass_failed_total", "pass" => name).increment(1);
            error!(
                target: "application::jobs::scheduler",
                pass = name,
                error = %err,
                "pass failed; next run re-selects from scratch"
            );
        }
        Err(_) => {
            metrics::counter!("ritaglio_pass_timeout_total", "pass" => name).increment(1);
            warn!(
                target: "application::jobs::scheduler",
                pass = name,
                timeout_ms = pass_timeout.as_millis() as u64,
                "pass timed out; committed progress stands"
            );
        }
    }

    metrics::histogram!("ritaglio_pass_duration_ms", "pass" => name)
        .record(started.elapsed().as_millis() as f64);
}
