// --- File: crates/geotrack_tracking/src/scheduler.rs ---
//! Timer loops for the background jobs.
//!
//! A job is driven by a [`Ticker`]. Production uses [`IntervalTicker`]; tests
//! drive jobs tick by tick through [`ManualTicker`] and end the loop by
//! dropping its [`TickHandle`].

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::TrackingError;

/// Source of tick signals. `tick` resolves to `false` once no further ticks
/// will come, which ends the job loop.
pub trait Ticker {
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fires every `period`, starting immediately. Ticks missed while a tick was
/// still running are skipped, not bunched.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn from_secs(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks on demand.
#[derive(Debug)]
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Sender side of a [`ManualTicker`].
#[derive(Debug, Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }

    /// A ticker that fires `count` times and is then exhausted.
    pub fn times(count: usize) -> Self {
        let (ticker, handle) = Self::new();
        for _ in 0..count {
            handle.tick();
        }
        ticker
    }
}

impl TickHandle {
    /// Queues one tick. Returns `false` if the ticker is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// A unit of periodic work.
pub trait BackgroundJob {
    /// Summary of one tick, logged by the run loop.
    type Report: Debug + Send;

    fn name(&self) -> &'static str;

    fn tick(&self) -> impl Future<Output = Result<Self::Report, TrackingError>> + Send;
}

/// Runs `job` on every tick until the ticker is exhausted.
///
/// A failed tick is logged and the loop continues with the next one.
/// Returns the number of ticks executed.
pub async fn run_job<J, T>(job: &J, mut ticker: T) -> usize
where
    J: BackgroundJob + Sync,
    T: Ticker + Send,
{
    info!(job = job.name(), "Background job started");
    let mut ticks = 0usize;

    while ticker.tick().await {
        ticks += 1;
        match job.tick().await {
            Ok(report) => debug!(job = job.name(), ?report, "Tick completed"),
            Err(e) => error!(job = job.name(), error = %e, "Tick failed"),
        }
    }

    info!(job = job.name(), ticks, "Background job stopped");
    ticks
}

/// Spawns [`run_job`] on the current runtime.
pub fn spawn_job<J, T>(job: Arc<J>, ticker: T) -> JoinHandle<usize>
where
    J: BackgroundJob + Send + Sync + 'static,
    T: Ticker + Send + 'static,
{
    tokio::spawn(async move { run_job(job.as_ref(), ticker).await })
}
