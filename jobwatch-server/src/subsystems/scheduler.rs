//! Ingestion Service: scheduled and manual ingestion runs.
//!
//! One pipeline, one gate. Scheduled ticks try the gate and skip when a run
//! is already in progress; manual triggers wait their turn. A failed run is
//! logged and reported as zero added, so callers never see a pipeline error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_ingest::{IngestionPipeline, IngestionReport, IngestionRequest};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of scheduled ticks.
#[async_trait]
pub trait IngestionTimer: Send + 'static {
    /// Wait for the next tick. `false` means the timer is finished.
    async fn tick(&mut self) -> bool;
}

/// Fixed-period timer; the first tick fires immediately when `run_on_start`.
pub struct IntervalTimer {
    interval: Interval,
}

impl IntervalTimer {
    pub fn new(period: Duration, run_on_start: bool) -> Self {
        let start = if run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn every_minutes(minutes: u64, run_on_start: bool) -> Self {
        Self::new(Duration::from_secs(minutes.max(1) * 60), run_on_start)
    }
}

#[async_trait]
impl IngestionTimer for IntervalTimer {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Timer driven by a channel: every message is one tick.
pub struct ChannelTimer {
    rx: mpsc::Receiver<()>,
}

impl ChannelTimer {
    pub fn channel() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(8);
        (tx, Self { rx })
    }
}

#[async_trait]
impl IngestionTimer for ChannelTimer {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

pub struct IngestionService {
    pipeline: Arc<IngestionPipeline>,
    defaults: IngestionRequest,
    gate: Mutex<()>,
    shutdown: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IngestionService {
    pub fn new(pipeline: Arc<IngestionPipeline>, defaults: IngestionRequest) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            pipeline,
            defaults,
            gate: Mutex::new(()),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Request used by scheduled runs.
    pub fn defaults(&self) -> &IngestionRequest {
        &self.defaults
    }

    pub fn pipeline(&self) -> &Arc<IngestionPipeline> {
        &self.pipeline
    }

    /// True while a run holds the gate.
    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Spawn the scheduling loop. A second call is ignored.
    pub async fn start<T: IngestionTimer>(self: &Arc<Self>, mut timer: T) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            tracing::warn!("Ingestion scheduler already started");
            return;
        }

        let service = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();

        *task = Some(tokio::spawn(async move {
            tracing::info!("Ingestion scheduler started");
            loop {
                tokio::select! {
                    more = timer.tick() => {
                        if !more {
                            tracing::info!("Ingestion timer finished");
                            break;
                        }
                        tokio::select! {
                            _ = service.run_scheduled() => {}
                            _ = shutdown.recv() => {
                                tracing::info!("Scheduled ingestion run cancelled by shutdown");
                                break;
                            }
                        }
                    }
                    _ = shutdown.recv() => {
                        break;
                    }
                }
            }
            tracing::info!("Ingestion scheduler stopped");
        }));
    }

    /// Stop the scheduling loop and wait for it to exit.
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = self.shutdown.send(());
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Ingestion scheduler task failed");
            }
        }
    }

    /// Scheduled run over the default request. `None` when skipped because
    /// another run holds the gate.
    pub async fn run_scheduled(&self) -> Option<IngestionReport> {
        let _guard = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::info!("Ingestion already in progress, skipping scheduled run");
                return None;
            }
        };
        tracing::info!("Starting scheduled ingestion");
        Some(self.execute(&self.defaults).await)
    }

    /// Manual run; waits for any run in progress to finish first.
    pub async fn trigger(&self, request: IngestionRequest) -> IngestionReport {
        let _guard = self.gate.lock().await;
        tracing::info!(terms = ?request.search_terms, "Starting manual ingestion");
        self.execute(&request).await
    }

    /// Manual run on the runtime; returns without waiting for it.
    pub fn spawn_trigger(self: &Arc<Self>, request: IngestionRequest) -> JoinHandle<IngestionReport> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.trigger(request).await })
    }

    async fn execute(&self, request: &IngestionRequest) -> IngestionReport {
        match self.pipeline.run(request).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Ingestion run failed, nothing committed");
                IngestionReport::empty()
            }
        }
    }
}
