//! Buffered telemetry with at-least-once delivery.
//!
//! Events are flushed when the buffer reaches the batch size or when the
//! periodic timer fires. A batch the sink rejects goes back to the front of
//! the buffer and is retried on the next flush.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chronos_core::rng::fresh_id;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub trace_id: String,
    pub payload: Value,
}

impl TelemetryEvent {
    pub fn new<R: Rng + ?Sized>(severity: Severity, payload: Value, rng: &mut R) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            trace_id: fresh_id(rng),
            payload,
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry sink rejected a batch of {size}: {reason}")]
    Rejected { size: usize, reason: String },
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn send(&self, batch: &[TelemetryEvent]) -> Result<(), TelemetryError>;
}

/// Writes each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl TelemetrySink for TracingSink {
    async fn send(&self, batch: &[TelemetryEvent]) -> Result<(), TelemetryError> {
        for event in batch {
            info!(
                target: "chronos_session.telemetry",
                ts = %event.timestamp.to_rfc3339(),
                severity = ?event.severity,
                trace_id = %event.trace_id,
                payload = %event.payload,
                "telemetry event"
            );
        }
        Ok(())
    }
}

struct Shared {
    buffer: Mutex<VecDeque<TelemetryEvent>>,
    sink: Arc<dyn TelemetrySink>,
    batch_size: usize,
}

impl Shared {
    async fn record(&self, event: TelemetryEvent) {
        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push_back(event);
            buffer.len() >= self.batch_size
        };
        if full {
            if let Err(err) = self.flush().await {
                warn!(target: "chronos_session.telemetry", %err, "size-triggered flush failed");
            }
        }
    }

    async fn flush(&self) -> Result<usize, TelemetryError> {
        let batch: Vec<TelemetryEvent> = self.buffer.lock().await.drain(..).collect();
        if batch.is_empty() {
            return Ok(0);
        }
        match self.sink.send(&batch).await {
            Ok(()) => {
                debug!(target: "chronos_session.telemetry", size = batch.len(), "batch flushed");
                Ok(batch.len())
            }
            Err(err) => {
                let mut buffer = self.buffer.lock().await;
                for event in batch.into_iter().rev() {
                    buffer.push_front(event);
                }
                Err(err)
            }
        }
    }
}

/// Cloneable recording side of a [`TelemetryBatcher`].
#[derive(Clone)]
pub struct TelemetryHandle {
    shared: Arc<Shared>,
}

impl TelemetryHandle {
    pub async fn record(&self, event: TelemetryEvent) {
        self.shared.record(event).await;
    }

    pub async fn pending(&self) -> usize {
        self.shared.buffer.lock().await.len()
    }
}

pub struct TelemetryBatcher {
    shared: Arc<Shared>,
    flush_interval: Duration,
    shutdown: Arc<Notify>,
    timer: Option<JoinHandle<()>>,
    stopped: bool,
}

impl TelemetryBatcher {
    pub fn new(sink: Arc<dyn TelemetrySink>, batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                buffer: Mutex::new(VecDeque::new()),
                sink,
                batch_size: batch_size.max(1),
            }),
            flush_interval,
            shutdown: Arc::new(Notify::new()),
            timer: None,
            stopped: false,
        }
    }

    pub fn from_config(config: &TelemetryConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        Self::new(sink, config.batch_size(), config.flush_interval())
    }

    pub fn handle(&self) -> TelemetryHandle {
        TelemetryHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Spawns the flush timer on the current tokio runtime. Starting a
    /// running batcher does nothing.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            return;
        }
        self.stopped = false;
        let shared = Arc::clone(&self.shared);
        let shutdown = Arc::clone(&self.shutdown);
        let period = self.flush_interval;
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = shared.flush().await {
                            warn!(target: "chronos_session.telemetry", %err, "timed flush failed; batch requeued");
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }
        }));
        debug!(target: "chronos_session.telemetry", ?period, "telemetry timer started");
    }

    /// Cancels the timer, tries one last flush and drops whatever is still
    /// unsent. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(timer) = self.timer.take() {
            self.shutdown.notify_one();
            if let Err(err) = timer.await {
                warn!(target: "chronos_session.telemetry", %err, "telemetry timer ended abnormally");
            }
        }
        if let Err(err) = self.shared.flush().await {
            warn!(target: "chronos_session.telemetry", %err, "final flush failed");
        }
        let dropped = {
            let mut buffer = self.shared.buffer.lock().await;
            let dropped = buffer.len();
            buffer.clear();
            dropped
        };
        info!(target: "chronos_session.telemetry", dropped, "telemetry stopped");
    }

    pub async fn record(&self, event: TelemetryEvent) {
        self.shared.record(event).await;
    }

    pub async fn flush(&self) -> Result<usize, TelemetryError> {
        self.shared.flush().await
    }

    pub async fn pending(&self) -> usize {
        self.shared.buffer.lock().await.len()
    }
}
