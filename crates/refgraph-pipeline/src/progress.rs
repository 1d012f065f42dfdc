//! Progress reporting for pipeline runs.
//!
//! A [`ProgressSink`] receives `(fraction, message)` pairs as a run moves
//! through its phases. Implementations must swallow their own failures and
//! must not block the pipeline; delivery is best-effort.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// `fraction` is in [0, 1] and non-decreasing within one run.
    async fn report(&self, fraction: f64, message: &str);
}

/// Discards all reports.
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn report(&self, _fraction: f64, _message: &str) {}
}

/// Progress event emitted during a pipeline run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub message: String,
}

/// Fans reports out over a broadcast channel; lagging or absent receivers
/// are ignored.
pub struct BroadcastProgress {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<ProgressEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl ProgressSink for BroadcastProgress {
    async fn report(&self, fraction: f64, message: &str) {
        let _ = self.tx.send(ProgressEvent {
            fraction,
            message: message.to_string(),
        });
    }
}

/// Remaps an inner sink's [0, 1] range into a sub-range of the outer run.
///
/// The expansion phase hands the miner a `SubrangeProgress` so the miner can
/// report its own 0..1 fraction without knowing the pipeline's layout.
pub struct SubrangeProgress<'a> {
    inner: &'a dyn ProgressSink,
    start: f64,
    span: f64,
}

impl<'a> SubrangeProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink, start: f64, span: f64) -> Self {
        Self { inner, start, span }
    }
}

#[async_trait]
impl ProgressSink for SubrangeProgress<'_> {
    async fn report(&self, fraction: f64, message: &str) {
        let mapped = self.start + self.span * fraction.clamp(0.0, 1.0);
        self.inner.report(mapped, message).await;
    }
}
