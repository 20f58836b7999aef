use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for bridge activity.
#[derive(Default)]
pub struct BridgeMetrics {
    pub requests: AtomicU64,
    pub finished_early: AtomicU64,
    pub chunks_sent: AtomicU64,
    pub early_hints: AtomicU64,
    pub heartbeats_accepted: AtomicU64,
    pub heartbeats_rejected: AtomicU64,
}

impl BridgeMetrics {
    /// Get metrics as a JSON-serializable snapshot
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": self.requests.load(Ordering::Relaxed),
            "finished_early": self.finished_early.load(Ordering::Relaxed),
            "chunks_sent": self.chunks_sent.load(Ordering::Relaxed),
            "early_hints": self.early_hints.load(Ordering::Relaxed),
            "heartbeats_accepted": self.heartbeats_accepted.load(Ordering::Relaxed),
            "heartbeats_rejected": self.heartbeats_rejected.load(Ordering::Relaxed),
        })
    }
}

static METRICS: OnceLock<BridgeMetrics> = OnceLock::new();

pub fn metrics() -> &'static BridgeMetrics {
    METRICS.get_or_init(BridgeMetrics::default)
}
