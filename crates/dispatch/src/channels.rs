//! Channel adapters that turn bridge callbacks into tokio channel traffic.
//!
//! The bridge invokes callbacks synchronously on the worker thread; these
//! adapters capture unbounded senders so the async side can consume chunks
//! and finished responses without the worker ever blocking on a receiver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bridge::{FinishCallback, HeartbeatCallback, HintsCallback, StreamCallback};
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::metrics;

/// A response detached from script execution via finish-early.
#[derive(Debug, Clone)]
pub struct FinishedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Parse the bridge's finish wire format back into header pairs.
///
/// The blob is consecutive NUL-terminated name/value byte strings in
/// insertion order; an empty name terminates the sequence (the ledger never
/// stores one). Non-UTF-8 bytes are replaced rather than dropped.
pub fn parse_header_blob(blob: &[u8]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    let mut fields = blob.split(|byte| *byte == 0);
    while let Some(name) = fields.next() {
        if name.is_empty() {
            break;
        }
        let value = fields.next().unwrap_or(b"");
        headers.push((
            String::from_utf8_lossy(name).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        ));
    }
    headers
}

/// Stream-chunk side of the bridge: wraps an unbounded sender and hands the
/// bridge a callback that forwards every chunk.
pub struct ChunkChannel {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChunkChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Callback for `bridge::enable_stream` / `bridge::arm_stream`.
    pub fn callback(&self) -> StreamCallback {
        let tx = self.tx.clone();
        Box::new(move |bytes| {
            metrics::metrics().chunks_sent.fetch_add(1, Ordering::Relaxed);
            if tx.send(Bytes::copy_from_slice(bytes)).is_err() {
                tracing::debug!("stream consumer dropped; chunk discarded");
            }
        })
    }
}

/// Early Hints side of the bridge: each batch of 103 header lines is
/// forwarded to the async side, which turns it into an informational
/// response on the wire.
pub struct HintsChannel {
    tx: mpsc::UnboundedSender<Vec<String>>,
}

impl HintsChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Callback for `bridge::set_hints_callback`.
    pub fn callback(&self) -> HintsCallback {
        let tx = self.tx.clone();
        Box::new(move |headers| {
            metrics::metrics()
                .early_hints
                .fetch_add(1, Ordering::Relaxed);
            if tx.send(headers.to_vec()).is_err() {
                tracing::debug!("hints consumer dropped; batch discarded");
            }
        })
    }
}

/// Finish-early side of the bridge: the callback decodes the payload into a
/// `FinishedResponse` and pushes it to the async consumer.
pub struct FinishChannel {
    tx: mpsc::UnboundedSender<FinishedResponse>,
}

impl FinishChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FinishedResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Callback for `bridge::set_finish_callback`.
    pub fn callback(&self) -> FinishCallback {
        let tx = self.tx.clone();
        Box::new(move |payload| {
            metrics::metrics()
                .finished_early
                .fetch_add(1, Ordering::Relaxed);
            let response = FinishedResponse {
                status: u16::try_from(payload.status).unwrap_or(500),
                headers: parse_header_blob(payload.header_blob),
                body: Bytes::copy_from_slice(payload.body),
            };
            if tx.send(response).is_err() {
                tracing::debug!("finish consumer dropped; response discarded");
            }
        })
    }
}

/// Shared request deadline, owned by the dispatcher and pushed out by
/// heartbeats. Tracks the cumulative extension budget the bridge itself
/// deliberately does not enforce.
#[derive(Clone)]
pub struct DeadlineHandle {
    deadline_ms: Arc<AtomicU64>,
    extended_secs: Arc<AtomicU64>,
    /// Total seconds of extension allowed across the request (0 = unlimited)
    budget_secs: u64,
}

impl DeadlineHandle {
    pub fn new(initial: Duration, budget_secs: u64) -> Self {
        Self {
            deadline_ms: Arc::new(AtomicU64::new(now_unix_ms() + initial.as_millis() as u64)),
            extended_secs: Arc::new(AtomicU64::new(0)),
            budget_secs,
        }
    }

    /// Absolute deadline as unix milliseconds.
    pub fn deadline_unix_ms(&self) -> u64 {
        self.deadline_ms.load(Ordering::Acquire)
    }

    /// Time left before the deadline; zero once passed.
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.deadline_unix_ms().saturating_sub(now_unix_ms()))
    }

    /// Seconds granted so far across all heartbeats.
    pub fn extended_secs(&self) -> u64 {
        self.extended_secs.load(Ordering::Acquire)
    }

    /// Push the deadline out by `secs`, subject to the cumulative budget.
    pub fn extend(&self, secs: u64) -> bool {
        if self.budget_secs > 0 {
            let granted = self.extended_secs.load(Ordering::Acquire);
            if granted.saturating_add(secs) > self.budget_secs {
                return false;
            }
        }
        self.extended_secs.fetch_add(secs, Ordering::AcqRel);
        self.deadline_ms
            .fetch_add(secs.saturating_mul(1000), Ordering::AcqRel);
        true
    }

    /// Callback for `bridge::configure_heartbeat`.
    pub fn callback(&self) -> HeartbeatCallback {
        let handle = self.clone();
        Box::new(move |secs| {
            let accepted = handle.extend(secs);
            let counters = metrics::metrics();
            if accepted {
                counters.heartbeats_accepted.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.heartbeats_rejected.fetch_add(1, Ordering::Relaxed);
            }
            accepted
        })
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_header_blob_round_trips_ledger_format() {
        let blob = b"Content-Type\x00text/event-stream\x00Cache-Control\x00no-cache\x00";
        let headers = parse_header_blob(blob);
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "text/event-stream".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
            ]
        );
    }

    #[test]
    fn parse_header_blob_handles_empty_and_truncated_input() {
        assert!(parse_header_blob(b"").is_empty());
        // Name without a value still parses, value defaults empty
        assert_eq!(
            parse_header_blob(b"X-A"),
            vec![("X-A".to_string(), String::new())]
        );
    }

    #[test]
    fn chunk_callback_forwards_bytes() {
        let (channel, mut rx) = ChunkChannel::new();
        let mut callback = channel.callback();
        callback(b"data: tick\n\n");
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"data: tick\n\n"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn chunk_callback_survives_dropped_receiver() {
        let (channel, rx) = ChunkChannel::new();
        drop(rx);
        let mut callback = channel.callback();
        callback(b"nobody listening");
    }

    #[test]
    fn hints_callback_forwards_batches() {
        let (channel, mut rx) = HintsChannel::new();
        let mut callback = channel.callback();
        let batch = vec![
            "Link: </style.css>; rel=preload; as=style".to_string(),
            "Link: </app.js>; rel=preload; as=script".to_string(),
        ];
        callback(&batch);
        assert_eq!(rx.try_recv().unwrap(), batch);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn finish_callback_decodes_payload() {
        let (channel, mut rx) = FinishChannel::new();
        let mut callback = channel.callback();
        callback(bridge::FinishPayload {
            body: b"done",
            header_blob: b"X-A\x001\x00",
            header_count: 1,
            status: 201,
        });
        let response = rx.try_recv().unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.headers, vec![("X-A".to_string(), "1".to_string())]);
        assert_eq!(response.body, Bytes::from_static(b"done"));
    }

    #[test]
    fn deadline_extends_within_budget() {
        let deadline = DeadlineHandle::new(Duration::from_secs(30), 60);
        let before = deadline.deadline_unix_ms();
        assert!(deadline.extend(40));
        assert_eq!(deadline.deadline_unix_ms(), before + 40_000);
        assert!(!deadline.extend(30));
        assert_eq!(deadline.extended_secs(), 40);
        assert!(deadline.extend(20));
        assert_eq!(deadline.extended_secs(), 60);
    }

    #[test]
    fn extend_with_huge_values_does_not_overflow() {
        let deadline = DeadlineHandle::new(Duration::from_secs(1), 0);
        assert!(deadline.extend(u64::MAX / 2));
    }

    #[test]
    fn zero_budget_is_unlimited() {
        let deadline = DeadlineHandle::new(Duration::from_secs(1), 0);
        assert!(deadline.extend(10_000));
    }
}
