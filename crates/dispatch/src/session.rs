//! One request's pass over the bridge, as an RAII type used on the worker
//! thread.
//!
//! Lifecycle ordering is the dispatcher's responsibility: `begin` installs
//! the context and every callback slot before script execution; during
//! and after execution the session exposes the poll-side state; dropping the
//! session tears the context down. The drop must happen only after the
//! script has stopped producing calls into the bridge on this thread.

use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::channels::{ChunkChannel, DeadlineHandle, FinishChannel, FinishedResponse, HintsChannel};
use crate::metrics;
use crate::wiring;

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub heartbeat_max_secs: u64,
    pub heartbeat_budget_secs: u64,
    pub stream_start_enabled: bool,
    pub initial_deadline: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        let defaults = wiring::defaults();
        Self {
            heartbeat_max_secs: defaults.heartbeat_max_secs,
            heartbeat_budget_secs: defaults.heartbeat_budget_secs,
            stream_start_enabled: defaults.stream_start_enabled,
            initial_deadline: Duration::from_secs(30),
        }
    }
}

/// Snapshot read back after execution when the script used `mark_finished`
/// or `trigger_finish`.
#[derive(Debug, Clone, Copy)]
pub struct FinishInfo {
    /// Byte offset in script output where the response ends
    pub output_offset: usize,
    /// Number of headers set before finish
    pub header_count: i32,
    pub status: u16,
}

pub struct RequestSession {
    request_id: u64,
    worker_id: u64,
    deadline: DeadlineHandle,
    /// Chunks pushed while streaming was enabled
    pub chunks: mpsc::UnboundedReceiver<Bytes>,
    /// At most one detached response, pushed by `trigger_finish`
    pub finished: mpsc::UnboundedReceiver<FinishedResponse>,
    /// Early Hints header batches, pushed before the response exists
    pub hints: mpsc::UnboundedReceiver<Vec<String>>,
}

impl RequestSession {
    /// Begin a session with process-wide defaults.
    pub fn begin(request_id: u64, worker_id: u64) -> Self {
        Self::begin_with(request_id, worker_id, SessionOptions::default())
    }

    /// Initialize the thread's bridge context and install every callback
    /// slot. Must run on the worker thread, before script execution.
    pub fn begin_with(request_id: u64, worker_id: u64, options: SessionOptions) -> Self {
        metrics::metrics().requests.fetch_add(1, Ordering::Relaxed);
        bridge::init(request_id, worker_id);

        let (finish, finished) = FinishChannel::new();
        bridge::set_finish_callback(finish.callback());

        let (hint, hints) = HintsChannel::new();
        bridge::set_hints_callback(hint.callback());

        let (chunk, chunks) = ChunkChannel::new();
        if options.stream_start_enabled {
            bridge::enable_stream(chunk.callback());
        } else {
            bridge::arm_stream(chunk.callback());
        }

        let deadline = DeadlineHandle::new(options.initial_deadline, options.heartbeat_budget_secs);
        bridge::configure_heartbeat(deadline.callback(), options.heartbeat_max_secs);

        tracing::trace!(request_id, worker_id, "bridge session started");
        Self {
            request_id,
            worker_id,
            deadline,
            chunks,
            finished,
            hints,
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn deadline(&self) -> &DeadlineHandle {
        &self.deadline
    }

    /// Finish snapshot, if the script finished early. Read on the worker
    /// thread after execution; `None` means the response follows the normal
    /// path.
    pub fn finish_info(&self) -> Option<FinishInfo> {
        if !bridge::is_finished() {
            return None;
        }
        Some(FinishInfo {
            output_offset: bridge::finished_offset(),
            header_count: bridge::finished_header_count(),
            status: u16::try_from(bridge::finished_response_code()).unwrap_or(500),
        })
    }

    /// Headers captured in the ledger, in emission order.
    pub fn response_headers(&self) -> Vec<(String, String)> {
        bridge::headers_snapshot()
    }
}

impl Drop for RequestSession {
    fn drop(&mut self) {
        bridge::destroy();
        tracing::trace!(request_id = self.request_id, "bridge session ended");
    }
}
