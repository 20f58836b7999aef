//! Per-worker-thread request context and its thread-local store.
//!
//! Exactly one context is live per worker thread at a time. Both sides of the
//! dispatcher/engine boundary link this crate, so both resolve to the same
//! thread-local slot; there is one owner of the context's memory and no
//! second copy to drift out of sync. All operations that need a context treat
//! "no live context" as a benign false/zero/no-op.

use std::cell::RefCell;

use crate::callbacks::{FinishCallback, HeartbeatCallback, HintsCallback, StreamCallback};
use crate::config;
use crate::headers::HeaderLedger;

pub(crate) struct RequestContext {
    pub(crate) request_id: u64,
    pub(crate) worker_id: u64,
    pub(crate) response_code: i32,

    // Finish-early snapshot
    pub(crate) finished: bool,
    pub(crate) finished_offset: usize,
    pub(crate) finished_header_count: i32,
    pub(crate) finish_callback: Option<FinishCallback>,

    pub(crate) headers: HeaderLedger,

    // Early Hints (HTTP 103)
    pub(crate) hints_callback: Option<HintsCallback>,

    // Heartbeat
    pub(crate) heartbeat_max_secs: u64,
    pub(crate) heartbeat_callback: Option<HeartbeatCallback>,

    // Streaming
    pub(crate) streaming: bool,
    pub(crate) stream_offset: usize,
    pub(crate) stream_callback: Option<StreamCallback>,

    // Set for the duration of any callback invocation; re-entrant invoking
    // operations observe it and fail closed.
    pub(crate) callback_in_flight: bool,
}

impl RequestContext {
    fn new(request_id: u64, worker_id: u64, config: config::BridgeConfig) -> Self {
        Self {
            request_id,
            worker_id,
            response_code: 200,
            finished: false,
            finished_offset: 0,
            finished_header_count: 0,
            finish_callback: None,
            headers: HeaderLedger::with_capacity(config.max_headers),
            hints_callback: None,
            heartbeat_max_secs: config.heartbeat_max_secs,
            heartbeat_callback: None,
            streaming: false,
            stream_offset: 0,
            stream_callback: None,
            callback_in_flight: false,
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Initialize a fresh context for the calling thread.
///
/// Any stale context from a previous request is torn down first; the new
/// context starts with `response_code = 200`, an empty header ledger and no
/// callbacks. Called by the dispatcher before script execution starts.
pub fn init(request_id: u64, worker_id: u64) {
    let config = config::get();
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            tracing::trace!(request_id, worker_id, "replacing stale bridge context");
        }
        *slot = Some(RequestContext::new(request_id, worker_id, config));
    });
}

/// Destroy the calling thread's context, dropping owned headers and
/// callbacks. Idempotent; safe with no context live.
pub fn destroy() {
    CURRENT.with(|slot| {
        if let Some(ctx) = slot.borrow_mut().take() {
            tracing::trace!(request_id = ctx.request_id, "bridge context destroyed");
        }
    });
}

/// Whether a context is live for the calling thread.
pub fn is_active() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Request id of the live context, if any.
pub fn request_id() -> Option<u64> {
    with(|ctx| ctx.request_id)
}

/// Worker id of the live context, if any.
pub fn worker_id() -> Option<u64> {
    with(|ctx| ctx.worker_id)
}

/// Current response code; 200 with no live context.
pub fn response_code() -> i32 {
    with(|ctx| ctx.response_code).unwrap_or(200)
}

/// Set the response code. Returns false with no live context.
pub fn set_response_code(code: i32) -> bool {
    with_mut(|ctx| ctx.response_code = code).is_some()
}

pub(crate) fn with<R>(f: impl FnOnce(&RequestContext) -> R) -> Option<R> {
    CURRENT.with(|slot| slot.borrow().as_ref().map(f))
}

/// Run `f` against the live context. The borrow is held for the duration of
/// `f`, so `f` must never invoke a stored callback directly; invoking
/// operations take the callback out of its slot, release the borrow, call it,
/// then reinstall (see finish/stream/heartbeat modules).
pub(crate) fn with_mut<R>(f: impl FnOnce(&mut RequestContext) -> R) -> Option<R> {
    CURRENT.with(|slot| slot.borrow_mut().as_mut().map(f))
}
