//! Finish-early protocol: detach the response from continued script
//! execution.
//!
//! `finished` is a one-way flag for the life of a context. The first finish
//! operation wins; every later one is a no-op that reports failure, so a
//! script never needs to track its own "already finished" state. The flag is
//! set *before* the finish callback runs, so a callback that re-enters
//! finish queries observes the terminal state and double delivery is
//! impossible.

use crate::callbacks::{FinishCallback, FinishPayload};
use crate::context;

/// Record the finish snapshot without invoking any callback.
///
/// Used when the dispatcher polls finish state after execution instead of
/// being pushed. Returns false (leaving all state untouched) if already
/// finished or no context is live.
pub fn mark_finished(offset: usize, header_count: i32, status: i32) -> bool {
    context::with_mut(|ctx| {
        if ctx.finished {
            return false;
        }
        ctx.finished = true;
        ctx.finished_offset = offset;
        ctx.finished_header_count = header_count;
        ctx.response_code = status;
        true
    })
    .unwrap_or(false)
}

enum Trigger {
    Refused,
    NoCallback,
    Invoke(FinishCallback),
}

/// Record the finish snapshot and push the captured response through the
/// registered finish callback, synchronously, before returning.
///
/// `header_blob` is the ledger's wire format: consecutive NUL-terminated
/// name/value byte strings in insertion order (see `headers::header_blob`).
///
/// Returns false if already finished, no context is live, no callback is
/// registered, or another callback is in flight on this context. The state
/// transition still happens on the no-callback path; only the delivery is
/// skipped.
pub fn trigger_finish(body: &[u8], header_blob: &[u8], header_count: i32, status: i32) -> bool {
    let trigger = context::with_mut(|ctx| {
        if ctx.finished || ctx.callback_in_flight {
            return Trigger::Refused;
        }
        ctx.finished = true;
        ctx.finished_offset = body.len();
        ctx.finished_header_count = header_count;
        ctx.response_code = status;
        match ctx.finish_callback.take() {
            Some(callback) => {
                ctx.callback_in_flight = true;
                Trigger::Invoke(callback)
            }
            None => Trigger::NoCallback,
        }
    });

    let mut callback = match trigger {
        Some(Trigger::Invoke(callback)) => callback,
        Some(Trigger::NoCallback) => {
            tracing::debug!("finish triggered with no callback registered");
            return false;
        }
        Some(Trigger::Refused) | None => return false,
    };

    tracing::debug!(
        body_len = body.len(),
        header_count,
        status,
        "finish triggered"
    );
    callback(FinishPayload {
        body,
        header_blob,
        header_count,
        status,
    });
    // Finish is one-shot: the callback is dropped rather than reinstalled, so
    // captured dispatcher resources (channel senders) are released here.
    context::with_mut(|ctx| ctx.callback_in_flight = false);
    true
}

/// Whether the current context has finished. False with no live context.
pub fn is_finished() -> bool {
    context::with(|ctx| ctx.finished).unwrap_or(false)
}

/// Output byte offset captured at finish time; 0 with no live context.
pub fn finished_offset() -> usize {
    context::with(|ctx| ctx.finished_offset).unwrap_or(0)
}

/// Header count captured at finish time; 0 with no live context.
pub fn finished_header_count() -> i32 {
    context::with(|ctx| ctx.finished_header_count).unwrap_or(0)
}

/// Response code captured at finish time; 200 with no live context.
pub fn finished_response_code() -> i32 {
    context::with(|ctx| ctx.response_code).unwrap_or(200)
}
