//! Early Hints (HTTP 103): push preliminary headers to the client before
//! the response exists.
//!
//! The script hands over fully formed header lines (e.g.
//! `Link: </style.css>; rel=preload`); the bridge forwards them through the
//! dispatcher's callback without parsing them. Hints only make sense while
//! the response is still open, so sends are refused once the context has
//! finished.

use crate::callbacks::HintsCallback;
use crate::context;

/// Install the early-hints callback on the current thread's context.
///
/// Called by the dispatcher before script execution. Returns false with no
/// live context.
pub fn set_hints_callback(callback: HintsCallback) -> bool {
    context::with_mut(|ctx| {
        ctx.hints_callback = Some(callback);
    })
    .is_some()
}

/// Forward a batch of early-hint header lines, synchronously.
///
/// Returns false when `headers` is empty, no callback is configured, the
/// response has already finished, another callback is in flight, or no
/// context is live.
pub fn send_early_hints(headers: &[String]) -> bool {
    if headers.is_empty() {
        return false;
    }
    let taken = context::with_mut(|ctx| {
        if ctx.finished || ctx.callback_in_flight {
            return None;
        }
        let callback = ctx.hints_callback.take()?;
        ctx.callback_in_flight = true;
        Some(callback)
    });
    let Some(Some(mut callback)) = taken else {
        return false;
    };

    tracing::debug!(count = headers.len(), "early hints sent");
    callback(headers);

    context::with_mut(|ctx| {
        ctx.callback_in_flight = false;
        if ctx.hints_callback.is_none() {
            ctx.hints_callback = Some(callback);
        }
    });
    true
}
