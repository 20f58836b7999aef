//! Callback slots installed by the dispatcher before script execution.
//!
//! Each slot holds an owned closure that captures whatever dispatcher-side
//! state it needs (channel senders, deadline handles). The bridge never
//! inspects the capture; it only invokes the closure, synchronously, on the
//! worker thread. An unconfigured slot makes every dependent operation fail
//! closed (return false) rather than fault.

use crate::context;

/// Response data handed to the finish callback by `trigger_finish`.
pub struct FinishPayload<'a> {
    /// Response body captured at finish time
    pub body: &'a [u8],
    /// Headers as consecutive NUL-terminated name/value byte strings,
    /// in insertion order
    pub header_blob: &'a [u8],
    /// Number of headers encoded in the blob
    pub header_count: i32,
    /// HTTP status code at finish time
    pub status: i32,
}

/// Invoked once when the script detaches the response via `trigger_finish`.
pub type FinishCallback = Box<dyn FnMut(FinishPayload<'_>) + Send>;

/// Invoked with each output chunk while streaming is enabled.
pub type StreamCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Invoked with a batch of Early Hints (HTTP 103) header lines.
pub type HintsCallback = Box<dyn FnMut(&[String]) + Send>;

/// Invoked with the requested extension in seconds; returns whether the
/// dispatcher accepted the extension.
pub type HeartbeatCallback = Box<dyn FnMut(u64) -> bool + Send>;

/// Install the finish callback on the current thread's context.
///
/// Returns false if no context is live. Must be called before script
/// execution begins; the slot is consumed by the first successful
/// `trigger_finish`.
pub fn set_finish_callback(callback: FinishCallback) -> bool {
    context::with_mut(|ctx| {
        ctx.finish_callback = Some(callback);
    })
    .is_some()
}
