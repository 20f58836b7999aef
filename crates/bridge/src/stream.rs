//! Streaming protocol: chunked delivery of output while the script runs.
//!
//! Orthogonal to finish-early; the two may be combined. Unlike `finished`,
//! streaming may toggle on and off within one context lifetime. Two
//! activation paths exist: `enable` turns streaming on immediately, while
//! `arm` installs the callback without enabling so the dispatcher can defer
//! the decision (e.g. until the script sets a particular response header)
//! and flip it later with `try_enable` without re-registering anything.

use crate::callbacks::StreamCallback;
use crate::context;

/// Install the chunk callback and turn streaming on, resetting the offset.
///
/// Returns false with no live context.
pub fn enable_stream(callback: StreamCallback) -> bool {
    context::with_mut(|ctx| {
        ctx.streaming = true;
        ctx.stream_offset = 0;
        ctx.stream_callback = Some(callback);
    })
    .is_some()
}

/// Install the chunk callback without enabling streaming.
///
/// A later `try_enable_stream` flips it on. Resets the offset. Returns false
/// with no live context.
pub fn arm_stream(callback: StreamCallback) -> bool {
    context::with_mut(|ctx| {
        ctx.stream_offset = 0;
        ctx.stream_callback = Some(callback);
    })
    .is_some()
}

/// Enable streaming if a callback is armed. Idempotent: true when already
/// enabled or newly enabled, false when no callback (or no context) is
/// present.
pub fn try_enable_stream() -> bool {
    context::with_mut(|ctx| {
        if ctx.streaming {
            return true;
        }
        if ctx.stream_callback.is_none() {
            return false;
        }
        ctx.streaming = true;
        tracing::debug!(request_id = ctx.request_id, "streaming enabled");
        true
    })
    .unwrap_or(false)
}

/// Whether streaming is currently enabled. False with no live context.
pub fn is_streaming() -> bool {
    context::with(|ctx| ctx.streaming).unwrap_or(false)
}

/// Push one chunk through the stream callback, synchronously.
///
/// Returns false when streaming is disabled, no callback is installed,
/// `bytes` is empty, another callback is in flight, or no context is live.
/// The bridge does not buffer: whoever produces the bytes owns any buffering
/// done before this call.
pub fn send_chunk(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let taken = context::with_mut(|ctx| {
        if !ctx.streaming || ctx.callback_in_flight {
            return None;
        }
        let callback = ctx.stream_callback.take()?;
        ctx.callback_in_flight = true;
        Some(callback)
    });
    let Some(Some(mut callback)) = taken else {
        return false;
    };

    callback(bytes);

    context::with_mut(|ctx| {
        ctx.callback_in_flight = false;
        // Reinstall unless the callback itself ended or replaced the stream
        if ctx.streaming && ctx.stream_callback.is_none() {
            ctx.stream_callback = Some(callback);
        }
    });
    true
}

/// Offset of output already delivered, for pull-based consumers that read
/// from a shared buffer instead of receiving pushed chunks. 0 with no live
/// context.
pub fn stream_offset() -> usize {
    context::with(|ctx| ctx.stream_offset).unwrap_or(0)
}

/// Advance the delivered-output offset. While streaming is enabled the
/// offset is monotonic: a value below the current one is ignored.
pub fn set_stream_offset(offset: usize) {
    context::with_mut(|ctx| {
        if ctx.streaming && offset < ctx.stream_offset {
            return;
        }
        ctx.stream_offset = offset;
    });
}

/// Disable streaming and clear the callback and offset. Safe to call
/// repeatedly, with or without a live context.
pub fn end_stream() {
    context::with_mut(|ctx| {
        ctx.streaming = false;
        ctx.stream_offset = 0;
        ctx.stream_callback = None;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<Vec<u8>>>>, StreamCallback) {
        let chunks: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&chunks);
        let callback: StreamCallback = Box::new(move |bytes| {
            sink.lock().unwrap().push(bytes.to_vec());
        });
        (chunks, callback)
    }

    #[test]
    fn no_context_is_benign() {
        context::destroy();
        let (_chunks, callback) = collector();
        assert!(!enable_stream(callback));
        assert!(!try_enable_stream());
        assert!(!is_streaming());
        assert!(!send_chunk(b"x"));
        end_stream();
    }

    #[test]
    fn enable_then_send_delivers_chunks() {
        context::init(1, 1);
        let (chunks, callback) = collector();
        assert!(enable_stream(callback));
        assert!(is_streaming());
        assert!(send_chunk(b"data: 1\n\n"));
        assert!(send_chunk(b"data: 2\n\n"));
        let seen = chunks.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], b"data: 1\n\n");
        context::destroy();
    }

    #[test]
    fn empty_chunk_is_rejected() {
        context::init(2, 1);
        let (chunks, callback) = collector();
        enable_stream(callback);
        assert!(!send_chunk(b""));
        assert!(chunks.lock().unwrap().is_empty());
        context::destroy();
    }

    #[test]
    fn armed_stream_sends_nothing_until_enabled() {
        context::init(3, 1);
        let (chunks, callback) = collector();
        assert!(arm_stream(callback));
        assert!(!is_streaming());
        assert!(!send_chunk(b"early"));
        assert!(chunks.lock().unwrap().is_empty());

        assert!(try_enable_stream());
        assert!(is_streaming());
        assert!(send_chunk(b"late"));
        assert_eq!(chunks.lock().unwrap().len(), 1);

        // Idempotent once enabled
        assert!(try_enable_stream());
        context::destroy();
    }

    #[test]
    fn try_enable_without_callback_fails() {
        context::init(4, 1);
        assert!(!try_enable_stream());
        assert!(!is_streaming());
        context::destroy();
    }

    #[test]
    fn offset_is_monotonic_while_enabled() {
        context::init(5, 1);
        let (_chunks, callback) = collector();
        enable_stream(callback);
        set_stream_offset(100);
        assert_eq!(stream_offset(), 100);
        set_stream_offset(50);
        assert_eq!(stream_offset(), 100);
        set_stream_offset(250);
        assert_eq!(stream_offset(), 250);
        context::destroy();
    }

    #[test]
    fn end_stream_resets_and_is_repeatable() {
        context::init(6, 1);
        let (chunks, callback) = collector();
        enable_stream(callback);
        set_stream_offset(64);
        end_stream();
        assert!(!is_streaming());
        assert_eq!(stream_offset(), 0);
        assert!(!send_chunk(b"after end"));
        assert!(chunks.lock().unwrap().is_empty());
        end_stream();

        // Re-enabling within the same context lifetime is allowed
        let (chunks2, callback2) = collector();
        assert!(enable_stream(callback2));
        assert!(send_chunk(b"again"));
        assert_eq!(chunks2.lock().unwrap().len(), 1);
        context::destroy();
    }

    #[test]
    fn reentrant_send_fails_closed() {
        context::init(7, 1);
        let (chunks, _unused) = collector();
        let sink = Arc::clone(&chunks);
        enable_stream(Box::new(move |bytes| {
            // Re-entering send_chunk from inside the callback must be refused
            assert!(!send_chunk(b"nested"));
            sink.lock().unwrap().push(bytes.to_vec());
        }));
        assert!(send_chunk(b"outer"));
        let seen = chunks.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], b"outer");
        drop(seen);
        // Callback was reinstalled after the outer call returned
        assert!(send_chunk(b"outer2"));
        assert_eq!(chunks.lock().unwrap().len(), 2);
        context::destroy();
    }

    #[test]
    fn end_stream_inside_callback_drops_it() {
        context::init(8, 1);
        let (chunks, _unused) = collector();
        let sink = Arc::clone(&chunks);
        enable_stream(Box::new(move |bytes| {
            sink.lock().unwrap().push(bytes.to_vec());
            end_stream();
        }));
        assert!(send_chunk(b"last"));
        assert!(!is_streaming());
        assert!(!send_chunk(b"after"));
        assert_eq!(chunks.lock().unwrap().len(), 1);
        context::destroy();
    }
}
