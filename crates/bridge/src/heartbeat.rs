//! Heartbeat protocol: script-initiated deadline extension.
//!
//! The bridge tracks no wall-clock time. A script asks for an extension,
//! the bridge validates it against the per-request ceiling and forwards it
//! to the dispatcher's callback; the dispatcher owns the actual deadline and
//! any cumulative budget. Each call is independent.

use crate::callbacks::HeartbeatCallback;
use crate::context;

/// Install the heartbeat callback and the per-call extension ceiling.
///
/// Called by the dispatcher before script execution. Returns false with no
/// live context.
pub fn configure_heartbeat(callback: HeartbeatCallback, max_extension_secs: u64) -> bool {
    context::with_mut(|ctx| {
        ctx.heartbeat_callback = Some(callback);
        ctx.heartbeat_max_secs = max_extension_secs;
    })
    .is_some()
}

/// Request a deadline extension of `secs` seconds.
///
/// Rejects zero, values above the configured ceiling, a missing callback, an
/// in-flight callback, and a missing context. Otherwise returns exactly the
/// callback's verdict.
pub fn request_extension(secs: u64) -> bool {
    if secs == 0 {
        return false;
    }
    let taken = context::with_mut(|ctx| {
        if secs > ctx.heartbeat_max_secs || ctx.callback_in_flight {
            return None;
        }
        let callback = ctx.heartbeat_callback.take()?;
        ctx.callback_in_flight = true;
        Some(callback)
    });
    let Some(Some(mut callback)) = taken else {
        return false;
    };

    let accepted = callback(secs);
    tracing::debug!(secs, accepted, "heartbeat extension requested");

    context::with_mut(|ctx| {
        ctx.callback_in_flight = false;
        if ctx.heartbeat_callback.is_none() {
            ctx.heartbeat_callback = Some(callback);
        }
    });
    accepted
}

/// The configured per-call extension ceiling; 0 with no live context.
pub fn heartbeat_max() -> u64 {
    context::with(|ctx| ctx.heartbeat_max_secs).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn no_context_is_benign() {
        context::destroy();
        assert!(!configure_heartbeat(Box::new(|_secs| true), 60));
        assert!(!request_extension(10));
        assert_eq!(heartbeat_max(), 0);
    }

    #[test]
    fn unconfigured_callback_fails_closed() {
        context::init(1, 1);
        // The ceiling is seeded from process config, but with no callback
        // every request is refused
        assert!(!request_extension(10));
        context::destroy();
    }

    #[test]
    fn bounds_are_enforced() {
        context::init(2, 1);
        let total = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&total);
        configure_heartbeat(
            Box::new(move |secs| {
                sink.fetch_add(secs, Ordering::SeqCst);
                true
            }),
            30,
        );
        assert_eq!(heartbeat_max(), 30);

        assert!(!request_extension(0));
        assert!(!request_extension(31));
        assert_eq!(total.load(Ordering::SeqCst), 0);

        assert!(request_extension(30));
        assert!(request_extension(5));
        assert_eq!(total.load(Ordering::SeqCst), 35);
        context::destroy();
    }

    #[test]
    fn callback_verdict_is_returned_verbatim() {
        context::init(3, 1);
        configure_heartbeat(Box::new(|secs| secs % 2 == 0), 100);
        assert!(request_extension(4));
        assert!(!request_extension(5));
        context::destroy();
    }

    #[test]
    fn repeated_calls_reuse_the_callback() {
        context::init(4, 1);
        let count = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&count);
        configure_heartbeat(
            Box::new(move |_secs| {
                sink.fetch_add(1, Ordering::SeqCst);
                true
            }),
            60,
        );
        for _ in 0..5 {
            assert!(request_extension(10));
        }
        assert_eq!(count.load(Ordering::SeqCst), 5);
        context::destroy();
    }

    #[test]
    fn reentrant_request_fails_closed() {
        context::init(5, 1);
        configure_heartbeat(
            Box::new(|_secs| {
                assert!(!request_extension(1));
                true
            }),
            60,
        );
        assert!(request_extension(10));
        // Callback reinstalled for the next request
        assert!(request_extension(10));
        context::destroy();
    }
}
