//! Request bridge between an async multi-worker dispatcher and a
//! synchronous, single-threaded-per-call script engine.
//!
//! Architecture:
//! - One request context per worker thread, held in a thread-local slot that
//!   both the dispatcher side and the engine side resolve to (context module)
//! - Ordered, capacity-bounded response header ledger with case-insensitive
//!   replace-or-append semantics (headers module)
//! - Finish-early: a one-shot transition detaching the response from
//!   continued script execution (finish module)
//! - Streaming: re-enterable chunked delivery with an offset-based fallback
//!   for polling consumers (stream module)
//! - Heartbeat: bounded deadline-extension requests forwarded to the
//!   dispatcher (heartbeat module)
//! - Early Hints: HTTP 103 header batches pushed before the response exists
//!   (hints module)
//!
//! Every public operation is total: missing context, missing callback, a full
//! ledger and repeated finishes all surface as false/zero/no-op returns,
//! never a panic. Callbacks are owned closures installed by the dispatcher
//! before execution and always invoked synchronously on the calling worker
//! thread; a single in-flight flag per context makes re-entrant invocation
//! fail closed.

pub mod callbacks;
pub mod config;
pub mod context;
pub mod finish;
pub mod headers;
pub mod heartbeat;
pub mod hints;
pub mod stream;

pub use callbacks::{
    FinishCallback, FinishPayload, HeartbeatCallback, HintsCallback, StreamCallback,
    set_finish_callback,
};
pub use config::BridgeConfig;
pub use context::{
    destroy, init, is_active, request_id, response_code, set_response_code, worker_id,
};
pub use finish::{
    finished_header_count, finished_offset, finished_response_code, is_finished, mark_finished,
    trigger_finish,
};
pub use headers::{
    add_header, clear_headers, get_header, header_blob, header_count, headers_snapshot,
};
pub use heartbeat::{configure_heartbeat, heartbeat_max, request_extension};
pub use hints::{send_early_hints, set_hints_callback};
pub use stream::{
    arm_stream, enable_stream, end_stream, is_streaming, send_chunk, set_stream_offset,
    stream_offset, try_enable_stream,
};
