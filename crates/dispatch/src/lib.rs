//! Dispatcher-side integration for the request bridge.
//!
//! The bridge crate owns the per-thread context and its synchronous,
//! engine-facing contract; this crate owns everything the async dispatcher
//! wraps around it: channel adapters that carry chunks and detached
//! responses to the async side, the per-request session lifecycle, the
//! shared deadline that heartbeats push out, process-wide wiring defaults,
//! and activity counters.

pub mod channels;
pub mod metrics;
pub mod session;
pub mod wiring;

pub use channels::{
    ChunkChannel, DeadlineHandle, FinishChannel, FinishedResponse, HintsChannel,
    parse_header_blob,
};
pub use metrics::{BridgeMetrics, metrics};
pub use session::{FinishInfo, RequestSession, SessionOptions};
pub use wiring::{DispatchDefaults, defaults, install_defaults};
