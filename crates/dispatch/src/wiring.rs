//! Process-wide session defaults, set once at startup and injected into each
//! new session. Keeps per-request state free of ad hoc global reads.

use std::sync::OnceLock;

use bridge::BridgeConfig;

#[derive(Debug, Clone, Copy)]
pub struct DispatchDefaults {
    /// Per-call heartbeat extension ceiling handed to each context
    pub heartbeat_max_secs: u64,
    /// Cumulative heartbeat budget per request (0 = unlimited)
    pub heartbeat_budget_secs: u64,
    /// Whether streaming starts enabled, or merely armed for a later
    /// `try_enable_stream` once the response qualifies
    pub stream_start_enabled: bool,
}

impl Default for DispatchDefaults {
    fn default() -> Self {
        Self {
            heartbeat_max_secs: BridgeConfig::default().heartbeat_max_secs,
            heartbeat_budget_secs: 0,
            stream_start_enabled: false,
        }
    }
}

static DEFAULTS: OnceLock<DispatchDefaults> = OnceLock::new();

/// Install session defaults. Returns false if already installed; the first
/// install wins for the life of the process.
pub fn install_defaults(defaults: DispatchDefaults) -> bool {
    DEFAULTS.set(defaults).is_ok()
}

pub fn defaults() -> DispatchDefaults {
    DEFAULTS.get().copied().unwrap_or_default()
}
