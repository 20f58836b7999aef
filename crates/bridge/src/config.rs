use std::sync::OnceLock;

static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

/// Process-wide bridge configuration, injected into each new request context.
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    /// Max entries in the per-request header ledger
    pub max_headers: usize,
    /// Default ceiling for a single heartbeat extension (seconds)
    pub heartbeat_max_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_headers: 128,
            heartbeat_max_secs: 300,
        }
    }
}

impl BridgeConfig {
    /// Create config from environment variables
    ///
    /// Environment variables:
    /// - BRIDGE_MAX_HEADERS: Max response headers per request (default: 128)
    /// - BRIDGE_HEARTBEAT_MAX_SECS: Max seconds per heartbeat extension (default: 300)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_headers: std::env::var("BRIDGE_MAX_HEADERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_headers),
            heartbeat_max_secs: std::env::var("BRIDGE_HEARTBEAT_MAX_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.heartbeat_max_secs),
        }
    }
}

/// Install the process-wide config. Returns false if already installed.
///
/// Contexts created before any install use `BridgeConfig::default()`.
pub fn install(config: BridgeConfig) -> bool {
    CONFIG.set(config).is_ok()
}

pub(crate) fn get() -> BridgeConfig {
    CONFIG.get().copied().unwrap_or_default()
}
