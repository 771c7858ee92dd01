//! Shared tuning constants and environment overrides.

use std::time::Duration;

use tracing::info;

/// Minimum gap between two change-stream emissions for one session.
pub const CHANGE_WINDOW: Duration = Duration::from_millis(200);

/// Cadence at which deferred change emissions are retried.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// Capacity of the bounded outbound relay queue.
pub const RELAY_QUEUE_CAPACITY: usize = 256;

/// Shapes dragged out smaller than this (in world units) are discarded.
pub const MIN_SHAPE_SIZE: f64 = 4.0;

/// Font size for text objects created in write mode.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Display name for sessions created without one.
pub const DEFAULT_SESSION_NAME: &str = "Untitled Board";

/// Tuning knobs for the change-stream flush task, loaded from environment
/// variables.
#[derive(Clone, Copy)]
pub struct FlushConfig {
    /// Milliseconds between deferred-flush passes.
    pub interval_ms: u64,
}

impl FlushConfig {
    /// Load the flush configuration, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let config =
            Self { interval_ms: env_parse("SYNCBOARD_FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS) };
        info!(interval_ms = config.interval_ms, "change flush configured");
        config
    }
}

/// Parse an environment variable, falling back to a default on absence or
/// parse failure.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
