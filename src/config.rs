//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

/// Runtime options for [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Accumulate per-scene timing and dump it when the run ends
    pub enable_profile: bool,
    /// Propagate the first scene failure and terminate the run (debugging only)
    pub abort_at_scene_exception: bool,
    /// Close or abort the open session when the capture source hits end-of-stream
    pub close_session_at_eof: bool,
    /// Frames discarded before each read
    pub skip_frames: usize,
    /// Backoff between reads while the capture source has no frame ready
    pub read_retry_ms: u64,
    /// Sleep interval while paused
    pub pause_poll_ms: u64,
    /// Watchdog window armed by an individual result
    pub watchdog_result_ms: u64,
    /// Tightened watchdog window once gears have been seen
    pub watchdog_gears_ms: u64,
    /// Name of the scene that decides `engine.in_game`
    pub presence_scene: String,
    /// Upper bound on chained events delivered by one flush, immediate or end-of-frame
    pub max_chained_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_profile: false,
            abort_at_scene_exception: false,
            close_session_at_eof: false,
            skip_frames: 0,
            read_retry_ms: 1000,
            pause_poll_ms: 500,
            watchdog_result_ms: 20_000,
            watchdog_gears_ms: 1_000,
            presence_scene: "GameTimerIcon".to_string(),
            max_chained_events: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded engine config from {}", path.as_ref().display());
        Self::from_toml(&content)
    }

    /// Enable end-of-stream session finalization
    pub fn with_close_session_at_eof(mut self, enabled: bool) -> Self {
        self.close_session_at_eof = enabled;
        self
    }

    /// Set the read retry backoff
    pub fn with_read_retry_ms(mut self, ms: u64) -> Self {
        self.read_retry_ms = ms;
        self
    }

    /// Enable strict mode
    pub fn with_abort_at_scene_exception(mut self, enabled: bool) -> Self {
        self.abort_at_scene_exception = enabled;
        self
    }
}
