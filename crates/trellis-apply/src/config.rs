//! Apply engine settings, loadable from TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApplyError, ApplyResult};

/// Configuration for an [`ApplyEngine`](crate::ApplyEngine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Animation used by [`ApplyEngine::apply`](crate::ApplyEngine::apply).
    pub animate_by_default: bool,
    /// Merge runs of inserts (or deletes) under one parent into a single
    /// widget call.
    pub coalesce_batches: bool,
    /// After each batch, compare the widget's child counts with the snapshot
    /// and log any mismatch.
    pub verify_row_counts: bool,
    /// How long an in-memory widget takes to finish an animated batch.
    pub animation_delay_ms: u64,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            animate_by_default: false,
            coalesce_batches: true,
            verify_row_counts: true,
            animation_delay_ms: 0,
        }
    }
}

impl ApplyConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> ApplyResult<Self> {
        toml::from_str(input).map_err(|e| ApplyError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> ApplyResult<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ApplyError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    /// The animation delay, `None` when animations complete at once.
    pub fn animation_delay(&self) -> Option<Duration> {
        (self.animation_delay_ms > 0).then(|| Duration::from_millis(self.animation_delay_ms))
    }
}
