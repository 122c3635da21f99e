//! Editor configuration.
//!
//! Every field has a default, so the UI may pass a partial JSON object.

use cake_render::{ClusterConfig, ProjectionConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`DesignSession`](crate::session::DesignSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Viewport projection (including the vertical bias calibration).
    pub projection: ProjectionConfig,

    /// Marker merge threshold and grouping mode. Default: 15 px, anchor mode.
    pub clustering: ClusterConfig,

    /// Maximum undo depth. Default: **100**.
    pub undo_depth: usize,

    /// Lifetime of cached prompt text and type enums. Default: **600 s**.
    pub prompt_ttl_secs: u64,

    /// Pointer hit radius around a marker, in pixels. Default: **12**.
    pub hit_radius_px: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            clustering: ClusterConfig::default(),
            undo_depth: 100,
            prompt_ttl_secs: cake_core::cache::DEFAULT_PROMPT_TTL.as_secs(),
            hit_radius_px: cake_render::hit::DEFAULT_HIT_RADIUS_PX,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config.
    ///
    /// # Errors
    /// Returns the JSON error if `json` is not a valid config object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn prompt_ttl(&self) -> Duration {
        Duration::from_secs(self.prompt_ttl_secs)
    }
}
