//! Editor configuration.

use crate::document::DEFAULT_CONTAINER_SIZE;
use crate::snap::SNAP_THRESHOLD;
use crate::storage::{DEFAULT_AUTOSAVE_DELAY_MS, DEFAULT_STORAGE_KEY};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// External programs standing in for the render and suggestion services.
///
/// Each is an argv list; empty means not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Collaborators {
    /// Reads a render request as JSON on stdin, writes PDF bytes to stdout.
    pub render_command: Vec<String>,
    /// Reads instruction and command on stdin, writes the reply to stdout.
    pub suggest_command: Vec<String>,
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub container_width: f64,
    pub container_height: f64,
    pub snap_threshold: f64,
    pub autosave_delay_ms: u64,
    pub storage_key: String,
    pub collaborators: Collaborators,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            container_width: DEFAULT_CONTAINER_SIZE.width,
            container_height: DEFAULT_CONTAINER_SIZE.height,
            snap_threshold: SNAP_THRESHOLD,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            collaborators: Collaborators::default(),
        }
    }
}

impl EditorConfig {
    /// Parse from JSON. Missing fields take defaults, invalid ones are reset.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Replace out-of-range values with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.container_width) {
            log::warn!("Ignoring container width {}", self.container_width);
            self.container_width = defaults.container_width;
        }
        if !positive(self.container_height) {
            log::warn!("Ignoring container height {}", self.container_height);
            self.container_height = defaults.container_height;
        }
        if !(self.snap_threshold.is_finite() && self.snap_threshold >= 0.0) {
            log::warn!("Ignoring snap threshold {}", self.snap_threshold);
            self.snap_threshold = defaults.snap_threshold;
        }
        if self.storage_key.trim().is_empty() {
            self.storage_key = defaults.storage_key;
        }
        self
    }

    pub fn container_size(&self) -> Size {
        Size::new(self.container_width, self.container_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.container_size(), Size::new(794.0, 1123.0));
        assert_eq!(config.snap_threshold, 5.0);
        assert_eq!(config.autosave_delay_ms, 1000);
        assert_eq!(config.storage_key, "pagefill.document");
        assert!(config.collaborators.render_command.is_empty());
    }

    #[test]
    fn test_partial_json() {
        let config = EditorConfig::from_json(r#"{"snapThreshold": 8, "storageKey": "invoice"}"#).unwrap();
        assert_eq!(config.snap_threshold, 8.0);
        assert_eq!(config.storage_key, "invoice");
        assert_eq!(config.container_width, 794.0);
    }

    #[test]
    fn test_invalid_values_reset() {
        let config = EditorConfig::from_json(
            r#"{"containerWidth": -5, "containerHeight": 0, "snapThreshold": -1, "storageKey": "  "}"#,
        )
        .unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_collaborators() {
        let config = EditorConfig::from_json(
            r#"{"collaborators": {"renderCommand": ["render-pdf", "--stdin"]}}"#,
        )
        .unwrap();
        assert_eq!(config.collaborators.render_command, ["render-pdf", "--stdin"]);
        assert!(config.collaborators.suggest_command.is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagefill.json");
        std::fs::write(&path, r#"{"autosaveDelayMs": 250}"#).unwrap();
        assert_eq!(EditorConfig::from_path(&path).unwrap().autosave_delay_ms, 250);

        let missing = EditorConfig::from_path(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
        assert!(matches!(EditorConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
