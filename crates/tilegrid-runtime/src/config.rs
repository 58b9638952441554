#![forbid(unsafe_code)]

//! Engine configuration as data.
//!
//! Captures the engine's tunables as a single [`EngineConfig`] that can be
//! loaded from TOML or JSON at startup.
//!
//! # Loading
//!
//! ```toml
//! # tilegrid.toml
//! history_depth = 100
//! external_drag_tolerance = 1.5
//! snap_back = "disabled"
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::from_toml_file("tilegrid.toml")?;
//! let config = EngineConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! Every field defaults to the value the engine uses when no file is
//! given, so `EngineConfig::default()` behaves exactly like an engine
//! built without configuration.

#[cfg(feature = "config-files")]
use std::path::Path;

use serde::{Deserialize, Serialize};
use tilegrid_layout::cache::DEFAULT_CACHE_CAPACITY;
use tilegrid_layout::cracks::DEFAULT_EXTERNAL_TOLERANCE;

use crate::history::{DEFAULT_HISTORY_DEPTH, HistoryConfig};

/// Whether a pending unlink reverts when the working copy matches the
/// derived arrangement again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapBackPolicy {
    /// Revert when ids, config and mobile geometry all match a fresh
    /// derivation.
    #[default]
    Geometric,
    /// Never revert automatically; only an explicit reset snaps back.
    Disabled,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum undo entries per history stack. Default: 50.
    pub history_depth: usize,
    /// Crack-selection tolerance for drops from outside the grid, in rows.
    /// Default: 1.0.
    pub external_drag_tolerance: f64,
    /// Arrangements kept by the derived-layout cache. Zero disables it.
    /// Default: 32.
    pub derived_cache_capacity: usize,
    pub snap_back: SnapBackPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            external_drag_tolerance: DEFAULT_EXTERNAL_TOLERANCE,
            derived_cache_capacity: DEFAULT_CACHE_CAPACITY,
            snap_back: SnapBackPolicy::Geometric,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, EngineConfigError> {
        toml::from_str::<Self>(s)
            .map_err(EngineConfigError::Toml)?
            .validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EngineConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(EngineConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, EngineConfigError> {
        serde_json::from_str::<Self>(s)
            .map_err(EngineConfigError::Json)?
            .validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(EngineConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.history_depth == 0 {
            errors.push("history_depth must be > 0".into());
        }
        if !self.external_drag_tolerance.is_finite() || self.external_drag_tolerance < 1.0 {
            errors.push(format!(
                "external_drag_tolerance must be a finite value >= 1, got {}",
                self.external_drag_tolerance
            ));
        }
        errors
    }

    /// Return `self` if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, EngineConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(EngineConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig::new(self.history_depth)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading an engine configuration.
#[derive(Debug)]
pub enum EngineConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-files")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for EngineConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for EngineConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
