//! Widget-type registry: default sizes, size bounds, and config constraints.
//!
//! The engine never hardcodes per-type knowledge. Layout derivation asks a
//! [`WidgetRegistry`] for the [`WidgetTypeSpec`] of each widget; unknown
//! types resolve to a permissive fallback spec (4×2 default, 1×1 minimum,
//! unbounded maximum).
//!
//! # Config-dependent constraints
//!
//! Some types change their geometry rules depending on their own config.
//! [`ConfigConstraint::HeaderToggle`] models the common case: a widget that
//! shows a header needs more rows, and resizing it across a height
//! threshold flips the header flag.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::widget::{Widget, WidgetConfig};

/// A width/height pair in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridSize {
    pub w: u32,
    pub h: u32,
}

impl GridSize {
    #[must_use]
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// A rule tying a widget's geometry to one of its config values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigConstraint {
    /// Boolean flag `key` is on exactly when the widget is at least
    /// `threshold_h` rows tall. While the flag is on, the minimum height is
    /// raised to `min_h_with_header`.
    HeaderToggle {
        key: String,
        threshold_h: u32,
        min_h_with_header: u32,
    },
}

impl ConfigConstraint {
    /// Minimum height this rule imposes given the widget's current config.
    #[must_use]
    pub fn min_height(&self, config: &WidgetConfig) -> Option<u32> {
        match self {
            Self::HeaderToggle {
                key,
                min_h_with_header,
                ..
            } => config
                .get(key)
                .and_then(serde_json::Value::as_bool)
                .filter(|shown| *shown)
                .map(|_| *min_h_with_header),
        }
    }

    /// Config updates implied by resizing to height `h`.
    ///
    /// Returns `None` when the config already agrees with the new height.
    #[must_use]
    pub fn sync_for_height(&self, config: &WidgetConfig, h: u32) -> Option<(String, serde_json::Value)> {
        match self {
            Self::HeaderToggle {
                key, threshold_h, ..
            } => {
                let wanted = h >= *threshold_h;
                let current = config.get(key).and_then(serde_json::Value::as_bool);
                if current == Some(wanted) {
                    None
                } else {
                    Some((key.clone(), serde_json::Value::Bool(wanted)))
                }
            }
        }
    }
}

/// Geometry rules for one widget type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetTypeSpec {
    pub default_size: GridSize,
    #[serde(default = "default_min_size")]
    pub min_size: GridSize,
    #[serde(default)]
    pub max_size: Option<GridSize>,
    #[serde(default)]
    pub config_constraints: Vec<ConfigConstraint>,
}

fn default_min_size() -> GridSize {
    GridSize::new(1, 1)
}

/// Spec used for types the registry does not know.
pub static FALLBACK_SPEC: WidgetTypeSpec = WidgetTypeSpec {
    default_size: GridSize::new(crate::FALLBACK_WIDTH, crate::FALLBACK_HEIGHT),
    min_size: GridSize::new(1, 1),
    max_size: None,
    config_constraints: Vec::new(),
};

impl WidgetTypeSpec {
    #[must_use]
    pub fn new(default_size: GridSize) -> Self {
        Self {
            default_size,
            min_size: default_min_size(),
            max_size: None,
            config_constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_min(mut self, min: GridSize) -> Self {
        self.min_size = min;
        self
    }

    #[must_use]
    pub fn with_max(mut self, max: GridSize) -> Self {
        self.max_size = Some(max);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: ConfigConstraint) -> Self {
        self.config_constraints.push(constraint);
        self
    }

    /// Minimum height after applying config-dependent rules for `widget`.
    #[must_use]
    pub fn effective_min_height(&self, widget: &Widget) -> u32 {
        self.config_constraints
            .iter()
            .filter_map(|c| c.min_height(&widget.config))
            .fold(self.min_size.h, u32::max)
    }

    /// Check internal consistency: min ≤ default ≤ max, all sizes positive.
    pub fn validate(&self, widget_type: &str) -> Result<(), RegistryError> {
        let bad = |reason: &'static str| RegistryError::InvalidSpec {
            widget_type: widget_type.to_owned(),
            reason,
        };
        if self.default_size.w == 0 || self.default_size.h == 0 {
            return Err(bad("default size must be positive"));
        }
        if self.min_size.w == 0 || self.min_size.h == 0 {
            return Err(bad("minimum size must be positive"));
        }
        if self.min_size.w > self.default_size.w || self.min_size.h > self.default_size.h {
            return Err(bad("minimum size exceeds default size"));
        }
        if let Some(max) = self.max_size
            && (max.w < self.default_size.w || max.h < self.default_size.h)
        {
            return Err(bad("default size exceeds maximum size"));
        }
        Ok(())
    }
}

/// Lookup of geometry rules by widget type.
pub trait WidgetRegistry {
    fn lookup(&self, widget_type: &str) -> Option<&WidgetTypeSpec>;
}

impl<R: WidgetRegistry + ?Sized> WidgetRegistry for &R {
    fn lookup(&self, widget_type: &str) -> Option<&WidgetTypeSpec> {
        (**self).lookup(widget_type)
    }
}

/// Resolve the type spec for `widget_type`, falling back to [`FALLBACK_SPEC`].
#[must_use]
pub fn resolve_spec<'a, R: WidgetRegistry + ?Sized>(
    registry: &'a R,
    widget_type: &str,
) -> &'a WidgetTypeSpec {
    registry.lookup(widget_type).unwrap_or(&FALLBACK_SPEC)
}

/// Map-backed registry, loadable from JSON (and TOML with `registry-toml`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticRegistry {
    types: BTreeMap<String, WidgetTypeSpec>,
}

impl StaticRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, widget_type: impl Into<String>, spec: WidgetTypeSpec) -> Self {
        self.types.insert(widget_type.into(), spec);
        self
    }

    pub fn insert(&mut self, widget_type: impl Into<String>, spec: WidgetTypeSpec) {
        self.types.insert(widget_type.into(), spec);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &WidgetTypeSpec)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Validate every registered spec.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.types
            .iter()
            .try_for_each(|(name, spec)| spec.validate(name))
    }

    /// Parse and validate a registry from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, RegistryError> {
        let registry: Self = serde_json::from_str(s).map_err(RegistryError::Json)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Parse and validate a registry from TOML.
    #[cfg(feature = "registry-toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, RegistryError> {
        let registry: Self = toml::from_str(s).map_err(RegistryError::Toml)?;
        registry.validate()?;
        Ok(registry)
    }
}

impl WidgetRegistry for StaticRegistry {
    fn lookup(&self, widget_type: &str) -> Option<&WidgetTypeSpec> {
        self.types.get(widget_type)
    }
}

/// Errors raised while loading a registry.
#[derive(Debug)]
pub enum RegistryError {
    Json(serde_json::Error),
    #[cfg(feature = "registry-toml")]
    Toml(toml::de::Error),
    InvalidSpec {
        widget_type: String,
        reason: &'static str,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "registry JSON parse error: {e}"),
            #[cfg(feature = "registry-toml")]
            Self::Toml(e) => write!(f, "registry TOML parse error: {e}"),
            Self::InvalidSpec {
                widget_type,
                reason,
            } => write!(f, "invalid spec for widget type {widget_type:?}: {reason}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            #[cfg(feature = "registry-toml")]
            Self::Toml(e) => Some(e),
            Self::InvalidSpec { .. } => None,
        }
    }
}
