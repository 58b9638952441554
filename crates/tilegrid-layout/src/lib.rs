#![forbid(unsafe_code)]

//! Grid model and layout algorithms for tilegrid.
//!
//! This crate is the pure half of the engine: it knows how widgets are
//! shaped, how they project onto each breakpoint, and how a multi-column
//! desktop arrangement flattens into a single mobile column. Nothing here
//! holds editing state; see `tilegrid-runtime` for the orchestrator.
//!
//! # Key Components
//!
//! - [`Widget`] / [`RawWidget`] - persisted widget records and their load-side shape
//! - [`WidgetRegistry`] - per-type size defaults and config-dependent constraints
//! - [`derive`] - widget → [`LayoutItem`] projection per breakpoint
//! - [`bands`] - band detection and mobile reading-order derivation
//! - [`cracks`] - vertical insertion offsets and directional snapping
//! - [`change`] - baseline selection and change/unlink detection
//! - [`validate`] - non-panicking validation of untrusted widget data
//! - [`DerivedLayoutCache`] - scoped memo for band-detection results

pub mod bands;
pub mod cache;
pub mod change;
pub mod cracks;
pub mod derive;
pub mod registry;
pub mod validate;
pub mod widget;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use bands::{Band, derive_mobile_layout, detect_bands, reading_order};
pub use cache::{DerivedLayoutCache, DerivedLayoutCacheStats};
pub use change::{BaselineSource, ChangeReport, check_for_actual_changes, same_id_set, select_baseline};
pub use cracks::{
    CrackSnapDecision, CrackSnapReason, DragDirection, DragSource, calculate_adaptive_threshold,
    find_vertical_cracks, select_crack_by_direction,
};
pub use derive::{LayoutItem, LayoutState, SizeConstraints, desktop_item, layout_state, mobile_item};
pub use registry::{
    ConfigConstraint, GridSize, RegistryError, StaticRegistry, WidgetRegistry, WidgetTypeSpec,
};
pub use validate::{
    WidgetIssue, WidgetIssueCode, WidgetIssueSeverity, WidgetReport, is_valid_widget_set,
    validate_widgets,
};
pub use widget::{GridRect, RawRect, RawWidget, Widget, WidgetConfig, WidgetId, normalize_widgets};

/// Column count of the desktop grid.
pub const DESKTOP_COLUMNS: u32 = 12;

/// Column count of the mobile grid. Mobile items are stacked full-width.
pub const MOBILE_COLUMNS: u32 = 2;

/// Width used when external input carries no usable width.
pub const FALLBACK_WIDTH: u32 = 4;

/// Height used when external input carries no usable height.
pub const FALLBACK_HEIGHT: u32 = 2;

/// One of the two responsive regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakpoint {
    #[default]
    Desktop,
    Mobile,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 2] = [Breakpoint::Desktop, Breakpoint::Mobile];

    /// Number of grid columns addressable at this breakpoint.
    #[must_use]
    pub const fn columns(self) -> u32 {
        match self {
            Self::Desktop => DESKTOP_COLUMNS,
            Self::Mobile => MOBILE_COLUMNS,
        }
    }

    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }

    /// Short key used by grid renderers (`lg` / `sm`).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Desktop => "lg",
            Self::Mobile => "sm",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop => write!(f, "desktop"),
            Self::Mobile => write!(f, "mobile"),
        }
    }
}

/// How the mobile arrangement relates to the desktop one.
///
/// `Linked` recomputes mobile positions from desktop on every change.
/// `Independent` stores mobile positions explicitly per widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobileLayoutMode {
    #[default]
    Linked,
    Independent,
}

impl MobileLayoutMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Linked => Self::Independent,
            Self::Independent => Self::Linked,
        }
    }
}

impl fmt::Display for MobileLayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linked => write!(f, "linked"),
            Self::Independent => write!(f, "independent"),
        }
    }
}
