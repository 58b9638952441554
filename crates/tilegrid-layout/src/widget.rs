//! Widget records: the persisted shape and the tolerant load-side shape.
//!
//! A [`Widget`] is what the engine edits. A [`RawWidget`] is what arrives
//! from persistence or other untrusted sources: every geometric field is
//! optional and older payloads carry `x/y/w/h` at the root instead of in
//! `layout`. [`RawWidget::normalize`] turns one into the other, filling gaps
//! with registry defaults and logging a warning for each repair.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::registry::{WidgetRegistry, resolve_spec};
use crate::{Breakpoint, FALLBACK_HEIGHT, FALLBACK_WIDTH};

/// Opaque per-widget configuration. Ordered so equality is structural.
pub type WidgetConfig = BTreeMap<String, serde_json::Value>;

/// Identifier of a widget, unique within one collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for WidgetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for WidgetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for WidgetId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WidgetId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A placement in integer grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridRect {
    #[must_use]
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// First row below this rectangle.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// First column right of this rectangle.
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }
}

/// A movable, resizable record on the dashboard grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub widget_type: String,
    /// Desktop placement.
    pub layout: GridRect,
    /// Mobile placement, present only when positioned independently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_layout: Option<GridRect>,
    #[serde(default)]
    pub config: WidgetConfig,
}

impl Widget {
    #[must_use]
    pub fn new(id: impl Into<WidgetId>, widget_type: impl Into<String>, layout: GridRect) -> Self {
        Self {
            id: id.into(),
            widget_type: widget_type.into(),
            layout,
            mobile_layout: None,
            config: WidgetConfig::new(),
        }
    }

    #[must_use]
    pub fn with_mobile_layout(mut self, rect: GridRect) -> Self {
        self.mobile_layout = Some(rect);
        self
    }

    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// The placement this widget occupies at `breakpoint`, if it has one.
    ///
    /// Desktop always answers with `layout`. Mobile answers only with an
    /// explicit `mobile_layout`; derived positions come from
    /// [`crate::bands::derive_mobile_layout`].
    #[must_use]
    pub fn explicit_rect(&self, breakpoint: Breakpoint) -> Option<GridRect> {
        match breakpoint {
            Breakpoint::Desktop => Some(self.layout),
            Breakpoint::Mobile => self.mobile_layout,
        }
    }

    /// The placement used for geometry queries at `breakpoint`, falling back
    /// to the desktop layout on mobile.
    #[must_use]
    pub fn rect_for(&self, breakpoint: Breakpoint) -> GridRect {
        self.explicit_rect(breakpoint).unwrap_or(self.layout)
    }

    /// Boolean config flag; absent or non-boolean values read as `None`.
    #[must_use]
    pub fn config_flag(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(serde_json::Value::as_bool)
    }
}

/// Tolerant rectangle as found in external payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRect {
    #[serde(default)]
    pub x: Option<i64>,
    #[serde(default)]
    pub y: Option<i64>,
    #[serde(default)]
    pub w: Option<i64>,
    #[serde(default)]
    pub h: Option<i64>,
}

impl From<GridRect> for RawRect {
    fn from(rect: GridRect) -> Self {
        Self {
            x: Some(i64::from(rect.x)),
            y: Some(i64::from(rect.y)),
            w: Some(i64::from(rect.w)),
            h: Some(i64::from(rect.h)),
        }
    }
}

/// Load-side widget record. Missing or legacy fields are accepted here and
/// repaired by [`RawWidget::normalize`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWidget {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub widget_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<RawRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_layout: Option<RawRect>,
    /// Legacy root-level coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<i64>,
    #[serde(default)]
    pub config: WidgetConfig,
}

impl From<&Widget> for RawWidget {
    fn from(widget: &Widget) -> Self {
        Self {
            id: widget.id.to_string(),
            widget_type: widget.widget_type.clone(),
            layout: Some(widget.layout.into()),
            mobile_layout: widget.mobile_layout.map(RawRect::from),
            x: None,
            y: None,
            w: None,
            h: None,
            config: widget.config.clone(),
        }
    }
}

impl RawWidget {
    /// The desktop rectangle as stored, preferring `layout` and falling back
    /// field by field to the legacy root-level coordinates.
    #[must_use]
    pub fn desktop_fields(&self) -> RawRect {
        let layout = self.layout.unwrap_or_default();
        RawRect {
            x: layout.x.or(self.x),
            y: layout.y.or(self.y),
            w: layout.w.or(self.w),
            h: layout.h.or(self.h),
        }
    }

    /// Repair this record into a [`Widget`].
    ///
    /// Missing sizes take the registry default for the widget type (or
    /// 4×2 for unknown types), missing or negative coordinates become 0.
    /// Every repair emits a `tracing` warning. A mobile layout is kept only
    /// when it is complete enough to place the widget.
    #[must_use]
    pub fn normalize<R: WidgetRegistry + ?Sized>(&self, registry: &R) -> Widget {
        let spec = resolve_spec(registry, &self.widget_type);
        let default_w = if spec.default_size.w > 0 {
            spec.default_size.w
        } else {
            FALLBACK_WIDTH
        };
        let default_h = if spec.default_size.h > 0 {
            spec.default_size.h
        } else {
            FALLBACK_HEIGHT
        };

        let fields = self.desktop_fields();
        let layout = GridRect {
            x: repair_coordinate(&self.id, "x", fields.x),
            y: repair_coordinate(&self.id, "y", fields.y),
            w: repair_size(&self.id, "w", fields.w, default_w),
            h: repair_size(&self.id, "h", fields.h, default_h),
        };

        let mobile_layout = self.mobile_layout.and_then(|raw| {
            match (raw.x, raw.y, raw.w, raw.h) {
                (Some(_), Some(_), _, _) => Some(GridRect {
                    x: repair_coordinate(&self.id, "mobileLayout.x", raw.x),
                    y: repair_coordinate(&self.id, "mobileLayout.y", raw.y),
                    w: repair_size(&self.id, "mobileLayout.w", raw.w, layout.w),
                    h: repair_size(&self.id, "mobileLayout.h", raw.h, layout.h),
                }),
                _ => {
                    tracing::warn!(
                        widget_id = %self.id,
                        "dropping mobile layout without coordinates"
                    );
                    None
                }
            }
        });

        Widget {
            id: WidgetId::new(self.id.clone()),
            widget_type: self.widget_type.clone(),
            layout,
            mobile_layout,
            config: self.config.clone(),
        }
    }
}

fn repair_coordinate(id: &str, field: &'static str, value: Option<i64>) -> u32 {
    match value {
        Some(v) if v >= 0 => u32::try_from(v).unwrap_or(u32::MAX),
        Some(v) => {
            tracing::warn!(widget_id = id, field, value = v, "negative coordinate clamped to 0");
            0
        }
        None => {
            tracing::warn!(widget_id = id, field, "missing coordinate defaulted to 0");
            0
        }
    }
}

fn repair_size(id: &str, field: &'static str, value: Option<i64>, default: u32) -> u32 {
    match value {
        Some(v) if v > 0 => u32::try_from(v).unwrap_or(u32::MAX),
        Some(v) => {
            tracing::warn!(widget_id = id, field, value = v, default, "non-positive size replaced");
            default
        }
        None => {
            tracing::warn!(widget_id = id, field, default, "missing size defaulted");
            default
        }
    }
}

/// Normalize a batch of external records.
///
/// Records with an empty id or an id already seen earlier in the batch are
/// dropped with a warning; the engine relies on ids being unique.
#[must_use]
pub fn normalize_widgets<R: WidgetRegistry + ?Sized>(raw: &[RawWidget], registry: &R) -> Vec<Widget> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut out = Vec::with_capacity(raw.len());
    for record in raw {
        if record.id.is_empty() {
            tracing::warn!(widget_type = %record.widget_type, "dropping widget without id");
            continue;
        }
        if !seen.insert(record.id.as_str()) {
            tracing::warn!(widget_id = %record.id, "dropping widget with duplicate id");
            continue;
        }
        out.push(record.normalize(registry));
    }
    out
}
