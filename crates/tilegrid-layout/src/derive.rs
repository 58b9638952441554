//! Widget → layout item projection.
//!
//! A [`LayoutItem`] is what a grid renderer consumes: a position plus the
//! size bounds the renderer must enforce while the user drags or resizes.
//! Items are never stored; they are recomputed from widgets whenever the
//! widgets, the mode, or the breakpoint change.
//!
//! # Invariants
//!
//! 1. `desktop_item(w).{x,y,w,h} == w.layout`.
//! 2. Mobile items never exceed [`MOBILE_COLUMNS`] in width.
//! 3. Derivation is deterministic and side-effect free.

use serde::{Deserialize, Serialize};

use crate::registry::{WidgetRegistry, resolve_spec};
use crate::widget::{GridRect, Widget, WidgetId};
use crate::{Breakpoint, DESKTOP_COLUMNS, MOBILE_COLUMNS};

/// Render-time position of one widget at one breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    #[serde(rename = "i")]
    pub id: WidgetId,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub locked: bool,
    #[serde(rename = "static", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
}

impl LayoutItem {
    /// Bare item without size bounds, as delivered by gesture capture.
    #[must_use]
    pub fn at(id: impl Into<WidgetId>, rect: GridRect) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            min_w: None,
            max_w: None,
            min_h: None,
            max_h: None,
            locked: false,
            is_static: false,
        }
    }

    #[must_use]
    pub const fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.w, self.h)
    }
}

/// Per-breakpoint render projection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutState {
    pub lg: Vec<LayoutItem>,
    pub sm: Vec<LayoutItem>,
}

impl LayoutState {
    #[must_use]
    pub fn items(&self, breakpoint: Breakpoint) -> &[LayoutItem] {
        match breakpoint {
            Breakpoint::Desktop => &self.lg,
            Breakpoint::Mobile => &self.sm,
        }
    }
}

/// Effective size bounds of one widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraints {
    pub min_w: u32,
    pub min_h: u32,
    pub max_w: Option<u32>,
    pub max_h: Option<u32>,
}

impl SizeConstraints {
    /// Clamp a requested size into these bounds. Minimums win over maximums.
    #[must_use]
    pub fn clamp(&self, w: u32, h: u32) -> (u32, u32) {
        let w = self.max_w.map_or(w, |max| w.min(max)).max(self.min_w);
        let h = self.max_h.map_or(h, |max| h.min(max)).max(self.min_h);
        (w, h)
    }

    /// Restrict these bounds to a grid with `columns` columns.
    #[must_use]
    pub fn within_columns(self, columns: u32) -> Self {
        Self {
            min_w: self.min_w.min(columns),
            max_w: Some(self.max_w.map_or(columns, |max| max.min(columns))),
            ..self
        }
    }
}

/// Size bounds for `widget`, after config-dependent overrides.
#[must_use]
pub fn size_constraints<R: WidgetRegistry + ?Sized>(widget: &Widget, registry: &R) -> SizeConstraints {
    let spec = resolve_spec(registry, &widget.widget_type);
    let min_h = spec.effective_min_height(widget);
    SizeConstraints {
        min_w: spec.min_size.w,
        min_h,
        max_w: spec.max_size.map(|m| m.w),
        max_h: spec.max_size.map(|m| m.h.max(min_h)),
    }
}

fn item(id: &WidgetId, rect: GridRect, bounds: SizeConstraints) -> LayoutItem {
    LayoutItem {
        min_w: Some(bounds.min_w),
        max_w: bounds.max_w,
        min_h: Some(bounds.min_h),
        max_h: bounds.max_h,
        ..LayoutItem::at(id.clone(), rect)
    }
}

/// Desktop layout item for `widget`.
#[must_use]
pub fn desktop_item<R: WidgetRegistry + ?Sized>(widget: &Widget, registry: &R) -> LayoutItem {
    let bounds = size_constraints(widget, registry).within_columns(DESKTOP_COLUMNS);
    item(&widget.id, widget.layout, bounds)
}

/// Mobile layout item for `widget`.
///
/// Uses `mobile_layout` when present. Otherwise the widget is placed at
/// the desktop row, full mobile width.
#[must_use]
pub fn mobile_item<R: WidgetRegistry + ?Sized>(widget: &Widget, registry: &R) -> LayoutItem {
    let bounds = size_constraints(widget, registry).within_columns(MOBILE_COLUMNS);
    let rect = match widget.mobile_layout {
        Some(rect) => {
            let x = rect.x.min(MOBILE_COLUMNS - 1);
            GridRect {
                x,
                w: rect.w.min(MOBILE_COLUMNS - x).max(1),
                ..rect
            }
        }
        None => GridRect::new(0, widget.layout.y, MOBILE_COLUMNS, widget.layout.h),
    };
    item(&widget.id, rect, bounds)
}

/// Build the render projection for both breakpoints.
#[must_use]
pub fn layout_state<R: WidgetRegistry + ?Sized>(
    desktop: &[Widget],
    mobile: &[Widget],
    registry: &R,
) -> LayoutState {
    LayoutState {
        lg: desktop.iter().map(|w| desktop_item(w, registry)).collect(),
        sm: mobile.iter().map(|w| mobile_item(w, registry)).collect(),
    }
}
