#![forbid(unsafe_code)]

//! Array-level widget operations.
//!
//! These helpers build candidate arrays; they never decide *where* a
//! candidate goes. The engine hands each candidate to the sync machine,
//! which routes it to the desktop array, the explicit mobile array, or
//! nowhere.

use rustc_hash::FxHashSet;
use tilegrid_layout::registry::resolve_spec;
use tilegrid_layout::{
    Breakpoint, DESKTOP_COLUMNS, GridRect, LayoutItem, MOBILE_COLUMNS, Widget, WidgetConfig,
    WidgetId, WidgetRegistry, derive::size_constraints,
};

/// Smallest `"{type}-{n}"` (n ≥ 1) not used by any widget in `existing`.
#[must_use]
pub fn next_widget_id<'a>(widget_type: &str, existing: impl IntoIterator<Item = &'a Widget>) -> WidgetId {
    let taken: FxHashSet<&str> = existing.into_iter().map(|w| w.id.as_str()).collect();
    let mut n = 1u64;
    loop {
        let candidate = format!("{widget_type}-{n}");
        if !taken.contains(candidate.as_str()) {
            return WidgetId::new(candidate);
        }
        n += 1;
    }
}

/// First free row below everything in `widgets` at `breakpoint`.
#[must_use]
pub fn bottom_row(widgets: &[Widget], breakpoint: Breakpoint) -> u32 {
    widgets
        .iter()
        .map(|w| w.rect_for(breakpoint).bottom())
        .max()
        .unwrap_or(0)
}

/// A new widget sized from the registry default, placed at column 0 below
/// everything on `desktop`, and, when `mobile` is given, below everything
/// on the mobile arrangement too.
#[must_use]
pub fn place_new_widget<R: WidgetRegistry + ?Sized>(
    id: WidgetId,
    widget_type: &str,
    config: WidgetConfig,
    registry: &R,
    desktop: &[Widget],
    mobile: Option<&[Widget]>,
) -> Widget {
    let size = resolve_spec(registry, widget_type).default_size;
    let w = size.w.clamp(1, DESKTOP_COLUMNS);
    let h = size.h.max(1);
    let mut widget = Widget::new(id, widget_type, GridRect::new(0, bottom_row(desktop, Breakpoint::Desktop), w, h));
    widget.config = config;
    if let Some(mobile) = mobile {
        widget.mobile_layout = Some(GridRect::new(
            0,
            bottom_row(mobile, Breakpoint::Mobile),
            MOBILE_COLUMNS,
            h,
        ));
    }
    widget
}

/// Remove `id`, returning the removed widget.
pub fn remove_widget(widgets: &mut Vec<Widget>, id: &str) -> Option<Widget> {
    let index = widgets.iter().position(|w| w.id == id)?;
    Some(widgets.remove(index))
}

/// Shallow-merge `patch` into the widget's config. Returns whether anything
/// changed.
pub fn patch_config(widget: &mut Widget, patch: &WidgetConfig) -> bool {
    let mut changed = false;
    for (key, value) in patch {
        if widget.config.get(key) != Some(value) {
            widget.config.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Resize `widget` at `breakpoint`, clamping to its size constraints and
/// syncing config flags tied to its height.
///
/// Returns whether geometry or config changed.
pub fn resize_widget<R: WidgetRegistry + ?Sized>(
    widget: &mut Widget,
    breakpoint: Breakpoint,
    w: u32,
    h: u32,
    registry: &R,
) -> bool {
    let columns = breakpoint.columns();
    let current = widget.rect_for(breakpoint);
    let bounds = size_constraints(widget, registry).within_columns(columns);
    let (w, h) = bounds.clamp(w, h);
    let w = w.min(columns.saturating_sub(current.x).max(1));
    let resized = GridRect { w, h, ..current };

    let mut changed = resized != current;
    match breakpoint {
        Breakpoint::Desktop => widget.layout = resized,
        Breakpoint::Mobile => {
            changed |= widget.mobile_layout.is_none();
            widget.mobile_layout = Some(resized);
        }
    }

    let spec = resolve_spec(registry, &widget.widget_type);
    for constraint in &spec.config_constraints {
        if let Some((key, value)) = constraint.sync_for_height(&widget.config, h) {
            widget.config.insert(key, value);
            changed = true;
        }
    }
    changed
}

/// Candidate array with `items` applied at `breakpoint`.
///
/// Widgets without an item keep their placement; items naming unknown ids
/// are ignored.
#[must_use]
pub fn apply_items(widgets: &[Widget], items: &[LayoutItem], breakpoint: Breakpoint) -> Vec<Widget> {
    widgets
        .iter()
        .map(|widget| {
            let mut next = widget.clone();
            if let Some(item) = items.iter().find(|item| item.id == widget.id) {
                let rect = item.rect();
                match breakpoint {
                    Breakpoint::Desktop => next.layout = rect,
                    Breakpoint::Mobile => next.mobile_layout = Some(rect),
                }
            }
            next
        })
        .collect()
}

/// Give every widget without a mobile placement one below the explicitly
/// placed widgets, full mobile width.
pub fn fill_mobile_layouts(widgets: &mut [Widget]) {
    let mut cursor = widgets
        .iter()
        .filter_map(|w| w.mobile_layout.map(|r| r.bottom()))
        .max()
        .unwrap_or(0);
    for widget in widgets.iter_mut().filter(|w| w.mobile_layout.is_none()) {
        let h = widget.layout.h.max(1);
        widget.mobile_layout = Some(GridRect::new(0, cursor, MOBILE_COLUMNS, h));
        cursor = cursor.saturating_add(h);
    }
}

/// Align a stored mobile arrangement with the current desktop widgets.
///
/// Widgets on desktop get their type, config and desktop rectangle
/// refreshed. Mobile-only widgets are kept, except those whose id is in
/// `desktop_at_capture` (they were on desktop when the arrangement was
/// stored and have since been deleted there). Desktop widgets the
/// arrangement does not know are appended at the bottom.
#[must_use]
pub fn reconcile_mobile(source: Vec<Widget>, desktop: &[Widget], desktop_at_capture: &[WidgetId]) -> Vec<Widget> {
    let mut out: Vec<Widget> = source
        .into_iter()
        .filter_map(|mut widget| match desktop.iter().find(|d| d.id == widget.id) {
            Some(current) => {
                widget.widget_type.clone_from(&current.widget_type);
                widget.config.clone_from(&current.config);
                widget.layout = current.layout;
                Some(widget)
            }
            None if desktop_at_capture.contains(&widget.id) => {
                tracing::debug!(widget_id = %widget.id, "dropping widget deleted on desktop");
                None
            }
            None => Some(widget),
        })
        .collect();
    let known: FxHashSet<WidgetId> = out.iter().map(|w| w.id.clone()).collect();
    out.extend(
        desktop
            .iter()
            .filter(|d| !known.contains(&d.id))
            .map(|d| Widget {
                mobile_layout: None,
                ..d.clone()
            }),
    );
    fill_mobile_layouts(&mut out);
    out
}

/// Sort by position at `breakpoint`, top to bottom then left to right.
pub fn sort_by_position(widgets: &mut [Widget], breakpoint: Breakpoint) {
    widgets.sort_by(|a, b| {
        let (ra, rb) = (a.rect_for(breakpoint), b.rect_for(breakpoint));
        ra.y.cmp(&rb.y)
            .then(ra.x.cmp(&rb.x))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Copy of `widgets` without mobile placements.
#[must_use]
pub fn strip_mobile_layouts(widgets: &[Widget]) -> Vec<Widget> {
    widgets
        .iter()
        .map(|w| Widget {
            mobile_layout: None,
            ..w.clone()
        })
        .collect()
}
