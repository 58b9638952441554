//! Band detection: flatten a multi-column desktop grid into one mobile column.
//!
//! # Algorithm
//!
//! 1. Sort widgets by `(y, x, id)`.
//! 2. Sweep top to bottom, keeping the running maximum bottom edge of the
//!    current band. A widget whose top is at or below that edge starts a
//!    new band; anything else joins the current band and may extend it.
//! 3. Inside a band, reorder by `(x, y, id)` so the row reads left to right.
//! 4. Stack bands in order: each widget gets `x = 0`, full mobile width, its
//!    desktop height, and the running row offset as `y`.
//!
//! Widgets in one band share a visual row even when their tops differ by a
//! few rows. The id tie-break makes output deterministic for exactly equal
//! coordinates.

use std::cmp::Ordering;

use crate::registry::{WidgetRegistry, resolve_spec};
use crate::widget::{GridRect, Widget, WidgetId};
use crate::{FALLBACK_HEIGHT, MOBILE_COLUMNS};

/// A maximal run of widgets with overlapping vertical spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    /// Top row of the band.
    pub start: u32,
    /// First row below the band (exclusive).
    pub end: u32,
    /// Members in left-to-right reading order.
    pub members: Vec<WidgetId>,
}

fn top_down(a: &Widget, b: &Widget) -> Ordering {
    a.layout
        .y
        .cmp(&b.layout.y)
        .then(a.layout.x.cmp(&b.layout.x))
        .then_with(|| a.id.cmp(&b.id))
}

fn left_right(a: &Widget, b: &Widget) -> Ordering {
    a.layout
        .x
        .cmp(&b.layout.x)
        .then(a.layout.y.cmp(&b.layout.y))
        .then_with(|| a.id.cmp(&b.id))
}

/// Group widget indices into bands, each already in reading order.
fn band_indices(widgets: &[Widget]) -> Vec<(u32, u32, Vec<usize>)> {
    let mut order: Vec<usize> = (0..widgets.len()).collect();
    order.sort_by(|&a, &b| top_down(&widgets[a], &widgets[b]));

    let mut bands: Vec<(u32, u32, Vec<usize>)> = Vec::new();
    for idx in order {
        let rect = widgets[idx].layout;
        match bands.last_mut() {
            Some((_, end, members)) if rect.y < *end => {
                *end = (*end).max(rect.bottom());
                members.push(idx);
            }
            _ => bands.push((rect.y, rect.bottom(), vec![idx])),
        }
    }

    for (_, _, members) in &mut bands {
        members.sort_by(|&a, &b| left_right(&widgets[a], &widgets[b]));
    }
    bands
}

/// Detect the bands of a desktop arrangement.
#[must_use]
pub fn detect_bands(widgets: &[Widget]) -> Vec<Band> {
    band_indices(widgets)
        .into_iter()
        .map(|(start, end, members)| Band {
            start,
            end,
            members: members.into_iter().map(|i| widgets[i].id.clone()).collect(),
        })
        .collect()
}

/// Widget ids in mobile reading order.
#[must_use]
pub fn reading_order(widgets: &[Widget]) -> Vec<WidgetId> {
    band_indices(widgets)
        .into_iter()
        .flat_map(|(_, _, members)| members)
        .map(|i| widgets[i].id.clone())
        .collect()
}

/// Mobile rectangles for `widgets`, indexed like the input.
#[must_use]
pub fn stacked_mobile_rects<R: WidgetRegistry + ?Sized>(widgets: &[Widget], registry: &R) -> Vec<GridRect> {
    let mut rects = vec![GridRect::default(); widgets.len()];
    let mut cursor = 0u32;
    for (_, _, members) in band_indices(widgets) {
        for idx in members {
            let widget = &widgets[idx];
            let h = if widget.layout.h > 0 {
                widget.layout.h
            } else {
                let default_h = resolve_spec(registry, &widget.widget_type).default_size.h;
                if default_h > 0 { default_h } else { FALLBACK_HEIGHT }
            };
            rects[idx] = GridRect::new(0, cursor, MOBILE_COLUMNS, h);
            cursor = cursor.saturating_add(h);
        }
    }
    rects
}

/// Derive a single-column mobile arrangement from desktop positions.
///
/// The result contains the same widgets in reading order, each with a
/// populated `mobile_layout`. Any existing mobile layout is replaced.
#[must_use]
pub fn derive_mobile_layout<R: WidgetRegistry + ?Sized>(widgets: &[Widget], registry: &R) -> Vec<Widget> {
    let rects = stacked_mobile_rects(widgets, registry);
    band_indices(widgets)
        .into_iter()
        .flat_map(|(_, _, members)| members)
        .map(|i| {
            let mut derived = widgets[i].clone();
            derived.mobile_layout = Some(rects[i]);
            derived
        })
        .collect()
}
