//! Crack snapping: vertical insertion offsets for drops between widgets.
//!
//! A *crack* is a row where a dragged widget can land without splitting
//! another widget: row 0, and every top and bottom edge of the other
//! widgets. While dragging, the cursor row is mapped to one crack using the
//! travel direction so the drop target does not jitter back and forth.
//!
//! # Tolerance
//!
//! Internal (in-grid) drags use a zero tolerance buffer: the first crack
//! past the cursor in the travel direction wins. External drags (a widget
//! dragged in from a palette) arrive with coarse pointer deltas and use a
//! buffer of at least one row to avoid overshooting.
//!
//! [`calculate_adaptive_threshold`] sizes the engagement window around a
//! crack: half the distance to the nearest neighbouring crack, clamped to
//! `[0.5, 1.5]` rows.

use serde::{Deserialize, Serialize};

use crate::Breakpoint;
use crate::widget::Widget;

/// Smallest engagement window around a crack, in rows.
pub const MIN_SNAP_THRESHOLD: f64 = 0.5;
/// Largest engagement window around a crack, in rows.
pub const MAX_SNAP_THRESHOLD: f64 = 1.5;
/// Default tolerance buffer for external drags, in rows.
pub const DEFAULT_EXTERNAL_TOLERANCE: f64 = 1.0;

/// Vertical travel direction of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragDirection {
    Up,
    Down,
    #[default]
    Unknown,
}

impl DragDirection {
    /// Infer the direction from two consecutive cursor rows.
    #[must_use]
    pub fn from_rows(previous: f64, next: f64) -> Self {
        if next > previous {
            Self::Down
        } else if next < previous {
            Self::Up
        } else {
            Self::Unknown
        }
    }
}

/// Where a drag originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragSource {
    /// Moving a widget already on the grid.
    #[default]
    Internal,
    /// Dropping a new widget from outside the grid.
    External,
}

impl DragSource {
    /// Tolerance buffer for this source given the configured external buffer.
    #[must_use]
    pub fn tolerance(self, external_buffer: f64) -> f64 {
        match self {
            Self::Internal => 0.0,
            Self::External => external_buffer.max(1.0),
        }
    }
}

/// Sorted, deduplicated insertion offsets at `breakpoint`, ignoring
/// `exclude_id` (normally the widget being dragged).
#[must_use]
pub fn find_vertical_cracks(
    widgets: &[Widget],
    exclude_id: Option<&str>,
    breakpoint: Breakpoint,
) -> Vec<u32> {
    let mut cracks = vec![0u32];
    for widget in widgets {
        if exclude_id.is_some_and(|id| widget.id == id) {
            continue;
        }
        let rect = widget.rect_for(breakpoint);
        cracks.push(rect.y);
        cracks.push(rect.bottom());
    }
    cracks.sort_unstable();
    cracks.dedup();
    cracks
}

fn nearest(cracks: &[u32], cursor_row: f64) -> Option<u32> {
    cracks.iter().copied().min_by(|a, b| {
        let da = (f64::from(*a) - cursor_row).abs();
        let db = (f64::from(*b) - cursor_row).abs();
        da.total_cmp(&db).then(a.cmp(b))
    })
}

/// Pick the crack to snap to for a cursor at `cursor_row`.
///
/// Moving down, the smallest crack at or beyond `cursor_row + tolerance`
/// wins; moving up, the largest crack at or before `cursor_row - tolerance`.
/// With an unknown direction, or no crack in the travel direction, the
/// nearest crack wins (ties go to the smaller row). Returns `None` only for
/// an empty crack list.
#[must_use]
pub fn select_crack_by_direction(
    cracks: &[u32],
    cursor_row: f64,
    direction: DragDirection,
    tolerance_buffer: f64,
) -> Option<u32> {
    let tolerance = tolerance_buffer.max(0.0);
    let directed = match direction {
        DragDirection::Down => {
            let threshold = cursor_row + tolerance;
            cracks
                .iter()
                .copied()
                .filter(|c| f64::from(*c) >= threshold)
                .min()
        }
        DragDirection::Up => {
            let threshold = cursor_row - tolerance;
            cracks
                .iter()
                .copied()
                .filter(|c| f64::from(*c) <= threshold)
                .max()
        }
        DragDirection::Unknown => None,
    };
    directed.or_else(|| nearest(cracks, cursor_row))
}

/// Engagement window around `target`: half the smaller gap to its
/// neighbouring cracks, clamped to `[0.5, 1.5]` rows.
#[must_use]
pub fn calculate_adaptive_threshold(cracks: &[u32], target: u32) -> f64 {
    let below = cracks.iter().copied().filter(|c| *c < target).max();
    let above = cracks.iter().copied().filter(|c| *c > target).min();
    let gap = match (below, above) {
        (Some(b), Some(a)) => (target - b).min(a - target),
        (Some(b), None) => target - b,
        (None, Some(a)) => a - target,
        (None, None) => return MAX_SNAP_THRESHOLD,
    };
    (f64::from(gap) / 2.0).clamp(MIN_SNAP_THRESHOLD, MAX_SNAP_THRESHOLD)
}

/// Why a snap decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrackSnapReason {
    /// Cursor is within the adaptive window of the chosen crack.
    Snapped,
    /// A crack was chosen but the cursor is outside its window.
    OutsideWindow,
    /// There was nothing to snap to.
    NoCracks,
}

/// Outcome of one snap query during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrackSnapDecision {
    pub cursor_row: f64,
    pub target_row: Option<u32>,
    pub threshold: f64,
    pub reason: CrackSnapReason,
}

impl CrackSnapDecision {
    /// Decide the drop row for a drag over `widgets`.
    #[must_use]
    pub fn decide(
        widgets: &[Widget],
        dragged: Option<&str>,
        breakpoint: Breakpoint,
        cursor_row: f64,
        direction: DragDirection,
        tolerance_buffer: f64,
    ) -> Self {
        let cracks = find_vertical_cracks(widgets, dragged, breakpoint);
        let Some(target) = select_crack_by_direction(&cracks, cursor_row, direction, tolerance_buffer)
        else {
            return Self {
                cursor_row,
                target_row: None,
                threshold: 0.0,
                reason: CrackSnapReason::NoCracks,
            };
        };
        let threshold = calculate_adaptive_threshold(&cracks, target);
        let reason = if (f64::from(target) - cursor_row).abs() <= threshold {
            CrackSnapReason::Snapped
        } else {
            CrackSnapReason::OutsideWindow
        };
        Self {
            cursor_row,
            target_row: Some(target),
            threshold,
            reason,
        }
    }

    /// The row to drop at, if the cursor engaged a crack.
    #[must_use]
    pub fn snapped_row(&self) -> Option<u32> {
        match self.reason {
            CrackSnapReason::Snapped => self.target_row,
            _ => None,
        }
    }
}
