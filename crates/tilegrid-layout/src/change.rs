//! Change detection for committed layout edits.
//!
//! When a gesture stops, the engine must decide two things: did anything
//! actually change (so a history entry is warranted), and should a mobile
//! edit desynchronize mobile from desktop. Both answers depend on which
//! baseline the candidate is compared against, see [`select_baseline`].
//!
//! # Mobile geometry
//!
//! On the mobile breakpoint each side is compared through its *effective*
//! mobile rectangle: the explicit `mobile_layout` when present, otherwise the
//! band-derived position. Two identical arrays therefore never differ, and
//! a gesture result with explicit mobile positions compares cleanly against
//! a desktop baseline.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::bands::stacked_mobile_rects;
use crate::registry::StaticRegistry;
use crate::widget::{GridRect, Widget};
use crate::{Breakpoint, MobileLayoutMode};

/// Which array a candidate is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    /// Desktop widgets as of the last load or commit.
    OriginalDesktop,
    /// Mobile widgets as of the last load or commit (independent mode).
    OriginalMobile,
    /// The working copy created by the first mobile edit of a pending unlink.
    CurrentDesktop,
}

/// Baseline selection rule.
///
/// Desktop always compares against the original desktop widgets. Mobile
/// compares against the original mobile widgets in independent mode, the
/// working snapshot while an unlink is pending, and the original desktop
/// widgets otherwise.
#[must_use]
pub const fn select_baseline(
    breakpoint: Breakpoint,
    mode: MobileLayoutMode,
    pending_unlink: bool,
) -> BaselineSource {
    match (breakpoint, mode, pending_unlink) {
        (Breakpoint::Desktop, _, _) => BaselineSource::OriginalDesktop,
        (Breakpoint::Mobile, MobileLayoutMode::Independent, _) => BaselineSource::OriginalMobile,
        (Breakpoint::Mobile, MobileLayoutMode::Linked, true) => BaselineSource::CurrentDesktop,
        (Breakpoint::Mobile, MobileLayoutMode::Linked, false) => BaselineSource::OriginalDesktop,
    }
}

/// Result of [`check_for_actual_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeReport {
    pub has_changes: bool,
    pub should_unlink: bool,
}

impl ChangeReport {
    pub const UNCHANGED: Self = Self {
        has_changes: false,
        should_unlink: false,
    };
}

fn effective_rects(widgets: &[Widget], breakpoint: Breakpoint) -> FxHashMap<&str, GridRect> {
    match breakpoint {
        Breakpoint::Desktop => widgets.iter().map(|w| (w.id.as_str(), w.layout)).collect(),
        Breakpoint::Mobile => {
            // Heights are positive after normalization, so the fallback
            // registry is never consulted for a default height here.
            let derived = stacked_mobile_rects(widgets, &StaticRegistry::new());
            widgets
                .iter()
                .zip(derived)
                .map(|(w, d)| (w.id.as_str(), w.mobile_layout.unwrap_or(d)))
                .collect()
        }
    }
}

/// Compare `updated` against the baseline chosen by [`select_baseline`].
///
/// A cardinality difference short-circuits: it is reported as changed
/// without per-widget diffing, and unlinks when a linked mobile layout is
/// being edited. Otherwise widgets are matched by id; geometry and config
/// differences are tracked separately so that config-only mobile edits
/// never unlink.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn check_for_actual_changes(
    updated: &[Widget],
    breakpoint: Breakpoint,
    original_desktop: &[Widget],
    original_mobile: &[Widget],
    mode: MobileLayoutMode,
    pending_unlink: bool,
    current_desktop: &[Widget],
) -> ChangeReport {
    let baseline = match select_baseline(breakpoint, mode, pending_unlink) {
        BaselineSource::OriginalDesktop => original_desktop,
        BaselineSource::OriginalMobile => original_mobile,
        BaselineSource::CurrentDesktop => current_desktop,
    };
    let unlinkable = breakpoint.is_mobile() && mode == MobileLayoutMode::Linked;

    if updated.len() != baseline.len() {
        return ChangeReport {
            has_changes: true,
            should_unlink: unlinkable,
        };
    }

    let before = effective_rects(baseline, breakpoint);
    let after = effective_rects(updated, breakpoint);
    let configs: FxHashMap<&str, &Widget> =
        baseline.iter().map(|w| (w.id.as_str(), w)).collect();

    let mut layout_changed = false;
    let mut config_changed = false;
    for widget in updated {
        let id = widget.id.as_str();
        match (before.get(id), configs.get(id)) {
            (Some(old_rect), Some(old)) => {
                if after.get(id) != Some(old_rect) {
                    layout_changed = true;
                }
                if old.config != widget.config {
                    config_changed = true;
                }
            }
            _ => layout_changed = true,
        }
        if layout_changed && config_changed {
            break;
        }
    }

    ChangeReport {
        has_changes: layout_changed || config_changed,
        should_unlink: layout_changed && unlinkable,
    }
}

/// Whether two arrays hold exactly the same set of widget ids.
#[must_use]
pub fn same_id_set(a: &[Widget], b: &[Widget]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let left: FxHashSet<&str> = a.iter().map(|w| w.id.as_str()).collect();
    b.iter().all(|w| left.contains(w.id.as_str()))
}
