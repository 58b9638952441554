#![forbid(unsafe_code)]

//! Mobile synchronization state machine.
//!
//! The engine's branching on (mode, pending unlink, breakpoint, dirty) is
//! concentrated in one transition function, [`SyncMachine::apply`]. It
//! never touches widgets: it returns the ordered list of [`SyncEffect`]s the
//! orchestrator must execute, together with the new [`SyncState`].
//!
//! ```text
//!                 mobile edit (unlinks)             commit
//!   Linked ──────────────────────────▶ Linked+Pending ──────▶ Independent
//!     ▲  ◀──────────────────────────────┘   │
//!     │     snap back / reset / cancel      │ toggle
//!     │                                     ▼
//!     └─────────────── toggle ────────── Independent
//! ```
//!
//! Breakpoint switches never emit effects; dirty is set by every applied
//! edit and cleared by commit, cancel and load.

use serde::{Deserialize, Serialize};
use tilegrid_layout::{Breakpoint, ChangeReport, MobileLayoutMode};

use crate::history::HistoryStack;

/// The four-dimensional synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncState {
    pub mode: MobileLayoutMode,
    pub pending_unlink: bool,
    pub breakpoint: Breakpoint,
    pub dirty: bool,
}

impl SyncState {
    /// Whether the mobile view is backed by an explicit mobile array.
    #[must_use]
    pub const fn explicit_mobile(&self) -> bool {
        matches!(self.mode, MobileLayoutMode::Independent) || self.pending_unlink
    }

    /// Whether the rendered array is the explicit mobile one.
    #[must_use]
    pub const fn shows_explicit_mobile(&self) -> bool {
        self.explicit_mobile() && self.breakpoint.is_mobile()
    }

    /// History stack addressed by edits in this state.
    #[must_use]
    pub const fn history_stack(&self) -> HistoryStack {
        HistoryStack::select(self.breakpoint, self.mode, self.pending_unlink)
    }
}

/// Geometry-bearing edit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Move or resize of existing widgets.
    Geometry,
    Add,
    Delete,
}

/// Facts the orchestrator measured about a candidate edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditInput {
    pub kind: EditKind,
    /// Candidate differs from what is currently displayed.
    pub changed: bool,
    /// Change detector verdict against the mode's baseline.
    pub report: ChangeReport,
    /// Candidate equals a freshly derived mobile arrangement.
    pub matches_derived: bool,
    /// The desktop array is empty.
    pub desktop_empty: bool,
}

/// Undo or redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryDirection {
    Undo,
    Redo,
}

/// Input to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    SetBreakpoint { breakpoint: Breakpoint },
    Edit(EditInput),
    ConfigEdit { changed: bool },
    ToggleMode,
    ResetMobile,
    History { direction: HistoryDirection, available: bool },
    Commit,
    Cancel { baseline_mode: MobileLayoutMode },
    Load { mode: MobileLayoutMode },
}

/// Why an event produced no state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncNoopReason {
    BreakpointUnchanged,
    NoChanges,
    /// A linked mobile edit the detector does not treat as an unlink; the
    /// derived arrangement stays authoritative.
    DerivedLayoutWins,
    AlreadyLinked,
    NothingToUndo,
    NothingToRedo,
}

/// One step for the orchestrator to execute, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SyncEffect {
    /// Push the pre-edit array of `stack`.
    CaptureHistory { stack: HistoryStack },
    /// The candidate becomes the desktop array.
    ApplyToDesktop,
    /// The candidate becomes the explicit mobile array.
    ApplyToMobile,
    /// Seed an empty desktop array from the candidate.
    SeedDesktop,
    /// Patch widget config on the named arrays.
    ///
    /// Only the active view's history stack is captured before the patch.
    /// While an unlink is pending both arrays are patched, so undoing the
    /// capture reverts the config on that one array and the other keeps it.
    PatchConfig { desktop: bool, mobile: bool },
    /// Snapshot the derived mobile arrangement as the working copy.
    BeginWorkingCopy,
    /// Drop the working copy and mobile history; mobile is derived again.
    SnapBack,
    /// Replace the explicit mobile array with a fresh derivation.
    DeriveMobileArray,
    /// Drop the explicit mobile array.
    ClearMobileArray,
    CacheManualLayout,
    /// Cached manual layout, else current mobile array, else a derivation.
    RestoreManualLayout,
    RestoreHistory { stack: HistoryStack, direction: HistoryDirection },
    PromoteBaselines { mobile: bool },
    RestoreBaselines,
    ReplaceAll,
    ClearCachedManualLayout,
    ClearHistory,
    Noop { reason: SyncNoopReason },
}

/// One transition with its telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTransition {
    pub transition_id: u64,
    pub from: SyncState,
    pub to: SyncState,
    pub effects: Vec<SyncEffect>,
}

impl SyncTransition {
    /// True when the event was ignored.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self.effects.as_slice(), [SyncEffect::Noop { .. }])
    }

    #[must_use]
    pub fn noop_reason(&self) -> Option<SyncNoopReason> {
        match self.effects.as_slice() {
            [SyncEffect::Noop { reason }] => Some(*reason),
            _ => None,
        }
    }
}

/// Deterministic (state, event) → (state', effects) machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncMachine {
    state: SyncState,
    transition_counter: u64,
}

fn noop(reason: SyncNoopReason) -> Vec<SyncEffect> {
    vec![SyncEffect::Noop { reason }]
}

impl SyncMachine {
    #[must_use]
    pub fn new(state: SyncState) -> Self {
        Self {
            state,
            transition_counter: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    #[must_use]
    pub const fn transition_count(&self) -> u64 {
        self.transition_counter
    }

    /// Apply one event, returning the effects to execute.
    pub fn apply(&mut self, event: &SyncEvent) -> SyncTransition {
        let from = self.state;
        let mut to = from;
        let effects = match *event {
            SyncEvent::SetBreakpoint { breakpoint } => {
                if breakpoint == from.breakpoint {
                    noop(SyncNoopReason::BreakpointUnchanged)
                } else {
                    to.breakpoint = breakpoint;
                    Vec::new()
                }
            }
            SyncEvent::Edit(input) => Self::edit(from, &mut to, input),
            SyncEvent::ConfigEdit { changed } => {
                if changed {
                    to.dirty = true;
                    let (desktop, mobile) = match (from.breakpoint, from.mode, from.pending_unlink) {
                        (_, MobileLayoutMode::Linked, true) => (true, true),
                        (Breakpoint::Desktop, _, _) => (true, false),
                        (Breakpoint::Mobile, MobileLayoutMode::Independent, _) => (false, true),
                        (Breakpoint::Mobile, MobileLayoutMode::Linked, false) => (true, false),
                    };
                    vec![
                        SyncEffect::CaptureHistory {
                            stack: from.history_stack(),
                        },
                        SyncEffect::PatchConfig { desktop, mobile },
                    ]
                } else {
                    noop(SyncNoopReason::NoChanges)
                }
            }
            SyncEvent::ToggleMode => {
                to.dirty = true;
                to.pending_unlink = false;
                match from.mode {
                    MobileLayoutMode::Linked => {
                        to.mode = MobileLayoutMode::Independent;
                        vec![SyncEffect::RestoreManualLayout]
                    }
                    MobileLayoutMode::Independent => {
                        to.mode = MobileLayoutMode::Linked;
                        vec![SyncEffect::CacheManualLayout, SyncEffect::ClearMobileArray]
                    }
                }
            }
            SyncEvent::ResetMobile => match (from.mode, from.pending_unlink) {
                (MobileLayoutMode::Independent, _) => {
                    to.dirty = true;
                    vec![
                        SyncEffect::CaptureHistory {
                            stack: HistoryStack::Mobile,
                        },
                        SyncEffect::DeriveMobileArray,
                    ]
                }
                (MobileLayoutMode::Linked, true) => {
                    to.pending_unlink = false;
                    vec![SyncEffect::SnapBack]
                }
                (MobileLayoutMode::Linked, false) => noop(SyncNoopReason::AlreadyLinked),
            },
            SyncEvent::History {
                direction,
                available,
            } => {
                if available {
                    to.dirty = true;
                    vec![SyncEffect::RestoreHistory {
                        stack: from.history_stack(),
                        direction,
                    }]
                } else {
                    noop(match direction {
                        HistoryDirection::Undo => SyncNoopReason::NothingToUndo,
                        HistoryDirection::Redo => SyncNoopReason::NothingToRedo,
                    })
                }
            }
            SyncEvent::Commit => {
                if from.pending_unlink {
                    to.mode = MobileLayoutMode::Independent;
                }
                to.pending_unlink = false;
                to.dirty = false;
                vec![
                    SyncEffect::PromoteBaselines {
                        mobile: to.mode == MobileLayoutMode::Independent,
                    },
                    SyncEffect::ClearCachedManualLayout,
                    SyncEffect::ClearHistory,
                ]
            }
            SyncEvent::Cancel { baseline_mode } => {
                to.mode = baseline_mode;
                to.pending_unlink = false;
                to.dirty = false;
                vec![
                    SyncEffect::RestoreBaselines,
                    SyncEffect::ClearCachedManualLayout,
                    SyncEffect::ClearHistory,
                ]
            }
            SyncEvent::Load { mode } => {
                to.mode = mode;
                to.pending_unlink = false;
                to.dirty = false;
                vec![
                    SyncEffect::ReplaceAll,
                    SyncEffect::ClearCachedManualLayout,
                    SyncEffect::ClearHistory,
                ]
            }
        };

        self.state = to;
        self.transition_counter = self.transition_counter.saturating_add(1);
        let transition = SyncTransition {
            transition_id: self.transition_counter,
            from,
            to,
            effects,
        };
        tracing::debug!(
            transition_id = transition.transition_id,
            event = ?event,
            from = ?transition.from,
            to = ?transition.to,
            effects = ?transition.effects,
            "sync transition"
        );
        transition
    }

    fn edit(from: SyncState, to: &mut SyncState, input: EditInput) -> Vec<SyncEffect> {
        if !input.changed {
            return noop(SyncNoopReason::NoChanges);
        }
        let effects = match (from.breakpoint, from.mode, from.pending_unlink) {
            (Breakpoint::Desktop, _, _) => vec![
                SyncEffect::CaptureHistory {
                    stack: HistoryStack::Desktop,
                },
                SyncEffect::ApplyToDesktop,
            ],
            (Breakpoint::Mobile, MobileLayoutMode::Independent, _) => vec![
                SyncEffect::CaptureHistory {
                    stack: HistoryStack::Mobile,
                },
                SyncEffect::ApplyToMobile,
            ],
            (Breakpoint::Mobile, MobileLayoutMode::Linked, true) => {
                if input.matches_derived {
                    to.pending_unlink = false;
                    vec![SyncEffect::SnapBack]
                } else {
                    vec![
                        SyncEffect::CaptureHistory {
                            stack: HistoryStack::Mobile,
                        },
                        SyncEffect::ApplyToMobile,
                    ]
                }
            }
            (Breakpoint::Mobile, MobileLayoutMode::Linked, false) => {
                if !input.report.should_unlink {
                    return noop(SyncNoopReason::DerivedLayoutWins);
                }
                to.pending_unlink = true;
                let mut effects = vec![
                    SyncEffect::BeginWorkingCopy,
                    SyncEffect::CaptureHistory {
                        stack: HistoryStack::Mobile,
                    },
                    SyncEffect::ApplyToMobile,
                ];
                if input.kind == EditKind::Add && input.desktop_empty {
                    effects.push(SyncEffect::SeedDesktop);
                }
                effects
            }
        };
        to.dirty = true;
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(bp: Breakpoint, mode: MobileLayoutMode, pending: bool) -> SyncState {
        SyncState {
            mode,
            pending_unlink: pending,
            breakpoint: bp,
            dirty: false,
        }
    }

    fn edit(changed: bool, should_unlink: bool, matches_derived: bool) -> SyncEvent {
        SyncEvent::Edit(EditInput {
            kind: EditKind::Geometry,
            changed,
            report: ChangeReport {
                has_changes: changed,
                should_unlink,
            },
            matches_derived,
            desktop_empty: false,
        })
    }

    #[test]
    fn desktop_edit_captures_desktop_and_sets_dirty() {
        let mut machine = SyncMachine::default();
        let t = machine.apply(&edit(true, false, false));
        assert_eq!(
            t.effects,
            vec![
                SyncEffect::CaptureHistory {
                    stack: HistoryStack::Desktop
                },
                SyncEffect::ApplyToDesktop
            ]
        );
        assert!(t.to.dirty);
        assert!(!t.to.pending_unlink);
        assert_eq!(t.transition_id, 1);
    }

    #[test]
    fn unchanged_edit_is_noop() {
        let mut machine = SyncMachine::default();
        let t = machine.apply(&edit(false, false, false));
        assert_eq!(t.noop_reason(), Some(SyncNoopReason::NoChanges));
        assert!(!machine.state().dirty);
    }

    #[test]
    fn first_linked_mobile_edit_begins_pending_unlink() {
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, false));
        let t = machine.apply(&edit(true, true, false));
        assert_eq!(
            t.effects,
            vec![
                SyncEffect::BeginWorkingCopy,
                SyncEffect::CaptureHistory {
                    stack: HistoryStack::Mobile
                },
                SyncEffect::ApplyToMobile
            ]
        );
        assert!(t.to.pending_unlink);
        assert_eq!(t.to.mode, MobileLayoutMode::Linked);
    }

    #[test]
    fn linked_mobile_edit_without_unlink_is_discarded() {
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, false));
        let t = machine.apply(&edit(true, false, false));
        assert_eq!(t.noop_reason(), Some(SyncNoopReason::DerivedLayoutWins));
    }

    #[test]
    fn structural_edit_on_empty_desktop_seeds_it() {
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, false));
        let t = machine.apply(&SyncEvent::Edit(EditInput {
            kind: EditKind::Add,
            changed: true,
            report: ChangeReport {
                has_changes: true,
                should_unlink: true,
            },
            matches_derived: false,
            desktop_empty: true,
        }));
        assert_eq!(t.effects.last(), Some(&SyncEffect::SeedDesktop));
    }

    #[test]
    fn linked_mobile_delete_stays_on_working_copy() {
        let delete = |matches_derived| {
            SyncEvent::Edit(EditInput {
                kind: EditKind::Delete,
                changed: true,
                report: ChangeReport {
                    has_changes: true,
                    should_unlink: true,
                },
                matches_derived,
                desktop_empty: false,
            })
        };
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, false));
        let t = machine.apply(&delete(false));
        assert_eq!(t.effects.last(), Some(&SyncEffect::ApplyToMobile));
        assert!(!t.effects.contains(&SyncEffect::ApplyToDesktop));
        assert!(!t.effects.contains(&SyncEffect::SeedDesktop));

        let t = machine.apply(&delete(false));
        assert_eq!(
            t.effects,
            vec![
                SyncEffect::CaptureHistory {
                    stack: HistoryStack::Mobile
                },
                SyncEffect::ApplyToMobile
            ]
        );
        assert!(t.to.pending_unlink);
    }

    #[test]
    fn pending_edit_matching_derived_snaps_back() {
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, true));
        let t = machine.apply(&edit(true, true, true));
        assert_eq!(t.effects, vec![SyncEffect::SnapBack]);
        assert!(!t.to.pending_unlink);

        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, true));
        let t = machine.apply(&edit(true, true, false));
        assert_eq!(t.effects[1], SyncEffect::ApplyToMobile);
        assert!(t.to.pending_unlink);
    }

    #[test]
    fn independent_edits_never_cross_sync() {
        let mut machine =
            SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Independent, false));
        let t = machine.apply(&edit(true, false, false));
        assert!(!t.effects.contains(&SyncEffect::ApplyToDesktop));
        assert!(!t.to.pending_unlink);
    }

    #[test]
    fn config_edit_routing() {
        let cases = [
            (Breakpoint::Desktop, MobileLayoutMode::Linked, false, (true, false)),
            (Breakpoint::Desktop, MobileLayoutMode::Linked, true, (true, true)),
            (Breakpoint::Mobile, MobileLayoutMode::Linked, false, (true, false)),
            (Breakpoint::Mobile, MobileLayoutMode::Linked, true, (true, true)),
            (Breakpoint::Mobile, MobileLayoutMode::Independent, false, (false, true)),
        ];
        for (bp, mode, pending, (desktop, mobile)) in cases {
            let mut machine = SyncMachine::new(state(bp, mode, pending));
            let t = machine.apply(&SyncEvent::ConfigEdit { changed: true });
            assert_eq!(t.effects[1], SyncEffect::PatchConfig { desktop, mobile });
            assert_eq!(t.to.pending_unlink, pending, "config edits never unlink");
        }
    }

    #[test]
    fn commit_promotes_pending_to_independent() {
        let mut machine = SyncMachine::new(SyncState {
            dirty: true,
            ..state(Breakpoint::Mobile, MobileLayoutMode::Linked, true)
        });
        let t = machine.apply(&SyncEvent::Commit);
        assert_eq!(t.to.mode, MobileLayoutMode::Independent);
        assert!(!t.to.pending_unlink);
        assert!(!t.to.dirty);
        assert_eq!(t.effects[0], SyncEffect::PromoteBaselines { mobile: true });
        assert!(t.effects.contains(&SyncEffect::ClearHistory));
    }

    #[test]
    fn commit_while_linked_keeps_linked() {
        let mut machine = SyncMachine::default();
        let t = machine.apply(&SyncEvent::Commit);
        assert_eq!(t.to.mode, MobileLayoutMode::Linked);
        assert_eq!(t.effects[0], SyncEffect::PromoteBaselines { mobile: false });
    }

    #[test]
    fn cancel_restores_baseline_mode() {
        let mut machine = SyncMachine::new(SyncState {
            dirty: true,
            ..state(Breakpoint::Mobile, MobileLayoutMode::Independent, false)
        });
        let t = machine.apply(&SyncEvent::Cancel {
            baseline_mode: MobileLayoutMode::Linked,
        });
        assert_eq!(t.to.mode, MobileLayoutMode::Linked);
        assert!(!t.to.dirty);
        assert_eq!(t.effects[0], SyncEffect::RestoreBaselines);
    }

    #[test]
    fn toggle_round_trip() {
        let mut machine = SyncMachine::default();
        let t = machine.apply(&SyncEvent::ToggleMode);
        assert_eq!(t.effects, vec![SyncEffect::RestoreManualLayout]);
        assert_eq!(t.to.mode, MobileLayoutMode::Independent);
        let t = machine.apply(&SyncEvent::ToggleMode);
        assert_eq!(
            t.effects,
            vec![SyncEffect::CacheManualLayout, SyncEffect::ClearMobileArray]
        );
        assert_eq!(t.to.mode, MobileLayoutMode::Linked);
        assert_eq!(machine.transition_count(), 2);
    }

    #[test]
    fn toggle_while_pending_clears_pending() {
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, true));
        let t = machine.apply(&SyncEvent::ToggleMode);
        assert_eq!(t.to.mode, MobileLayoutMode::Independent);
        assert!(!t.to.pending_unlink);
    }

    #[test]
    fn reset_mobile_per_state() {
        let mut machine =
            SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Independent, false));
        let t = machine.apply(&SyncEvent::ResetMobile);
        assert_eq!(t.effects[1], SyncEffect::DeriveMobileArray);

        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, true));
        let t = machine.apply(&SyncEvent::ResetMobile);
        assert_eq!(t.effects, vec![SyncEffect::SnapBack]);
        assert!(!t.to.pending_unlink);

        let mut machine = SyncMachine::default();
        let t = machine.apply(&SyncEvent::ResetMobile);
        assert_eq!(t.noop_reason(), Some(SyncNoopReason::AlreadyLinked));
    }

    #[test]
    fn history_uses_selected_stack() {
        let mut machine = SyncMachine::new(state(Breakpoint::Mobile, MobileLayoutMode::Linked, true));
        let t = machine.apply(&SyncEvent::History {
            direction: HistoryDirection::Undo,
            available: true,
        });
        assert_eq!(
            t.effects,
            vec![SyncEffect::RestoreHistory {
                stack: HistoryStack::Mobile,
                direction: HistoryDirection::Undo
            }]
        );
        // Undo never clears a pending unlink by itself.
        assert!(t.to.pending_unlink);

        let t = machine.apply(&SyncEvent::History {
            direction: HistoryDirection::Redo,
            available: false,
        });
        assert_eq!(t.noop_reason(), Some(SyncNoopReason::NothingToRedo));
    }

    #[test]
    fn breakpoint_switch_has_no_effects() {
        let mut machine = SyncMachine::default();
        let t = machine.apply(&SyncEvent::SetBreakpoint {
            breakpoint: Breakpoint::Mobile,
        });
        assert!(t.effects.is_empty());
        assert_eq!(t.to.breakpoint, Breakpoint::Mobile);
        let t = machine.apply(&SyncEvent::SetBreakpoint {
            breakpoint: Breakpoint::Mobile,
        });
        assert_eq!(t.noop_reason(), Some(SyncNoopReason::BreakpointUnchanged));
    }

    #[test]
    fn load_resets_flags() {
        let mut machine = SyncMachine::new(SyncState {
            dirty: true,
            ..state(Breakpoint::Mobile, MobileLayoutMode::Linked, true)
        });
        let t = machine.apply(&SyncEvent::Load {
            mode: MobileLayoutMode::Independent,
        });
        assert_eq!(
            t.to,
            state(Breakpoint::Mobile, MobileLayoutMode::Independent, false)
        );
    }
}
