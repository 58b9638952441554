#![forbid(unsafe_code)]

//! Dual-stack undo/redo history over full widget-array snapshots.
//!
//! The desktop and mobile arrangements are edited independently, so each
//! gets its own pair of LIFO stacks. A snapshot is the *pre-edit* array:
//! undoing pops it and hands the caller's current array to the redo side.
//!
//! # Architecture
//!
//! ```text
//! push(desktop, s0); push(desktop, s1)       current = s2
//! ┌─────────────────────────────────────────────────────┐
//! │ desktop  undo: [s0, s1]      redo: []               │
//! │ mobile   undo: []            redo: []               │
//! └─────────────────────────────────────────────────────┘
//!
//! undo(desktop, s2) -> s1                    current = s1
//! ┌─────────────────────────────────────────────────────┐
//! │ desktop  undo: [s0]          redo: [s2]             │
//! └─────────────────────────────────────────────────────┘
//!
//! push(desktop, s1') — new branch, clears desktop redo
//! ```
//!
//! # Invariants
//!
//! 1. Each undo list holds at most `config.max_depth` entries; the oldest
//!    is evicted first.
//! 2. A push clears the redo list of *that* stack only.
//! 3. While an undo/redo result is being applied, pushes are suppressed.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tilegrid_layout::{Breakpoint, MobileLayoutMode, Widget, WidgetId};

/// Which undo/redo stack an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStack {
    Desktop,
    Mobile,
}

impl HistoryStack {
    pub const ALL: [HistoryStack; 2] = [HistoryStack::Desktop, HistoryStack::Mobile];

    /// Stack that records edits in the given engine state.
    ///
    /// Mobile edits go to the mobile stack only when they touch an explicit
    /// mobile array (independent mode, or a pending unlink). Everything
    /// else edits desktop widgets and lands on the desktop stack.
    #[must_use]
    pub const fn select(breakpoint: Breakpoint, mode: MobileLayoutMode, pending_unlink: bool) -> Self {
        let explicit_mobile = matches!(mode, MobileLayoutMode::Independent) || pending_unlink;
        if breakpoint.is_mobile() && explicit_mobile {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Whether this stack may be offered for undo/redo in the given state.
    ///
    /// A linked mobile view without a pending unlink has no explicit mobile
    /// array, so the mobile stack is disabled there.
    #[must_use]
    pub const fn enabled_in(self, breakpoint: Breakpoint, mode: MobileLayoutMode, pending_unlink: bool) -> bool {
        !(matches!(self, Self::Mobile)
            && breakpoint.is_mobile()
            && matches!(mode, MobileLayoutMode::Linked)
            && !pending_unlink)
    }
}

impl fmt::Display for HistoryStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop => write!(f, "desktop"),
            Self::Mobile => write!(f, "mobile"),
        }
    }
}

/// Full copy of one widget array plus the selection at capture time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub widgets: Vec<Widget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_id: Option<WidgetId>,
}

impl HistorySnapshot {
    #[must_use]
    pub fn new(widgets: Vec<Widget>, selected_id: Option<WidgetId>) -> Self {
        Self {
            widgets,
            selected_id,
        }
    }
}

/// Configuration for the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum entries per undo list.
    pub max_depth: usize,
}

/// Default per-stack depth.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create an unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct StackPair {
    undo: VecDeque<HistorySnapshot>,
    redo: VecDeque<HistorySnapshot>,
}

/// Two independent undo/redo stacks keyed by [`HistoryStack`].
#[derive(Clone)]
pub struct MultiStackHistory {
    desktop: StackPair,
    mobile: StackPair,
    config: HistoryConfig,
    applying: bool,
}

impl fmt::Debug for MultiStackHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiStackHistory")
            .field("desktop_undo", &self.desktop.undo.len())
            .field("desktop_redo", &self.desktop.redo.len())
            .field("mobile_undo", &self.mobile.undo.len())
            .field("mobile_redo", &self.mobile.redo.len())
            .field("config", &self.config)
            .field("applying", &self.applying)
            .finish()
    }
}

impl Default for MultiStackHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl MultiStackHistory {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            desktop: StackPair::default(),
            mobile: StackPair::default(),
            config,
            applying: false,
        }
    }

    fn pair(&self, stack: HistoryStack) -> &StackPair {
        match stack {
            HistoryStack::Desktop => &self.desktop,
            HistoryStack::Mobile => &self.mobile,
        }
    }

    fn pair_mut(&mut self, stack: HistoryStack) -> &mut StackPair {
        match stack {
            HistoryStack::Desktop => &mut self.desktop,
            HistoryStack::Mobile => &mut self.mobile,
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Record a pre-edit snapshot, clearing that stack's redo list.
    ///
    /// Returns `false` (and records nothing) while an undo/redo result is
    /// being applied.
    pub fn push(&mut self, stack: HistoryStack, snapshot: HistorySnapshot) -> bool {
        if self.applying {
            tracing::debug!(%stack, "history capture suppressed while applying");
            return false;
        }
        let max_depth = self.config.max_depth;
        let pair = self.pair_mut(stack);
        pair.redo.clear();
        pair.undo.push_back(snapshot);
        while pair.undo.len() > max_depth {
            pair.undo.pop_front();
        }
        tracing::debug!(%stack, depth = pair.undo.len(), "history snapshot captured");
        true
    }

    /// Pop the most recent snapshot, moving `current` to the redo list.
    ///
    /// Returns `None` (and drops nothing) when the undo list is empty.
    pub fn undo(&mut self, stack: HistoryStack, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let pair = self.pair_mut(stack);
        let previous = pair.undo.pop_back()?;
        pair.redo.push_back(current);
        tracing::debug!(%stack, undo = pair.undo.len(), redo = pair.redo.len(), "undo");
        Some(previous)
    }

    /// Pop the most recently undone snapshot, moving `current` back to the
    /// undo list.
    pub fn redo(&mut self, stack: HistoryStack, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let max_depth = self.config.max_depth;
        let pair = self.pair_mut(stack);
        let next = pair.redo.pop_back()?;
        pair.undo.push_back(current);
        while pair.undo.len() > max_depth {
            pair.undo.pop_front();
        }
        tracing::debug!(%stack, undo = pair.undo.len(), redo = pair.redo.len(), "redo");
        Some(next)
    }

    /// Empty one stack, or both when `stack` is `None`.
    pub fn clear(&mut self, stack: Option<HistoryStack>) {
        match stack {
            Some(stack) => {
                let pair = self.pair_mut(stack);
                pair.undo.clear();
                pair.redo.clear();
            }
            None => {
                self.desktop = StackPair::default();
                self.mobile = StackPair::default();
            }
        }
    }

    // ====================================================================
    // Reentrancy Guard
    // ====================================================================

    /// Suppress capture until [`end_apply`](Self::end_apply).
    pub fn begin_apply(&mut self) {
        self.applying = true;
    }

    pub fn end_apply(&mut self) {
        self.applying = false;
    }

    #[must_use]
    pub const fn is_applying(&self) -> bool {
        self.applying
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn can_undo(&self, stack: HistoryStack) -> bool {
        !self.pair(stack).undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self, stack: HistoryStack) -> bool {
        !self.pair(stack).redo.is_empty()
    }

    /// Undo availability as offered to the user in the given state.
    #[must_use]
    pub fn can_undo_in(&self, breakpoint: Breakpoint, mode: MobileLayoutMode, pending_unlink: bool) -> bool {
        let stack = HistoryStack::select(breakpoint, mode, pending_unlink);
        stack.enabled_in(breakpoint, mode, pending_unlink) && self.can_undo(stack)
    }

    /// Redo availability as offered to the user in the given state.
    #[must_use]
    pub fn can_redo_in(&self, breakpoint: Breakpoint, mode: MobileLayoutMode, pending_unlink: bool) -> bool {
        let stack = HistoryStack::select(breakpoint, mode, pending_unlink);
        stack.enabled_in(breakpoint, mode, pending_unlink) && self.can_redo(stack)
    }

    #[must_use]
    pub fn undo_depth(&self, stack: HistoryStack) -> usize {
        self.pair(stack).undo.len()
    }

    #[must_use]
    pub fn redo_depth(&self, stack: HistoryStack) -> usize {
        self.pair(stack).redo.len()
    }

    /// Most recent undo entry, if any.
    #[must_use]
    pub fn peek_undo(&self, stack: HistoryStack) -> Option<&HistorySnapshot> {
        self.pair(stack).undo.back()
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        HistoryStack::ALL
            .iter()
            .all(|s| !self.can_undo(*s) && !self.can_redo(*s))
    }
}

// ============================================================================
// Tests
// ============================================================================
