#![forbid(unsafe_code)]

//! Lifecycle of one drag, resize or drop gesture.
//!
//! ```text
//!          begin                 finish / cancel
//!   Idle ────────▶ Active ─────────────────────────▶ Idle
//!                  │    ▲
//!                  └────┘ preview / track_cursor
//! ```
//!
//! Previews only replace the transient item list shown by the view. They
//! never touch widgets or history; the engine runs change detection once,
//! when the gesture finishes.

use serde::{Deserialize, Serialize};
use tilegrid_layout::{Breakpoint, DragDirection, DragSource, LayoutItem, WidgetId};

/// What the user is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Move,
    Resize,
    /// A new widget dragged in from outside the grid.
    Drop,
}

impl GestureKind {
    #[must_use]
    pub const fn drag_source(self) -> DragSource {
        match self {
            Self::Drop => DragSource::External,
            Self::Move | Self::Resize => DragSource::Internal,
        }
    }
}

/// An in-flight gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveGesture {
    pub gesture_id: u64,
    pub kind: GestureKind,
    /// Widget being moved or resized; `None` for drops.
    pub widget_id: Option<WidgetId>,
    pub breakpoint: Breakpoint,
    pub preview: Vec<LayoutItem>,
    pub direction: DragDirection,
    pub last_row: Option<f64>,
    pub preview_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum GestureState {
    #[default]
    Idle,
    Active(ActiveGesture),
}

/// Tracks at most one gesture at a time.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    state: GestureState,
    gesture_counter: u64,
}

impl GestureTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a gesture, abandoning any gesture still in flight.
    pub fn begin(&mut self, kind: GestureKind, widget_id: Option<WidgetId>, breakpoint: Breakpoint) -> u64 {
        if let Some(stale) = self.cancel() {
            tracing::debug!(gesture_id = stale.gesture_id, "abandoning unfinished gesture");
        }
        self.gesture_counter = self.gesture_counter.saturating_add(1);
        tracing::debug!(
            gesture_id = self.gesture_counter,
            ?kind,
            %breakpoint,
            widget_id = widget_id.as_ref().map(WidgetId::as_str),
            "gesture started"
        );
        self.state = GestureState::Active(ActiveGesture {
            gesture_id: self.gesture_counter,
            kind,
            widget_id,
            breakpoint,
            preview: Vec::new(),
            direction: DragDirection::Unknown,
            last_row: None,
            preview_count: 0,
        });
        self.gesture_counter
    }

    /// Replace the preview items. Returns `false` when idle.
    pub fn preview(&mut self, items: Vec<LayoutItem>) -> bool {
        match &mut self.state {
            GestureState::Active(active) => {
                active.preview = items;
                active.preview_count = active.preview_count.saturating_add(1);
                true
            }
            GestureState::Idle => false,
        }
    }

    /// Record the cursor row and return the inferred travel direction.
    ///
    /// A stationary cursor keeps the previous direction.
    pub fn track_cursor(&mut self, row: f64) -> DragDirection {
        let GestureState::Active(active) = &mut self.state else {
            return DragDirection::Unknown;
        };
        if let Some(previous) = active.last_row {
            let inferred = DragDirection::from_rows(previous, row);
            if inferred != DragDirection::Unknown {
                active.direction = inferred;
            }
        }
        active.last_row = Some(row);
        active.direction
    }

    /// End the gesture and hand back what was tracked.
    pub fn finish(&mut self) -> Option<ActiveGesture> {
        let finished = self.take();
        if let Some(active) = &finished {
            tracing::debug!(
                gesture_id = active.gesture_id,
                previews = active.preview_count,
                "gesture finished"
            );
        }
        finished
    }

    /// Drop the gesture and its preview.
    pub fn cancel(&mut self) -> Option<ActiveGesture> {
        let cancelled = self.take();
        if let Some(active) = &cancelled {
            tracing::debug!(gesture_id = active.gesture_id, "gesture cancelled");
        }
        cancelled
    }

    fn take(&mut self) -> Option<ActiveGesture> {
        match std::mem::take(&mut self.state) {
            GestureState::Active(active) => Some(active),
            GestureState::Idle => None,
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveGesture> {
        match &self.state {
            GestureState::Active(active) => Some(active),
            GestureState::Idle => None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Preview items to overlay at `breakpoint`, if a gesture there has
    /// produced any.
    #[must_use]
    pub fn preview_items(&self, breakpoint: Breakpoint) -> Option<&[LayoutItem]> {
        self.active()
            .filter(|a| a.breakpoint == breakpoint && a.preview_count > 0)
            .map(|a| a.preview.as_slice())
    }
}
