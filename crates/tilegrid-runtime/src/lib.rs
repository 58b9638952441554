#![forbid(unsafe_code)]

//! tilegrid runtime
//!
//! This crate provides the stateful half of tilegrid: it owns widget
//! arrays, the linked/independent mobile synchronization state, and
//! dual-stack undo/redo, and it turns discrete edit events into committed
//! layouts.
//!
//! # Key Components
//!
//! - [`LayoutEngine`] - the orchestrator and its public action surface
//! - [`SyncMachine`] - explicit (state, event) → (state, effects) transitions
//! - [`MultiStackHistory`] - independent desktop and mobile undo/redo stacks
//! - [`GestureTracker`] - preview-then-commit lifecycle of one gesture
//! - [`EngineConfig`] - tunables, loadable from TOML/JSON with `config-files`
//! - [`SavePayload`] / [`LoadPayload`] - the persistence boundary
//!
//! # How it fits in the system
//! Geometry lives in `tilegrid-layout`; this crate decides which array an
//! edit lands in and when mobile stops following desktop. Rendering,
//! gesture capture and persistence are external and talk to the engine
//! through [`EngineView`], [`LayoutItem`] lists, and payloads.

pub mod config;
pub mod engine;
pub mod gesture;
pub mod history;
pub mod machine;
pub mod ops;
pub mod payload;

pub use config::{EngineConfig, EngineConfigError, SnapBackPolicy};
pub use engine::{CachedManualLayout, EngineState, EngineView, LayoutEngine};
pub use gesture::{ActiveGesture, GestureKind, GestureTracker};
pub use history::{HistoryConfig, HistorySnapshot, HistoryStack, MultiStackHistory};
pub use machine::{
    EditInput, EditKind, HistoryDirection, SyncEffect, SyncEvent, SyncMachine, SyncNoopReason,
    SyncState, SyncTransition,
};
pub use payload::{LoadPayload, PayloadError, SavePayload};

pub use tilegrid_layout::{
    Breakpoint, GridRect, LayoutItem, LayoutState, MobileLayoutMode, StaticRegistry, Widget,
    WidgetConfig, WidgetId,
};
