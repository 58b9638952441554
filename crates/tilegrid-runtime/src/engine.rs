#![forbid(unsafe_code)]

//! The layout engine.
//!
//! [`LayoutEngine`] owns one authoritative [`EngineState`] and exposes it
//! through a pure projection, [`LayoutEngine::view`]. Every public action
//! follows the same shape:
//!
//! 1. Build a candidate (for edits) from the array currently displayed.
//! 2. Measure it: did anything change, would it unlink, does it match the
//!    derived arrangement.
//! 3. Feed one [`SyncEvent`] to the [`SyncMachine`] and execute the
//!    returned effects in order.
//! 4. [`publish`](LayoutEngine::publish): bump the revision and hand the
//!    registered listener a fresh view.
//!
//! # Arrays
//!
//! | array                 | holds                                              |
//! |-----------------------|----------------------------------------------------|
//! | `desktop`             | desktop widgets, never with `mobile_layout`        |
//! | `mobile`              | explicit mobile arrangement (independent/pending)  |
//! | `original_*`          | baselines as of the last load or commit            |
//! | `working_baseline`    | derived snapshot taken when an unlink began        |
//! | `cached_manual_layout`| last independent arrangement, kept across toggles  |
//!
//! While linked and not pending, `mobile` is empty and the mobile view is
//! derived from `desktop` through the engine's [`DerivedLayoutCache`].

use std::fmt;

use serde::Serialize;
use tilegrid_layout::{
    Breakpoint, CrackSnapDecision, DerivedLayoutCache, DerivedLayoutCacheStats, DragSource,
    LayoutItem, LayoutState, MobileLayoutMode, StaticRegistry, Widget, WidgetConfig, WidgetId,
    WidgetRegistry, check_for_actual_changes, layout_state, normalize_widgets,
};

use crate::config::{EngineConfig, SnapBackPolicy};
use crate::gesture::{ActiveGesture, GestureKind, GestureTracker};
use crate::history::{HistorySnapshot, HistoryStack, MultiStackHistory};
use crate::machine::{
    EditInput, EditKind, HistoryDirection, SyncEffect, SyncEvent, SyncMachine, SyncState,
    SyncTransition,
};
use crate::ops::{
    self, apply_items, fill_mobile_layouts, next_widget_id, patch_config, place_new_widget,
    reconcile_mobile, remove_widget, sort_by_position, strip_mobile_layouts,
};
use crate::payload::{LoadPayload, PayloadError, SavePayload};

/// Authoritative widget data. Mode and flags live in [`SyncState`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineState {
    pub desktop: Vec<Widget>,
    pub mobile: Vec<Widget>,
    pub original_desktop: Vec<Widget>,
    pub original_mobile: Vec<Widget>,
    pub original_mode: MobileLayoutMode,
    pub working_baseline: Vec<Widget>,
    pub cached_manual_layout: Option<CachedManualLayout>,
    pub selected_id: Option<WidgetId>,
    pub editing: bool,
    pub revision: u64,
}

/// Independent arrangement set aside by a toggle to linked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedManualLayout {
    pub widgets: Vec<Widget>,
    /// Desktop ids when the arrangement was cached. A cached widget whose id
    /// was on desktop then and is gone now was deleted on desktop meanwhile.
    pub desktop_ids: Vec<WidgetId>,
}

/// Everything a renderer needs, computed from [`EngineState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineView {
    pub revision: u64,
    pub breakpoint: Breakpoint,
    pub mobile_layout_mode: MobileLayoutMode,
    pub pending_unlink: bool,
    pub has_unsaved_changes: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub editing: bool,
    pub selected_id: Option<WidgetId>,
    pub display_widgets: Vec<Widget>,
    pub layout_state: LayoutState,
}

type Listener = Box<dyn FnMut(&EngineView)>;

/// Inputs the effects of one transition may consume.
#[derive(Default)]
struct EffectContext {
    candidate: Option<Vec<Widget>>,
    config_patch: Option<(WidgetId, WidgetConfig)>,
    loaded: Option<(Vec<Widget>, Vec<Widget>)>,
}

/// Responsive grid editing engine.
pub struct LayoutEngine<R: WidgetRegistry = StaticRegistry> {
    registry: R,
    config: EngineConfig,
    state: EngineState,
    machine: SyncMachine,
    history: MultiStackHistory,
    cache: DerivedLayoutCache,
    gesture: GestureTracker,
    listener: Option<Listener>,
}

impl<R: WidgetRegistry> fmt::Debug for LayoutEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("config", &self.config)
            .field("sync", &self.machine.state())
            .field("desktop", &self.state.desktop.len())
            .field("mobile", &self.state.mobile.len())
            .field("revision", &self.state.revision)
            .field("history", &self.history)
            .field("gesture", &self.gesture.active())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl<R: WidgetRegistry> LayoutEngine<R> {
    #[must_use]
    pub fn new(registry: R) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Build an engine with explicit tunables. The config is used as given;
    /// run [`EngineConfig::validated`] first for untrusted input.
    #[must_use]
    pub fn with_config(registry: R, config: EngineConfig) -> Self {
        Self {
            history: MultiStackHistory::new(config.history_config()),
            cache: DerivedLayoutCache::new(config.derived_cache_capacity),
            registry,
            config,
            state: EngineState::default(),
            machine: SyncMachine::default(),
            gesture: GestureTracker::new(),
            listener: None,
        }
    }

    /// Register the callback invoked once per published action.
    pub fn set_listener(&mut self, listener: impl FnMut(&EngineView) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    // ====================================================================
    // Queries
    // ====================================================================

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.machine.state()
    }

    #[must_use]
    pub fn breakpoint(&self) -> Breakpoint {
        self.machine.state().breakpoint
    }

    #[must_use]
    pub fn mobile_layout_mode(&self) -> MobileLayoutMode {
        self.machine.state().mode
    }

    #[must_use]
    pub fn pending_unlink(&self) -> bool {
        self.machine.state().pending_unlink
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.machine.state().dirty
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        let s = self.machine.state();
        self.history.can_undo_in(s.breakpoint, s.mode, s.pending_unlink)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        let s = self.machine.state();
        self.history.can_redo_in(s.breakpoint, s.mode, s.pending_unlink)
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&WidgetId> {
        self.state.selected_id.as_ref()
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.state.editing
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    #[must_use]
    pub fn desktop_widgets(&self) -> &[Widget] {
        &self.state.desktop
    }

    /// The explicit mobile array; empty while linked and not pending.
    #[must_use]
    pub fn mobile_widgets(&self) -> &[Widget] {
        &self.state.mobile
    }

    #[must_use]
    pub fn history(&self) -> &MultiStackHistory {
        &self.history
    }

    #[must_use]
    pub fn cache_stats(&self) -> DerivedLayoutCacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn gesture(&self) -> Option<&ActiveGesture> {
        self.gesture.active()
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ====================================================================
    // Projection
    // ====================================================================

    fn derived_mobile(&mut self) -> Vec<Widget> {
        self.cache.get_or_derive(&self.state.desktop, &self.registry)
    }

    /// The mobile arrangement, explicit or derived.
    fn mobile_source(&mut self) -> Vec<Widget> {
        if self.machine.state().explicit_mobile() {
            let mut mobile = self.state.mobile.clone();
            sort_by_position(&mut mobile, Breakpoint::Mobile);
            mobile
        } else {
            self.derived_mobile()
        }
    }

    /// Widgets shown at the current breakpoint, in display order.
    pub fn display_widgets(&mut self) -> Vec<Widget> {
        match self.breakpoint() {
            Breakpoint::Desktop => self.state.desktop.clone(),
            Breakpoint::Mobile => self.mobile_source(),
        }
    }

    /// Layout items for both breakpoints, with any gesture preview overlaid.
    pub fn layout_state(&mut self) -> LayoutState {
        let mobile = self.mobile_source();
        let mut state = layout_state(&self.state.desktop, &mobile, &self.registry);
        let breakpoint = self.breakpoint();
        if let Some(preview) = self.gesture.preview_items(breakpoint) {
            let items = match breakpoint {
                Breakpoint::Desktop => &mut state.lg,
                Breakpoint::Mobile => &mut state.sm,
            };
            for overlay in preview {
                match items.iter_mut().find(|item| item.id == overlay.id) {
                    Some(item) => {
                        item.x = overlay.x;
                        item.y = overlay.y;
                        item.w = overlay.w;
                        item.h = overlay.h;
                    }
                    None => items.push(overlay.clone()),
                }
            }
        }
        state
    }

    /// Pure projection of the current state.
    pub fn view(&mut self) -> EngineView {
        let sync = self.machine.state();
        EngineView {
            revision: self.state.revision,
            breakpoint: sync.breakpoint,
            mobile_layout_mode: sync.mode,
            pending_unlink: sync.pending_unlink,
            has_unsaved_changes: sync.dirty,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            editing: self.state.editing,
            selected_id: self.state.selected_id.clone(),
            display_widgets: self.display_widgets(),
            layout_state: self.layout_state(),
        }
    }

    /// Payload for the persistence collaborator.
    ///
    /// A pending unlink is saved as independent with the working copy, which
    /// is what [`commit_changes`](Self::commit_changes) will promote it to.
    #[must_use]
    pub fn save_payload(&self) -> SavePayload {
        let sync = self.machine.state();
        if sync.explicit_mobile() {
            let mut mobile_widgets = self.state.mobile.clone();
            sort_by_position(&mut mobile_widgets, Breakpoint::Mobile);
            SavePayload {
                widgets: self.state.desktop.clone(),
                mobile_widgets,
                mobile_layout_mode: MobileLayoutMode::Independent,
            }
        } else {
            SavePayload {
                widgets: self.state.desktop.clone(),
                mobile_widgets: Vec::new(),
                mobile_layout_mode: MobileLayoutMode::Linked,
            }
        }
    }

    // ====================================================================
    // Apply / Notify
    // ====================================================================

    fn publish(&mut self) {
        self.state.revision = self.state.revision.saturating_add(1);
        if let Some(mut listener) = self.listener.take() {
            let view = self.view();
            listener(&view);
            self.listener = Some(listener);
        }
    }

    fn dispatch(&mut self, event: SyncEvent, mut ctx: EffectContext) -> SyncTransition {
        let transition = self.machine.apply(&event);
        for effect in &transition.effects {
            self.execute(*effect, &mut ctx);
        }
        transition
    }

    fn execute(&mut self, effect: SyncEffect, ctx: &mut EffectContext) {
        match effect {
            SyncEffect::CaptureHistory { stack } => {
                let widgets = match stack {
                    HistoryStack::Desktop => self.state.desktop.clone(),
                    HistoryStack::Mobile => self.state.mobile.clone(),
                };
                self.history
                    .push(stack, HistorySnapshot::new(widgets, self.state.selected_id.clone()));
            }
            SyncEffect::ApplyToDesktop => {
                if let Some(candidate) = &ctx.candidate {
                    self.state.desktop = strip_mobile_layouts(candidate);
                }
            }
            SyncEffect::ApplyToMobile => {
                if let Some(candidate) = &ctx.candidate {
                    let mut mobile = candidate.clone();
                    fill_mobile_layouts(&mut mobile);
                    self.state.mobile = mobile;
                }
            }
            SyncEffect::SeedDesktop => {
                if self.state.desktop.is_empty()
                    && let Some(candidate) = &ctx.candidate
                {
                    self.state.desktop = strip_mobile_layouts(candidate);
                }
            }
            SyncEffect::PatchConfig { desktop, mobile } => {
                if let Some((id, patch)) = &ctx.config_patch {
                    let targets = [
                        (desktop, &mut self.state.desktop),
                        (mobile, &mut self.state.mobile),
                    ];
                    for (enabled, widgets) in targets {
                        if enabled && let Some(widget) = widgets.iter_mut().find(|w| w.id == *id) {
                            patch_config(widget, patch);
                        }
                    }
                }
            }
            SyncEffect::BeginWorkingCopy => {
                let derived = self.derived_mobile();
                self.state.working_baseline.clone_from(&derived);
                self.state.mobile = derived;
            }
            SyncEffect::SnapBack => {
                self.state.mobile.clear();
                self.state.working_baseline.clear();
                self.history.clear(Some(HistoryStack::Mobile));
                tracing::debug!("mobile arrangement matches desktop again; unlink reverted");
            }
            SyncEffect::DeriveMobileArray => {
                self.state.mobile = self.derived_mobile();
            }
            SyncEffect::ClearMobileArray => {
                self.state.mobile.clear();
                self.state.working_baseline.clear();
            }
            SyncEffect::CacheManualLayout => {
                if !self.state.mobile.is_empty() {
                    self.state.cached_manual_layout = Some(CachedManualLayout {
                        widgets: self.state.mobile.clone(),
                        desktop_ids: self.state.desktop.iter().map(|w| w.id.clone()).collect(),
                    });
                }
            }
            SyncEffect::RestoreManualLayout => {
                self.state.mobile = match self.state.cached_manual_layout.take() {
                    Some(cached) => reconcile_mobile(cached.widgets, &self.state.desktop, &cached.desktop_ids),
                    None if !self.state.mobile.is_empty() => {
                        reconcile_mobile(std::mem::take(&mut self.state.mobile), &self.state.desktop, &[])
                    }
                    None => self.derived_mobile(),
                };
                self.state.working_baseline.clear();
            }
            SyncEffect::RestoreHistory { stack, direction } => {
                self.restore_history(stack, direction);
            }
            SyncEffect::PromoteBaselines { mobile } => {
                self.state.original_desktop.clone_from(&self.state.desktop);
                self.state.original_mobile = if mobile {
                    self.state.mobile.clone()
                } else {
                    Vec::new()
                };
                self.state.original_mode = self.machine.state().mode;
                self.state.working_baseline.clear();
            }
            SyncEffect::RestoreBaselines => {
                self.state.desktop.clone_from(&self.state.original_desktop);
                self.state.mobile = match self.state.original_mode {
                    MobileLayoutMode::Independent => self.state.original_mobile.clone(),
                    MobileLayoutMode::Linked => Vec::new(),
                };
                self.state.working_baseline.clear();
                self.state.selected_id = None;
                self.state.editing = false;
                self.gesture.cancel();
            }
            SyncEffect::ReplaceAll => {
                if let Some((desktop, mobile)) = ctx.loaded.take() {
                    self.state.original_desktop.clone_from(&desktop);
                    self.state.original_mobile.clone_from(&mobile);
                    self.state.original_mode = self.machine.state().mode;
                    self.state.desktop = desktop;
                    self.state.mobile = mobile;
                    self.state.working_baseline.clear();
                    self.state.selected_id = None;
                    self.cache.clear();
                    self.gesture.cancel();
                }
            }
            SyncEffect::ClearCachedManualLayout => {
                self.state.cached_manual_layout = None;
            }
            SyncEffect::ClearHistory => {
                self.history.clear(None);
            }
            SyncEffect::Noop { .. } => {}
        }
    }

    fn restore_history(&mut self, stack: HistoryStack, direction: HistoryDirection) {
        let target = match stack {
            HistoryStack::Desktop => &mut self.state.desktop,
            HistoryStack::Mobile => &mut self.state.mobile,
        };
        let current = HistorySnapshot::new(target.clone(), self.state.selected_id.clone());
        self.history.begin_apply();
        let restored = match direction {
            HistoryDirection::Undo => self.history.undo(stack, current),
            HistoryDirection::Redo => self.history.redo(stack, current),
        };
        if let Some(snapshot) = restored {
            *target = snapshot.widgets;
            self.state.selected_id = snapshot
                .selected_id
                .filter(|id| target.iter().any(|w| w.id == *id));
        }
        self.history.end_apply();
    }

    /// Measure `candidate` against the displayed array and route it.
    fn submit_edit(&mut self, kind: EditKind, candidate: Vec<Widget>) -> bool {
        let sync = self.machine.state();
        let breakpoint = sync.breakpoint;
        let current = self.display_widgets();
        let changed = check_for_actual_changes(
            &candidate,
            breakpoint,
            &current,
            &current,
            MobileLayoutMode::Independent,
            false,
            &current,
        )
        .has_changes;
        let report = check_for_actual_changes(
            &candidate,
            breakpoint,
            &self.state.original_desktop,
            &self.state.original_mobile,
            sync.mode,
            sync.pending_unlink,
            &self.state.working_baseline,
        );

        let matches_derived = sync.pending_unlink
            && breakpoint.is_mobile()
            && sync.mode == MobileLayoutMode::Linked
            && self.config.snap_back == SnapBackPolicy::Geometric
            && {
                let derived = self.derived_mobile();
                !check_for_actual_changes(
                    &candidate,
                    Breakpoint::Mobile,
                    &derived,
                    &derived,
                    MobileLayoutMode::Independent,
                    false,
                    &derived,
                )
                .has_changes
            };

        let input = EditInput {
            kind,
            changed,
            report,
            matches_derived,
            desktop_empty: self.state.desktop.is_empty(),
        };
        let ctx = EffectContext {
            candidate: Some(candidate),
            ..EffectContext::default()
        };
        !self.dispatch(SyncEvent::Edit(input), ctx).is_noop()
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    /// Replace everything with freshly loaded data.
    ///
    /// Raw records are normalized (see [`normalize_widgets`]). An
    /// independent payload without mobile widgets starts from a derived
    /// arrangement.
    pub fn set_initial_data(&mut self, payload: LoadPayload) {
        let _span = tracing::debug_span!("engine.action", action = "set_initial_data").entered();
        let desktop = strip_mobile_layouts(&normalize_widgets(&payload.widgets, &self.registry));
        let mode = payload.mobile_layout_mode;
        let mobile = match mode {
            MobileLayoutMode::Linked => {
                if !payload.mobile_widgets.is_empty() {
                    tracing::debug!(
                        count = payload.mobile_widgets.len(),
                        "ignoring mobile widgets of a linked layout"
                    );
                }
                Vec::new()
            }
            MobileLayoutMode::Independent if payload.mobile_widgets.is_empty() => {
                self.cache.get_or_derive(&desktop, &self.registry)
            }
            MobileLayoutMode::Independent => {
                let mut mobile = normalize_widgets(&payload.mobile_widgets, &self.registry);
                fill_mobile_layouts(&mut mobile);
                mobile
            }
        };
        tracing::debug!(
            widgets = desktop.len(),
            mobile_widgets = mobile.len(),
            %mode,
            "layout loaded"
        );
        let ctx = EffectContext {
            loaded: Some((desktop, mobile)),
            ..EffectContext::default()
        };
        self.dispatch(SyncEvent::Load { mode }, ctx);
        self.publish();
    }

    /// Decode a JSON payload and load it.
    pub fn load_json(&mut self, json: &str) -> Result<(), PayloadError> {
        let payload = LoadPayload::from_json(json)?;
        self.set_initial_data(payload);
        Ok(())
    }

    /// Enter edit mode.
    pub fn start_editing(&mut self) {
        self.state.editing = true;
        self.publish();
    }

    /// Adopt the current arrays as the new baselines after a successful
    /// external save.
    pub fn commit_changes(&mut self) {
        let _span = tracing::debug_span!("engine.action", action = "commit_changes").entered();
        self.dispatch(SyncEvent::Commit, EffectContext::default());
        self.publish();
    }

    /// Throw away every edit since the last load or commit.
    pub fn cancel_editing(&mut self) {
        let _span = tracing::debug_span!("engine.action", action = "cancel_editing").entered();
        let baseline_mode = self.state.original_mode;
        self.dispatch(SyncEvent::Cancel { baseline_mode }, EffectContext::default());
        self.publish();
    }

    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        let _span = tracing::debug_span!("engine.action", action = "set_breakpoint", %breakpoint).entered();
        let transition = self.dispatch(SyncEvent::SetBreakpoint { breakpoint }, EffectContext::default());
        if !transition.is_noop() {
            self.gesture.cancel();
        }
        self.publish();
    }

    /// Replace the widget-type registry. Derived arrangements are recomputed.
    pub fn set_registry(&mut self, registry: R) {
        self.registry = registry;
        self.cache.invalidate_all();
        self.publish();
    }

    /// Select a displayed widget, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        let found = match id {
            None => {
                self.state.selected_id = None;
                true
            }
            Some(id) => match self.display_widgets().into_iter().find(|w| w.id == id) {
                Some(widget) => {
                    self.state.selected_id = Some(widget.id);
                    true
                }
                None => false,
            },
        };
        self.publish();
        found
    }

    // ====================================================================
    // Widget CRUD
    // ====================================================================

    /// Add a widget of `widget_type` at the bottom of the displayed
    /// arrangement and return its id.
    pub fn add_widget(&mut self, widget_type: &str, config: WidgetConfig) -> WidgetId {
        let _span = tracing::debug_span!("engine.action", action = "add_widget", widget_type).entered();
        let breakpoint = self.breakpoint();
        let mut candidate = self.display_widgets();
        let id = next_widget_id(
            widget_type,
            self.state.desktop.iter().chain(&self.state.mobile).chain(&candidate),
        );
        let widget = place_new_widget(
            id.clone(),
            widget_type,
            config,
            &self.registry,
            &self.state.desktop,
            breakpoint.is_mobile().then_some(candidate.as_slice()),
        );
        candidate.push(widget);
        self.submit_edit(EditKind::Add, candidate);
        self.publish();
        id
    }

    /// Delete a widget from the displayed arrangement.
    pub fn delete_widget(&mut self, id: &str) -> bool {
        let _span = tracing::debug_span!("engine.action", action = "delete_widget", widget_id = id).entered();
        let mut candidate = self.display_widgets();
        let applied = match remove_widget(&mut candidate, id) {
            Some(_) => {
                let applied = self.submit_edit(EditKind::Delete, candidate);
                if applied && self.state.selected_id.as_ref().is_some_and(|s| s == id) {
                    self.state.selected_id = None;
                }
                applied
            }
            None => {
                tracing::debug!(widget_id = id, "delete ignored: unknown widget");
                false
            }
        };
        self.publish();
        applied
    }

    /// Shallow-merge `patch` into a widget's config.
    pub fn update_widget_config(&mut self, id: &str, patch: WidgetConfig) -> bool {
        let _span =
            tracing::debug_span!("engine.action", action = "update_widget_config", widget_id = id).entered();
        let target = self.display_widgets().into_iter().find(|w| w.id == id);
        let applied = match target {
            Some(mut widget) => {
                let changed = patch_config(&mut widget, &patch);
                let ctx = EffectContext {
                    config_patch: Some((widget.id, patch)),
                    ..EffectContext::default()
                };
                !self.dispatch(SyncEvent::ConfigEdit { changed }, ctx).is_noop()
            }
            None => {
                tracing::debug!(widget_id = id, "config update ignored: unknown widget");
                false
            }
        };
        self.publish();
        applied
    }

    /// Resize a widget at the current breakpoint, clamped to its
    /// constraints.
    pub fn resize_widget(&mut self, id: &str, w: u32, h: u32) -> bool {
        let _span = tracing::debug_span!("engine.action", action = "resize_widget", widget_id = id, w, h).entered();
        let breakpoint = self.breakpoint();
        let mut candidate = self.display_widgets();
        let resized = match candidate.iter_mut().find(|widget| widget.id == id) {
            Some(widget) => ops::resize_widget(widget, breakpoint, w, h, &self.registry),
            None => {
                tracing::debug!(widget_id = id, "resize ignored: unknown widget");
                false
            }
        };
        let applied = resized && self.submit_edit(EditKind::Geometry, candidate);
        self.publish();
        applied
    }

    /// Switch between linked and independent mobile layouts.
    pub fn toggle_mobile_layout_mode(&mut self) {
        let _span = tracing::debug_span!("engine.action", action = "toggle_mobile_layout_mode").entered();
        self.dispatch(SyncEvent::ToggleMode, EffectContext::default());
        self.publish();
    }

    /// Replace the explicit mobile arrangement with a fresh derivation.
    pub fn reset_mobile_layout(&mut self) -> bool {
        let _span = tracing::debug_span!("engine.action", action = "reset_mobile_layout").entered();
        let applied = !self.dispatch(SyncEvent::ResetMobile, EffectContext::default()).is_noop();
        self.publish();
        applied
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(HistoryDirection::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(HistoryDirection::Redo)
    }

    fn step_history(&mut self, direction: HistoryDirection) -> bool {
        let _span = tracing::debug_span!("engine.action", action = "history", ?direction).entered();
        let available = match direction {
            HistoryDirection::Undo => self.can_undo(),
            HistoryDirection::Redo => self.can_redo(),
        };
        let applied = !self
            .dispatch(SyncEvent::History { direction, available }, EffectContext::default())
            .is_noop();
        self.publish();
        applied
    }

    // ====================================================================
    // Gestures
    // ====================================================================

    /// Commit a final arrangement for `breakpoint` without a gesture.
    ///
    /// Items for a breakpoint other than the active one are ignored.
    pub fn apply_layout_change(&mut self, breakpoint: Breakpoint, items: &[LayoutItem]) -> bool {
        let _span = tracing::debug_span!("engine.action", action = "apply_layout_change", %breakpoint).entered();
        let applied = self.commit_layout(breakpoint, items);
        self.publish();
        applied
    }

    fn commit_layout(&mut self, breakpoint: Breakpoint, items: &[LayoutItem]) -> bool {
        if breakpoint != self.breakpoint() {
            tracing::debug!(%breakpoint, "layout change for inactive breakpoint ignored");
            return false;
        }
        let candidate = apply_items(&self.display_widgets(), items, breakpoint);
        self.submit_edit(EditKind::Geometry, candidate)
    }

    /// Start tracking a gesture. `widget_id` must name a displayed widget
    /// when given.
    pub fn begin_gesture(&mut self, kind: GestureKind, widget_id: Option<&str>) -> Option<u64> {
        let widget_id = match widget_id {
            Some(id) => Some(self.display_widgets().into_iter().find(|w| w.id == id)?.id),
            None => None,
        };
        let gesture_id = self.gesture.begin(kind, widget_id, self.breakpoint());
        self.publish();
        Some(gesture_id)
    }

    /// Show an in-flight arrangement. Never touches widgets or history.
    pub fn preview_gesture(&mut self, items: Vec<LayoutItem>) -> bool {
        let accepted = self.gesture.preview(items);
        if accepted {
            self.publish();
        }
        accepted
    }

    /// End the gesture and commit its final arrangement.
    pub fn finish_gesture(&mut self, items: &[LayoutItem]) -> bool {
        let _span = tracing::debug_span!("engine.action", action = "finish_gesture").entered();
        let applied = match self.gesture.finish() {
            Some(gesture) => self.commit_layout(gesture.breakpoint, items),
            None => false,
        };
        self.publish();
        applied
    }

    pub fn cancel_gesture(&mut self) -> bool {
        let cancelled = self.gesture.cancel().is_some();
        self.publish();
        cancelled
    }

    /// Snap decision for a cursor at `cursor_row` during the current drag.
    pub fn suggest_drop_row(&mut self, cursor_row: f64) -> CrackSnapDecision {
        let direction = self.gesture.track_cursor(cursor_row);
        let (source, dragged) = match self.gesture.active() {
            Some(active) => (active.kind.drag_source(), active.widget_id.clone()),
            None => (DragSource::Internal, None),
        };
        let tolerance = source.tolerance(self.config.external_drag_tolerance);
        let widgets = self.display_widgets();
        CrackSnapDecision::decide(
            &widgets,
            dragged.as_ref().map(WidgetId::as_str),
            self.breakpoint(),
            cursor_row,
            direction,
            tolerance,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tilegrid_layout::{GridRect, RawWidget};

    fn engine_with(widgets: &[Widget]) -> LayoutEngine {
        let mut engine = LayoutEngine::new(StaticRegistry::new());
        engine.set_initial_data(LoadPayload {
            widgets: widgets.iter().map(RawWidget::from).collect(),
            ..LoadPayload::default()
        });
        engine
    }

    fn w(id: &str, x: u32, y: u32) -> Widget {
        Widget::new(id, "card", GridRect::new(x, y, 4, 2))
    }

    #[test]
    fn listener_sees_every_publish() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine_with(&[w("a", 0, 0)]);
        let sink = Rc::clone(&seen);
        engine.set_listener(move |view| sink.borrow_mut().push(view.revision));
        engine.set_breakpoint(Breakpoint::Mobile);
        engine.select(Some("a"));
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn desktop_move_updates_desktop_and_history() {
        let mut engine = engine_with(&[w("a", 0, 0), w("b", 4, 0)]);
        let moved = engine.apply_layout_change(
            Breakpoint::Desktop,
            &[LayoutItem::at("b", GridRect::new(0, 2, 4, 2))],
        );
        assert!(moved);
        assert_eq!(engine.desktop_widgets()[1].layout.y, 2);
        assert!(engine.has_unsaved_changes());
        assert!(engine.can_undo());
        assert!(!engine.pending_unlink());
    }

    #[test]
    fn unchanged_layout_is_not_recorded() {
        let mut engine = engine_with(&[w("a", 0, 0)]);
        let same = engine.apply_layout_change(
            Breakpoint::Desktop,
            &[LayoutItem::at("a", GridRect::new(0, 0, 4, 2))],
        );
        assert!(!same);
        assert!(!engine.can_undo());
        assert!(!engine.has_unsaved_changes());
    }

    #[test]
    fn inactive_breakpoint_items_are_ignored() {
        let mut engine = engine_with(&[w("a", 0, 0)]);
        assert!(!engine.apply_layout_change(
            Breakpoint::Mobile,
            &[LayoutItem::at("a", GridRect::new(0, 5, 2, 2))],
        ));
    }

    #[test]
    fn referential_misses_are_noops() {
        let mut engine = engine_with(&[w("a", 0, 0)]);
        assert!(!engine.delete_widget("ghost"));
        assert!(!engine.resize_widget("ghost", 2, 2));
        assert!(!engine.update_widget_config("ghost", WidgetConfig::new()));
        assert!(!engine.select(Some("ghost")));
        assert!(engine.begin_gesture(GestureKind::Move, Some("ghost")).is_none());
        assert!(!engine.has_unsaved_changes());
    }

    #[test]
    fn add_then_delete_clears_selection() {
        let mut engine = engine_with(&[w("a", 0, 0)]);
        let id = engine.add_widget("card", WidgetConfig::new());
        assert_eq!(id, WidgetId::from("card-1"));
        assert_eq!(engine.desktop_widgets()[1].layout, GridRect::new(0, 2, 4, 2));
        assert!(engine.select(Some("card-1")));
        assert!(engine.delete_widget("card-1"));
        assert!(engine.selected_id().is_none());
        assert_eq!(engine.desktop_widgets().len(), 1);
    }

    #[test]
    fn gesture_preview_overlays_without_history() {
        let mut engine = engine_with(&[w("a", 0, 0)]);
        engine.begin_gesture(GestureKind::Move, Some("a")).unwrap();
        engine.preview_gesture(vec![LayoutItem::at("a", GridRect::new(4, 3, 4, 2))]);
        let state = engine.layout_state();
        assert_eq!((state.lg[0].x, state.lg[0].y), (4, 3));
        assert_eq!(engine.desktop_widgets()[0].layout.y, 0);
        assert!(!engine.can_undo());

        assert!(engine.finish_gesture(&[LayoutItem::at("a", GridRect::new(4, 3, 4, 2))]));
        assert_eq!(engine.desktop_widgets()[0].layout, GridRect::new(4, 3, 4, 2));
        assert_eq!(engine.history().undo_depth(HistoryStack::Desktop), 1);
    }

    #[test]
    fn cancelled_gesture_leaves_no_trace() {
        let mut engine = engine_with(&[w("a", 0, 0)]);
        engine.begin_gesture(GestureKind::Resize, Some("a")).unwrap();
        engine.preview_gesture(vec![LayoutItem::at("a", GridRect::new(0, 0, 8, 4))]);
        assert!(engine.cancel_gesture());
        assert_eq!(engine.layout_state().lg[0].w, 4);
        assert!(!engine.finish_gesture(&[]));
    }

    #[test]
    fn drop_suggestion_uses_cracks_of_displayed_widgets() {
        let mut engine = engine_with(&[w("a", 0, 0), Widget::new("b", "card", GridRect::new(0, 2, 4, 3))]);
        engine.begin_gesture(GestureKind::Drop, None).unwrap();
        engine.suggest_drop_row(1.0);
        let decision = engine.suggest_drop_row(1.6);
        assert_eq!(decision.target_row, Some(5));
        engine.cancel_gesture();
        let decision = engine.suggest_drop_row(2.2);
        assert_eq!(decision.snapped_row(), Some(2));
    }

    #[test]
    fn save_payload_while_linked_has_no_mobile_widgets() {
        let engine = engine_with(&[w("a", 0, 0)]);
        let payload = engine.save_payload();
        assert_eq!(payload.mobile_layout_mode, MobileLayoutMode::Linked);
        assert!(payload.mobile_widgets.is_empty());
        assert_eq!(payload.widgets.len(), 1);
    }

    #[test]
    fn registry_swap_invalidates_derivation() {
        use tilegrid_layout::{GridSize, WidgetTypeSpec};
        let mut engine = engine_with(&[w("a", 0, 0)]);
        engine.set_breakpoint(Breakpoint::Mobile);
        engine.display_widgets();
        engine.set_registry(StaticRegistry::new().with_type("card", WidgetTypeSpec::new(GridSize::new(4, 2))));
        let before = engine.cache_stats().misses;
        engine.display_widgets();
        assert_eq!(engine.cache_stats().misses, before + 1);
    }
}
