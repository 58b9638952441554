#![forbid(unsafe_code)]

//! Normalization of malformed input must warn, never fail.
//!
//! Run:
//!   cargo test -p tilegrid-layout --test normalize_tracing

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tilegrid_layout::{
    GridRect, GridSize, RawWidget, StaticRegistry, WidgetTypeSpec, is_valid_widget_set,
    normalize_widgets,
};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields,
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn raw(value: serde_json::Value) -> RawWidget {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn missing_fields_warn_once_per_repair() {
    let registry =
        StaticRegistry::new().with_type("chart", WidgetTypeSpec::new(GridSize::new(6, 4)));
    let input = vec![raw(json!({"id": "a", "type": "chart", "layout": {"x": 2}}))];

    let mut widgets = Vec::new();
    let events = with_captured_events(|| widgets = normalize_widgets(&input, &registry));

    assert_eq!(widgets[0].layout, GridRect::new(2, 0, 6, 4));
    let warns: Vec<_> = events
        .iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    // y, w and h were repaired.
    assert_eq!(warns.len(), 3);
    assert!(warns.iter().all(|e| e.fields.get("widget_id").map(String::as_str) == Some("a")));
    let fields: Vec<&str> = warns
        .iter()
        .filter_map(|e| e.fields.get("field").map(String::as_str))
        .collect();
    assert_eq!(fields, vec!["y", "w", "h"]);
}

#[test]
fn well_formed_input_is_silent() {
    let input = vec![raw(json!({"id": "a", "type": "card", "layout": {"x": 0, "y": 0, "w": 4, "h": 2}}))];
    let events = with_captured_events(|| {
        let _ = normalize_widgets(&input, &StaticRegistry::new());
    });
    assert!(events.iter().all(|e| e.level != tracing::Level::WARN));
}

#[test]
fn invalid_sets_are_repaired_with_warnings() {
    let input = vec![
        raw(json!({"id": "a", "type": "card", "layout": {"x": -2, "y": 0, "w": 4, "h": 2}})),
        raw(json!({"id": "a", "type": "card", "layout": {"x": 0, "y": 0, "w": 4, "h": 2}})),
        raw(json!({"type": "card"})),
    ];
    assert!(!is_valid_widget_set(&input));

    let mut widgets = Vec::new();
    let events = with_captured_events(|| widgets = normalize_widgets(&input, &StaticRegistry::new()));
    assert_eq!(widgets.len(), 1);
    assert_eq!(widgets[0].layout.x, 0);
    let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"negative coordinate clamped to 0"));
    assert!(messages.contains(&"dropping widget with duplicate id"));
    assert!(messages.contains(&"dropping widget without id"));
}
