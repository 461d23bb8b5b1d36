#![forbid(unsafe_code)]

//! Tracing contract of the history engine: span names, event targets and
//! the long-replay warning.
//!
//! Run:
//!   cargo test -p histree --test tracing_history_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use histree::{
    ActionHandle, ActionRegistry, BranchId, BranchSwitchMode, CustomHandler, HistoryConfig,
    HistoryEngine,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
#[allow(dead_code)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
    fields: HashMap<String, String>,
    parent_span_name: Option<String>,
}

struct EventCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct CaptureHandle {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureHandle {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn messages(&self, target: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.target == target)
            .map(|e| e.message)
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields,
            parent_span_name,
        });
    }
}

fn with_captured_tracing<F>(f: F) -> CaptureHandle
where
    F: FnOnce(),
{
    let spans = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        spans: spans.clone(),
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    CaptureHandle { spans, events }
}

fn registry() -> (ActionRegistry<Vec<u32>>, ActionHandle<u32>) {
    let mut registry = ActionRegistry::new();
    let push = registry
        .register_custom(
            "push",
            CustomHandler::new(
                |s: &mut Vec<u32>, v: &u32| s.push(*v),
                |s: &mut Vec<u32>, _: &u32| {
                    s.pop();
                },
            ),
        )
        .unwrap();
    (registry, push)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn registration_logs_under_registry_target() {
    let handle = with_captured_tracing(|| {
        let (registry, _) = registry();
        assert_eq!(registry.len(), 1);
    });
    let events = handle.events();
    let registered: Vec<_> = events
        .iter()
        .filter(|e| e.target == "histree.registry" && e.message == "action registered")
        .collect();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].fields.get("action").map(String::as_str), Some("push"));
}

#[test]
fn dispatch_runs_inside_dispatch_span() {
    let handle = with_captured_tracing(|| {
        let (registry, push) = registry();
        let mut engine: HistoryEngine<Vec<u32>> = HistoryEngine::new(registry);
        let mut state = Vec::new();
        engine.dispatch(&mut state, &push, 1).unwrap();
    });

    let spans = handle.spans();
    let dispatch = spans
        .iter()
        .find(|s| s.name == "history.dispatch")
        .expect("dispatch span");
    assert_eq!(dispatch.fields.get("action").map(String::as_str), Some("push"));
    assert_eq!(dispatch.fields.get("branch").map(String::as_str), Some("b0"));

    let events = handle.events();
    let dispatched = events
        .iter()
        .find(|e| e.message == "action dispatched")
        .expect("dispatch event");
    assert_eq!(dispatched.target, "histree.engine");
    assert_eq!(dispatched.level, tracing::Level::DEBUG);
    assert_eq!(dispatched.parent_span_name.as_deref(), Some("history.dispatch"));
    assert_eq!(dispatched.fields.get("position").map(String::as_str), Some("b0@0"));
}

#[test]
fn fork_logs_branch_created() {
    let handle = with_captured_tracing(|| {
        let (registry, push) = registry();
        let mut engine: HistoryEngine<Vec<u32>> = HistoryEngine::new(registry);
        let mut state = Vec::new();
        engine.dispatch(&mut state, &push, 1).unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 2).unwrap();
    });

    let events = handle.events();
    let created = events
        .iter()
        .find(|e| e.message == "branch created")
        .expect("branch created event");
    assert_eq!(created.fields.get("branch").map(String::as_str), Some("b1"));
    assert_eq!(created.fields.get("parent").map(String::as_str), Some("b0@-1"));
}

#[test]
fn boundary_undo_and_redo_only_trace() {
    let handle = with_captured_tracing(|| {
        let (registry, _) = registry();
        let mut engine: HistoryEngine<Vec<u32>> = HistoryEngine::new(registry);
        let mut state = Vec::new();
        assert!(!engine.undo(&mut state).unwrap());
        assert!(!engine.redo(&mut state).unwrap());
    });

    let engine_events: Vec<_> = handle
        .events()
        .into_iter()
        .filter(|e| e.target == "histree.engine")
        .collect();
    assert_eq!(engine_events.len(), 2);
    assert!(engine_events.iter().all(|e| e.level == tracing::Level::TRACE));
}

#[test]
fn long_replay_warns() {
    let handle = with_captured_tracing(|| {
        let (registry, push) = registry();
        let mut engine: HistoryEngine<Vec<u32>> =
            HistoryEngine::new(registry).with_config(HistoryConfig::new(2));
        let mut state = Vec::new();
        for v in 0..5 {
            engine.dispatch(&mut state, &push, v).unwrap();
        }
        engine.time_travel(&mut state, 3, None).unwrap();
        engine.time_travel(&mut state, -1, None).unwrap();
    });

    let warnings: Vec<_> = handle
        .events()
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].target, "histree.engine");
    assert_eq!(warnings[0].message, "long history replay");
    assert_eq!(warnings[0].fields.get("replayed").map(String::as_str), Some("4"));
    assert_eq!(
        warnings[0].parent_span_name.as_deref(),
        Some("history.time_travel")
    );
}

#[test]
fn branch_switch_reports_cursor_move() {
    let handle = with_captured_tracing(|| {
        let (registry, push) = registry();
        let mut engine: HistoryEngine<Vec<u32>> = HistoryEngine::new(registry);
        let mut state = Vec::new();
        engine.dispatch(&mut state, &push, 1).unwrap();
        engine.dispatch(&mut state, &push, 2).unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 3).unwrap();
        engine
            .switch_to_branch(&mut state, BranchId::new(0), BranchSwitchMode::HeadOfBranch)
            .unwrap();
        assert_eq!(state, vec![1, 2]);
    });

    assert!(handle.spans().iter().any(|s| s.name == "history.switch_branch"));
    let moved = handle
        .events()
        .into_iter()
        .find(|e| e.message == "replay completed")
        .expect("replay completed event");
    assert_eq!(moved.fields.get("from").map(String::as_str), Some("b1@0"));
    assert_eq!(moved.fields.get("to").map(String::as_str), Some("b0@1"));
    assert_eq!(moved.fields.get("undone").map(String::as_str), Some("1"));
    assert_eq!(moved.fields.get("redone").map(String::as_str), Some("1"));
    assert_eq!(moved.fields.get("steps").map(String::as_str), Some("2"));
    assert_eq!(
        handle.messages("histree.engine").last().map(String::as_str),
        Some("replay completed")
    );

    let steps: Vec<_> = handle
        .events()
        .into_iter()
        .filter(|e| e.message == "replay step")
        .map(|e| e.fields.get("direction").cloned().unwrap_or_default())
        .collect();
    assert_eq!(steps, vec!["backward", "forward"]);
}
