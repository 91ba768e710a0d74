//! Shared helpers for the navigator integration tests
#![allow(dead_code)]

use rhtmx_navigator::{guard_fn, Guard, HistoryBackend, Next, Route};
use std::sync::{Arc, Mutex};

/// In-memory history backend that records every call
pub struct RecordingHistory {
    base: String,
    location: String,
    events: Mutex<Vec<String>>,
}

impl RecordingHistory {
    pub fn new(location: &str) -> Arc<Self> {
        Self::with_base("", location)
    }

    /// Backend serving the app under `base` (no trailing slash)
    pub fn with_base(base: &str, location: &str) -> Arc<Self> {
        Arc::new(Self {
            base: base.to_string(),
            location: location.to_string(),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl HistoryBackend for RecordingHistory {
    fn push(&self, route: &Route) {
        self.record(format!("push {}", route.full_path));
    }

    fn replace(&self, route: &Route) {
        self.record(format!("replace {}", route.full_path));
    }

    fn go(&self, delta: i32) {
        self.record(format!("go {}", delta));
    }

    fn ensure_url(&self, current: &Route, push: bool) {
        self.record(format!("ensure {} {}", current.full_path, push));
    }

    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn setup_listeners(&self) {
        self.record("setup".to_string());
    }

    fn teardown_listeners(&self) {
        self.record("teardown".to_string());
    }

    fn create_href(&self, full_path: &str) -> String {
        format!("{}{}", self.base, full_path)
    }
}

/// Shared, ordered event log
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Guard that logs `label` and continues
pub fn logging_guard(log: &Log, label: &'static str) -> Guard {
    let log = log.clone();
    guard_fn(move |_to, _from| {
        let log = log.clone();
        async move {
            log.push(label);
            Ok(Next::Continue)
        }
    })
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
