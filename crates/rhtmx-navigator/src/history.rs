//! History backend boundary
//!
//! The router never stores URLs itself. A backend (browser history, hash URLs, an
//! in-memory stack for servers and tests) implements [`HistoryBackend`] and the
//! router calls into it when navigations commit or fail.

use crate::route::Route;

/// External URL/history storage driven by the router
pub trait HistoryBackend: Send + Sync {
    /// Record a committed navigation as a new entry
    fn push(&self, route: &Route);

    /// Record a committed navigation over the current entry
    fn replace(&self, route: &Route);

    /// Move through the history stack by `delta` entries
    fn go(&self, delta: i32);

    /// Reconcile the visible URL with `current`, pushing when `push` is set
    fn ensure_url(&self, current: &Route, push: bool);

    /// Location the backend currently shows (used for the initial navigation)
    fn current_location(&self) -> String;

    /// Start listening for external navigations (back/forward)
    fn setup_listeners(&self) {}

    /// Stop listening for external navigations
    fn teardown_listeners(&self) {}

    /// Link target for a full path
    fn create_href(&self, full_path: &str) -> String {
        full_path.to_string()
    }
}
