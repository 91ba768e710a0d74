//! Router engine instance
//!
//! [`Router`] is a cheap `Clone` handle over shared state: the matcher, the optional
//! history backend, the global hooks and the current/pending routes. It owns no
//! globals; create one per application and hand clones to collaborators.

use crate::component::RouteComponent;
use crate::config::{RouteConfig, RouterOptions};
use crate::error::{NavigationFailure, RouterError};
use crate::guard::{AfterHook, Guard, HookId, HookList, Instance};
use crate::history::HistoryBackend;
use crate::location::{normalize_location, Location, RawLocation};
use crate::matcher::Matcher;
use crate::record::RouteRecord;
use crate::route::Route;
use crate::transition::NavigationKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Result of a navigation
pub type NavigationResult = Result<Arc<Route>, NavigationFailure>;

/// Callback receiving every committed route
pub type RouteListener = Arc<dyn Fn(&Route) + Send + Sync>;

/// Callback receiving errors raised by guards and component loaders
pub type ErrorListener = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

type ReadyCallback = Box<dyn FnOnce(&Route) + Send>;
type ReadyErrorCallback = Box<dyn FnOnce(&NavigationFailure) + Send>;

/// A location resolved without navigating
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    /// Normalized target
    pub location: Location,
    pub route: Route,
    /// Link target produced by the history backend (the full path without one)
    pub href: String,
}

pub(crate) struct Hooks {
    pub before_each: HookList<Guard>,
    pub before_resolve: HookList<Guard>,
    pub after_each: HookList<AfterHook>,
    pub listeners: HookList<RouteListener>,
    pub error_listeners: HookList<ErrorListener>,
}

pub(crate) struct NavigationState {
    pub current: Arc<Route>,
    pub pending: Option<Arc<Route>>,
    pub ready: bool,
    ready_callbacks: Vec<ReadyCallback>,
    ready_error_callbacks: Vec<ReadyErrorCallback>,
}

pub(crate) struct RouterInner {
    pub matcher: Matcher,
    pub history: Option<Arc<dyn HistoryBackend>>,
    pub hooks: Mutex<Hooks>,
    pub state: Mutex<NavigationState>,
    pub route_tx: watch::Sender<Arc<Route>>,
    next_hook_id: AtomicU64,
}

/// Navigation engine
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{Component, RouteConfig, Router, RouterOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let router = Router::new(RouterOptions::new().with_routes([
///     RouteConfig::new("/").with_component(Component::new("Home")),
///     RouteConfig::new("/users/:id").with_name("user"),
/// ]));
///
/// let route = router.push("/users/7").await.unwrap();
/// assert_eq!(route.params["id"], "7");
/// assert_eq!(router.current_route().path, "/users/7");
/// # }
/// ```
#[derive(Clone)]
pub struct Router {
    pub(crate) inner: Arc<RouterInner>,
}

impl Router {
    pub fn new(options: RouterOptions) -> Self {
        let RouterOptions {
            routes,
            history,
            parse_query,
            stringify_query,
        } = options;

        let matcher = Matcher::new(&routes).with_query_codec(parse_query, stringify_query);
        let start = Arc::new(Route::start());
        let (route_tx, _) = watch::channel(start.clone());

        Self {
            inner: Arc::new(RouterInner {
                matcher,
                history,
                hooks: Mutex::new(Hooks {
                    before_each: HookList::new(),
                    before_resolve: HookList::new(),
                    after_each: HookList::new(),
                    listeners: HookList::new(),
                    error_listeners: HookList::new(),
                }),
                state: Mutex::new(NavigationState {
                    current: start,
                    pending: None,
                    ready: false,
                    ready_callbacks: Vec::new(),
                    ready_error_callbacks: Vec::new(),
                }),
                route_tx,
                next_hook_id: AtomicU64::new(1),
            }),
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigates to a new location, adding a history entry
    pub async fn push(&self, to: impl Into<RawLocation>) -> NavigationResult {
        self.transition_to(to.into(), NavigationKind::Push).await
    }

    /// Navigates to a new location, replacing the current history entry
    pub async fn replace(&self, to: impl Into<RawLocation>) -> NavigationResult {
        self.transition_to(to.into(), NavigationKind::Replace).await
    }

    /// Navigation started by the backend itself (back/forward); nothing is pushed
    pub async fn handle_external_navigation(&self, to: impl Into<RawLocation>) -> NavigationResult {
        self.transition_to(to.into(), NavigationKind::External).await
    }

    /// Sets up backend listeners and navigates to the backend's current location
    pub async fn init(&self) -> NavigationResult {
        let location = match &self.inner.history {
            Some(history) => {
                history.setup_listeners();
                history.current_location()
            }
            None => "/".to_string(),
        };
        tracing::debug!(location = %location, "initial navigation");
        self.transition_to(location.into(), NavigationKind::External).await
    }

    /// Stops backend listeners and resets the router to the start route
    pub fn teardown(&self) {
        if let Some(history) = &self.inner.history {
            history.teardown_listeners();
        }
        let mut state = self.inner.lock_state();
        state.current = Arc::new(Route::start());
        state.pending = None;
    }

    pub fn go(&self, delta: i32) {
        match &self.inner.history {
            Some(history) => history.go(delta),
            None => tracing::warn!("go({}) ignored: no history backend installed", delta),
        }
    }

    pub fn back(&self) {
        self.go(-1);
    }

    pub fn forward(&self) {
        self.go(1);
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Matches a location without navigating
    pub fn match_location(
        &self,
        raw: impl Into<RawLocation>,
        current: Option<&Route>,
    ) -> Result<Route, RouterError> {
        self.inner.matcher.match_location(raw, current)
    }

    /// Resolves a target the way a link would, relative to `current` (or the
    /// current route) and honouring `append`
    pub fn resolve(
        &self,
        to: impl Into<RawLocation>,
        current: Option<&Route>,
        append: bool,
    ) -> Result<ResolvedLocation, RouterError> {
        let fallback = self.current_route();
        let current = current.unwrap_or(&fallback);

        let location = normalize_location(
            to.into(),
            Some(current),
            append,
            self.inner.matcher.query_parser(),
        )?;
        let route = self
            .inner
            .matcher
            .match_location(location.clone(), Some(current))?;

        let full_path = route.redirected_from.as_deref().unwrap_or(&route.full_path);
        let href = match &self.inner.history {
            Some(history) => history.create_href(full_path),
            None => full_path.to_string(),
        };

        Ok(ResolvedLocation {
            location,
            route,
            href,
        })
    }

    /// Adds routes to the table
    pub fn add_routes(&self, configs: &[RouteConfig]) {
        self.inner.matcher.add_routes(configs);
    }

    pub fn current_route(&self) -> Arc<Route> {
        self.inner.lock_state().current.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock_state().ready
    }

    // ========================================================================
    // Hooks and listeners
    // ========================================================================

    /// Registers a global guard run before in-config enter guards
    pub fn before_each(&self, guard: Guard) -> HookId {
        let id = self.inner.next_id();
        self.inner.lock_hooks().before_each.push(id, guard);
        id
    }

    /// Registers a global guard run after in-component enter guards
    pub fn before_resolve(&self, guard: Guard) -> HookId {
        let id = self.inner.next_id();
        self.inner.lock_hooks().before_resolve.push(id, guard);
        id
    }

    /// Registers a hook run after every committed navigation
    pub fn after_each(&self, hook: AfterHook) -> HookId {
        let id = self.inner.next_id();
        self.inner.lock_hooks().after_each.push(id, hook);
        id
    }

    /// Registers a callback receiving every committed route
    pub fn listen<F>(&self, listener: F) -> HookId
    where
        F: Fn(&Route) + Send + Sync + 'static,
    {
        let id = self.inner.next_id();
        self.inner.lock_hooks().listeners.push(id, Arc::new(listener));
        id
    }

    /// Registers a callback for errors raised by guards and component loaders
    pub fn on_error<F>(&self, listener: F) -> HookId
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        let id = self.inner.next_id();
        self.inner.lock_hooks().error_listeners.push(id, Arc::new(listener));
        id
    }

    /// Removes any hook, listener or error listener by id
    pub fn remove_hook(&self, id: HookId) -> bool {
        let mut hooks = self.inner.lock_hooks();
        hooks.before_each.remove(id)
            || hooks.before_resolve.remove(id)
            || hooks.after_each.remove(id)
            || hooks.listeners.remove(id)
            || hooks.error_listeners.remove(id)
    }

    /// Runs `on_ready` once the first navigation commits
    ///
    /// When the router is already ready, `on_ready` runs immediately.
    pub fn on_ready<F>(&self, on_ready: F)
    where
        F: FnOnce(&Route) + Send + 'static,
    {
        self.register_ready(Box::new(on_ready), None);
    }

    /// Like [`on_ready`](Self::on_ready), with `on_failure` run instead if the first
    /// navigation fails
    pub fn on_ready_or_else<F, E>(&self, on_ready: F, on_failure: E)
    where
        F: FnOnce(&Route) + Send + 'static,
        E: FnOnce(&NavigationFailure) + Send + 'static,
    {
        self.register_ready(Box::new(on_ready), Some(Box::new(on_failure)));
    }

    fn register_ready(&self, on_ready: ReadyCallback, on_failure: Option<ReadyErrorCallback>) {
        let mut state = self.inner.lock_state();
        if state.ready {
            let current = state.current.clone();
            drop(state);
            on_ready(&current);
            return;
        }
        state.ready_callbacks.push(on_ready);
        if let Some(on_failure) = on_failure {
            state.ready_error_callbacks.push(on_failure);
        }
    }

    /// Receiver of committed routes
    pub fn subscribe(&self) -> watch::Receiver<Arc<Route>> {
        self.inner.route_tx.subscribe()
    }

    // ========================================================================
    // Rendering integration
    // ========================================================================

    /// Record of the current route at `depth` (0 is the root)
    pub fn matched_record_at(&self, depth: usize) -> Option<Arc<RouteRecord>> {
        self.current_route().matched.get(depth).cloned()
    }

    /// Components of every record matched by `to` (or the current route)
    pub fn matched_components(&self, to: Option<&Route>) -> Vec<RouteComponent> {
        let current;
        let route = match to {
            Some(route) => route,
            None => {
                current = self.current_route();
                &current
            }
        };
        route
            .matched
            .iter()
            .flat_map(|record| record.components().into_values())
            .collect()
    }

    /// Registers (`Some`) or unregisters (`None`) the UI instance of a record's view
    pub fn register_route_instance(&self, record: &RouteRecord, view: &str, instance: Option<Instance>) {
        record.register_instance(view, instance);
    }
}

impl RouterInner {
    fn next_id(&self) -> HookId {
        HookId(self.next_hook_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, NavigationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_hooks(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_current(&self, route: &Arc<Route>) -> bool {
        Arc::ptr_eq(&self.lock_state().current, route)
    }

    pub(crate) fn is_pending(&self, route: &Arc<Route>) -> bool {
        self.lock_state()
            .pending
            .as_ref()
            .is_some_and(|pending| Arc::ptr_eq(pending, route))
    }

    pub(crate) fn ensure_url(&self, push: bool) {
        if let Some(history) = &self.history {
            let current = self.lock_state().current.clone();
            history.ensure_url(&current, push);
        }
    }

    /// Flips `ready` on the first committed navigation and drains the ready callbacks
    pub(crate) fn mark_ready(&self, route: &Route) {
        let callbacks = {
            let mut state = self.lock_state();
            if state.ready {
                return;
            }
            state.ready = true;
            state.ready_error_callbacks.clear();
            std::mem::take(&mut state.ready_callbacks)
        };
        for callback in callbacks {
            callback(route);
        }
    }

    /// Flips `ready` on the first failed navigation and drains the error callbacks
    pub(crate) fn mark_failed(&self, failure: &NavigationFailure) {
        let callbacks = {
            let mut state = self.lock_state();
            if state.ready {
                return;
            }
            state.ready = true;
            state.ready_callbacks.clear();
            std::mem::take(&mut state.ready_error_callbacks)
        };
        for callback in callbacks {
            callback(failure);
        }
    }
}
