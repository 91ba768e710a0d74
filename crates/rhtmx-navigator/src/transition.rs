//! Navigation transitions
//!
//! A transition matches the target, diffs the matched chains, runs the guard queue
//! step by step and finally commits the new route.
//!
//! # Guard order
//!
//! 1. `before_route_leave` of deactivated components (deepest first)
//! 2. global `before_each` hooks
//! 3. `before_route_update` of reused components
//! 4. `before_enter` of activated records
//! 5. lazy component resolution of activated records
//! 6. `before_route_enter` of activated components
//! 7. global `before_resolve` hooks
//!
//! Before every step the transition checks it is still the pending one; a newer
//! navigation cancels it. A guard or loader that panics fails the navigation the
//! same way as one returning an error.

use crate::component::{Component, RouteComponent};
use crate::error::NavigationFailure;
use crate::guard::{Guard, Instance, InstanceCallback, Next};
use crate::location::RawLocation;
use crate::record::RouteRecord;
use crate::route::Route;
use crate::router::{NavigationResult, Router, RouterInner};
use anyhow::{anyhow, Context};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Interval between checks for a view instance requested by an enter guard
pub const INSTANCE_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// How a committed navigation is reported to the history backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavigationKind {
    Push,
    Replace,
    /// Started by the backend itself; nothing is recorded
    External,
}

/// Three-way split of two matched chains
#[derive(Debug, Clone, Default)]
pub struct RecordDiff {
    /// Common prefix, present in both chains
    pub updated: Vec<Arc<RouteRecord>>,
    /// Suffix of the next chain
    pub activated: Vec<Arc<RouteRecord>>,
    /// Suffix of the current chain
    pub deactivated: Vec<Arc<RouteRecord>>,
}

/// Splits two matched chains at the first record that differs (pure function)
pub fn resolve_queue(current: &[Arc<RouteRecord>], next: &[Arc<RouteRecord>]) -> RecordDiff {
    let split = current
        .iter()
        .zip(next)
        .take_while(|(a, b)| Arc::ptr_eq(a, b))
        .count();

    RecordDiff {
        updated: next[..split].to_vec(),
        activated: next[split..].to_vec(),
        deactivated: current[split..].to_vec(),
    }
}

enum Step {
    Guard(Guard),
    /// In-component enter guard; may request the view instance
    Enter {
        guard: Guard,
        record: Arc<RouteRecord>,
        view: String,
    },
    ResolveComponents(Vec<Arc<RouteRecord>>),
}

/// Instance callback queued by an enter guard
struct PostEnter {
    record: Arc<RouteRecord>,
    view: String,
    callback: InstanceCallback,
}

/// Why a guard queue stopped early
enum Halt {
    Failed(NavigationFailure),
    Redirect(RawLocation),
}

type ComponentGuards = (Arc<RouteRecord>, String, Vec<Guard>);

/// Guards of every resolved component, grouped per record view
fn component_guards<F>(records: &[Arc<RouteRecord>], select: F) -> Vec<ComponentGuards>
where
    F: Fn(&Component) -> &[Guard],
{
    let mut groups = Vec::new();
    for record in records {
        for (view, component) in record.components() {
            let Some(component) = component.ready() else {
                continue;
            };
            let guards = select(component.as_ref()).to_vec();
            if !guards.is_empty() {
                groups.push((record.clone(), view, guards));
            }
        }
    }
    groups
}

fn leave_steps(deactivated: &[Arc<RouteRecord>]) -> Vec<Step> {
    let mut groups = component_guards(deactivated, Component::leave_guards);
    groups.reverse();
    groups
        .into_iter()
        .flat_map(|(_, _, guards)| guards)
        .map(Step::Guard)
        .collect()
}

fn update_steps(updated: &[Arc<RouteRecord>]) -> Vec<Step> {
    component_guards(updated, Component::update_guards)
        .into_iter()
        .flat_map(|(_, _, guards)| guards)
        .map(Step::Guard)
        .collect()
}

fn enter_steps(activated: &[Arc<RouteRecord>]) -> Vec<Step> {
    component_guards(activated, Component::enter_guards)
        .into_iter()
        .flat_map(|(record, view, guards)| {
            guards.into_iter().map(move |guard| Step::Enter {
                guard,
                record: record.clone(),
                view: view.clone(),
            })
        })
        .collect()
}

/// Runs every lazy loader of `records` and stores the resolved components
async fn resolve_components(records: &[Arc<RouteRecord>]) -> anyhow::Result<()> {
    let mut loads = Vec::new();
    for record in records {
        for (view, component) in record.components() {
            if let RouteComponent::Lazy(loader) = component {
                let record = record.clone();
                loads.push(async move {
                    let component = loader().await.with_context(|| {
                        format!("Failed to resolve async component {} of \"{}\"", view, record.path)
                    })?;
                    Ok::<_, anyhow::Error>((record, view, component))
                });
            }
        }
    }

    if loads.is_empty() {
        return Ok(());
    }
    for (record, view, component) in try_join_all(loads).await? {
        record.resolve_component(&view, component);
    }
    Ok(())
}

/// Runs a guard; a panic, even before the guard returns its future, becomes an error
async fn call_guard(guard: &Guard, to: &Arc<Route>, from: &Arc<Route>) -> anyhow::Result<Next> {
    catch_panic(async { guard(to.clone(), from.clone()).await }).await
}

async fn catch_panic<T, F>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(anyhow!("navigation guard panicked: {}", message))
        }
    }
}

/// Hands the registered instance to `callback`, polling until it registers or the
/// route stops being current
fn poll_instance(router: Weak<RouterInner>, route: Arc<Route>, post: PostEnter) {
    let PostEnter {
        record,
        view,
        callback,
    } = post;

    if let Some(instance) = record.instance(&view) {
        callback(instance);
        return;
    }

    tokio::spawn(async move {
        loop {
            let still_current = router
                .upgrade()
                .is_some_and(|inner| inner.is_current(&route));
            if !still_current {
                tracing::debug!(view = %view, path = %record.path, "route left before view instance registered");
                return;
            }

            tokio::time::sleep(INSTANCE_POLL_INTERVAL).await;

            let registered: Option<Instance> = record.instance(&view);
            if let Some(instance) = registered {
                callback(instance);
                return;
            }
        }
    });
}

impl Router {
    pub(crate) fn transition_to(
        &self,
        raw: RawLocation,
        kind: NavigationKind,
    ) -> BoxFuture<'static, NavigationResult> {
        let router = self.clone();
        Box::pin(async move {
            let current = router.current_route();
            let route = match router.inner.matcher.match_location(raw, Some(&current)) {
                Ok(route) => Arc::new(route),
                Err(err) => {
                    let failure = NavigationFailure::from(err);
                    tracing::warn!("{}", failure);
                    router.inner.mark_failed(&failure);
                    return Err(failure);
                }
            };

            tracing::debug!(from = %current.full_path, to = %route.full_path, "navigation started");

            match router.confirm_transition(&route, &current, kind).await {
                Ok(()) => Ok(route),
                Err(Halt::Failed(failure)) => Err(router.abort(failure, &route)),
                Err(Halt::Redirect(to)) => {
                    let failure = NavigationFailure::Redirected {
                        from: current.full_path.clone(),
                        to: route.full_path.clone(),
                    };
                    let failure = router.abort(failure, &route);

                    let kind = if to.is_replace() {
                        NavigationKind::Replace
                    } else {
                        NavigationKind::Push
                    };
                    if let Err(err) = router.transition_to(to, kind).await {
                        tracing::debug!("redirected navigation did not commit: {}", err);
                    }
                    Err(failure)
                }
            }
        })
    }

    async fn confirm_transition(
        &self,
        route: &Arc<Route>,
        current: &Arc<Route>,
        kind: NavigationKind,
    ) -> Result<(), Halt> {
        if route.is_same(current) && route.matched.len() == current.matched.len() {
            self.inner.ensure_url(false);
            return Err(Halt::Failed(NavigationFailure::Duplicated {
                from: current.full_path.clone(),
                to: route.full_path.clone(),
            }));
        }

        let diff = resolve_queue(&current.matched, &route.matched);
        let before_each = self.inner.lock_hooks().before_each.snapshot();

        let mut queue = leave_steps(&diff.deactivated);
        queue.extend(before_each.into_iter().map(Step::Guard));
        queue.extend(update_steps(&diff.updated));
        queue.extend(
            diff.activated
                .iter()
                .filter_map(|record| record.before_enter.clone())
                .map(Step::Guard),
        );
        queue.push(Step::ResolveComponents(diff.activated.clone()));

        self.inner.lock_state().pending = Some(route.clone());

        let mut post_enter = Vec::new();
        self.run_queue(queue, route, current, &mut post_enter).await?;

        // Enter guards are extracted only now that lazy components are resolved
        let before_resolve = self.inner.lock_hooks().before_resolve.snapshot();
        let mut queue = enter_steps(&diff.activated);
        queue.extend(before_resolve.into_iter().map(Step::Guard));
        self.run_queue(queue, route, current, &mut post_enter).await?;

        self.commit(route, current, kind, post_enter)
    }

    async fn run_queue(
        &self,
        queue: Vec<Step>,
        route: &Arc<Route>,
        current: &Arc<Route>,
        post_enter: &mut Vec<PostEnter>,
    ) -> Result<(), Halt> {
        for step in queue {
            if !self.inner.is_pending(route) {
                return Err(Halt::Failed(cancelled(current, route)));
            }

            let decision = match step {
                Step::Guard(guard) => call_guard(&guard, route, current).await,
                Step::Enter {
                    guard,
                    record,
                    view,
                } => match call_guard(&guard, route, current).await {
                    Ok(Next::ContinueWith(callback)) => {
                        post_enter.push(PostEnter {
                            record,
                            view,
                            callback,
                        });
                        continue;
                    }
                    other => other,
                },
                Step::ResolveComponents(records) => catch_panic(resolve_components(&records))
                    .await
                    .map(|()| Next::Continue),
            };

            match decision {
                Ok(Next::Continue) | Ok(Next::ContinueWith(_)) => {}
                Ok(Next::Abort) => {
                    self.inner.ensure_url(true);
                    return Err(Halt::Failed(NavigationFailure::Aborted {
                        from: current.full_path.clone(),
                        to: route.full_path.clone(),
                    }));
                }
                Ok(Next::Redirect(to)) if to.is_target() => return Err(Halt::Redirect(to)),
                Ok(Next::Redirect(to)) => {
                    tracing::warn!("ignoring guard redirect without a path or name: {:?}", to);
                }
                Err(err) => {
                    self.inner.ensure_url(true);
                    return Err(Halt::Failed(NavigationFailure::Guard(err)));
                }
            }
        }
        Ok(())
    }

    /// Makes `route` current; fails when a newer navigation took over
    fn commit(
        &self,
        route: &Arc<Route>,
        current: &Arc<Route>,
        kind: NavigationKind,
        post_enter: Vec<PostEnter>,
    ) -> Result<(), Halt> {
        let previous = {
            let mut state = self.inner.lock_state();
            let still_pending = state
                .pending
                .as_ref()
                .is_some_and(|pending| Arc::ptr_eq(pending, route));
            if !still_pending {
                return Err(Halt::Failed(cancelled(current, route)));
            }
            state.pending = None;
            std::mem::replace(&mut state.current, route.clone())
        };

        let (listeners, after_each) = {
            let hooks = self.inner.lock_hooks();
            (hooks.listeners.snapshot(), hooks.after_each.snapshot())
        };

        for listener in listeners {
            listener(route);
        }
        self.inner.route_tx.send_replace(route.clone());

        if let Some(history) = &self.inner.history {
            match kind {
                NavigationKind::Push => history.push(route),
                NavigationKind::Replace => history.replace(route),
                NavigationKind::External => {}
            }
        }
        self.inner.ensure_url(false);

        for hook in after_each {
            hook(route, &previous);
        }

        tracing::debug!(to = %route.full_path, "navigation committed");
        self.inner.mark_ready(route);

        for post in post_enter {
            poll_instance(Arc::downgrade(&self.inner), route.clone(), post);
        }
        Ok(())
    }

    /// Finishes a failed navigation: broadcasts guard errors and settles `ready`
    fn abort(
        &self,
        failure: NavigationFailure,
        route: &Arc<Route>,
    ) -> NavigationFailure {
        if let NavigationFailure::Guard(err) = &failure {
            let listeners = self.inner.lock_hooks().error_listeners.snapshot();
            if listeners.is_empty() {
                tracing::error!("uncaught error during route navigation: {:#}", err);
            }
            for listener in listeners {
                listener(err);
            }
        }

        {
            let mut state = self.inner.lock_state();
            let is_this = state
                .pending
                .as_ref()
                .is_some_and(|pending| Arc::ptr_eq(pending, route));
            if is_this {
                state.pending = None;
            }
        }

        self.inner.mark_failed(&failure);

        tracing::debug!("navigation to \"{}\" failed: {}", route.full_path, failure);
        failure
    }
}

fn cancelled(current: &Route, route: &Route) -> NavigationFailure {
    NavigationFailure::Cancelled {
        from: current.full_path.clone(),
        to: route.full_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::table::RouteTable;

    #[test]
    fn test_resolve_queue_splits_at_first_difference() {
        let table = RouteTable::build(&[RouteConfig::new("/parent")
            .with_child(RouteConfig::new("a"))
            .with_child(RouteConfig::new("b"))]);
        let parent = table.get("/parent").cloned().unwrap();
        let a = table.get("/parent/a").cloned().unwrap();
        let b = table.get("/parent/b").cloned().unwrap();

        let diff = resolve_queue(&[parent.clone(), a.clone()], &[parent.clone(), b.clone()]);
        assert_eq!(diff.updated.len(), 1);
        assert!(Arc::ptr_eq(&diff.updated[0], &parent));
        assert!(Arc::ptr_eq(&diff.activated[0], &b));
        assert!(Arc::ptr_eq(&diff.deactivated[0], &a));
    }

    #[test]
    fn test_resolve_queue_from_start() {
        let table = RouteTable::build(&[RouteConfig::new("/a")]);
        let a = table.get("/a").cloned().unwrap();

        let diff = resolve_queue(&[], &[a]);
        assert!(diff.updated.is_empty());
        assert!(diff.deactivated.is_empty());
        assert_eq!(diff.activated.len(), 1);
    }

    #[test]
    fn test_leave_steps_are_deepest_first() {
        let outer = Component::new("Outer").before_route_leave(crate::guard_fn(|_, _| async {
            Ok(Next::Continue)
        }));
        let inner = Component::new("Inner").before_route_leave(crate::guard_fn(|_, _| async {
            Ok(Next::Abort)
        }));
        let table = RouteTable::build(&[RouteConfig::new("/outer")
            .with_component(outer)
            .with_child(RouteConfig::new("inner").with_component(inner))]);
        let chain = vec![
            table.get("/outer").cloned().unwrap(),
            table.get("/outer/inner").cloned().unwrap(),
        ];

        let groups = {
            let mut groups = component_guards(&chain, Component::leave_guards);
            groups.reverse();
            groups
        };
        assert_eq!(groups[0].0.path, "/outer/inner");
        assert_eq!(groups[1].0.path, "/outer");
        assert_eq!(leave_steps(&chain).len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_components_replaces_lazy_slots() {
        let table = RouteTable::build(&[RouteConfig::new("/lazy")
            .with_component(RouteComponent::lazy(|| async { Ok(Component::new("Loaded")) }))]);
        let record = table.get("/lazy").cloned().unwrap();

        resolve_components(&[record.clone()]).await.unwrap();
        let component = record.component("default").unwrap();
        assert_eq!(component.ready().unwrap().name(), "Loaded");
    }

    #[tokio::test]
    async fn test_resolve_components_surfaces_errors() {
        let table = RouteTable::build(&[RouteConfig::new("/broken").with_component(
            RouteComponent::lazy(|| async { Err(anyhow::anyhow!("chunk missing")) }),
        )]);
        let record = table.get("/broken").cloned().unwrap();

        let err = resolve_components(&[record.clone()]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("chunk missing"));
        assert!(record.component("default").unwrap().is_lazy());
    }
}
