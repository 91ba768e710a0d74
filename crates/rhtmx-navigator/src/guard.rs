//! Navigation guard types
//!
//! A guard is an async function of `(to, from)` that resolves to a [`Next`] decision.
//! Returning `Err` is treated like a thrown error: the navigation aborts and the error
//! is broadcast to the router's error listeners.

use crate::location::RawLocation;
use crate::route::Route;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// UI instance registered by the rendering integration for a record's named view
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Callback an enter guard asks to run once the entered view's instance exists
pub type InstanceCallback = Box<dyn FnOnce(Instance) + Send>;

/// Future returned by every guard
pub type GuardFuture = BoxFuture<'static, anyhow::Result<Next>>;

/// Navigation guard: `(to, from) -> Next`
pub type Guard = Arc<dyn Fn(Arc<Route>, Arc<Route>) -> GuardFuture + Send + Sync>;

/// Hook run after a navigation commits: `(to, from)`
pub type AfterHook = Arc<dyn Fn(&Route, &Route) + Send + Sync>;

/// Decision returned by a guard
pub enum Next {
    /// Proceed to the next guard
    Continue,
    /// Proceed, and run the callback with the entered view's instance after commit.
    /// Only meaningful for in-component enter guards; elsewhere it behaves like `Continue`.
    ContinueWith(InstanceCallback),
    /// Veto the navigation and restore the URL
    Abort,
    /// Abandon this navigation and start a new one
    Redirect(RawLocation),
}

impl Next {
    /// Redirect to a location
    pub fn redirect(to: impl Into<RawLocation>) -> Self {
        Next::Redirect(to.into())
    }

    /// Continue and receive the view instance once it registers
    pub fn with_instance<F>(callback: F) -> Self
    where
        F: FnOnce(Instance) + Send + 'static,
    {
        Next::ContinueWith(Box::new(callback))
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Next::Continue => write!(f, "Continue"),
            Next::ContinueWith(_) => write!(f, "ContinueWith(..)"),
            Next::Abort => write!(f, "Abort"),
            Next::Redirect(to) => f.debug_tuple("Redirect").field(to).finish(),
        }
    }
}

/// Wraps an async closure into a [`Guard`]
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{guard_fn, Next};
///
/// let guard = guard_fn(|to, _from| async move {
///     if to.path == "/admin" {
///         Ok(Next::redirect("/login"))
///     } else {
///         Ok(Next::Continue)
///     }
/// });
/// # let _ = guard;
/// ```
pub fn guard_fn<F, Fut>(f: F) -> Guard
where
    F: Fn(Arc<Route>, Arc<Route>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Next>> + Send + 'static,
{
    Arc::new(move |to: Arc<Route>, from: Arc<Route>| -> GuardFuture { Box::pin(f(to, from)) })
}

/// Wraps a closure into an [`AfterHook`]
pub fn after_hook_fn<F>(f: F) -> AfterHook
where
    F: Fn(&Route, &Route) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Identifier returned when registering a global hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) u64);

/// Registration-ordered list of hooks that can be removed by id
pub(crate) struct HookList<T> {
    entries: Vec<(HookId, T)>,
}

impl<T: Clone> HookList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, id: HookId, hook: T) {
        self.entries.push((id, hook));
    }

    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.entries.iter().map(|(_, hook)| hook.clone()).collect()
    }
}
