//! Route components
//!
//! The navigator does not render anything. A [`Component`] is an opaque handle for the
//! rendering integration that also carries the in-component guards the transition
//! engine runs (`before_route_enter`, `before_route_update`, `before_route_leave`).

use crate::guard::Guard;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Async loader for a lazily resolved component
pub type ComponentLoader = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Component>> + Send + Sync>;

/// A view component and its in-component guards
#[derive(Clone, Default)]
pub struct Component {
    name: String,
    enter_guards: Vec<Guard>,
    update_guards: Vec<Guard>,
    leave_guards: Vec<Guard>,
}

impl Component {
    /// Creates a component with no guards
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a guard run before the component's route is entered
    ///
    /// Enter guards may answer [`Next::ContinueWith`](crate::Next::ContinueWith) to
    /// receive the view instance once it has been registered.
    pub fn before_route_enter(mut self, guard: Guard) -> Self {
        self.enter_guards.push(guard);
        self
    }

    /// Adds a guard run when the route changes but this component stays mounted
    pub fn before_route_update(mut self, guard: Guard) -> Self {
        self.update_guards.push(guard);
        self
    }

    /// Adds a guard run before the component's route is left
    pub fn before_route_leave(mut self, guard: Guard) -> Self {
        self.leave_guards.push(guard);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enter_guards(&self) -> &[Guard] {
        &self.enter_guards
    }

    pub fn update_guards(&self) -> &[Guard] {
        &self.update_guards
    }

    pub fn leave_guards(&self) -> &[Guard] {
        &self.leave_guards
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("enter_guards", &self.enter_guards.len())
            .field("update_guards", &self.update_guards.len())
            .field("leave_guards", &self.leave_guards.len())
            .finish()
    }
}

/// Component slot of a route record: resolved, or waiting on a loader
#[derive(Clone)]
pub enum RouteComponent {
    Ready(Arc<Component>),
    Lazy(ComponentLoader),
}

impl RouteComponent {
    /// Wraps an async loader
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::{Component, RouteComponent};
    ///
    /// let lazy = RouteComponent::lazy(|| async { Ok(Component::new("Settings")) });
    /// assert!(lazy.is_lazy());
    /// ```
    pub fn lazy<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Component>> + Send + 'static,
    {
        RouteComponent::Lazy(Arc::new(
            move || -> BoxFuture<'static, anyhow::Result<Component>> { Box::pin(loader()) },
        ))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, RouteComponent::Lazy(_))
    }

    /// Resolved component, if already loaded
    pub fn ready(&self) -> Option<&Arc<Component>> {
        match self {
            RouteComponent::Ready(component) => Some(component),
            RouteComponent::Lazy(_) => None,
        }
    }
}

impl From<Component> for RouteComponent {
    fn from(component: Component) -> Self {
        RouteComponent::Ready(Arc::new(component))
    }
}

impl From<Arc<Component>> for RouteComponent {
    fn from(component: Arc<Component>) -> Self {
        RouteComponent::Ready(component)
    }
}

impl fmt::Debug for RouteComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteComponent::Ready(component) => f.debug_tuple("Ready").field(component).finish(),
            RouteComponent::Lazy(_) => write!(f, "Lazy(..)"),
        }
    }
}
