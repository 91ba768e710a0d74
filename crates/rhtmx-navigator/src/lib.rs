//! # RHTMX Navigator
//!
//! Client-side navigation engine with support for:
//! - Route tables compiled from a nested config tree (`/users/:id`, `/files/*`,
//!   `/posts/:id?`, `/items/:id(\d+)`)
//! - Named routes, redirects (static, by location, computed) and aliases
//! - Relative navigation (`../sibling`, `?query-only`, params-only)
//! - An async guard pipeline with leave/update/enter component guards and
//!   global `before_each` / `before_resolve` / `after_each` hooks
//! - Lazily loaded route components
//! - Cancellation: a newer navigation supersedes one still running its guards
//!
//! ## Architecture
//!
//! - [`path`] and [`query`] are pure string utilities
//! - [`RouteTable`] compiles [`RouteConfig`]s into records in matching priority order
//! - [`Matcher`] turns a [`RawLocation`] into a [`Route`], following redirects and aliases
//! - [`Router`] owns the current route and runs transitions through the guard queue
//! - A [`HistoryBackend`] (browser, hash, in-memory) is plugged in by the host
//!
//! Rendering is not part of this crate. [`Component`] is an opaque handle carrying
//! in-component guards; the rendering integration registers view instances through
//! [`Router::register_route_instance`] and follows commits with
//! [`Router::subscribe`] or [`Router::listen`].
//!
//! ## Example
//!
//! ```
//! use rhtmx_navigator::{guard_fn, Component, Next, RouteConfig, Router, RouterOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let router = Router::new(RouterOptions::new().with_routes([
//!     RouteConfig::new("/").with_component(Component::new("Home")),
//!     RouteConfig::new("/login").with_component(Component::new("Login")),
//!     RouteConfig::new("/admin")
//!         .with_component(Component::new("Admin"))
//!         .with_meta("auth", true),
//! ]));
//!
//! router.before_each(guard_fn(|to, _from| async move {
//!     if to.meta["auth"] == true {
//!         Ok(Next::redirect("/login"))
//!     } else {
//!         Ok(Next::Continue)
//!     }
//! }));
//!
//! let failure = router.push("/admin").await.unwrap_err();
//! assert!(failure.is_expected());
//! assert_eq!(router.current_route().path, "/login");
//! # }
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod component;
pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod location;
pub mod matcher;
pub mod path;
pub mod query;
pub mod record;
pub mod route;
pub mod router;
pub mod table;
pub mod transition;

// ============================================================================
// Re-exports
// ============================================================================

pub use component::{Component, ComponentLoader, RouteComponent};
pub use config::{
    ComponentRegistry, Redirect, RouteConfig, RouteEntry, RouteManifest, RouteProps, RouterOptions,
    DEFAULT_VIEW,
};
pub use error::{NavigationFailure, NavigationFailureKind, RouterError};
pub use guard::{after_hook_fn, guard_fn, AfterHook, Guard, GuardFuture, HookId, Instance, Next};
pub use history::HistoryBackend;
pub use location::{Location, Params, RawLocation};
pub use matcher::{Matcher, MAX_REDIRECT_DEPTH};
pub use query::{Query, QueryValue};
pub use record::RouteRecord;
pub use route::Route;
pub use router::{NavigationResult, ResolvedLocation, Router};
pub use table::RouteTable;
pub use transition::{resolve_queue, RecordDiff};
