// File: src/config.rs
// Purpose: Route configuration, router options and the TOML route manifest

use crate::component::RouteComponent;
use crate::error::RouterError;
use crate::guard::Guard;
use crate::history::HistoryBackend;
use crate::location::RawLocation;
use crate::query::{QueryParser, QueryStringifier};
use crate::route::Route;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// View name used when a route declares a single component
pub const DEFAULT_VIEW: &str = "default";

// ============================================================================
// Redirects and props
// ============================================================================

/// Redirect rule of a route
#[derive(Clone)]
pub enum Redirect {
    /// Redirect to a path (resolved relative to the parent record)
    Path(String),
    /// Redirect to a location; its `query`, `hash` and `params` override the trigger's
    To(RawLocation),
    /// Compute the target from the route being redirected
    Dynamic(Arc<dyn Fn(&Route) -> RawLocation + Send + Sync>),
}

impl Redirect {
    /// Builds a dynamic redirect from a closure
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&Route) -> RawLocation + Send + Sync + 'static,
    {
        Redirect::Dynamic(Arc::new(f))
    }

    /// Computes the raw redirect target for `route`
    pub fn target(&self, route: &Route) -> RawLocation {
        match self {
            Redirect::Path(path) => RawLocation::Path(path.clone()),
            Redirect::To(location) => location.clone(),
            Redirect::Dynamic(f) => f(route),
        }
    }
}

impl fmt::Debug for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Redirect::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Redirect::To(location) => f.debug_tuple("To").field(location).finish(),
            Redirect::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}

impl From<&str> for Redirect {
    fn from(path: &str) -> Self {
        Redirect::Path(path.to_string())
    }
}

/// How a matched route turns into props for its view
#[derive(Clone)]
pub enum RouteProps {
    /// `true` passes the route params, `false` passes nothing
    Bool(bool),
    /// Static props
    Object(Map<String, Value>),
    /// Props computed from the route
    Function(Arc<dyn Fn(&Route) -> Value + Send + Sync>),
}

impl RouteProps {
    /// Resolves the props for a route (pure function)
    pub fn resolve(&self, route: &Route) -> Option<Value> {
        match self {
            RouteProps::Bool(false) => None,
            RouteProps::Bool(true) => Some(Value::Object(
                route
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )),
            RouteProps::Object(props) => Some(Value::Object(props.clone())),
            RouteProps::Function(f) => Some(f(route)),
        }
    }
}

impl fmt::Debug for RouteProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteProps::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            RouteProps::Object(props) => f.debug_tuple("Object").field(props).finish(),
            RouteProps::Function(_) => write!(f, "Function(..)"),
        }
    }
}

// ============================================================================
// RouteConfig
// ============================================================================

/// One node of the declarative route tree
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{Component, RouteConfig};
///
/// let config = RouteConfig::new("/params/:name")
///     .with_name("params")
///     .with_component(Component::new("Params"))
///     .with_child(RouteConfig::new("links/:age").with_component(Component::new("Links")))
///     .with_meta("title", "Params");
///
/// assert_eq!(config.children.len(), 1);
/// assert_eq!(config.meta["title"], "Params");
/// ```
#[derive(Clone, Default)]
pub struct RouteConfig {
    /// Path pattern, relative to the parent unless it starts with `/`
    pub path: String,
    pub name: Option<String>,
    /// Named-view component mapping
    pub components: BTreeMap<String, RouteComponent>,
    pub children: Vec<RouteConfig>,
    pub redirect: Option<Redirect>,
    pub alias: Vec<String>,
    /// `Some(true)` matches letter case exactly
    pub case_sensitive: Option<bool>,
    /// Require the exact trailing slash
    pub strict: bool,
    /// Per-view props
    pub props: BTreeMap<String, RouteProps>,
    pub before_enter: Option<Guard>,
    /// Opaque metadata bag
    pub meta: Value,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the component of the default view
    pub fn with_component(self, component: impl Into<RouteComponent>) -> Self {
        self.with_view(DEFAULT_VIEW, component)
    }

    /// Sets the component of a named view
    pub fn with_view(mut self, view: impl Into<String>, component: impl Into<RouteComponent>) -> Self {
        self.components.insert(view.into(), component.into());
        self
    }

    pub fn with_child(mut self, child: RouteConfig) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = RouteConfig>,
    {
        self.children.extend(children);
        self
    }

    pub fn with_redirect(mut self, redirect: impl Into<Redirect>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alias.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = Some(sensitive);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the props of the default view
    pub fn with_props(self, props: RouteProps) -> Self {
        self.with_view_props(DEFAULT_VIEW, props)
    }

    pub fn with_view_props(mut self, view: impl Into<String>, props: RouteProps) -> Self {
        self.props.insert(view.into(), props);
        self
    }

    pub fn before_enter(mut self, guard: Guard) -> Self {
        self.before_enter = Some(guard);
        self
    }

    /// Sets a metadata key-value pair
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.meta.is_object() {
            self.meta = Value::Object(Map::new());
        }
        if let Value::Object(meta) = &mut self.meta {
            meta.insert(key.into(), value.into());
        }
        self
    }

    /// Replaces the whole metadata bag
    pub fn with_metadata(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("components", &self.components)
            .field("children", &self.children)
            .field("redirect", &self.redirect)
            .field("alias", &self.alias)
            .field("case_sensitive", &self.case_sensitive)
            .field("strict", &self.strict)
            .field("before_enter", &self.before_enter.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}

// ============================================================================
// RouterOptions
// ============================================================================

/// Options used to construct a [`Router`](crate::Router)
#[derive(Clone, Default)]
pub struct RouterOptions {
    pub routes: Vec<RouteConfig>,
    pub history: Option<Arc<dyn HistoryBackend>>,
    pub parse_query: Option<QueryParser>,
    pub stringify_query: Option<QueryStringifier>,
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes<I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = RouteConfig>,
    {
        self.routes.extend(routes);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryBackend>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_query_parser(mut self, parser: QueryParser) -> Self {
        self.parse_query = Some(parser);
        self
    }

    pub fn with_query_stringifier(mut self, stringifier: QueryStringifier) -> Self {
        self.stringify_query = Some(stringifier);
        self
    }
}

// ============================================================================
// TOML route manifest
// ============================================================================

/// Component lookup used when turning a manifest into route configs
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, RouteComponent>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, component: impl Into<RouteComponent>) -> Self {
        self.components.insert(name.into(), component.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&RouteComponent> {
        self.components.get(name)
    }
}

/// One alias or a list of aliases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasEntry {
    One(String),
    Many(Vec<String>),
}

impl Default for AliasEntry {
    fn default() -> Self {
        AliasEntry::Many(Vec::new())
    }
}

impl AliasEntry {
    fn into_vec(self) -> Vec<String> {
        match self {
            AliasEntry::One(alias) => vec![alias],
            AliasEntry::Many(aliases) => aliases,
        }
    }
}

/// A route as written in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Registry name of the default view component
    #[serde(default)]
    pub component: Option<String>,

    /// Registry names of named view components
    #[serde(default)]
    pub components: BTreeMap<String, String>,

    #[serde(default)]
    pub redirect: Option<String>,

    #[serde(default)]
    pub alias: AliasEntry,

    #[serde(default)]
    pub case_sensitive: Option<bool>,

    #[serde(default = "default_false")]
    pub strict: bool,

    /// Pass route params as props to the default view
    #[serde(default)]
    pub props: Option<bool>,

    #[serde(default)]
    pub meta: Option<Value>,

    #[serde(default)]
    pub children: Vec<RouteEntry>,
}

fn default_false() -> bool {
    false
}

/// Declarative route tree loaded from TOML
///
/// ```toml
/// [[routes]]
/// path = "/"
/// component = "Home"
///
/// [[routes]]
/// path = "/params/:name"
/// component = "Params"
/// meta = { title = "Params" }
///
///   [[routes.children]]
///   path = "links/:age"
///   component = "Links"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl RouteManifest {
    /// Load a manifest from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read route manifest: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse route manifest: {:?}", path))
    }

    /// Parse a manifest from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let manifest: RouteManifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Resolve component names and build route configs
    pub fn into_configs(self, registry: &ComponentRegistry) -> Result<Vec<RouteConfig>, RouterError> {
        self.routes
            .into_iter()
            .map(|entry| entry.into_config(registry))
            .collect()
    }
}

impl RouteEntry {
    fn into_config(self, registry: &ComponentRegistry) -> Result<RouteConfig, RouterError> {
        let lookup = |name: &str| {
            registry.get(name).cloned().ok_or_else(|| RouterError::Manifest {
                path: self.path.clone(),
                reason: format!("unknown component \"{}\"", name),
            })
        };

        let mut config = RouteConfig::new(self.path.clone());
        config.name = self.name.clone();
        config.case_sensitive = self.case_sensitive;
        config.strict = self.strict;
        config.alias = self.alias.clone().into_vec();
        config.redirect = self.redirect.clone().map(Redirect::Path);

        if let Some(name) = &self.component {
            config.components.insert(DEFAULT_VIEW.to_string(), lookup(name)?);
        }
        for (view, name) in &self.components {
            config.components.insert(view.clone(), lookup(name)?);
        }

        if let Some(props) = self.props {
            config.props.insert(DEFAULT_VIEW.to_string(), RouteProps::Bool(props));
        }
        if let Some(meta) = self.meta.clone() {
            config.meta = meta;
        }

        config.children = self
            .children
            .into_iter()
            .map(|child| child.into_config(registry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(config)
    }
}
