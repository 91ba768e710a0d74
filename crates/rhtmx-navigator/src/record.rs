//! Compiled route records

use crate::component::{Component, RouteComponent};
use crate::config::{Redirect, RouteProps};
use crate::guard::{Guard, Instance};
use crate::path::PathPattern;
use crate::route::Route;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// One compiled node of the route tree
///
/// Records are immutable once built, apart from two slots owned by collaborators:
/// the view → instance registry written by the rendering integration, and the
/// component slots, where a lazy loader is replaced by its resolved component.
pub struct RouteRecord {
    /// Canonical path pattern
    pub path: String,
    pub name: Option<String>,
    pub parent: Option<Arc<RouteRecord>>,
    /// Canonical path shadowed by an alias record
    pub match_as: Option<String>,
    pub redirect: Option<Redirect>,
    pub before_enter: Option<Guard>,
    pub meta: Value,
    pub props: BTreeMap<String, RouteProps>,
    pattern: PathPattern,
    components: RwLock<BTreeMap<String, RouteComponent>>,
    instances: RwLock<HashMap<String, Instance>>,
}

/// Fields of a record, as produced by the table builder
pub(crate) struct RecordParts {
    pub path: String,
    pub pattern: PathPattern,
    pub name: Option<String>,
    pub parent: Option<Arc<RouteRecord>>,
    pub match_as: Option<String>,
    pub redirect: Option<Redirect>,
    pub before_enter: Option<Guard>,
    pub meta: Value,
    pub props: BTreeMap<String, RouteProps>,
    pub components: BTreeMap<String, RouteComponent>,
}

impl RouteRecord {
    pub(crate) fn new(parts: RecordParts) -> Self {
        let meta = match parts.meta {
            Value::Null => Value::Object(Default::default()),
            meta => meta,
        };

        Self {
            path: parts.path,
            name: parts.name,
            parent: parts.parent,
            match_as: parts.match_as,
            redirect: parts.redirect,
            before_enter: parts.before_enter,
            meta,
            props: parts.props,
            pattern: parts.pattern,
            components: RwLock::new(parts.components),
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Number of ancestors
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent.as_ref();
        while let Some(parent) = cursor {
            depth += 1;
            cursor = parent.parent.as_ref();
        }
        depth
    }

    /// Snapshot of the named-view component mapping
    pub fn components(&self) -> BTreeMap<String, RouteComponent> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn component(&self, view: &str) -> Option<RouteComponent> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(view)
            .cloned()
    }

    /// Replaces a lazy slot with its resolved component
    pub(crate) fn resolve_component(&self, view: &str, component: Component) {
        self.components
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(view.to_string(), RouteComponent::from(component));
    }

    /// Instance currently registered for a view
    pub fn instance(&self, view: &str) -> Option<Instance> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(view)
            .cloned()
    }

    /// Registers (`Some`) or unregisters (`None`) the UI instance of a view
    pub fn register_instance(&self, view: &str, instance: Option<Instance>) {
        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        match instance {
            Some(instance) => {
                instances.insert(view.to_string(), instance);
            }
            None => {
                instances.remove(view);
            }
        }
    }

    /// Props for a view given the resolved route
    ///
    /// `true` passes the route params as a JSON object, an object is passed as is, and a
    /// function is called with the route. Views without props get `None`.
    pub fn resolve_props(&self, view: &str, route: &Route) -> Option<Value> {
        self.props.get(view)?.resolve(route)
    }
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| &parent.path))
            .field("match_as", &self.match_as)
            .field("redirect", &self.redirect)
            .field("meta", &self.meta)
            .finish()
    }
}
