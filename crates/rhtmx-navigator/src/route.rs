//! Resolved routes

use crate::location::{Location, Params};
use crate::query::{stringify_query, Query, QueryStringifier};
use crate::record::RouteRecord;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of matching a location against the route table
///
/// Routes are immutable values handed to guards and committed as current.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: Option<String>,
    pub path: String,
    /// Hash including its leading `#`, or empty
    pub hash: String,
    pub query: Query,
    pub params: Params,
    /// `path` + stringified query + hash
    pub full_path: String,
    /// Matched records, root first
    pub matched: Vec<Arc<RouteRecord>>,
    /// Metadata of the deepest matched record
    pub meta: Value,
    /// Full path of the location that redirected here
    pub redirected_from: Option<String>,
    start: bool,
}

impl Route {
    /// The "nowhere" route that is current before the first navigation commits
    pub fn start() -> Self {
        Self {
            name: None,
            path: "/".to_string(),
            hash: String::new(),
            query: Query::new(),
            params: Params::new(),
            full_path: "/".to_string(),
            matched: Vec::new(),
            meta: Value::Object(Map::new()),
            redirected_from: None,
            start: true,
        }
    }

    /// Builds a route from a (possibly missing) record and a normalized location
    pub fn new(
        record: Option<&Arc<RouteRecord>>,
        location: &Location,
        redirected_from: Option<&Location>,
        stringify: Option<&QueryStringifier>,
    ) -> Self {
        let query = location.query.clone().unwrap_or_default();
        let name = location
            .name
            .clone()
            .or_else(|| record.and_then(|record| record.name.clone()));
        let meta = record.map_or_else(|| Value::Object(Map::new()), |record| record.meta.clone());

        Self {
            name,
            path: path_or_root(location.path.as_deref()).to_string(),
            hash: location.hash.clone().unwrap_or_default(),
            params: location.params.clone().unwrap_or_default(),
            full_path: full_path(location, stringify),
            matched: record.map(matched_chain).unwrap_or_default(),
            query,
            meta,
            redirected_from: redirected_from.map(|from| full_path(from, stringify)),
            start: false,
        }
    }

    pub fn is_start(&self) -> bool {
        self.start
    }

    /// True when a path matched a record
    pub fn is_matched(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Deepest matched record
    pub fn record(&self) -> Option<&Arc<RouteRecord>> {
        self.matched.last()
    }

    /// Compares two routes by content
    ///
    /// Routes are the same when their paths (ignoring a trailing slash), hashes and
    /// queries agree. The start route is only the same as another start route.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::Route;
    ///
    /// let start = Route::start();
    /// assert!(start.is_same(&Route::start()));
    ///
    /// let mut copy = Route::start();
    /// copy.path = "/elsewhere".into();
    /// // Still the start sentinel: identity wins over content
    /// assert!(start.is_same(&copy));
    /// ```
    pub fn is_same(&self, other: &Route) -> bool {
        if self.start || other.start {
            return self.start && other.start;
        }

        if !self.path.is_empty() && !other.path.is_empty() {
            return trim_trailing_slash(&self.path) == trim_trailing_slash(&other.path)
                && self.hash == other.hash
                && self.query == other.query;
        }

        match (&self.name, &other.name) {
            (Some(a), Some(b)) => {
                a == b && self.hash == other.hash && self.query == other.query && self.params == other.params
            }
            _ => false,
        }
    }
}

fn path_or_root(path: Option<&str>) -> &str {
    match path {
        Some(path) if !path.is_empty() => path,
        _ => "/",
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// `path` + stringified query + hash of a location
pub fn full_path(location: &Location, stringify: Option<&QueryStringifier>) -> String {
    let path = path_or_root(location.path.as_deref());
    let query = match (&location.query, stringify) {
        (Some(query), Some(stringify)) => stringify(query),
        (Some(query), None) => stringify_query(query),
        (None, _) => String::new(),
    };
    let hash = location.hash.as_deref().unwrap_or("");
    format!("{}{}{}", path, query, hash)
}

fn matched_chain(record: &Arc<RouteRecord>) -> Vec<Arc<RouteRecord>> {
    let mut chain = Vec::new();
    let mut cursor = Some(record.clone());
    while let Some(record) = cursor {
        cursor = record.parent.clone();
        chain.push(record);
    }
    chain.reverse();
    chain
}
