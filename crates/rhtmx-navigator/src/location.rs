//! Navigation targets and their normalization
//!
//! A [`RawLocation`] is whatever the caller hands to `push`/`replace`: a plain path
//! string or a structured [`Location`]. [`normalize_location`] turns it into the
//! canonical shape the matcher consumes.

use crate::error::RouterError;
use crate::path::{parse_path, resolve_path, PathPattern};
use crate::query::{resolve_query, Query, QueryParser, QueryValue};
use crate::route::Route;
use std::collections::HashMap;

/// Route params: name → decoded value
pub type Params = HashMap<String, String>;

/// Structured navigation target
///
/// The same type describes raw input and the normalized result; `normalized` marks
/// the latter so normalization is idempotent.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::Location;
///
/// let by_name = Location::named("user").with_param("id", "7");
/// let by_path = Location::path("/search").with_query_param("q", "rust").with_hash("top");
///
/// assert_eq!(by_name.params.unwrap()["id"], "7");
/// assert_eq!(by_path.hash.as_deref(), Some("top"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub name: Option<String>,
    pub path: Option<String>,
    pub params: Option<Params>,
    pub query: Option<Query>,
    pub hash: Option<String>,
    /// Resolve a relative path by appending to the current path
    pub append: bool,
    /// Replace instead of push when used as a guard redirect
    pub replace: bool,
    pub normalized: bool,
}

impl Location {
    /// Path-based location
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Name-based location
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Relative-params location: keeps the current route and swaps params
    pub fn params(params: Params) -> Self {
        Self {
            params: Some(params),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query
            .get_or_insert_with(Query::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// True when the location points somewhere (has a path or a name)
    pub fn is_target(&self) -> bool {
        self.path.is_some() || self.name.is_some()
    }
}

/// Navigation target as accepted by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLocation {
    Path(String),
    Location(Location),
}

impl RawLocation {
    /// Structured view of the target
    pub fn into_location(self) -> Location {
        match self {
            RawLocation::Path(path) => Location::path(path),
            RawLocation::Location(location) => location,
        }
    }

    /// True when the target asks for a history replacement
    pub fn is_replace(&self) -> bool {
        matches!(self, RawLocation::Location(location) if location.replace)
    }

    /// True when the target can start a navigation (a path string, or a location
    /// with a path or a name)
    pub fn is_target(&self) -> bool {
        match self {
            RawLocation::Path(_) => true,
            RawLocation::Location(location) => location.is_target(),
        }
    }
}

impl From<&str> for RawLocation {
    fn from(path: &str) -> Self {
        RawLocation::Path(path.to_string())
    }
}

impl From<String> for RawLocation {
    fn from(path: String) -> Self {
        RawLocation::Path(path)
    }
}

impl From<&String> for RawLocation {
    fn from(path: &String) -> Self {
        RawLocation::Path(path.clone())
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        RawLocation::Location(location)
    }
}

/// Converts a raw target into a canonical location
///
/// # Rules
///
/// 1. Already normalized locations are returned as is
/// 2. Named locations are copied and returned; the matcher resolves them
/// 3. Params without a path, given a current route, merge into the current params
///    and either keep the current name or fill the deepest matched record's path
/// 4. Everything else is treated as a path: split, resolved against the current path
///    (or `/`), its query parsed and overlaid with the explicit query, and its hash
///    prefixed with `#`
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::location::normalize_location;
///
/// let location = normalize_location("/users?tab=posts#top".into(), None, false, None).unwrap();
/// assert_eq!(location.path.as_deref(), Some("/users"));
/// assert_eq!(location.hash.as_deref(), Some("#top"));
/// assert!(location.normalized);
/// ```
pub fn normalize_location(
    raw: RawLocation,
    current: Option<&Route>,
    append: bool,
    parser: Option<&QueryParser>,
) -> Result<Location, RouterError> {
    let next = raw.into_location();

    if next.normalized || next.name.is_some() {
        return Ok(next);
    }

    // Relative params
    if next.path.is_none() && next.params.is_some() {
        if let Some(current) = current {
            return normalize_relative_params(next, current);
        }
    }

    let raw_path = next.path.as_deref().unwrap_or("");
    let parsed = parse_path(raw_path);
    let base = current.map_or("/", |route| route.path.as_str());

    let path = if parsed.path.is_empty() {
        base.to_string()
    } else {
        resolve_path(parsed.path, base, append || next.append)
    };

    let query = resolve_query(parsed.query, next.query.as_ref(), parser);

    let hash = next
        .hash
        .as_deref()
        .filter(|hash| !hash.is_empty())
        .unwrap_or(parsed.hash);
    let hash = match hash {
        "" => None,
        hash if hash.starts_with('#') => Some(hash.to_string()),
        hash => Some(format!("#{}", hash)),
    };

    Ok(Location {
        path: Some(path),
        query: Some(query),
        hash,
        replace: next.replace,
        normalized: true,
        ..Location::default()
    })
}

fn normalize_relative_params(mut next: Location, current: &Route) -> Result<Location, RouterError> {
    next.normalized = true;

    let mut params = current.params.clone();
    params.extend(next.params.take().unwrap_or_default());

    if let Some(name) = &current.name {
        next.name = Some(name.clone());
        next.params = Some(params);
    } else if let Some(record) = current.matched.last() {
        let pattern = PathPattern::compile(&record.path)?;
        next.path = Some(pattern.fill(&params)?);
    } else {
        tracing::warn!("relative params navigation requires a current route");
    }

    Ok(next)
}
