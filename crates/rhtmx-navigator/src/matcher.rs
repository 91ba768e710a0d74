//! Location matcher
//!
//! Resolves raw locations against the route table, following redirect and alias
//! indirection, and produces fully populated [`Route`]s.

use crate::config::RouteConfig;
use crate::error::RouterError;
use crate::location::{normalize_location, Location, Params, RawLocation};
use crate::path::{resolve_path, PathPattern};
use crate::query::{QueryParser, QueryStringifier};
use crate::record::RouteRecord;
use crate::route::{full_path, Route};
use crate::table::RouteTable;
use std::sync::{Arc, PoisonError, RwLock};

/// Maximum number of redirect/alias hops followed for one match
pub const MAX_REDIRECT_DEPTH: usize = 16;

/// Resolves locations against a growable route table
///
/// Matching runs on a snapshot of the table, so redirect callbacks may add routes.
pub struct Matcher {
    table: RwLock<Arc<RouteTable>>,
    parse_query: Option<QueryParser>,
    stringify_query: Option<QueryStringifier>,
}

impl Matcher {
    /// Compiles the route table
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::{Matcher, RouteConfig};
    ///
    /// let matcher = Matcher::new(&[
    ///     RouteConfig::new("/users/:id").with_name("user"),
    ///     RouteConfig::new("*"),
    /// ]);
    ///
    /// let route = matcher.match_location("/users/42", None).unwrap();
    /// assert_eq!(route.params["id"], "42");
    /// assert_eq!(route.name.as_deref(), Some("user"));
    /// ```
    pub fn new(configs: &[RouteConfig]) -> Self {
        Self {
            table: RwLock::new(Arc::new(RouteTable::build(configs))),
            parse_query: None,
            stringify_query: None,
        }
    }

    /// Installs custom query codecs
    pub fn with_query_codec(
        mut self,
        parser: Option<QueryParser>,
        stringifier: Option<QueryStringifier>,
    ) -> Self {
        self.parse_query = parser;
        self.stringify_query = stringifier;
        self
    }

    pub(crate) fn query_parser(&self) -> Option<&QueryParser> {
        self.parse_query.as_ref()
    }

    /// Extends the table; routes resolved earlier keep their records
    pub fn add_routes(&self, configs: &[RouteConfig]) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *table).extend(configs);
    }

    fn snapshot(&self) -> Arc<RouteTable> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record registered under a route name
    pub fn record_by_name(&self, name: &str) -> Option<Arc<RouteRecord>> {
        self.snapshot().by_name(name).cloned()
    }

    /// All records in matching priority order
    pub fn records(&self) -> Vec<Arc<RouteRecord>> {
        self.snapshot().records().cloned().collect()
    }

    /// Resolves a raw location, relative to `current` when given
    ///
    /// A location that matches nothing yields a route with an empty matched chain.
    /// Filling a pattern without a required param, or following more than
    /// [`MAX_REDIRECT_DEPTH`] redirects or aliases, is an error.
    pub fn match_location(
        &self,
        raw: impl Into<RawLocation>,
        current: Option<&Route>,
    ) -> Result<Route, RouterError> {
        let table = self.snapshot();
        self.match_in(&table, raw.into(), current, None, 0)
    }

    fn match_in(
        &self,
        table: &RouteTable,
        raw: RawLocation,
        current: Option<&Route>,
        redirected_from: Option<&Location>,
        depth: usize,
    ) -> Result<Route, RouterError> {
        let mut location = normalize_location(raw, current, false, self.parse_query.as_ref())?;

        if let Some(name) = location.name.clone() {
            let Some(record) = table.by_name(&name) else {
                tracing::warn!("Route with name '{}' does not exist", name);
                return Ok(self.create_route(None, &location, None));
            };

            let params = location.params.get_or_insert_with(Params::new);
            if let Some(current) = current {
                let required: Vec<&str> = record
                    .pattern()
                    .keys()
                    .iter()
                    .filter(|key| !key.optional)
                    .map(|key| key.param_name())
                    .collect();
                for (key, value) in &current.params {
                    if !params.contains_key(key) && required.contains(&key.as_str()) {
                        params.insert(key.clone(), value.clone());
                    }
                }
            }

            location.path = Some(record.pattern().fill(params)?);
            return self.finish(table, Some(record), location, redirected_from, depth);
        }

        if let Some(path) = location.path.clone().filter(|path| !path.is_empty()) {
            for record in table.records() {
                if let Some(params) = extract_params(record, &path) {
                    location.params = Some(params);
                    return self.finish(table, Some(record), location, redirected_from, depth);
                }
            }
        }

        Ok(self.create_route(None, &location, None))
    }

    fn finish(
        &self,
        table: &RouteTable,
        record: Option<&Arc<RouteRecord>>,
        location: Location,
        redirected_from: Option<&Location>,
        depth: usize,
    ) -> Result<Route, RouterError> {
        if let Some(record) = record {
            if record.redirect.is_some() {
                let trigger = redirected_from.cloned().unwrap_or(location);
                return self.redirect(table, record, trigger, depth);
            }
            if let Some(match_as) = &record.match_as {
                return self.alias(table, match_as, location, depth);
            }
        }
        Ok(self.create_route(record, &location, redirected_from))
    }

    fn redirect(
        &self,
        table: &RouteTable,
        record: &Arc<RouteRecord>,
        location: Location,
        depth: usize,
    ) -> Result<Route, RouterError> {
        self.check_depth(&location, depth)?;

        let Some(redirect) = &record.redirect else {
            return Ok(self.create_route(Some(record), &location, None));
        };
        let preliminary = self.create_route(Some(record), &location, None);
        let target = redirect.target(&preliminary).into_location();

        // The redirect target is the source of truth for query, hash and params
        let query = target.query.clone().or_else(|| location.query.clone());
        let hash = target.hash.clone().or_else(|| location.hash.clone());
        let params = target.params.clone().or_else(|| location.params.clone());

        if let Some(name) = target.name {
            if table.by_name(&name).is_none() {
                tracing::warn!("redirect failed: named route \"{}\" not found", name);
            }
            let next = Location {
                name: Some(name),
                query,
                hash,
                params,
                normalized: true,
                ..Location::default()
            };
            return self.match_in(table, next.into(), None, Some(&location), depth + 1);
        }

        if let Some(path) = target.path.filter(|path| !path.is_empty()) {
            let base = record
                .parent
                .as_ref()
                .map_or("/", |parent| parent.path.as_str());
            let raw_path = resolve_path(&path, base, true);
            let resolved = PathPattern::compile(&raw_path)?.fill(&params.unwrap_or_default())?;
            let next = Location {
                path: Some(resolved),
                query,
                hash,
                normalized: true,
                ..Location::default()
            };
            return self.match_in(table, next.into(), None, Some(&location), depth + 1);
        }

        tracing::warn!("invalid redirect option: {:?}", redirect);
        Ok(self.create_route(None, &location, None))
    }

    fn alias(
        &self,
        table: &RouteTable,
        match_as: &str,
        mut location: Location,
        depth: usize,
    ) -> Result<Route, RouterError> {
        self.check_depth(&location, depth)?;

        let params = location.params.clone().unwrap_or_default();
        let aliased_path = PathPattern::compile(match_as)?.fill(&params)?;
        let canonical = Location {
            path: Some(aliased_path),
            normalized: true,
            ..Location::default()
        };
        let aliased = self.match_in(table, canonical.into(), None, None, depth + 1)?;

        match aliased.matched.last() {
            Some(record) => {
                location.params = Some(aliased.params.clone());
                Ok(self.create_route(Some(record), &location, None))
            }
            None => Ok(self.create_route(None, &location, None)),
        }
    }

    fn check_depth(&self, location: &Location, depth: usize) -> Result<(), RouterError> {
        if depth >= MAX_REDIRECT_DEPTH {
            return Err(RouterError::RedirectLoop {
                from: full_path(location, self.stringify_query.as_ref()),
                limit: MAX_REDIRECT_DEPTH,
            });
        }
        Ok(())
    }

    fn create_route(
        &self,
        record: Option<&Arc<RouteRecord>>,
        location: &Location,
        redirected_from: Option<&Location>,
    ) -> Route {
        Route::new(record, location, redirected_from, self.stringify_query.as_ref())
    }
}

/// Matches `path` against a record and decodes its captures
fn extract_params(record: &RouteRecord, path: &str) -> Option<Params> {
    let pattern = record.pattern();
    let captures = pattern.captures(path)?;

    let params = pattern
        .keys()
        .iter()
        .zip(captures)
        .filter_map(|(key, value)| {
            let value = value?;
            let decoded = urlencoding::decode(&value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(value);
            Some((key.param_name().to_string(), decoded))
        })
        .collect();
    Some(params)
}
