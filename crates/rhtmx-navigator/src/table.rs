//! Route table builder
//!
//! Compiles a tree of [`RouteConfig`]s into three structures: the ordered path list
//! (matching priority), the path → record map and the name → record map. Building
//! is best-effort: configuration mistakes are reported with `tracing::warn!` and the
//! rest of the tree is still registered.

use crate::config::RouteConfig;
use crate::path::{join_paths, PathPattern, PatternOptions};
use crate::record::{RecordParts, RouteRecord};
use std::collections::HashMap;
use std::sync::Arc;

/// Path key of catch-all routes, always tried last
pub const WILDCARD: &str = "*";

/// Indexed, priority-ordered route table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    path_list: Vec<String>,
    path_map: HashMap<String, Arc<RouteRecord>>,
    name_map: HashMap<String, Arc<RouteRecord>>,
}

impl RouteTable {
    /// Builds a table from a config tree
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::{RouteConfig, RouteTable};
    ///
    /// let table = RouteTable::build(&[
    ///     RouteConfig::new("*"),
    ///     RouteConfig::new("/users/:id").with_name("user"),
    /// ]);
    ///
    /// // Catch-alls always come last
    /// assert_eq!(table.path_list(), &["/users/:id".to_string(), "*".to_string()]);
    /// assert!(table.by_name("user").is_some());
    /// ```
    pub fn build(configs: &[RouteConfig]) -> Self {
        let mut table = Self::default();
        table.extend(configs);
        table
    }

    /// Registers more routes; existing entries are never replaced
    pub fn extend(&mut self, configs: &[RouteConfig]) {
        for config in configs {
            self.add_route_record(config, None, None);
        }

        // Stable partition: wildcard keys move to the end in their relative order
        let (mut specific, wildcards): (Vec<String>, Vec<String>) = std::mem::take(&mut self.path_list)
            .into_iter()
            .partition(|path| path != WILDCARD);
        specific.extend(wildcards);
        self.path_list = specific;

        let missing_slash: Vec<&str> = self
            .path_list
            .iter()
            .map(String::as_str)
            .filter(|path| !path.is_empty() && !path.starts_with('*') && !path.starts_with('/'))
            .collect();
        if !missing_slash.is_empty() {
            tracing::warn!(
                "Non-nested routes must include a leading slash character. Fix the following routes: {}",
                missing_slash.join(", ")
            );
        }
    }

    /// Path keys in matching priority order
    pub fn path_list(&self) -> &[String] {
        &self.path_list
    }

    /// Record registered under a canonical path
    pub fn get(&self, path: &str) -> Option<&Arc<RouteRecord>> {
        self.path_map.get(path)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<RouteRecord>> {
        self.name_map.get(name)
    }

    /// Records in matching priority order
    pub fn records(&self) -> impl Iterator<Item = &Arc<RouteRecord>> {
        self.path_list.iter().filter_map(|path| self.path_map.get(path))
    }

    pub fn len(&self) -> usize {
        self.path_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_list.is_empty()
    }

    fn add_route_record(
        &mut self,
        config: &RouteConfig,
        parent: Option<&Arc<RouteRecord>>,
        match_as: Option<String>,
    ) {
        let path = normalize_path(&config.path, parent, config.strict);
        let options = PatternOptions {
            sensitive: config.case_sensitive.unwrap_or(false),
            strict: config.strict,
        };

        let pattern = match PathPattern::compile_with(&path, options) {
            Ok(pattern) => pattern,
            Err(err) => {
                tracing::warn!("{}; skipping route and its children", err);
                return;
            }
        };
        if !pattern.duplicate_keys().is_empty() {
            tracing::warn!("Duplicate param keys in route with path: \"{}\"", path);
        }

        let record = Arc::new(RouteRecord::new(RecordParts {
            path,
            pattern,
            name: config.name.clone(),
            parent: parent.cloned(),
            match_as: match_as.clone(),
            redirect: config.redirect.clone(),
            before_enter: config.before_enter.clone(),
            meta: config.meta.clone(),
            props: config.props.clone(),
            components: config.components.clone(),
        }));

        if !config.children.is_empty() {
            if let Some(name) = &config.name {
                let has_default_child = config
                    .children
                    .iter()
                    .any(|child| child.path.is_empty() || child.path == "/");
                if config.redirect.is_none() && has_default_child {
                    tracing::warn!(
                        "Named Route '{}' has a default child route. When navigating to this named route, \
                         the default child route will not be rendered. Remove the name from this route \
                         and use the name of the default child route for named links instead.",
                        name
                    );
                }
            }

            for child in &config.children {
                let child_match_as = match_as
                    .as_ref()
                    .map(|shadow| join_paths(shadow, &child.path));
                self.add_route_record(child, Some(&record), child_match_as);
            }
        }

        if !self.path_map.contains_key(&record.path) {
            self.path_list.push(record.path.clone());
            self.path_map.insert(record.path.clone(), record.clone());
        }

        for alias in &config.alias {
            if *alias == config.path {
                tracing::warn!(
                    "Found an alias with the same value as the path: \"{}\". The alias is ignored.",
                    config.path
                );
                continue;
            }

            let shadow = RouteConfig::new(alias.clone()).with_children(config.children.iter().cloned());
            let canonical = if record.path.is_empty() {
                "/".to_string()
            } else {
                record.path.clone()
            };
            self.add_route_record(&shadow, parent, Some(canonical));
        }

        if let Some(name) = &config.name {
            if !self.name_map.contains_key(name) {
                self.name_map.insert(name.clone(), record.clone());
            } else if match_as.is_none() {
                tracing::warn!(
                    "Duplicate named routes definition: {{ name: \"{}\", path: \"{}\" }}",
                    name,
                    record.path
                );
            }
        }
    }
}

/// Strips a trailing slash (unless strict) and joins relative paths onto the parent
fn normalize_path(path: &str, parent: Option<&Arc<RouteRecord>>, strict: bool) -> String {
    let path = if strict {
        path
    } else {
        path.strip_suffix('/').unwrap_or(path)
    };

    if path.starts_with('/') {
        return path.to_string();
    }
    match parent {
        Some(parent) => join_paths(&parent.path, path),
        None => path.to_string(),
    }
}
