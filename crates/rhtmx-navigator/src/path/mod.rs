/// Path utilities for splitting, resolving and cleaning navigation paths
///
/// All functions are **pure**: given same input, always produce same output with no side effects.
/// None of them decode percent-escapes; decoding happens when captures are extracted.

use std::borrow::Cow;

pub mod pattern;
pub use pattern::{PathPattern, PatternKey, PatternOptions};

/// A raw path split into its path, query and hash parts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPath<'a> {
    /// Path portion (everything before `?` and `#`)
    pub path: &'a str,
    /// Query string without its leading `?`
    pub query: &'a str,
    /// Hash including its leading `#` (empty when absent)
    pub hash: &'a str,
}

/// Splits a raw path into path, query and hash (pure function)
///
/// The first `#` starts the hash, then the first `?` of the remainder starts the query.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::parse_path;
///
/// let parsed = parse_path("/users/1?tab=posts#top");
/// assert_eq!(parsed.path, "/users/1");
/// assert_eq!(parsed.query, "tab=posts");
/// assert_eq!(parsed.hash, "#top");
/// ```
pub fn parse_path(raw: &str) -> ParsedPath<'_> {
    let (rest, hash) = match raw.find('#') {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };

    let (path, query) = match rest.find('?') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };

    ParsedPath { path, query, hash }
}

/// Resolves `relative` against `base` (pure function)
///
/// # Rules
///
/// 1. Absolute paths (`/...`) are returned unchanged
/// 2. Query or hash only (`?...`, `#...`) is appended to `base`
/// 3. Otherwise `base` is treated as a segment stack: its last segment is dropped
///    unless `append` is set (or it is already empty), then `..` pops and `.` is skipped
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::resolve_path;
///
/// assert_eq!(resolve_path("/abs", "/a/b", false), "/abs");
/// assert_eq!(resolve_path("c", "/a/b", false), "/a/c");
/// assert_eq!(resolve_path("c", "/a/b", true), "/a/b/c");
/// assert_eq!(resolve_path("../c", "/a/b/d", false), "/a/c");
/// assert_eq!(resolve_path("?q=1", "/a", false), "/a?q=1");
/// ```
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
    match relative.chars().next() {
        Some('/') => return relative.to_string(),
        Some('?') | Some('#') => return format!("{}{}", base, relative),
        _ => {}
    }

    let mut stack: Vec<&str> = base.split('/').collect();

    // Drop the trailing segment unless appending, or the base ends with a slash
    if !append || stack.last().map_or(true, |last| last.is_empty()) {
        stack.pop();
    }

    for segment in relative.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." => {}
            _ => stack.push(segment),
        }
    }

    if stack.first() != Some(&"") {
        stack.insert(0, "");
    }

    stack.join("/")
}

/// Collapses doubled slashes into one
///
/// Returns `Cow::Borrowed` when the input contains no `//` (zero allocations).
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::clean_path;
///
/// assert_eq!(clean_path("/a//b"), "/a/b");
/// assert_eq!(clean_path("/a/b"), "/a/b");
/// ```
pub fn clean_path(path: &str) -> Cow<'_, str> {
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }

    let mut cleaned = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' && previous_slash {
            continue;
        }
        previous_slash = ch == '/';
        cleaned.push(ch);
    }
    Cow::Owned(cleaned)
}

/// Joins a child path onto its parent path and cleans the result
pub fn join_paths(parent: &str, child: &str) -> String {
    clean_path(&format!("{}/{}", parent, child)).into_owned()
}
