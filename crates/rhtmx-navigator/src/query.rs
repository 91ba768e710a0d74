//! Query string codec
//!
//! Parses query strings into a multi-value [`Query`] and serializes it back to a
//! canonical string. Keys are kept in a `BTreeMap`, so serialization order is stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Multi-value query mapping
pub type Query = BTreeMap<String, QueryValue>;

/// Custom query parser installed through the router options
pub type QueryParser = Arc<dyn Fn(&str) -> Result<Query, QueryError> + Send + Sync>;

/// Custom query serializer installed through the router options
pub type QueryStringifier = Arc<dyn Fn(&Query) -> String + Send + Sync>;

/// Value stored under a query key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// Key present without `=`
    Null,
    /// Single value
    Single(String),
    /// Repeated key; `None` elements are bare keys
    List(Vec<Option<String>>),
}

impl QueryValue {
    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Null => None,
            QueryValue::Single(value) => Some(value),
            QueryValue::List(values) => values.iter().flatten().next().map(String::as_str),
        }
    }

    fn push(&mut self, value: Option<String>) {
        let previous = std::mem::replace(self, QueryValue::Null);
        *self = match previous {
            QueryValue::Null => QueryValue::List(vec![None, value]),
            QueryValue::Single(first) => QueryValue::List(vec![Some(first), value]),
            QueryValue::List(mut values) => {
                values.push(value);
                QueryValue::List(values)
            }
        };
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values.into_iter().map(Some).collect())
    }
}

/// Failure raised by a query parser
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed query component \"{component}\": {reason}")]
pub struct QueryError {
    pub component: String,
    pub reason: String,
}

fn decode(component: &str) -> Result<String, QueryError> {
    urlencoding::decode(component)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| QueryError {
            component: component.to_string(),
            reason: err.to_string(),
        })
}

/// Encodes per RFC3986, leaving commas readable
fn encode(component: &str) -> String {
    urlencoding::encode(component).replace("%2C", ",")
}

/// Parses a query string (pure function)
///
/// A single leading `?`, `#` or `&` is ignored, `+` decodes to a space, a key without
/// `=` maps to [`QueryValue::Null`] and repeated keys accumulate into a list.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::query::{parse_query, QueryValue};
///
/// let query = parse_query("?tag=a&tag=b&q=hello+world&flag").unwrap();
/// assert_eq!(query["q"], QueryValue::Single("hello world".into()));
/// assert_eq!(query["flag"], QueryValue::Null);
/// assert_eq!(
///     query["tag"],
///     QueryValue::List(vec![Some("a".into()), Some("b".into())])
/// );
/// ```
pub fn parse_query(raw: &str) -> Result<Query, QueryError> {
    let mut query = Query::new();

    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['?', '#', '&'])
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(query);
    }

    for param in trimmed.split('&') {
        let param = param.replace('+', " ");
        let (key, value) = match param.split_once('=') {
            Some((key, value)) => (decode(key)?, Some(decode(value)?)),
            None => (decode(&param)?, None),
        };

        match query.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                let value = value.map_or(QueryValue::Null, QueryValue::Single);
                query.insert(key, value);
            }
        }
    }

    Ok(query)
}

/// Parses `raw` with the custom or default parser and overlays `extra`
///
/// A parse failure is downgraded to an empty query with a diagnostic.
pub fn resolve_query(raw: &str, extra: Option<&Query>, parser: Option<&QueryParser>) -> Query {
    let parsed = match parser {
        Some(parser) => parser(raw),
        None => parse_query(raw),
    };

    let mut query = parsed.unwrap_or_else(|err| {
        tracing::warn!("{}", err);
        Query::new()
    });

    if let Some(extra) = extra {
        for (key, value) in extra {
            query.insert(key.clone(), value.clone());
        }
    }
    query
}

/// Serializes a query to `?a=1&b=2` form (empty string when there is nothing to emit)
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::query::{stringify_query, Query, QueryValue};
///
/// let mut query = Query::new();
/// query.insert("name".into(), QueryValue::Single("a b,c".into()));
/// query.insert("flag".into(), QueryValue::Null);
/// assert_eq!(stringify_query(&query), "?flag&name=a%20b,c");
/// assert_eq!(stringify_query(&Query::new()), "");
/// ```
pub fn stringify_query(query: &Query) -> String {
    let pairs: Vec<String> = query
        .iter()
        .map(|(key, value)| match value {
            QueryValue::Null => encode(key),
            QueryValue::Single(value) => format!("{}={}", encode(key), encode(value)),
            QueryValue::List(values) => values
                .iter()
                .map(|value| match value {
                    Some(value) => format!("{}={}", encode(key), encode(value)),
                    None => encode(key),
                })
                .collect::<Vec<_>>()
                .join("&"),
        })
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}
