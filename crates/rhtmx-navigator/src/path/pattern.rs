/// Path pattern compilation
///
/// Compiles route paths such as `/users/:id`, `/files/:path*`, `/post/:id(\d+)?` or `*`
/// into a matcher that extracts ordered captures, and back into a filler that turns
/// params into a concrete path.
///
/// # Syntax
///
/// - `:name` → required segment param
/// - `:name?` → optional param, `:name*` → zero or more segments, `:name+` → one or more
/// - `:name(regex)` → param with a custom capture pattern
/// - `(regex)` → unnamed capture, exposed by index
/// - `*` → wildcard capture, exposed as `pathMatch` when it is the first unnamed key
/// - `\:` → literal character
use crate::error::RouterError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\\.)|([/.])?(?:(?::(\w+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*))",
    )
    .expect("path token regex is valid")
});

const DELIMITER: &str = "/";

/// Synthetic param name of the first unnamed capture
pub const WILDCARD_PARAM: &str = "pathMatch";

/// Options that change how a pattern matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Match letter case exactly (default: case-insensitive)
    pub sensitive: bool,
    /// Require the exact trailing slash (default: an optional trailing slash is accepted)
    pub strict: bool,
}

/// One named (or numbered) capture in a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternKey {
    /// Param name, or the capture index for unnamed captures
    pub name: String,
    /// Delimiter character that precedes the capture (`/`, `.` or empty)
    pub prefix: String,
    pub optional: bool,
    pub repeat: bool,
    /// Capture shares its segment with following literal text
    pub partial: bool,
    /// Capture came from a bare `*`
    pub asterisk: bool,
    /// Regex source for a single value
    pub pattern: String,
}

impl PatternKey {
    /// Name under which the captured value is exposed in route params
    pub fn param_name(&self) -> &str {
        if self.name == "0" {
            WILDCARD_PARAM
        } else {
            &self.name
        }
    }

    fn is_unnamed(&self) -> bool {
        self.name.chars().all(|c| c.is_ascii_digit())
    }
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Key(usize),
}

/// A compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    tokens: Vec<Token>,
    keys: Vec<PatternKey>,
    regex: Regex,
    validators: Vec<Regex>,
}

impl PathPattern {
    /// Compiles a pattern with default options (case-insensitive, non-strict)
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::path::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/users/:id").unwrap();
    /// let captures = pattern.captures("/users/42").unwrap();
    /// assert_eq!(captures, vec![Some("42".to_string())]);
    /// ```
    pub fn compile(path: &str) -> Result<Self, RouterError> {
        Self::compile_with(path, PatternOptions::default())
    }

    /// Compiles a pattern with explicit options
    pub fn compile_with(path: &str, options: PatternOptions) -> Result<Self, RouterError> {
        let (tokens, keys) = tokenize(path);
        let source = tokens_to_regex(&tokens, &keys, options);

        let invalid = |err: regex::Error| RouterError::InvalidPattern {
            path: path.to_string(),
            reason: err.to_string(),
        };

        let regex = Regex::new(&source).map_err(invalid)?;
        let validators = keys
            .iter()
            .map(|key| {
                let flags = if options.sensitive { "" } else { "(?i)" };
                Regex::new(&format!("{}^(?:{})$", flags, key.pattern)).map_err(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: path.to_string(),
            tokens,
            keys,
            regex,
            validators,
        })
    }

    /// Pattern source as declared
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Ordered capture keys
    pub fn keys(&self) -> &[PatternKey] {
        &self.keys
    }

    /// Names of params that must be present to fill this pattern
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(|key| !key.optional)
            .map(|key| key.name.as_str())
    }

    /// Param names that appear more than once in the pattern
    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut seen = HashMap::new();
        for key in &self.keys {
            *seen.entry(key.name.as_str()).or_insert(0usize) += 1;
        }
        let mut duplicates: Vec<&str> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .collect();
        duplicates.sort_unstable();
        duplicates
    }

    /// Tests a concrete path (pure function)
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches a concrete path and returns one raw (undecoded) capture per key
    ///
    /// Returns `None` when the path does not match. Optional captures that did not
    /// participate are `None` inside the vector.
    pub fn captures(&self, path: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.captures(path)?;
        Some(
            (1..=self.keys.len())
                .map(|idx| caps.get(idx).map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Fills params back into the pattern to produce a concrete path
    ///
    /// Values are percent-encoded (keeping `/` inside wildcard captures). A missing
    /// required param is a hard error.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::path::PathPattern;
    /// use std::collections::HashMap;
    ///
    /// let pattern = PathPattern::compile("/params/:name/links/:age?").unwrap();
    /// let mut params = HashMap::new();
    /// params.insert("name".to_string(), "42".to_string());
    /// assert_eq!(pattern.fill(&params).unwrap(), "/params/42/links");
    ///
    /// params.clear();
    /// assert!(pattern.fill(&params).is_err());
    /// ```
    pub fn fill(&self, params: &HashMap<String, String>) -> Result<String, RouterError> {
        let mut path = String::new();

        for token in &self.tokens {
            let idx = match token {
                Token::Literal(text) => {
                    path.push_str(text);
                    continue;
                }
                Token::Key(idx) => *idx,
            };
            let key = &self.keys[idx];

            let value = params.get(&key.name).or_else(|| {
                if key.is_unnamed() && key.name == "0" {
                    params.get(WILDCARD_PARAM)
                } else {
                    None
                }
            });

            let value = match value {
                Some(value) => value,
                None if key.optional => {
                    if key.partial {
                        path.push_str(&key.prefix);
                    }
                    continue;
                }
                None => {
                    return Err(RouterError::MissingParam {
                        param: key.param_name().to_string(),
                        path: self.source.clone(),
                    })
                }
            };

            let segment = if key.asterisk {
                encode_asterisk(value)
            } else {
                encode_pretty(value)
            };

            if !self.validators[idx].is_match(&segment) {
                return Err(RouterError::InvalidParam {
                    param: key.param_name().to_string(),
                    value: segment,
                    pattern: key.pattern.clone(),
                    path: self.source.clone(),
                });
            }

            path.push_str(&key.prefix);
            path.push_str(&segment);
        }

        Ok(path)
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

fn tokenize(source: &str) -> (Vec<Token>, Vec<PatternKey>) {
    let mut tokens = Vec::new();
    let mut keys: Vec<PatternKey> = Vec::new();
    let mut unnamed = 0usize;
    let mut index = 0usize;
    let mut literal = String::new();

    for caps in PATH_TOKEN.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        literal.push_str(&source[index..whole.start()]);
        index = whole.end();

        if let Some(escaped) = caps.get(1) {
            // `\x` keeps the character after the backslash
            literal.push_str(&escaped.as_str()[1..]);
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let next = source[index..].chars().next();
        let prefix = caps.get(2).map(|m| m.as_str());
        let name = caps.get(3).map(|m| m.as_str());
        let capture = caps.get(4).or_else(|| caps.get(5)).map(|m| m.as_str());
        let modifier = caps.get(6).map(|m| m.as_str());
        let asterisk = caps.get(7).is_some();

        let partial = match (prefix, next) {
            (Some(prefix), Some(next)) => !prefix.starts_with(next),
            _ => false,
        };
        let repeat = matches!(modifier, Some("+") | Some("*"));
        let optional = matches!(modifier, Some("?") | Some("*"));
        let delimiter = prefix.unwrap_or(DELIMITER).to_string();

        let pattern = match capture {
            Some(group) => escape_group(group),
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(&delimiter)),
        };

        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let numbered = unnamed.to_string();
                unnamed += 1;
                numbered
            }
        };

        tokens.push(Token::Key(keys.len()));
        keys.push(PatternKey {
            name,
            prefix: prefix.unwrap_or("").to_string(),
            optional,
            repeat,
            partial,
            asterisk,
            pattern,
        });
    }

    literal.push_str(&source[index..]);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    (tokens, keys)
}

fn tokens_to_regex(tokens: &[Token], keys: &[PatternKey], options: PatternOptions) -> String {
    let mut route = String::new();

    for token in tokens {
        match token {
            Token::Literal(text) => route.push_str(&regex::escape(text)),
            Token::Key(idx) => {
                let key = &keys[*idx];
                let prefix = regex::escape(&key.prefix);
                let mut capture = format!("(?:{})", key.pattern);

                if key.repeat {
                    capture = format!("{}(?:{}{})*", capture, prefix, capture);
                }

                let capture = if key.optional {
                    if key.partial {
                        format!("{}({})?", prefix, capture)
                    } else {
                        format!("(?:{}({}))?", prefix, capture)
                    }
                } else {
                    format!("{}({})", prefix, capture)
                };

                route.push_str(&capture);
            }
        }
    }

    if !options.strict {
        if route.ends_with(DELIMITER) {
            route.truncate(route.len() - DELIMITER.len());
        }
        route.push_str("(?:/)?");
    }
    route.push('$');

    let flags = if options.sensitive { "" } else { "(?i)" };
    format!("{}^{}", flags, route)
}

fn escape_group(group: &str) -> String {
    let mut escaped = String::with_capacity(group.len());
    for ch in group.chars() {
        if matches!(ch, '$' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ============================================================================
// Param encoding
// ============================================================================

/// Reserved characters a path segment may carry unescaped
const SEGMENT_KEEP: &[(&str, &str)] = &[
    ("%3B", ";"),
    ("%2C", ","),
    ("%3A", ":"),
    ("%40", "@"),
    ("%26", "&"),
    ("%3D", "="),
    ("%2B", "+"),
    ("%24", "$"),
    ("%21", "!"),
    ("%2A", "*"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
];

fn restore(mut encoded: String, keep: &[(&str, &str)]) -> String {
    for (escaped, raw) in keep {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, raw);
        }
    }
    encoded
}

/// Encodes a segment value: URI-safe characters stay, `/`, `?` and `#` are escaped
fn encode_pretty(value: &str) -> String {
    restore(urlencoding::encode(value).into_owned(), SEGMENT_KEEP)
}

/// Encodes a wildcard value: like [`encode_pretty`] but keeps `/`
fn encode_asterisk(value: &str) -> String {
    restore(encode_pretty(value), &[("%2F", "/")])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_static_pattern() {
        let pattern = PathPattern::compile("/about").unwrap();
        assert!(pattern.is_match("/about"));
        assert!(pattern.is_match("/about/"));
        assert!(pattern.is_match("/ABOUT"));
        assert!(!pattern.is_match("/about/us"));
        assert!(pattern.keys().is_empty());
    }

    #[test]
    fn test_case_sensitive_pattern() {
        let options = PatternOptions {
            sensitive: true,
            strict: false,
        };
        let pattern = PathPattern::compile_with("/About", options).unwrap();
        assert!(pattern.is_match("/About"));
        assert!(!pattern.is_match("/about"));
    }

    #[test]
    fn test_strict_pattern() {
        let options = PatternOptions {
            sensitive: false,
            strict: true,
        };
        let pattern = PathPattern::compile_with("/about/", options).unwrap();
        assert!(pattern.is_match("/about/"));
        assert!(!pattern.is_match("/about"));
    }

    #[test]
    fn test_named_params() {
        let pattern = PathPattern::compile("/params/:name/links/:age").unwrap();
        let captures = pattern.captures("/params/42/links/7").unwrap();
        assert_eq!(captures, vec![Some("42".into()), Some("7".into())]);
        assert_eq!(
            pattern.required_params().collect::<Vec<_>>(),
            vec!["name", "age"]
        );
    }

    #[test]
    fn test_optional_param() {
        let pattern = PathPattern::compile("/posts/:id?").unwrap();
        assert_eq!(pattern.captures("/posts").unwrap(), vec![None]);
        assert_eq!(
            pattern.captures("/posts/9").unwrap(),
            vec![Some("9".to_string())]
        );
        assert_eq!(pattern.required_params().count(), 0);
    }

    #[test]
    fn test_custom_capture_pattern() {
        let pattern = PathPattern::compile(r"/items/:id(\d+)").unwrap();
        assert!(pattern.is_match("/items/12"));
        assert!(!pattern.is_match("/items/abc"));
    }

    #[test]
    fn test_repeat_param() {
        let pattern = PathPattern::compile("/files/:path+").unwrap();
        let captures = pattern.captures("/files/a/b/c").unwrap();
        assert_eq!(captures, vec![Some("a/b/c".to_string())]);
        assert!(!pattern.is_match("/files"));
    }

    #[test]
    fn test_wildcard() {
        let pattern = PathPattern::compile("*").unwrap();
        assert_eq!(pattern.keys()[0].param_name(), WILDCARD_PARAM);
        assert_eq!(
            pattern.captures("/nope/deeper").unwrap(),
            vec![Some("/nope/deeper".to_string())]
        );
    }

    #[test]
    fn test_prefixed_wildcard() {
        let pattern = PathPattern::compile("/user-*").unwrap();
        let captures = pattern.captures("/user-admin").unwrap();
        assert_eq!(captures, vec![Some("admin".to_string())]);
    }

    #[test]
    fn test_escaped_colon() {
        let pattern = PathPattern::compile(r"/time\:now").unwrap();
        assert!(pattern.is_match("/time:now"));
        assert!(pattern.keys().is_empty());
    }

    #[test]
    fn test_duplicate_keys() {
        let pattern = PathPattern::compile("/:id/nested/:id").unwrap();
        assert_eq!(pattern.duplicate_keys(), vec!["id"]);
    }

    #[test]
    fn test_fill_required_and_optional() {
        let pattern = PathPattern::compile("/users/:id/:tab?").unwrap();
        assert_eq!(pattern.fill(&params(&[("id", "7")])).unwrap(), "/users/7");
        assert_eq!(
            pattern
                .fill(&params(&[("id", "7"), ("tab", "posts")]))
                .unwrap(),
            "/users/7/posts"
        );
    }

    #[test]
    fn test_fill_missing_param() {
        let pattern = PathPattern::compile("/users/:id").unwrap();
        let err = pattern.fill(&HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            RouterError::MissingParam {
                param: "id".into(),
                path: "/users/:id".into()
            }
        );
    }

    #[test]
    fn test_fill_invalid_param() {
        let pattern = PathPattern::compile(r"/items/:id(\d+)").unwrap();
        let err = pattern.fill(&params(&[("id", "abc")])).unwrap_err();
        assert!(matches!(err, RouterError::InvalidParam { .. }));
    }

    #[test]
    fn test_fill_encodes_values() {
        let pattern = PathPattern::compile("/search/:term").unwrap();
        assert_eq!(
            pattern.fill(&params(&[("term", "a b/c")])).unwrap(),
            "/search/a%20b%2Fc"
        );
    }

    #[test]
    fn test_fill_wildcard_keeps_slashes() {
        let pattern = PathPattern::compile("*").unwrap();
        assert_eq!(
            pattern
                .fill(&params(&[(WILDCARD_PARAM, "/not/found")]))
                .unwrap(),
            "/not/found"
        );
    }

    #[test]
    fn test_fill_keeps_reserved_segment_characters() {
        let pattern = PathPattern::compile("/tags/:tag").unwrap();
        assert_eq!(
            pattern.fill(&params(&[("tag", "a,b;c=d@e:f+(g)!*$&'")])).unwrap(),
            "/tags/a,b;c=d@e:f+(g)!*$&'"
        );
        assert_eq!(
            pattern.fill(&params(&[("tag", "100%?#")])).unwrap(),
            "/tags/100%25%3F%23"
        );
    }
}
