//! Integration tests for rhtmx-navigator route matching
//!
//! Tests are organized by feature area and cover:
//! - End-to-end matching over a nested table
//! - Pattern priority (catch-alls last)
//! - Param round trips through named routes
//! - Aliases (flat and nested)
//! - Redirects (path, named, computed, object override)
//! - Relative navigation
//! - Route manifests
//! - Link resolution

mod common;

use common::RecordingHistory;
use pretty_assertions::assert_eq;
use rhtmx_navigator::*;
use once_cell::sync::OnceCell;
use rstest::rstest;
use std::collections::HashMap;
use std::sync::Arc;

fn demo_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/").with_component(Component::new("Home")),
        RouteConfig::new("/foo")
            .with_component(Component::new("Foo"))
            .with_child(RouteConfig::new("/").with_component(Component::new("Child"))),
        RouteConfig::new("/params/:name")
            .with_name("params")
            .with_component(Component::new("Params"))
            .with_child(
                RouteConfig::new("links/:age")
                    .with_name("links")
                    .with_component(Component::new("Links")),
            ),
        RouteConfig::new("*").with_component(Component::new("NotFound")),
    ]
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// End-to-end table
// ============================================================================

#[test]
fn test_match_single_param() {
    let matcher = Matcher::new(&demo_routes());
    let route = matcher.match_location("/params/42", None).unwrap();

    assert_eq!(route.params, params(&[("name", "42")]));
    assert_eq!(route.matched.len(), 1);
    assert_eq!(route.name.as_deref(), Some("params"));
}

#[test]
fn test_match_nested_params() {
    let matcher = Matcher::new(&demo_routes());
    let route = matcher.match_location("/params/42/links/7", None).unwrap();

    assert_eq!(route.params, params(&[("name", "42"), ("age", "7")]));
    assert_eq!(route.matched.len(), 2);
    assert_eq!(route.matched[0].path, "/params/:name");
    assert_eq!(route.matched[1].path, "/params/:name/links/:age");
}

#[test]
fn test_match_wildcard_fallback() {
    let matcher = Matcher::new(&demo_routes());
    let route = matcher.match_location("/nope", None).unwrap();

    assert_eq!(route.matched.len(), 1);
    assert_eq!(route.matched[0].path, "*");
    assert_eq!(route.params["pathMatch"], "/nope");
}

#[test]
fn test_match_default_child() {
    let matcher = Matcher::new(&demo_routes());
    let route = matcher.match_location("/foo", None).unwrap();

    assert_eq!(route.matched.len(), 2);
    assert_eq!(route.matched[1].path, "/foo/");
}

#[test]
fn test_match_root() {
    let matcher = Matcher::new(&demo_routes());
    let route = matcher.match_location("/", None).unwrap();

    assert_eq!(route.matched.len(), 1);
    assert_eq!(route.matched[0].path, "");
    assert_eq!(route.full_path, "/");
}

#[test]
fn test_match_query_and_hash() {
    let matcher = Matcher::new(&demo_routes());
    let route = matcher
        .match_location("/params/42?tab=info&tab=more#top", None)
        .unwrap();

    assert_eq!(route.path, "/params/42");
    assert_eq!(route.hash, "#top");
    assert_eq!(
        route.query["tab"],
        QueryValue::List(vec![Some("info".into()), Some("more".into())])
    );
    assert_eq!(route.full_path, "/params/42?tab=info&tab=more#top");
}

#[test]
fn test_no_match_without_wildcard() {
    let matcher = Matcher::new(&[RouteConfig::new("/only")]);
    let route = matcher.match_location("/other", None).unwrap();

    assert!(!route.is_matched());
    assert_eq!(route.path, "/other");
}

// ============================================================================
// Pattern priority
// ============================================================================

#[rstest]
#[case::wildcard_first(true)]
#[case::wildcard_last(false)]
fn test_literal_beats_wildcard(#[case] wildcard_first: bool) {
    let literal = RouteConfig::new("/about").with_name("about");
    let wildcard = RouteConfig::new("*").with_name("not-found");
    let configs = if wildcard_first {
        vec![wildcard, literal]
    } else {
        vec![literal, wildcard]
    };

    let matcher = Matcher::new(&configs);
    let route = matcher.match_location("/about", None).unwrap();
    assert_eq!(route.name.as_deref(), Some("about"));
}

#[test]
fn test_case_sensitivity() {
    let matcher = Matcher::new(&[
        RouteConfig::new("/Exact").case_sensitive(true).with_name("exact"),
        RouteConfig::new("/Loose").with_name("loose"),
    ]);

    assert!(!matcher.match_location("/exact", None).unwrap().is_matched());
    assert_eq!(
        matcher.match_location("/loose", None).unwrap().name.as_deref(),
        Some("loose")
    );
}

#[test]
fn test_strict_trailing_slash() {
    let matcher = Matcher::new(&[RouteConfig::new("/dir/").strict(true)]);

    assert!(matcher.match_location("/dir/", None).unwrap().is_matched());
    assert!(!matcher.match_location("/dir", None).unwrap().is_matched());
}

// ============================================================================
// Param round trip
// ============================================================================

#[rstest]
#[case("1", "2")]
#[case("hello world", "a/b")]
#[case("ünï", "%")]
fn test_param_round_trip(#[case] a: &str, #[case] b: &str) {
    let matcher = Matcher::new(&[RouteConfig::new("/pair/:a/:b").with_name("pair")]);

    let named = matcher
        .match_location(
            Location::named("pair").with_param("a", a).with_param("b", b),
            None,
        )
        .unwrap();
    let by_path = matcher.match_location(named.path.as_str(), None).unwrap();

    assert_eq!(by_path.params, params(&[("a", a), ("b", b)]));
}

#[test]
fn test_missing_required_param_is_fatal() {
    let matcher = Matcher::new(&[RouteConfig::new("/pair/:a/:b").with_name("pair")]);
    let err = matcher
        .match_location(Location::named("pair").with_param("a", "1"), None)
        .unwrap_err();

    assert_eq!(
        err,
        RouterError::MissingParam {
            param: "b".into(),
            path: "/pair/:a/:b".into()
        }
    );
}

#[test]
fn test_named_child_inherits_parent_params() {
    let matcher = Matcher::new(&demo_routes());
    let current = matcher.match_location("/params/42", None).unwrap();

    let route = matcher
        .match_location(Location::named("links").with_param("age", "9"), Some(&current))
        .unwrap();
    assert_eq!(route.path, "/params/42/links/9");
}

// ============================================================================
// Aliases
// ============================================================================

#[test]
fn test_alias_resolves_to_canonical_record() {
    let table_configs = vec![RouteConfig::new("/home")
        .with_name("home")
        .with_alias("/start")
        .with_component(Component::new("Home"))];
    let matcher = Matcher::new(&table_configs);
    let canonical = matcher.record_by_name("home").unwrap();

    let by_alias = matcher.match_location("/start", None).unwrap();
    let by_path = matcher.match_location("/home", None).unwrap();

    assert!(Arc::ptr_eq(by_alias.matched.last().unwrap(), &canonical));
    assert!(Arc::ptr_eq(by_path.matched.last().unwrap(), &canonical));
    assert_eq!(by_alias.path, "/start");
}

#[test]
fn test_nested_alias_keeps_own_params() {
    let matcher = Matcher::new(&[RouteConfig::new("/users/:id")
        .with_component(Component::new("User"))
        .with_child(
            RouteConfig::new("profile")
                .with_name("profile")
                .with_alias("p")
                .with_component(Component::new("Profile")),
        )]);
    let canonical = matcher.record_by_name("profile").unwrap();

    let route = matcher.match_location("/users/5/p", None).unwrap();
    assert!(Arc::ptr_eq(route.matched.last().unwrap(), &canonical));
    assert_eq!(route.matched.len(), 2);
    assert_eq!(route.params, params(&[("id", "5")]));
}

#[test]
fn test_multiple_aliases() {
    let matcher = Matcher::new(&[RouteConfig::new("/docs")
        .with_name("docs")
        .with_aliases(["/documentation", "/help"])]);

    for path in ["/docs", "/documentation", "/help"] {
        let route = matcher.match_location(path, None).unwrap();
        assert_eq!(route.name.as_deref(), Some("docs"), "path {}", path);
    }
}

// ============================================================================
// Redirects
// ============================================================================

#[test]
fn test_redirect_object_overrides_trigger() {
    let matcher = Matcher::new(&[
        RouteConfig::new("/redirect/:name").with_redirect(Redirect::dynamic(|_route| {
            Location::path("/params/:name")
                .with_param("name", "x")
                .with_query_param("age", "26")
                .into()
        })),
        RouteConfig::new("/params/:name"),
    ]);

    let route = matcher
        .match_location("/redirect/other?age=1", None)
        .unwrap();
    assert_eq!(route.path, "/params/x");
    assert_eq!(route.params, params(&[("name", "x")]));
    assert_eq!(route.query["age"], QueryValue::from("26"));
    assert_eq!(route.redirected_from.as_deref(), Some("/redirect/other?age=1"));
}

#[test]
fn test_redirect_keeps_trigger_query_and_hash() {
    let matcher = Matcher::new(&[
        RouteConfig::new("/old/:id").with_redirect("/new/:id"),
        RouteConfig::new("/new/:id"),
    ]);

    let route = matcher.match_location("/old/3?x=1#h", None).unwrap();
    assert_eq!(route.full_path, "/new/3?x=1#h");
    assert_eq!(route.params["id"], "3");
}

#[test]
fn test_named_redirect() {
    let matcher = Matcher::new(&[
        RouteConfig::new("/me").with_redirect(Redirect::To(
            Location::named("user").with_param("id", "self").into(),
        )),
        RouteConfig::new("/users/:id").with_name("user"),
    ]);

    let route = matcher.match_location("/me", None).unwrap();
    assert_eq!(route.path, "/users/self");
    assert_eq!(route.name.as_deref(), Some("user"));
    assert_eq!(route.redirected_from.as_deref(), Some("/me"));
}

#[test]
fn test_redirect_chain() {
    let matcher = Matcher::new(&[
        RouteConfig::new("/a").with_redirect("/b"),
        RouteConfig::new("/b").with_redirect("/c"),
        RouteConfig::new("/c").with_name("c"),
    ]);

    let route = matcher.match_location("/a", None).unwrap();
    assert_eq!(route.name.as_deref(), Some("c"));
    assert_eq!(route.redirected_from.as_deref(), Some("/a"));
}

#[test]
fn test_redirect_cycle_errors() {
    let matcher = Matcher::new(&[
        RouteConfig::new("/ping").with_redirect("/pong"),
        RouteConfig::new("/pong").with_redirect("/ping"),
    ]);

    let err = matcher.match_location("/ping", None).unwrap_err();
    assert!(matches!(err, RouterError::RedirectLoop { .. }));
}

// ============================================================================
// Relative navigation
// ============================================================================

#[test]
fn test_relative_params_by_path() {
    let matcher = Matcher::new(&[RouteConfig::new("/users/:id/:tab")]);
    let current = matcher.match_location("/users/1/posts", None).unwrap();

    let route = matcher
        .match_location(Location::params(params(&[("id", "2")])), Some(&current))
        .unwrap();
    assert_eq!(route.path, "/users/2/posts");
}

#[test]
fn test_relative_path() {
    let matcher = Matcher::new(&demo_routes());
    let current = matcher.match_location("/params/42", None).unwrap();

    let route = matcher
        .match_location(Location::path("links/7").append(), Some(&current))
        .unwrap();
    assert_eq!(route.params, params(&[("name", "42"), ("age", "7")]));
}

#[test]
fn test_normalization_is_idempotent() {
    let current = Matcher::new(&demo_routes())
        .match_location("/params/42", None)
        .unwrap();

    for raw in [
        RawLocation::from("../foo?x=1#h"),
        RawLocation::from(Location::path("bar").append().with_hash("top")),
        RawLocation::from(Location::params(params(&[("name", "7")]))),
    ] {
        let once = location::normalize_location(raw, Some(&current), false, None).unwrap();
        let twice =
            location::normalize_location(once.clone().into(), Some(&current), false, None).unwrap();
        assert_eq!(once, twice);
    }
}

// ============================================================================
// Table extension
// ============================================================================

#[test]
fn test_add_routes_before_wildcard() {
    let matcher = Matcher::new(&demo_routes());
    matcher.add_routes(&[RouteConfig::new("/late").with_name("late")]);

    let route = matcher.match_location("/late", None).unwrap();
    assert_eq!(route.name.as_deref(), Some("late"));
    assert_eq!(matcher.records().last().unwrap().path, "*");
}

#[test]
fn test_redirect_callback_may_add_routes() {
    let slot: Arc<OnceCell<Router>> = Arc::new(OnceCell::new());
    let in_redirect = slot.clone();

    let router = Router::new(RouterOptions::new().with_routes([
        RouteConfig::new("/setup").with_redirect(Redirect::dynamic(move |_route| {
            if let Some(router) = in_redirect.get() {
                router.add_routes(&[RouteConfig::new("/added").with_name("added")]);
            }
            "/target".into()
        })),
        RouteConfig::new("/target").with_name("target"),
    ]));
    let _ = slot.set(router.clone());

    let route = router.match_location("/setup", None).unwrap();
    assert_eq!(route.name.as_deref(), Some("target"));

    let added = router.match_location("/added", None).unwrap();
    assert_eq!(added.name.as_deref(), Some("added"));
}

// ============================================================================
// Manifest
// ============================================================================

const MANIFEST: &str = r#"
[[routes]]
path = "/"
component = "Home"

[[routes]]
path = "/params/:name"
name = "params"
component = "Params"
alias = "/p/:name"
meta = { title = "Params" }

  [[routes.children]]
  path = "links/:age"
  component = "Links"
  props = true

[[routes]]
path = "/legacy"
redirect = "/"

[[routes]]
path = "*"
component = "NotFound"
"#;

fn registry() -> ComponentRegistry {
    ComponentRegistry::new()
        .register("Home", Component::new("Home"))
        .register("Params", Component::new("Params"))
        .register("Links", Component::new("Links"))
        .register("NotFound", Component::new("NotFound"))
}

#[test]
fn test_manifest_builds_working_table() {
    let configs = RouteManifest::from_toml_str(MANIFEST)
        .unwrap()
        .into_configs(&registry())
        .unwrap();
    let matcher = Matcher::new(&configs);

    let route = matcher.match_location("/params/1/links/2", None).unwrap();
    assert_eq!(route.matched.len(), 2);
    assert_eq!(route.matched[0].meta["title"], "Params");

    let leaf = route.matched.last().unwrap();
    assert_eq!(
        leaf.resolve_props(DEFAULT_VIEW, &route),
        Some(serde_json::json!({ "name": "1", "age": "2" }))
    );

    let aliased = matcher.match_location("/p/9", None).unwrap();
    assert_eq!(aliased.name.as_deref(), Some("params"));
    assert_eq!(aliased.params["name"], "9");

    let redirected = matcher.match_location("/legacy", None).unwrap();
    assert_eq!(redirected.path, "/");
}

#[test]
fn test_manifest_load_from_file() {
    let path = std::env::temp_dir().join(format!("rhtmx-navigator-{}.toml", std::process::id()));
    std::fs::write(&path, MANIFEST).unwrap();

    let manifest = RouteManifest::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(manifest.routes.len(), 4);
    assert_eq!(manifest.routes[1].children.len(), 1);
}

#[test]
fn test_manifest_load_missing_file() {
    let err = RouteManifest::load("/definitely/not/here/routes.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read route manifest"));
}

// ============================================================================
// Link resolution
// ============================================================================

#[tokio::test]
async fn test_resolve_uses_redirect_source_for_href() {
    let history = RecordingHistory::with_base("/app", "/");
    let router = Router::new(
        RouterOptions::new()
            .with_routes([
                RouteConfig::new("/old").with_redirect("/users/1"),
                RouteConfig::new("/users/:id").with_name("user"),
            ])
            .with_history(history.clone()),
    );

    let resolved = router.resolve("/old", None, false).unwrap();
    assert_eq!(resolved.route.path, "/users/1");
    assert_eq!(resolved.href, "/app/old");
    assert!(resolved.location.normalized);

    let resolved = router
        .resolve(Location::named("user").with_param("id", "2"), None, false)
        .unwrap();
    assert_eq!(resolved.href, "/app/users/2");
    // Resolving never navigates
    assert!(history.events().is_empty());
    assert!(router.current_route().is_start());
}

#[tokio::test]
async fn test_resolve_relative_with_append() {
    let router = Router::new(RouterOptions::new().with_routes(demo_routes()));
    router.push("/params/42").await.unwrap();

    let resolved = router.resolve("links/7", None, true).unwrap();
    assert_eq!(resolved.route.path, "/params/42/links/7");
    assert_eq!(resolved.href, "/params/42/links/7");
}

#[test]
fn test_custom_query_codec() {
    let parser: query::QueryParser = Arc::new(|raw: &str| {
        let mut parsed = Query::new();
        for pair in raw.split(';').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once(':').unwrap_or((pair, ""));
            parsed.insert(key.to_string(), QueryValue::from(value));
        }
        Ok::<_, query::QueryError>(parsed)
    });
    let stringifier: query::QueryStringifier = Arc::new(|query: &Query| {
        let pairs: Vec<String> = query
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value.first().unwrap_or("")))
            .collect();
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join(";"))
        }
    });

    let router = Router::new(
        RouterOptions::new()
            .with_routes([RouteConfig::new("/search")])
            .with_query_parser(parser)
            .with_query_stringifier(stringifier),
    );

    let route = router.match_location("/search?q:rust;page:2", None).unwrap();
    assert_eq!(route.query["q"], QueryValue::from("rust"));
    assert_eq!(route.query["page"], QueryValue::from("2"));
    assert_eq!(route.full_path, "/search?page:2;q:rust");
}
