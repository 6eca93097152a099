use tether::http::request::{Method, Request, RequestBuilder};
use tether::http::response::{HandlerResult, RouteError, StatusCode};
use tether::http::writer::ResponseWriter;
use tether::server::path::{PathTemplate, clean_path, is_param, split_segments};
use tether::server::{MatchedRoute, Router};

fn ok(w: &mut ResponseWriter, _r: &Request) -> HandlerResult {
    w.send_response(b"ok")
}

fn tagged(tag: &'static str) -> impl Fn(&mut ResponseWriter, &Request) -> HandlerResult + Send + Sync {
    move |w: &mut ResponseWriter, _r: &Request| w.send_response(tag)
}

/// Runs the resolved handler and returns the status and body it produced.
fn invoke(route: &MatchedRoute) -> Result<String, RouteError> {
    let req = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    let mut w = ResponseWriter::new(req.version, false, None);
    route.handler.call(&mut w, &req)?;

    let out = String::from_utf8_lossy(w.as_bytes()).into_owned();
    Ok(out.rsplit("\r\n\r\n").next().unwrap_or_default().to_string())
}

#[test]
fn test_is_param() {
    assert!(is_param("{id}"));
    assert!(is_param("{}"));
    assert!(!is_param("{id"));
    assert!(!is_param("id}"));
    assert!(!is_param("id"));
}

#[test]
fn test_clean_path() {
    assert_eq!(clean_path("/search/42?q=x&y=z"), "/search/42");
    assert_eq!(clean_path("/a-b_c.d/E9"), "/a-b_c.d/E9");
    assert_eq!(clean_path("/"), "/");
    assert_eq!(clean_path("no-slash"), "");
    assert_eq!(clean_path("/bad path"), "");
    assert_eq!(clean_path("/caf%C3%A9"), "");
    assert_eq!(clean_path(""), "");
}

#[test]
fn test_split_segments() {
    assert!(split_segments("/").is_empty());
    assert_eq!(split_segments("/a/b/"), vec!["a", "b"]);
    assert_eq!(split_segments("a/b"), vec!["a", "b"]);
}

#[test]
fn test_template_matching() {
    let template = PathTemplate::parse("/users/{id}/posts");

    let params = template.matches(&["users", "7", "posts"]).unwrap();
    assert_eq!(params.get("id"), Some("7"));

    assert!(template.matches(&["users", "7"]).is_none());
    assert!(template.matches(&["Users", "7", "posts"]).is_none());
}

#[test]
fn test_router_len_counts_registrations() {
    let mut router = Router::new();
    assert!(router.is_empty());

    router.handle(Method::GET, "/a", ok);
    router.handle(Method::POST, "/a", ok);

    assert!(!router.is_empty());
    assert_eq!(router.len(), 2);
}

#[test]
fn test_find_route_extracts_params() {
    let mut router = Router::new();
    router.handle(Method::GET, "/search/{firstID}/ds/{secondID}", ok);

    let route = router.find_route("/search/42/ds/99", Method::GET);

    assert_eq!(route.params.get("firstID"), Some("42"));
    assert_eq!(route.params.get("secondID"), Some("99"));
    assert_eq!(route.params.len(), 2);
    assert_eq!(invoke(&route).unwrap(), "ok");
}

#[test]
fn test_find_route_wrong_segment_count_is_not_found() {
    let mut router = Router::new();
    router.handle(Method::GET, "/search/{firstID}/ds/{secondID}", ok);

    let route = router.find_route("/search/42/ds", Method::GET);

    assert!(route.params.is_empty());
    assert_eq!(invoke(&route).unwrap_err().code, StatusCode::NotFound);
}

#[test]
fn test_find_route_unknown_method() {
    let mut router = Router::new();
    router.handle(Method::GET, "/items", ok);

    let route = router.find_route("/items", Method::DELETE);

    assert!(route.params.is_empty());
    assert_eq!(invoke(&route).unwrap_err().code, StatusCode::MethodNotAllowed);
}

#[test]
fn test_find_route_literal_is_case_sensitive() {
    let mut router = Router::new();
    router.handle(Method::GET, "/api/info", ok);

    let route = router.find_route("/API/info", Method::GET);

    assert_eq!(invoke(&route).unwrap_err().code, StatusCode::NotFound);
}

#[test]
fn test_find_route_strips_query_and_trailing_slash() {
    let mut router = Router::new();
    router.handle(Method::GET, "/api/info", ok);

    assert!(invoke(&router.find_route("/api/info?verbose=1", Method::GET)).is_ok());
    assert!(invoke(&router.find_route("/api/info/", Method::GET)).is_ok());
}

#[test]
fn test_find_route_invalid_path_is_not_found() {
    let mut router = Router::new();
    router.handle(Method::GET, "/", ok);

    let route = router.find_route("/<script>", Method::GET);

    assert_eq!(invoke(&route).unwrap_err().code, StatusCode::NotFound);
}

#[test]
fn test_root_route() {
    let mut router = Router::new();
    router.handle(Method::GET, "/", ok);

    assert!(invoke(&router.find_route("/", Method::GET)).is_ok());
    assert!(invoke(&router.find_route("/x", Method::GET)).is_err());
}

#[test]
fn test_literal_outranks_capture() {
    let mut router = Router::new();
    router.handle(Method::GET, "/a/{x}", tagged("capture"));
    router.handle(Method::GET, "/a/b", tagged("literal"));

    assert_eq!(invoke(&router.find_route("/a/b", Method::GET)).unwrap(), "literal");

    let route = router.find_route("/a/c", Method::GET);
    assert_eq!(route.params.get("x"), Some("c"));
    assert_eq!(invoke(&route).unwrap(), "capture");
}

#[test]
fn test_leftmost_literal_decides_precedence() {
    let mut router = Router::new();
    router.handle(Method::GET, "/{kind}/latest", tagged("right-literal"));
    router.handle(Method::GET, "/posts/{id}", tagged("left-literal"));

    assert_eq!(
        invoke(&router.find_route("/posts/latest", Method::GET)).unwrap(),
        "left-literal"
    );
}

#[test]
fn test_equal_shapes_resolve_to_first_registration() {
    let mut router = Router::new();
    router.handle(Method::GET, "/u/{id}", tagged("first"));
    router.handle(Method::GET, "/u/{name}", tagged("second"));

    assert_eq!(invoke(&router.find_route("/u/1", Method::GET)).unwrap(), "first");
}

#[test]
fn test_reregistration_replaces_handler() {
    let mut router = Router::new();
    router.handle(Method::GET, "/dup", tagged("old"));
    router.handle(Method::GET, "/dup", tagged("new"));

    assert_eq!(router.len(), 1);
    assert_eq!(invoke(&router.find_route("/dup", Method::GET)).unwrap(), "new");
}

#[test]
fn test_methods_are_independent() {
    let mut router = Router::new();
    router.handle(Method::GET, "/login", tagged("get"));
    router.handle(Method::POST, "/login", tagged("post"));

    assert_eq!(invoke(&router.find_route("/login", Method::POST)).unwrap(), "post");
    assert_eq!(router.len(), 2);
}
