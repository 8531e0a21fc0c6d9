use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::StatusCode;
use http::header::SET_COOKIE;
use http_body_util::Full;
use serde_json::{Value, json};
use tsu_bridge::{
    Adapter, Command, CookieOptions, HandlerError, Method, NormalizedRequest, NormalizedResponse,
    Request, Response, Route,
};

fn get(uri: &str) -> http::Request<Full<Bytes>> {
    http::Request::builder().uri(uri).body(Full::new(Bytes::new())).unwrap()
}

fn post_json(uri: &str, body: Value) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

/// An adapter with one route whose orchestrator always returns `outcome`.
fn adapter_returning(
    name: &str,
    outcome: Result<NormalizedResponse, HandlerError>,
) -> Adapter {
    let mut adapter = Adapter::new(name).orchestrator(move |_route: Route, _req: NormalizedRequest| {
        let outcome = outcome.clone();
        async move { outcome }
    });
    adapter.route(Method::Get, "/thing").unwrap();
    adapter.boot().unwrap();
    adapter
}

#[tokio::test]
async fn orchestrator_sees_route_and_every_parameter_source() {
    let seen: Arc<Mutex<Option<(Route, NormalizedRequest)>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let mut adapter = Adapter::new("tsu").orchestrator(move |route: Route, req: NormalizedRequest| {
        let sink = Arc::clone(&sink);
        async move {
            *sink.lock().unwrap() = Some((route, req));
            Ok(NormalizedResponse::ok())
        }
    });
    adapter.route(Method::Post, "/teams/{team}/members").unwrap();
    adapter.boot().unwrap();

    let req = http::Request::builder()
        .method("POST")
        .uri("/teams/red/members?role=admin")
        .header("x-request-id", "r-1")
        .header("cookie", "sid=abc")
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(r#"{"name":"ana","age":31}"#)))
        .unwrap();
    let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();

    let res = adapter.dispatch(req, Some(peer)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let (route, req) = seen.lock().unwrap().take().unwrap();
    assert_eq!(route, Route::new(Method::Post, "/teams/{team}/members"));
    assert_eq!(req.remote_addr, Some(peer));
    assert_eq!(req.parameter_str("team"), Some("red"));
    assert_eq!(req.parameter_str("role"), Some("admin"));
    assert_eq!(req.parameter_str("x-request-id"), Some("r-1"));
    assert_eq!(req.parameter_str("sid"), Some("abc"));
    assert_eq!(req.parameter_str("name"), Some("ana"));
    assert_eq!(req.parameter("age"), Some(&json!(31)));
}

#[tokio::test]
async fn success_renders_status_body_and_commands() {
    let outcome = NormalizedResponse::json(json!({ "ok": true }))
        .with_status(201)
        .with_command(Command::set_header("location", "/thing/1"))
        .with_command(Command::create_cookie("sid", "abc", &CookieOptions::default()))
        .with_command(Command::set_header("x-other", "1").for_adapters(["lambda"]))
        .with_command(Command::new("flush-cdn", vec![]));

    let adapter = adapter_returning("tsu", Ok(outcome));
    let res = adapter.dispatch(get("/thing"), None).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(&res), json!({ "ok": true }));
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(res.header("location"), Some("/thing/1"));
    assert_eq!(res.header(SET_COOKIE.as_str()), Some("sid=abc; Path=/"));
    assert_eq!(res.header("x-other"), None);
}

#[tokio::test]
async fn adapter_name_selects_commands() {
    let outcome = NormalizedResponse::ok()
        .with_command(Command::set_header("x-only-lambda", "1").for_adapters(["lambda"]));

    let lambda = adapter_returning("lambda", Ok(outcome.clone()));
    let tsu = adapter_returning("tsu", Ok(outcome));

    assert_eq!(lambda.dispatch(get("/thing"), None).await.header("x-only-lambda"), Some("1"));
    assert_eq!(tsu.dispatch(get("/thing"), None).await.header("x-only-lambda"), None);
}

#[tokio::test]
async fn known_errors_keep_their_status() {
    let err = HandlerError::known(409, "already exists").with_details(json!({ "id": 3 }));
    let adapter = adapter_returning("tsu", Err(err));

    let res = adapter.dispatch(get("/thing"), None).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(
        json_body(&res),
        json!({ "error": { "status": 409, "message": "already exists", "details": { "id": 3 } } })
    );
    // security headers ride along on failures too
    assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
}

#[tokio::test]
async fn unknown_errors_are_500() {
    let adapter = adapter_returning("tsu", Err(HandlerError::unknown("disk on fire")));

    let res = adapter.dispatch(get("/thing"), None).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), b"disk on fire");
}

#[tokio::test]
async fn invalid_status_from_orchestrator_is_500() {
    let adapter = adapter_returning("tsu", Ok(NormalizedResponse::ok().with_status(1200)));
    let res = adapter.dispatch(get("/thing"), None).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn missing_orchestrator_is_a_configuration_error() {
    let mut adapter = Adapter::new("tsu");
    adapter.route(Method::Get, "/thing").unwrap();
    adapter.boot().unwrap();

    let res = adapter.dispatch(get("/thing"), None).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body(), b"no orchestrator is bound to adapter `tsu`");
}

#[tokio::test]
async fn malformed_json_never_reaches_the_orchestrator() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let mut adapter = Adapter::new("tsu").orchestrator(move |_: Route, _: NormalizedRequest| {
        let counter = Arc::clone(&counter);
        async move {
            *counter.lock().unwrap() += 1;
            Ok(NormalizedResponse::ok())
        }
    });
    adapter.route(Method::Post, "/thing").unwrap();
    adapter.boot().unwrap();

    let req = http::Request::builder()
        .method("POST")
        .uri("/thing")
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(b"{oops")))
        .unwrap();

    let res = adapter.dispatch(req, None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&res)["error"]["message"], "malformed JSON body");
    assert_eq!(*calls.lock().unwrap(), 0);

    let ok = adapter.dispatch(post_json("/thing", json!({ "a": 1 })), None).await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn unrouted_requests_are_404_and_405() {
    let adapter = adapter_returning("tsu", Ok(NormalizedResponse::ok()));

    let missing = adapter.dispatch(get("/nowhere"), None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let wrong_method = http::Request::builder()
        .method("DELETE")
        .uri("/thing")
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert_eq!(adapter.dispatch(wrong_method, None).await.status(), StatusCode::NOT_FOUND);

    let purge = http::Request::builder()
        .method("PURGE")
        .uri("/thing")
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert_eq!(adapter.dispatch(purge, None).await.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn handle_works_without_the_router() {
    let adapter = adapter_returning("tsu", Ok(NormalizedResponse::text("direct")));
    let route = Route::new(Method::Get, "/thing");
    let req = Request::from_http(
        http::Request::builder().uri("/thing").body(Bytes::new()).unwrap(),
        Default::default(),
    )
    .unwrap();

    let res = adapter.handle(&route, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), b"direct");
    assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
}

#[tokio::test]
async fn url_params_are_decoded_like_the_query() {
    let seen: Arc<Mutex<Option<NormalizedRequest>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let mut adapter = Adapter::new("tsu").orchestrator(move |_: Route, req: NormalizedRequest| {
        let sink = Arc::clone(&sink);
        async move {
            *sink.lock().unwrap() = Some(req);
            Ok(NormalizedResponse::ok())
        }
    });
    adapter.route(Method::Get, "/users/{name}").unwrap();
    adapter.boot().unwrap();

    let res = adapter.dispatch(get("/users/jos%C3%A9%20x?q=jos%C3%A9%20x"), None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = seen.lock().unwrap().take().unwrap();
    assert_eq!(req.url_params["name"], "josé x");
    assert_eq!(req.query["q"], "josé x");
    assert_eq!(req.parameter_str("name"), Some("josé x"));
}
