//! Minimal bridge: a toy orchestrator behind three routes.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42?verbose=1
//!   curl -i -X POST http://localhost:3000/login \
//!        -H 'content-type: application/json' \
//!        -d '{"user":"alice"}'
//!   curl -i http://localhost:3000/boom

use serde_json::json;
use tsu_bridge::{
    Adapter, Command, CookieOptions, HandlerError, Method, NormalizedRequest, NormalizedResponse,
    Route, SameSite, Server,
};

#[tokio::main]
async fn main() -> Result<(), tsu_bridge::Error> {
    tracing_subscriber::fmt::init();

    let mut adapter = Adapter::new("tsu").orchestrator(orchestrate);
    adapter
        .route(Method::Get,  "/users/{id}")?
        .route(Method::Post, "/login")?
        .route(Method::Get,  "/boom")?;
    adapter.boot()?;

    Server::bind("0.0.0.0:3000").serve(adapter).await
}

async fn orchestrate(
    route: Route,
    req: NormalizedRequest,
) -> Result<NormalizedResponse, HandlerError> {
    match (route.method(), route.path()) {
        // Every source lands in `parameters`: the URL id, the query flag,
        // the headers and cookies.
        (Method::Get, "/users/{id}") => Ok(NormalizedResponse::json(json!({
            "id": req.parameter_str("id"),
            "verbose": req.parameter_str("verbose").is_some(),
            "agent": req.headers.get("user-agent"),
        }))),

        (Method::Post, "/login") => {
            let user = req
                .parameter_str("user")
                .ok_or_else(|| HandlerError::known(422, "user is required"))?;
            let session = CookieOptions {
                http_only: true,
                same_site: Some(SameSite::Lax),
                max_age: Some(3600),
                ..CookieOptions::default()
            };
            Ok(NormalizedResponse::json(json!({ "user": user }))
                .with_command(Command::create_cookie("sid", &format!("s-{user}"), &session))
                // applied by another adapter only, ignored here
                .with_command(Command::set_header("x-lambda", "1").for_adapters(["lambda"])))
        }

        _ => Err(HandlerError::unknown("the orchestrator fell over")),
    }
}
