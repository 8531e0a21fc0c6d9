//! # tsu-bridge
//!
//! Binds a hyper HTTP server to an adapter-agnostic request orchestrator.
//!
//! The orchestrator owns routing semantics, validation and business logic.
//! The bridge only translates, in both directions:
//!
//! - **In:** the native request becomes a [`NormalizedRequest`]. Headers,
//!   cookies, body, query and URL parameters are copied into plain maps and
//!   merged into one parameter view (later sources win on collision).
//! - **Out:** the orchestrator's [`NormalizedResponse`] becomes status,
//!   headers, cookies and body on the native [`Response`]. Side effects
//!   travel as named [`Command`]s, applied only when they target this
//!   adapter.
//! - **Errors:** a [`HandlerError`] with an HTTP status is sent with that
//!   status and a JSON payload. Anything else is a `500`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_bridge::{Adapter, Command, HandlerError, Method, NormalizedRequest,
//!                  NormalizedResponse, Route, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tsu_bridge::Error> {
//!     let mut adapter = Adapter::new("tsu").orchestrator(orchestrate);
//!     adapter
//!         .route(Method::Get,  "/users/{id}")?
//!         .route(Method::Post, "/users")?;
//!     adapter.boot()?;
//!
//!     Server::bind("0.0.0.0:3000").serve(adapter).await
//! }
//!
//! async fn orchestrate(route: Route, req: NormalizedRequest)
//!     -> Result<NormalizedResponse, HandlerError>
//! {
//!     match (route.path(), req.parameter_str("id")) {
//!         ("/users/{id}", Some(id)) => Ok(NormalizedResponse::json(
//!             serde_json::json!({ "id": id }),
//!         )),
//!         ("/users", _) => Ok(NormalizedResponse::ok()
//!             .with_status(201)
//!             .with_command(Command::set_header("location", "/users/99"))),
//!         _ => Err(HandlerError::known(404, "no such user")),
//!     }
//! }
//! ```

mod adapter;
mod command;
mod cookie;
mod error;
mod method;
mod normalized;
mod orchestrator;
mod request;
mod response;
mod router;
mod server;
mod translate;

pub use adapter::Adapter;
pub use command::{CLEAR_COOKIE, CREATE_COOKIE, Command, SET_HEADER, apply_commands};
pub use cookie::{Cookie, CookieOptions, SameSite, parse_cookie_header};
pub use error::{Error, HandlerError, failure_response};
pub use method::Method;
pub use normalized::{NormalizedRequest, NormalizedResponse, ResponseBody};
pub use orchestrator::Orchestrator;
pub use request::Request;
pub use response::Response;
pub use router::Route;
pub use server::Server;
pub use translate::normalize;
