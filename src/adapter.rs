//! The adapter: lifecycle, route bookkeeping and per-request translation.
//!
//! # Lifecycle
//!
//! Two flags, flipped once each and in order:
//!
//! 1. [`Adapter::boot`] installs the default response headers.
//! 2. [`Adapter::start`] freezes route registration. [`Server::serve`]
//!    calls it for you.
//!
//! [`Server::serve`]: crate::Server::serve

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HeaderValue;
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use tracing::{Instrument, info, info_span, warn};

use crate::command::apply_commands;
use crate::error::{Error, HandlerError, failure_response};
use crate::method::Method;
use crate::normalized::{NormalizedResponse, ResponseBody};
use crate::orchestrator::Orchestrator;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, Router};
use crate::translate::normalize;

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("referrer-policy", "no-referrer"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
];

/// Binds a set of routes to an [`Orchestrator`].
///
/// ```rust,no_run
/// use tsu_bridge::{Adapter, HandlerError, Method, NormalizedRequest,
///                  NormalizedResponse, Route, Server};
///
/// async fn orchestrate(route: Route, req: NormalizedRequest)
///     -> Result<NormalizedResponse, HandlerError>
/// {
///     match req.parameter_str("id") {
///         Some(id) => Ok(NormalizedResponse::text(format!("{route} -> {id}"))),
///         None => Err(HandlerError::known(400, "missing id")),
///     }
/// }
///
/// # async fn run() -> Result<(), tsu_bridge::Error> {
/// let mut adapter = Adapter::new("tsu").orchestrator(orchestrate);
/// adapter.route(Method::Get, "/users/{id}")?;
/// adapter.boot()?;
/// Server::bind("0.0.0.0:3000").serve(adapter).await
/// # }
/// ```
pub struct Adapter {
    name: String,
    orchestrator: Option<Arc<dyn Orchestrator>>,
    router: Router,
    security_headers: bool,
    default_headers: HeaderMap,
    booted: bool,
    started: bool,
}

impl Adapter {
    /// `name` is what commands target in their adapter list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orchestrator: None,
            router: Router::new(),
            security_headers: true,
            default_headers: HeaderMap::new(),
            booted: false,
            started: false,
        }
    }

    pub fn orchestrator(mut self, orchestrator: impl Orchestrator) -> Self {
        self.orchestrator = Some(Arc::new(orchestrator));
        self
    }

    /// Whether [`boot`](Adapter::boot) installs the default security headers.
    /// On by default.
    pub fn security_headers(mut self, enabled: bool) -> Self {
        self.security_headers = enabled;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn is_booted(&self) -> bool { self.booted }
    pub fn is_started(&self) -> bool { self.started }

    /// Registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        self.router.routes()
    }

    /// Registers a route. Rejected once the adapter has started.
    pub fn route(&mut self, method: Method, path: &str) -> Result<&mut Self, Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.router.register(Route::new(method, path))?;
        Ok(self)
    }

    pub fn boot(&mut self) -> Result<(), Error> {
        if self.booted {
            return Err(Error::AlreadyBooted);
        }
        if self.security_headers {
            for (name, value) in SECURITY_HEADERS {
                self.default_headers.insert(*name, HeaderValue::from_static(*value));
            }
        }
        if self.orchestrator.is_none() {
            warn!(adapter = %self.name, "booting without an orchestrator, every request will fail");
        }
        self.booted = true;
        info!(adapter = %self.name, routes = self.routes().len(), "adapter booted");
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), Error> {
        if !self.booted {
            return Err(Error::NotBooted);
        }
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;
        info!(adapter = %self.name, "adapter started");
        Ok(())
    }

    /// Routes a raw request and translates it through [`handle`](Adapter::handle).
    ///
    /// Unknown methods get `405`, unmatched paths `404`, an unreadable body
    /// `400`. This is what every server connection calls per request.
    pub async fn dispatch<B>(&self, req: http::Request<B>, peer: Option<SocketAddr>) -> Response
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        let Ok(method) = Method::try_from(req.method()) else {
            return self.finish(Response::status_only(StatusCode::METHOD_NOT_ALLOWED));
        };
        let Some((route, params)) = self.router.lookup(method, req.uri().path()) else {
            return self.finish(Response::status_only(StatusCode::NOT_FOUND));
        };

        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = HandlerError::known(400, format!("failed to read request body: {e}"));
                return self.finish(failure_response(&err));
            }
        };

        match native_request(parts, body, params, peer) {
            Ok(req) => self.handle(route, req).await,
            Err(e) => self.finish(failure_response(&e.into())),
        }
    }

    /// Runs one request through the orchestrator and renders the outcome.
    ///
    /// Never fails: every error path ends in [`failure_response`].
    pub async fn handle(&self, route: &Route, req: Request) -> Response {
        let span = info_span!("request", adapter = %self.name, %route, path = %req.path());
        async move {
            let Some(orchestrator) = &self.orchestrator else {
                let err = Error::MissingOrchestrator(self.name.clone());
                return self.finish(failure_response(&err.into()));
            };

            let outcome = match normalize(&req).await {
                Ok(normalized) => orchestrator.handle(route, normalized).await,
                Err(e) => Err(e),
            };

            let res = match outcome.and_then(|res| self.render(res)) {
                Ok(res) => res,
                Err(e) => failure_response(&e),
            };
            info!(status = res.status().as_u16(), "request handled");
            self.finish(res)
        }
        .instrument(span)
        .await
    }

    /// Applies commands first, then status and body, so a command cannot
    /// clobber the body's `content-type`.
    fn render(&self, normalized: NormalizedResponse) -> Result<Response, HandlerError> {
        let status = StatusCode::from_u16(normalized.status).map_err(|_| {
            HandlerError::unknown(format!("orchestrator returned invalid status {}", normalized.status))
        })?;

        let mut res = Response::new();
        apply_commands(&self.name, &normalized.commands, &mut res);
        res.set_status(status);
        match normalized.body {
            ResponseBody::Empty => {}
            ResponseBody::Json(value) => res.json(&value),
            ResponseBody::Text(text) => res.text(text),
            ResponseBody::Bytes { content_type, data } => res.bytes(&content_type, data),
        }
        Ok(res)
    }

    fn finish(&self, mut res: Response) -> Response {
        res.fill_headers(&self.default_headers);
        res
    }
}

fn native_request(
    parts: http::request::Parts,
    body: Bytes,
    params: HashMap<String, String>,
    peer: Option<SocketAddr>,
) -> Result<Request, Error> {
    let req = Request::from_http(http::Request::from_parts(parts, body), params)?;
    Ok(match peer {
        Some(addr) => req.with_remote_addr(addr),
        None => req,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_order_is_enforced() {
        let mut adapter = Adapter::new("tsu");
        assert!(matches!(adapter.start(), Err(Error::NotBooted)));

        adapter.boot().unwrap();
        assert!(matches!(adapter.boot(), Err(Error::AlreadyBooted)));

        adapter.start().unwrap();
        assert!(adapter.is_booted() && adapter.is_started());
        assert!(matches!(adapter.start(), Err(Error::AlreadyStarted)));
    }

    #[test]
    fn registration_closes_on_start() {
        let mut adapter = Adapter::new("tsu");
        adapter.route(Method::Get, "/a").unwrap().route(Method::Post, "/a").unwrap();
        assert!(matches!(adapter.route(Method::Get, "/a"), Err(Error::DuplicateRoute { .. })));

        adapter.boot().unwrap();
        adapter.route(Method::Get, "/b").unwrap();
        adapter.start().unwrap();
        assert!(matches!(adapter.route(Method::Get, "/c"), Err(Error::AlreadyStarted)));

        let routes: Vec<String> = adapter.routes().iter().map(ToString::to_string).collect();
        assert_eq!(routes, ["GET /a", "POST /a", "GET /b"]);
    }

    #[test]
    fn boot_installs_security_headers() {
        let mut on = Adapter::new("tsu");
        on.boot().unwrap();
        let res = on.finish(Response::new());
        assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(res.header("x-frame-options"), Some("SAMEORIGIN"));

        let mut off = Adapter::new("tsu").security_headers(false);
        off.boot().unwrap();
        assert!(off.finish(Response::new()).headers().is_empty());
    }
}
