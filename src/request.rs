//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Uri};

use crate::error::Error;
use crate::method::Method;

/// An incoming HTTP request with its body fully collected.
///
/// This is the native side of the bridge: what the server hands over before
/// anything is normalized for the orchestrator.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Wraps an `http::Request` whose body has already been collected.
    ///
    /// `params` are the URL parameters captured by the route, e.g. `id` for
    /// `/users/{id}`.
    pub fn from_http(
        req: http::Request<Bytes>,
        params: HashMap<String, String>,
    ) -> Result<Self, Error> {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method)?;
        Ok(Self {
            method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params,
            remote_addr: None,
        })
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn params(&self) -> &HashMap<String, String> { &self.params }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named URL parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
