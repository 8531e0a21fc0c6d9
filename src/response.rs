//! Outgoing HTTP response type.
//!
//! The native side of the bridge: commands and failure payloads write into a
//! [`Response`], and the server turns it into a hyper response with
//! [`Response::into_inner`].

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue, SET_COOKIE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde_json::Value;

use crate::cookie::Cookie;
use crate::error::Error;

/// An outgoing HTTP response. Defaults to `200 OK` with no body.
#[derive(Debug, Clone)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Response {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Response with no body.
    pub fn status_only(status: StatusCode) -> Self {
        Self { status, ..Self::new() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// First value of a header. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets a header, replacing any previous values under the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Adds a header value, keeping the existing ones.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Appends a `Set-Cookie` header for `cookie`.
    pub fn set_cookie(&mut self, cookie: &Cookie) -> Result<(), Error> {
        let value = cookie.to_header_value()?;
        let value = HeaderValue::try_from(value).map_err(|e| Error::InvalidCookie {
            name: cookie.name().to_owned(),
            reason: e.to_string(),
        })?;
        self.headers.append(SET_COOKIE, value);
        Ok(())
    }

    /// `application/json` body.
    pub fn json(&mut self, value: &Value) {
        self.body_raw("application/json", value.to_string().into_bytes());
    }

    /// `text/plain; charset=utf-8` body.
    pub fn text(&mut self, body: impl Into<String>) {
        self.body_raw("text/plain; charset=utf-8", body.into().into_bytes());
    }

    /// Body with an explicit content type. An unrepresentable content type
    /// falls back to `application/octet-stream`.
    pub fn bytes(&mut self, content_type: &str, body: Vec<u8>) {
        self.body_raw(content_type, body);
    }

    /// Copies every header in `defaults` that this response does not set yet.
    pub(crate) fn fill_headers(&mut self, defaults: &HeaderMap) {
        for (name, value) in defaults {
            if !self.headers.contains_key(name) {
                self.headers.insert(name.clone(), value.clone());
            }
        }
    }

    fn body_raw(&mut self, content_type: &str, body: Vec<u8>) {
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream"));
        self.headers.insert(CONTENT_TYPE, content_type);
        self.body = Bytes::from(body);
    }

    /// Converts into the hyper response the connection writes out.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let len = self.body.len();
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
        res
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let invalid = |reason: String| Error::InvalidHeader { name: name.to_owned(), reason };
    let header_name = HeaderName::try_from(name).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::try_from(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}
