//! Error types.
//!
//! Two layers, kept apart on purpose:
//!
//! - [`Error`] is the bridge's own failure: binding a port, registering a bad
//!   route, driving the lifecycle out of order, writing an illegal header.
//! - [`HandlerError`] is what a request produces when it fails. It is either
//!   *known* (it carries an HTTP status) or *unknown* (everything else, sent
//!   as `500`). [`failure_response`] is the single place that turns one into
//!   a [`Response`].

use http::StatusCode;
use serde_json::{Value, json};
use tracing::error;

use crate::method::Method;
use crate::response::Response;

/// The error type returned by the bridge's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),

    #[error("invalid route `{path}`: {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("route `{method} {path}` is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("adapter is already booted")]
    AlreadyBooted,

    #[error("adapter must be booted before it is started")]
    NotBooted,

    #[error("adapter is already started")]
    AlreadyStarted,

    #[error("no orchestrator is bound to adapter `{0}`")]
    MissingOrchestrator(String),

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid cookie `{name}`: {reason}")]
    InvalidCookie { name: String, reason: String },

    #[error("invalid arguments for command `{command}`: {reason}")]
    InvalidCommandArgs { command: String, reason: String },
}

/// A failed request, as reported by the orchestrator or by the bridge itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// An application error that knows its HTTP status.
    #[error("{message}")]
    Known {
        status: StatusCode,
        message: String,
        details: Option<Value>,
    },

    /// Anything else. Always answered with `500 Internal Server Error`.
    #[error("{0}")]
    Unknown(String),
}

impl HandlerError {
    /// A known error with the given status code.
    ///
    /// A code `http` cannot represent (outside `100..=999`) is not a status
    /// at all, so the error degrades to [`HandlerError::Unknown`].
    pub fn known(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match StatusCode::from_u16(status) {
            Ok(status) => Self::Known { status, message, details: None },
            Err(_) => Self::Unknown(message),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Attaches a structured payload to a known error. No-op on unknown ones.
    pub fn with_details(mut self, value: Value) -> Self {
        if let Self::Known { details, .. } = &mut self {
            *details = Some(value);
        }
        self
    }

    /// The HTTP status this error exposes, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Known { status, .. } => Some(*status),
            Self::Unknown(_) => None,
        }
    }
}

impl From<Error> for HandlerError {
    fn from(e: Error) -> Self {
        Self::Unknown(e.to_string())
    }
}

/// Renders a [`HandlerError`] as the response the client receives.
///
/// Known errors keep their status and get a JSON payload:
///
/// ```text
/// {"error":{"status":404,"message":"user not found","details":{...}}}
/// ```
///
/// Unknown errors become `500` with the raw message as plain text.
pub fn failure_response(err: &HandlerError) -> Response {
    let mut res = Response::new();
    match err {
        HandlerError::Known { status, message, details } => {
            let mut payload = json!({ "status": status.as_u16(), "message": message });
            if let Some(details) = details {
                payload["details"] = details.clone();
            }
            res.set_status(*status);
            res.json(&json!({ "error": payload }));
        }
        HandlerError::Unknown(message) => {
            error!(error = %message, "request failed");
            res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            res.text(message.clone());
        }
    }
    res
}
