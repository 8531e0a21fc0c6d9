//! Adapter-agnostic request and response value objects.
//!
//! These are what an [`Orchestrator`](crate::Orchestrator) sees and returns.
//! Nothing in here knows about hyper. Each value lives exactly as long as the
//! request that produced it.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;

/// A request, flattened into plain maps.
///
/// Every source keeps its own map. `parameters` is the merged view, built in
/// the order headers, cookies, body, query, URL parameters. A later source
/// overwrites an earlier one on key collision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRequest {
    pub method: String,
    pub path: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub url_params: BTreeMap<String, String>,
    /// Parsed body. `Null` when empty or of a type the bridge does not parse.
    pub body: Value,
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    pub remote_addr: Option<SocketAddr>,
    pub parameters: BTreeMap<String, Value>,
}

impl NormalizedRequest {
    /// Merged parameter lookup.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Merged parameter lookup, for parameters that hold a string.
    pub fn parameter_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }
}

/// Response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Bytes { content_type: String, data: Vec<u8> },
}

/// What an orchestrator returns on success: a status, a body, and the
/// commands the adapter should apply to the native response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: ResponseBody,
    #[serde(default)]
    pub commands: Vec<Command>,
}

fn default_status() -> u16 { 200 }

impl NormalizedResponse {
    /// `200`, no body.
    pub fn ok() -> Self {
        Self { status: default_status(), body: ResponseBody::Empty, commands: Vec::new() }
    }

    pub fn json(value: Value) -> Self {
        Self { body: ResponseBody::Json(value), ..Self::ok() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { body: ResponseBody::Text(text.into()), ..Self::ok() }
    }

    pub fn bytes(content_type: impl Into<String>, data: Vec<u8>) -> Self {
        let body = ResponseBody::Bytes { content_type: content_type.into(), data };
        Self { body, ..Self::ok() }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }
}

impl Default for NormalizedResponse {
    fn default() -> Self { Self::ok() }
}
