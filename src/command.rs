//! Response-side commands.
//!
//! A command is a named instruction an orchestrator attaches to a
//! [`NormalizedResponse`](crate::NormalizedResponse), such as "set this
//! cookie". Orchestrators talk to many adapters at once, so each command may
//! name the adapters it targets. An adapter applies a command only when the
//! list is absent or contains the adapter's own name.
//!
//! Names are looked up in a static table:
//!
//! | Name | Arguments |
//! |---|---|
//! | `set-header` | `[name, value]` |
//! | `create-cookie` | `[name, value, options?]` |
//! | `clear-cookie` | `[name, options?]` |
//!
//! Unknown names are ignored. A known command with bad arguments is skipped
//! with a warning; commands never fail a response.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::cookie::{Cookie, CookieOptions};
use crate::error::Error;
use crate::response::Response;

pub const SET_HEADER: &str = "set-header";
pub const CREATE_COOKIE: &str = "create-cookie";
pub const CLEAR_COOKIE: &str = "clear-cookie";

/// A named, adapter-scoped instruction for the native response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Adapters this command targets. `None` targets every adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapters: Option<Vec<String>>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self { name: name.into(), args, adapters: None }
    }

    pub fn set_header(name: &str, value: &str) -> Self {
        Self::new(SET_HEADER, vec![json!(name), json!(value)])
    }

    pub fn create_cookie(name: &str, value: &str, options: &CookieOptions) -> Self {
        let options = serde_json::to_value(options).unwrap_or(Value::Null);
        Self::new(CREATE_COOKIE, vec![json!(name), json!(value), options])
    }

    pub fn clear_cookie(name: &str) -> Self {
        Self::new(CLEAR_COOKIE, vec![json!(name)])
    }

    /// Restricts the command to the named adapters.
    pub fn for_adapters<I, S>(mut self, adapters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.adapters = Some(adapters.into_iter().map(Into::into).collect());
        self
    }

    /// True when this command should be applied by the adapter called `adapter`.
    pub fn applies_to(&self, adapter: &str) -> bool {
        match &self.adapters {
            None => true,
            Some(list) => list.iter().any(|a| a == adapter),
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

type CommandFn = fn(&[Value], &mut Response) -> Result<(), Error>;

static COMMANDS: &[(&str, CommandFn)] = &[
    (SET_HEADER,    set_header),
    (CREATE_COOKIE, create_cookie),
    (CLEAR_COOKIE,  clear_cookie),
];

fn lookup(name: &str) -> Option<CommandFn> {
    COMMANDS.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
}

/// Applies, in order, every command in `commands` that targets `adapter`.
pub fn apply_commands(adapter: &str, commands: &[Command], res: &mut Response) {
    for command in commands {
        if !command.applies_to(adapter) {
            continue;
        }
        let Some(run) = lookup(&command.name) else {
            debug!(command = %command.name, "ignoring unknown command");
            continue;
        };
        if let Err(e) = run(&command.args, res) {
            warn!(command = %command.name, error = %e, "skipping command");
        }
    }
}

fn set_header(args: &[Value], res: &mut Response) -> Result<(), Error> {
    let name = arg_str(SET_HEADER, args, 0, "name")?;
    let value = arg_str(SET_HEADER, args, 1, "value")?;
    res.set_header(&name, &value)
}

fn create_cookie(args: &[Value], res: &mut Response) -> Result<(), Error> {
    let name = arg_str(CREATE_COOKIE, args, 0, "name")?;
    let value = arg_str(CREATE_COOKIE, args, 1, "value")?;
    let options = arg_options(CREATE_COOKIE, args, 2)?;
    res.set_cookie(&Cookie::new(name, value, options))
}

fn clear_cookie(args: &[Value], res: &mut Response) -> Result<(), Error> {
    let name = arg_str(CLEAR_COOKIE, args, 0, "name")?;
    let options = arg_options(CLEAR_COOKIE, args, 1)?;
    res.set_cookie(&Cookie::removal(name, options))
}

/// Strings pass through; numbers and booleans are stringified.
fn arg_str(command: &str, args: &[Value], index: usize, what: &str) -> Result<String, Error> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        Some(_) => Err(invalid_args(command, format!("{what} must be a string"))),
        None => Err(invalid_args(command, format!("missing {what}"))),
    }
}

fn arg_options(command: &str, args: &[Value], index: usize) -> Result<CookieOptions, Error> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(CookieOptions::default()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| invalid_args(command, format!("options: {e}"))),
    }
}

fn invalid_args(command: &str, reason: String) -> Error {
    Error::InvalidCommandArgs { command: command.to_owned(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;

    fn set_cookies(res: &Response) -> Vec<&str> {
        res.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    #[test]
    fn filter_matches_or_is_absent() {
        let everyone = Command::set_header("x-a", "1");
        let ours = Command::set_header("x-b", "2").for_adapters(["tsu", "lambda"]);
        let theirs = Command::set_header("x-c", "3").for_adapters(["express"]);

        assert!(everyone.applies_to("tsu"));
        assert!(ours.applies_to("tsu"));
        assert!(!theirs.applies_to("tsu"));

        let mut res = Response::new();
        apply_commands("tsu", &[everyone, ours, theirs], &mut res);
        assert_eq!(res.header("x-a"), Some("1"));
        assert_eq!(res.header("x-b"), Some("2"));
        assert_eq!(res.header("x-c"), None);
    }

    #[test]
    fn empty_filter_targets_nobody() {
        let cmd = Command::set_header("x-a", "1").for_adapters(Vec::<String>::new());
        assert!(!cmd.applies_to("tsu"));
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let mut res = Response::new();
        let commands = [
            Command::new("launch-rockets", vec![json!(3)]),
            Command::set_header("x-after", "yes"),
        ];
        apply_commands("tsu", &commands, &mut res);
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("x-after"), Some("yes"));
    }

    #[test]
    fn creates_and_clears_cookies() {
        let options = CookieOptions { http_only: true, ..CookieOptions::default() };
        let mut res = Response::new();
        apply_commands(
            "tsu",
            &[Command::create_cookie("sid", "abc", &options), Command::clear_cookie("old")],
            &mut res,
        );
        assert_eq!(
            set_cookies(&res),
            vec!["sid=abc; Path=/; HttpOnly", "old=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0"]
        );
    }

    #[test]
    fn malformed_arguments_are_skipped() {
        let mut res = Response::new();
        let commands = [
            Command::new(SET_HEADER, vec![json!("x-only-name")]),
            Command::new(SET_HEADER, vec![json!({ "no": "object" }), json!("v")]),
            Command::new(CREATE_COOKIE, vec![json!("sid"), json!("v"), json!({ "maxAge": "soon" })]),
            Command::new(SET_HEADER, vec![json!("x-count"), json!(3)]),
        ];
        apply_commands("tsu", &commands, &mut res);
        assert!(set_cookies(&res).is_empty());
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("x-count"), Some("3"));
    }
}
