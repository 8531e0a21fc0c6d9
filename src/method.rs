//! HTTP method as a typed enum.
//!
//! Covers the RFC 9110 methods plus `PATCH` (RFC 5789). Anything else is
//! answered with `405 Method Not Allowed` before it reaches an orchestrator.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

/// Parses an uppercase method string. Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            other     => Err(Error::UnsupportedMethod(other.to_owned())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = Error;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_http() {
        assert_eq!(Method::try_from(&http::Method::PATCH).unwrap(), Method::Patch);
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn rejects_extension_methods() {
        let purge = http::Method::from_bytes(b"PURGE").unwrap();
        assert!(matches!(Method::try_from(&purge), Err(Error::UnsupportedMethod(m)) if m == "PURGE"));
        assert!("get".parse::<Method>().is_err());
    }
}
