//! Cookie parsing and `Set-Cookie` rendering (RFC 6265).

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[serde(alias = "Strict")]
    Strict,
    #[serde(alias = "Lax")]
    Lax,
    #[serde(alias = "None")]
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax    => "Lax",
            Self::None   => "None",
        }
    }
}

/// Cookie attributes, as orchestrators send them in a `create-cookie` command.
///
/// Deserializes from camelCase JSON (`{"maxAge": 3600, "httpOnly": true}`).
/// A missing `path` means `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Seconds.
    pub max_age: Option<i64>,
    /// Unix timestamp, seconds.
    pub expires: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_owned()),
            domain: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

/// A cookie to send to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    options: CookieOptions,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self { name: name.into(), value: value.into(), options }
    }

    /// A cookie that tells the client to drop `name` right away.
    pub fn removal(name: impl Into<String>, options: CookieOptions) -> Self {
        let options = CookieOptions { max_age: Some(0), expires: Some(0), ..options };
        Self::new(name, "", options)
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn value(&self) -> &str { &self.value }
    pub fn options(&self) -> &CookieOptions { &self.options }

    /// Renders the `Set-Cookie` header value.
    pub fn to_header_value(&self) -> Result<String, Error> {
        let invalid = |reason: &str| Error::InvalidCookie {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };

        if self.name.is_empty() || !self.name.bytes().all(is_token_byte) {
            return Err(invalid("name is not an RFC 6265 token"));
        }
        if !self.value.bytes().all(is_cookie_octet) {
            return Err(invalid("value contains characters outside cookie-octet"));
        }

        let opts = &self.options;
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if let Some(path) = &opts.path {
            if !is_attribute_value(path) {
                return Err(invalid("path contains a control character or `;`"));
            }
            parts.push(format!("Path={path}"));
        }
        if let Some(domain) = &opts.domain {
            if !is_attribute_value(domain) {
                return Err(invalid("domain contains a control character or `;`"));
            }
            parts.push(format!("Domain={domain}"));
        }
        if let Some(expires) = opts.expires {
            let at = DateTime::from_timestamp(expires, 0)
                .ok_or_else(|| invalid("expires is out of range"))?;
            parts.push(format!("Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT")));
        }
        if let Some(max_age) = opts.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }
        if opts.secure {
            parts.push("Secure".to_owned());
        }
        if opts.http_only {
            parts.push("HttpOnly".to_owned());
        }
        if let Some(same_site) = opts.same_site {
            parts.push(format!("SameSite={}", same_site.as_str()));
        }

        Ok(parts.join("; "))
    }
}

/// Splits a `Cookie` request header into name/value pairs, in header order.
///
/// Pairs without `=` are skipped. One layer of surrounding double quotes is
/// stripped from values. Values are not percent-decoded.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_owned(), value.to_owned()))
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

fn is_attribute_value(s: &str) -> bool {
    s.bytes().all(|b| !b.is_ascii_control() && b != b';')
}
