//! Request cookie parsing and `Set-Cookie` rendering.
//!
//! # Wire format
//! ```text
//! Cookie: name=value[; $Path=p][; $Domain=d][; $Port=n], other=value
//! ```
//! Pairs are separated by `;` or `,`. `$`-prefixed attributes modify the
//! cookie that precedes them instead of starting a new one.

use std::fmt::Write;
use std::time::SystemTime;

use serde::Serialize;

/// A single cookie, as received or as about to be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub port: Option<String>,
    pub version: Option<u32>,
    #[serde(skip)]
    pub expires: Option<SystemTime>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Render the value of a `Set-Cookie` header for this cookie.
    pub fn to_set_cookie(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            let _ = write!(out, "; Path={}", path);
        }
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; Domain={}", domain);
        }
        if let Some(port) = &self.port {
            let _ = write!(out, "; Port=\"{}\"", port);
        }
        if let Some(version) = self.version {
            let _ = write!(out, "; Version={}", version);
        }
        if let Some(expires) = self.expires {
            let _ = write!(out, "; Expires={}", httpdate::fmt_http_date(expires));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse the value of a request `Cookie` header.
///
/// A `$Version`/`$ProtocolVersion` seen before any cookie becomes the default
/// version of the cookies that follow; other attributes with no preceding
/// cookie are ignored.
pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    let mut cookies: Vec<Cookie> = Vec::new();
    let mut default_version = None;

    for part in header.split([';', ',']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, value) = match part.split_once('=') {
            Some((name, value)) => (name.trim(), unquote(value.trim())),
            None => (part, ""),
        };

        if let Some(attribute) = name.strip_prefix('$') {
            let attribute = attribute.to_ascii_lowercase();
            if matches!(attribute.as_str(), "version" | "protocolversion") {
                let version = value.parse().ok();
                match cookies.last_mut() {
                    Some(cookie) => cookie.version = version,
                    None => default_version = version,
                }
                continue;
            }
            let Some(cookie) = cookies.last_mut() else {
                continue;
            };
            match attribute.as_str() {
                "path" => cookie.path = Some(value.to_string()),
                "domain" => cookie.domain = Some(value.to_string()),
                "port" => cookie.port = Some(value.to_string()),
                _ => {}
            }
            continue;
        }

        let mut cookie = Cookie::new(name, value);
        cookie.version = default_version;
        cookies.push(cookie);
    }
    cookies
}
