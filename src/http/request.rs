//! Request model and header-block parser.
//!
//! # Responsibilities
//! - Hold the parsed request line, headers, cookies and query values
//! - Turn a framed header block into an [`HttpRequest`]
//! - Carry the late-bound body fields filled in by body decoders
//!
//! # Design Decisions
//! - Parsing stops at the first malformed header line (fail fast)
//! - An unparseable protocol token is tolerated as version `0.0`
//! - Header values are stored verbatim in addition to any structured field

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::Serialize;

use super::cookie::{parse_cookie_header, Cookie};
use super::error::HttpError;
use super::headers::WebHeaderCollection;
use super::query::QueryValueCollection;

/// Protocol version from the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct HttpVersion {
    pub major: u8,
    pub minor: u8,
}

impl HttpVersion {
    pub const HTTP_10: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_11: HttpVersion = HttpVersion { major: 1, minor: 1 };

    /// Parse an `HTTP/x.y` token, falling back to `0.0`.
    pub fn parse(token: &str) -> Self {
        token
            .strip_prefix("HTTP/")
            .and_then(|v| v.split_once('.'))
            .and_then(|(major, minor)| {
                Some(HttpVersion {
                    major: major.parse().ok()?,
                    minor: minor.parse().ok()?,
                })
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A file submitted through a multipart body.
#[derive(Debug, Clone, Default)]
pub struct PostedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A parsed HTTP request.
///
/// Everything except `post`, `files` and `input` is fixed once dispatch
/// begins; those three are populated by the body decoder.
#[derive(Debug, Default)]
pub struct HttpRequest {
    pub method: String,
    /// Request target exactly as received.
    pub raw_url: String,
    /// Percent-decoded path component of the target.
    pub path: String,
    pub query_string: String,
    pub version: HttpVersion,
    pub headers: WebHeaderCollection,
    pub cookies: Vec<Cookie>,
    /// Declared `Content-Length`, `None` when the header is absent.
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub accept_types: Vec<String>,
    pub accept_languages: Vec<String>,
    pub referrer: Option<String>,
    pub host: Option<String>,
    pub user_agent: Option<String>,
    /// Values decoded from the query string.
    pub get: QueryValueCollection,
    /// Values decoded from a form body.
    pub post: QueryValueCollection,
    pub files: Vec<PostedFile>,
    /// Raw body for content types no decoder claimed.
    pub input: Option<tokio::fs::File>,
}

impl HttpRequest {
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    /// Value of a query-string field.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.get.value(name)
    }

    /// Value of a form field from the body.
    pub fn form(&self, name: &str) -> Option<&str> {
        self.post.value(name)
    }

    /// `true` when the client asked for a WebSocket upgrade.
    pub fn is_websocket_request(&self) -> bool {
        self.websocket_key().is_some()
    }

    pub fn websocket_key(&self) -> Option<&str> {
        self.headers
            .get("Sec-WebSocket-Key")
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// `true` when the client asked to close after this exchange.
    pub fn wants_close(&self) -> bool {
        self.headers
            .get("Connection")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")))
    }

    fn apply_header(&mut self, name: &str, value: &str) -> Result<(), HttpError> {
        match name.to_ascii_lowercase().as_str() {
            "accept" => self.accept_types = split_list(value),
            "accept-language" => self.accept_languages = split_list(value),
            "content-length" => {
                let length: i64 = value
                    .parse()
                    .map_err(|_| HttpError::bad_request(format!("invalid Content-Length {:?}", value)))?;
                let length = u64::try_from(length)
                    .map_err(|_| HttpError::bad_request(format!("negative Content-Length {}", length)))?;
                self.content_length = Some(length);
            }
            "content-type" => self.content_type = Some(value.to_string()),
            "content-encoding" => self.content_encoding = Some(value.to_string()),
            "referer" => self.referrer = Some(value.to_string()),
            "host" => self.host = Some(value.to_string()),
            "user-agent" => self.user_agent = Some(value.to_string()),
            "cookie" => self.cookies.extend(parse_cookie_header(value)),
            _ => {}
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a framed header block (request line plus header lines).
///
/// The block may or may not include the trailing `\r\n\r\n`.
pub fn parse_request_head(block: &[u8]) -> Result<HttpRequest, HttpError> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split(['\r', '\n']).filter(|line| !line.is_empty());

    let request_line = lines
        .next()
        .ok_or_else(|| HttpError::bad_request("empty request"))?;
    let mut tokens = request_line.split(' ').filter(|t| !t.is_empty());
    let (Some(method), Some(target), Some(protocol)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(HttpError::bad_request(format!(
            "malformed request line {:?}",
            request_line
        )));
    };

    let mut request = HttpRequest {
        method: method.to_string(),
        raw_url: target.to_string(),
        version: HttpVersion::parse(protocol),
        ..HttpRequest::default()
    };

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };
    request.path = percent_decode_str(path).decode_utf8_lossy().into_owned();
    request.query_string = query.to_string();
    request.get = QueryValueCollection::parse(query);

    for line in lines {
        let (name, value) = match line.find(':') {
            Some(0) | None => {
                return Err(HttpError::bad_request(format!("malformed header line {:?}", line)));
            }
            Some(i) => (line[..i].trim(), line[i + 1..].trim()),
        };
        request.headers.append(name, value);
        request.apply_header(name, value)?;
    }

    Ok(request)
}
