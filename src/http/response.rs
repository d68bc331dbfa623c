//! Response model and status-line/header serialization.
//!
//! # Responsibilities
//! - Hold status, headers, cookies and framing preferences for a response
//! - Provide the standard headers every response starts with
//! - Render the status line and header block
//!
//! # Design Decisions
//! - Framing decisions (keep-alive, chunked, compression) are applied by the
//!   connection context right before the header write, not here
//! - `Set-Cookie` is emitted once per cookie

use std::time::SystemTime;

use super::cookie::Cookie;
use super::headers::WebHeaderCollection;
use super::pipeline::ContentEncoding;
use super::request::HttpVersion;

/// Reason phrase for a status code.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        426 => "Upgrade Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => match status / 100 {
            1 => "Informational",
            2 => "Success",
            3 => "Redirection",
            4 => "Client Error",
            _ => "Server Error",
        },
    }
}

/// Response under construction for one exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub version: HttpVersion,
    pub headers: WebHeaderCollection,
    pub cookies: Vec<Cookie>,
    pub content_type: String,
    pub content_encoding: ContentEncoding,
    pub keep_alive: bool,
}

impl HttpResponse {
    /// A `200 OK` carrying the standard headers.
    pub fn new(server_name: &str) -> Self {
        let mut headers = WebHeaderCollection::new();
        headers.set("Server", server_name);
        headers.set("Date", httpdate::fmt_http_date(SystemTime::now()));
        headers.set("Accept-Ranges", "bytes");
        headers.set("Vary", "Accept-Encoding");
        headers.set("Access-Control-Allow-Origin", "*");
        Self {
            status: 200,
            version: HttpVersion::HTTP_11,
            headers,
            cookies: Vec::new(),
            content_type: "text/html".to_string(),
            content_encoding: ContentEncoding::Identity,
            keep_alive: true,
        }
    }

    pub fn status_description(&self) -> &'static str {
        reason_phrase(self.status)
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// `true` when the body will be chunk-framed.
    pub fn is_chunked(&self) -> bool {
        self.version >= HttpVersion::HTTP_11
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| c.name != cookie.name);
        self.cookies.push(cookie);
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.append(name, value);
    }

    /// `HTTP/{version} {code} {description}\r\n{headers}\r\n`
    pub fn serialize_head(&self) -> String {
        let mut out = format!(
            "HTTP/{} {} {}\r\n",
            self.version,
            self.status,
            self.status_description()
        );
        self.headers.write_to(&mut out);
        for cookie in &self.cookies {
            out.push_str("Set-Cookie: ");
            out.push_str(&cookie.to_set_cookie());
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}
