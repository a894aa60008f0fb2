//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`]; middleware further up the chain may read
//! its content type and swap its [`Body`] before it reaches the wire.

use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

use crate::body::{Body, HttpBody};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::body`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css; charset=utf-8
    Html,         // text/html; charset=utf-8
    JavaScript,   // text/javascript; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Wasm,         // application/wasm
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css         => "text/css; charset=utf-8",
            Self::Html        => "text/html; charset=utf-8",
            Self::JavaScript  => "text/javascript; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Wasm        => "application/wasm",
        }
    }

    /// Guesses from a file extension (without the dot). Unknown → octet-stream.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "css"                 => Self::Css,
            "htm" | "html"        => Self::Html,
            "js" | "mjs" | "cjs"  => Self::JavaScript,
            "json" | "map"        => Self::Json,
            "png"                 => Self::Png,
            "svg"                 => Self::Svg,
            "txt"                 => Self::Text,
            "wasm"                => Self::Wasm,
            _                     => Self::OctetStream,
        }
    }

    fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use http::StatusCode;
/// use specifier_rewrite::Response;
///
/// Response::html("<script type=\"module\" src=\"./app.js\"></script>");
/// Response::javascript("import 'lit';");
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use http::{header, HeaderValue, StatusCode};
/// use specifier_rewrite::{ContentType, Response};
///
/// Response::builder()
///     .status(StatusCode::OK)
///     .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
///     .body(ContentType::JavaScript, "export const x = 1;");
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
}

impl Response {
    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<Body>) -> Self {
        Self::typed(ContentType::Html, body.into())
    }

    /// `200 OK`, `text/javascript; charset=utf-8`.
    pub fn javascript(body: impl Into<Body>) -> Self {
        Self::typed(ContentType::JavaScript, body.into())
    }

    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::typed(ContentType::Json, body.into())
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::typed(ContentType::Text, Body::Text(body.into()))
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: HeaderMap::new(), body: Body::Empty }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    fn typed(content_type: ContentType, body: Body) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type.header_value());
        Self { status: StatusCode::OK, headers, body }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &Body { &self.body }
    pub fn body_mut(&mut self) -> &mut Body { &mut self.body }

    /// The declared `content-type`, if present and visible ASCII.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE)?.to_str().ok()
    }

    /// Replaces the body. A `content-length` set for the old body is dropped.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.headers.remove(header::CONTENT_LENGTH);
        self.body = body.into();
    }

    pub(crate) fn into_inner(self) -> http::Response<HttpBody> {
        let mut res = http::Response::new(self.body.into_http());
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Terminate with an HTML body.
    pub fn html(self, body: impl Into<Body>) -> Response {
        self.body(ContentType::Html, body)
    }

    /// Terminate with a JavaScript body.
    pub fn javascript(self, body: impl Into<Body>) -> Response {
        self.body(ContentType::JavaScript, body)
    }

    /// Terminate with a typed body: a buffer, a string, or a stream.
    pub fn body(mut self, content_type: ContentType, body: impl Into<Body>) -> Response {
        self.headers.insert(header::CONTENT_TYPE, content_type.header_value());
        Response { status: self.status, headers: self.headers, body: body.into() }
    }

    /// Terminate with a body whose `content-type`, if any, was set through
    /// [`header`](Self::header).
    pub fn raw(self, body: impl Into<Body>) -> Response {
        Response { status: self.status, headers: self.headers, body: body.into() }
    }

    /// Terminate with no body (e.g. `204 No Content`, `304 Not Modified`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Body::Empty }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`StatusCode`] directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
