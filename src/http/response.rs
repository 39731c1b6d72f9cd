//! HTTP response building module
//!
//! Builders for every status the server answers with. All responses share
//! one body type so file streams and fixed bodies can be returned from the
//! same handler.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ALLOW, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS,
};
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};

/// Body type shared by all responses
pub type ResponseBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Cache lifetime for served files (one day)
pub const FILE_CACHE_CONTROL: &str = "public, max-age=86400";

const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Fixed body from bytes
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Empty body
pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Header set for a file response, assembled up front and applied in one go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeaders {
    pub content_type: &'static str,
    pub content_length: u64,
    pub content_range: Option<String>,
    pub accept_ranges: bool,
}

impl FileHeaders {
    pub const fn new(content_type: &'static str, content_length: u64) -> Self {
        Self {
            content_type,
            content_length,
            content_range: None,
            accept_ranges: false,
        }
    }

    #[must_use]
    pub fn with_accept_ranges(mut self) -> Self {
        self.accept_ranges = true;
        self
    }

    #[must_use]
    pub fn with_content_range(mut self, value: String) -> Self {
        self.content_range = Some(value);
        self.accept_ranges = true;
        self
    }

    fn apply(self, builder: Builder) -> Builder {
        let mut builder = builder
            .header(CONTENT_TYPE, self.content_type)
            .header(CACHE_CONTROL, FILE_CACHE_CONTROL)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
            .header(CONTENT_LENGTH, self.content_length);
        if self.accept_ranges {
            builder = builder.header(ACCEPT_RANGES, "bytes");
        }
        if let Some(range) = self.content_range {
            builder = builder.header(CONTENT_RANGE, range);
        }
        builder
    }
}

/// Build a 200/206 file response from a prepared header set
pub fn build_file_response(
    status: StatusCode,
    headers: FileHeaders,
    body: ResponseBody,
) -> Response<ResponseBody> {
    headers
        .apply(Response::builder().status(status))
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(empty_body())
        })
}

/// Build 301 redirect response
pub fn build_redirect_response(location: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(empty_body())
        })
}

/// Build 404 Not Found response, HTML when a custom page is available
pub fn build_404_response(custom_page: Option<Bytes>) -> Response<ResponseBody> {
    let (content_type, body) = match custom_page {
        Some(page) => ("text/html", page),
        None => ("text/plain", Bytes::from_static(b"404 Not Found")),
    };

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, content_type)
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body("404 Not Found"))
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain")
        .body(full_body("500 Internal Server Error"))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(full_body("500 Internal Server Error"))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(CONTENT_TYPE, "text/plain")
        .header(ALLOW, ALLOWED_METHODS)
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response (CORS preflight)
pub fn build_options_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, ALLOWED_METHODS)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
        .header(ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Range")
        .header(ACCESS_CONTROL_MAX_AGE, "86400")
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(empty_body())
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_RANGE, format!("bytes */{file_size}"))
        .header(ACCEPT_RANGES, "bytes")
        .body(full_body("416 Range Not Satisfiable"))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(full_body("416 Range Not Satisfiable"))
        })
}

/// Build JSON health response
pub fn build_health_response(json: String, is_head: bool) -> Response<ResponseBody> {
    let content_length = json.len();
    let body = if is_head {
        empty_body()
    } else {
        full_body(json)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, content_length)
        .header(CACHE_CONTROL, "no-store")
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(empty_body())
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
