//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: counts the request, logs it,
//! then dispatches to the health endpoint or the file pipeline.

use crate::config::AppState;
use crate::error::ServeError;
use crate::handler::resolve::{self, Resolution};
use crate::handler::stream;
use crate::health::HealthReport;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Bytes;
use hyper::header::RANGE;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/health";
/// Custom not-found page under the public root
pub const NOT_FOUND_PAGE: &str = "404.html";

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    pub query: Option<String>,
    pub is_head: bool,
    pub range_header: Option<String>,
}

impl RequestContext {
    fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            is_head: req.method() == Method::HEAD,
            range_header: req
                .headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: Option<SocketAddr>,
) -> Result<Response<ResponseBody>, Infallible> {
    state.stats.record_request();

    if state.access_log_enabled() {
        let entry = AccessLogEntry::new(
            req.method().to_string(),
            req.uri().path().to_string(),
            remote_addr,
        );
        logger::log_access(&entry, state.config.logging.access_log_format);
    }

    let method = req.method().clone();
    let ctx = RequestContext::from_request(&req);
    drop(req);

    // Health probes count toward the total only, never success or error
    if ctx.path == HEALTH_PATH {
        return Ok(serve_health(&ctx, &state));
    }

    if let Some(resp) = check_http_method(&method, &ctx, &state) {
        return Ok(resp);
    }

    Ok(route_request(&ctx, &state).await)
}

/// Answer OPTIONS and reject anything other than GET/HEAD
fn check_http_method(
    method: &Method,
    ctx: &RequestContext,
    state: &AppState,
) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => {
            state.stats.record_success();
            Some(http::build_options_response())
        }
        _ => {
            let message = format!("Method not allowed: {method} {}", ctx.path);
            logger::log_warning(&message);
            state.stats.record_error(message);
            Some(http::build_405_response())
        }
    }
}

fn serve_health(ctx: &RequestContext, state: &AppState) -> Response<ResponseBody> {
    match HealthReport::collect(&state.stats).to_json() {
        Ok(json) => http::build_health_response(json, ctx.is_head),
        Err(e) => {
            logger::log_error(&format!("Failed to render health report: {e}"));
            http::build_500_response()
        }
    }
}

/// Resolve the path and hand the result to the matching responder
async fn route_request(ctx: &RequestContext, state: &Arc<AppState>) -> Response<ResponseBody> {
    match resolve::resolve(&state.public_root, &ctx.path, ctx.query.as_deref()).await {
        Ok(Resolution::Serve(target)) => stream::serve_file(ctx, &target, &state.stats).await,
        Ok(Resolution::Redirect(location)) => http::build_redirect_response(&location),
        Err(err) => serve_error(&err, state).await,
    }
}

/// Record the failure and build the 404/500 response for it
async fn serve_error(err: &ServeError, state: &AppState) -> Response<ResponseBody> {
    match err {
        ServeError::NotFound(_) | ServeError::DirectoryWithoutIndex(_) => {
            state.stats.record_error(err.to_string());
            http::build_404_response(load_not_found_page(state).await)
        }
        ServeError::Filesystem { .. } => {
            logger::log_error(&err.to_string());
            state.stats.record_error(err.to_string());
            http::build_500_response()
        }
    }
}

async fn load_not_found_page(state: &AppState) -> Option<Bytes> {
    tokio::fs::read(state.public_root.join(NOT_FOUND_PAGE))
        .await
        .ok()
        .map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{
        ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION,
    };
    use hyper::StatusCode;
    use std::fs;

    const VIDEO_SIZE: usize = 300_000;

    fn video_bytes() -> Vec<u8> {
        (0..VIDEO_SIZE).map(|i| (i % 251) as u8).collect()
    }

    fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.join("style.css"), "body{}").unwrap();
        fs::create_dir(root.join("videos")).unwrap();
        fs::write(root.join("videos/index.html"), "<h1>videos</h1>").unwrap();
        fs::write(root.join("videos/intro.mp4"), video_bytes()).unwrap();
        fs::write(root.join("videos/empty.webm"), b"").unwrap();

        let mut config = Config::default();
        config.server.public_dir = root.display().to_string();
        config.logging.access_log = false;
        let state = Arc::new(AppState::new(config).unwrap());
        (dir, state)
    }

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    fn get_range(path: &str, range: &str) -> Request<()> {
        Request::builder()
            .uri(path)
            .header(RANGE, range)
            .body(())
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<()>) -> Response<ResponseBody> {
        handle_request(req, Arc::clone(state), None).await.unwrap()
    }

    async fn body_bytes(resp: Response<ResponseBody>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_root_matches_index_html() {
        let (_dir, state) = test_state();
        let root = send(&state, get("/")).await;
        let index = send(&state, get("/index.html")).await;

        assert_eq!(root.status(), StatusCode::OK);
        assert_eq!(root.status(), index.status());
        assert_eq!(root.headers(), index.headers());
        assert_eq!(body_bytes(root).await, body_bytes(index).await);
    }

    #[tokio::test]
    async fn test_common_headers() {
        let (_dir, state) = test_state();
        let resp = send(&state, get("/style.css")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/css");
        assert_eq!(resp.headers()[CACHE_CONTROL], "public, max-age=86400");
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
        assert_eq!(body_bytes(resp).await, "body{}");
        assert_eq!(state.stats.snapshot().requests_success, 1);
    }

    #[tokio::test]
    async fn test_range_ignored_for_non_video() {
        let (_dir, state) = test_state();
        let resp = send(&state, get_range("/style.css", "bytes=0-1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(CONTENT_RANGE).is_none());
        assert_eq!(body_bytes(resp).await, "body{}");
    }

    #[tokio::test]
    async fn test_directory_redirect_and_index() {
        let (_dir, state) = test_state();
        let redirect = send(&state, get("/videos")).await;
        assert_eq!(redirect.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(redirect.headers()[LOCATION], "/videos/");

        let index = send(&state, get("/videos/")).await;
        assert_eq!(index.status(), StatusCode::OK);
        assert_eq!(body_bytes(index).await, "<h1>videos</h1>");

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.requests_success, 1);
        assert_eq!(snap.requests_error, 0);
    }

    #[tokio::test]
    async fn test_not_found_plain_fallback() {
        let (_dir, state) = test_state();
        let resp = send(&state, get("/missing.png")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(body_bytes(resp).await, "404 Not Found");

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_error, 1);
        assert_eq!(snap.last_error.as_deref(), Some("file not found: /missing.png"));
    }

    #[tokio::test]
    async fn test_not_found_custom_page() {
        let (dir, state) = test_state();
        fs::write(dir.path().join("404.html"), "<h1>lost</h1>").unwrap();

        let resp = send(&state, get("/nope/deeper")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(body_bytes(resp).await, "<h1>lost</h1>");
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let (_dir, state) = test_state();
        let resp = send(&state, get("/%2e%2e/%2e%2e/etc/passwd")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_video_without_range() {
        let (_dir, state) = test_state();
        let resp = send(&state, get("/videos/intro.mp4")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "video/mp4");
        assert_eq!(resp.headers()[ACCEPT_RANGES], "bytes");
        assert_eq!(resp.headers()[CONTENT_LENGTH], VIDEO_SIZE.to_string().as_str());
        assert_eq!(state.stats.active_video_streams(), 1);

        assert_eq!(body_bytes(resp).await.as_ref(), video_bytes().as_slice());
        let snap = state.stats.snapshot();
        assert_eq!(snap.video_streams_active, 0);
        assert_eq!(snap.video_streams_total, 1);
        assert_eq!(snap.requests_success, 1);
    }

    #[tokio::test]
    async fn test_video_open_range_from_zero() {
        let (_dir, state) = test_state();
        let resp = send(&state, get_range("/videos/intro.mp4", "bytes=0-")).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            resp.headers()[CONTENT_RANGE],
            format!("bytes 0-{}/{VIDEO_SIZE}", VIDEO_SIZE - 1).as_str()
        );
        assert_eq!(body_bytes(resp).await.len(), VIDEO_SIZE);
    }

    #[tokio::test]
    async fn test_video_ranges() {
        let (_dir, state) = test_state();
        let data = video_bytes();
        let last = VIDEO_SIZE - 1;

        for (start, end) in [(0, 0), (0, 99), (1000, 70_000), (last - 10, last), (last, last)] {
            let resp = send(
                &state,
                get_range("/videos/intro.mp4", &format!("bytes={start}-{end}")),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
            assert_eq!(
                resp.headers()[CONTENT_RANGE],
                format!("bytes {start}-{end}/{VIDEO_SIZE}").as_str()
            );
            assert_eq!(resp.headers()[ACCEPT_RANGES], "bytes");
            assert_eq!(
                resp.headers()[CONTENT_LENGTH],
                (end - start + 1).to_string().as_str()
            );
            assert_eq!(body_bytes(resp).await.as_ref(), &data[start..=end]);
        }
        assert_eq!(state.stats.active_video_streams(), 0);
    }

    #[tokio::test]
    async fn test_bad_ranges_rejected_with_416() {
        let (_dir, state) = test_state();
        for range in [
            format!("bytes={VIDEO_SIZE}-"),
            format!("bytes=0-{VIDEO_SIZE}"),
            "bytes=500-100".to_string(),
            "bytes=abc-".to_string(),
            "bytes=-500".to_string(),
        ] {
            let resp = send(&state, get_range("/videos/intro.mp4", &range)).await;
            assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE, "range {range}");
            assert_eq!(
                resp.headers()[CONTENT_RANGE],
                format!("bytes */{VIDEO_SIZE}").as_str()
            );
        }

        let empty = send(&state, get_range("/videos/empty.webm", "bytes=0-")).await;
        assert_eq!(empty.status(), StatusCode::RANGE_NOT_SATISFIABLE);

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_error, 6);
        assert_eq!(snap.video_streams_active, 0);
    }

    #[tokio::test]
    async fn test_aborted_video_stream_released() {
        let (_dir, state) = test_state();
        let resp = send(&state, get("/videos/intro.mp4")).await;
        assert_eq!(state.stats.active_video_streams(), 1);

        let mut body = resp.into_body();
        let first = body.frame().await.unwrap().unwrap();
        assert!(first.is_data());
        drop(body);

        let snap = state.stats.snapshot();
        assert_eq!(snap.video_streams_active, 0);
        assert_eq!(snap.video_streams_total, 1);
        assert_eq!(snap.requests_success, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_filesystem_error_is_500() {
        let (_dir, state) = test_state();
        std::os::unix::fs::symlink(
            state.public_root.join("loop"),
            state.public_root.join("loop"),
        )
        .unwrap();

        let resp = send(&state, get("/loop")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(body_bytes(resp).await, "500 Internal Server Error");

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_error, 1);
        assert_eq!(snap.requests_success, 0);
        assert!(snap.last_error.unwrap().contains("/loop"));
    }

    #[tokio::test]
    async fn test_head_request() {
        let (_dir, state) = test_state();
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/videos/intro.mp4")
            .body(())
            .unwrap();
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], VIDEO_SIZE.to_string().as_str());
        assert!(body_bytes(resp).await.is_empty());

        let snap = state.stats.snapshot();
        assert_eq!(snap.video_streams_total, 0);
        assert_eq!(snap.requests_success, 1);
    }

    #[tokio::test]
    async fn test_methods() {
        let (_dir, state) = test_state();
        let options = Request::builder()
            .method(Method::OPTIONS)
            .uri("/index.html")
            .body(())
            .unwrap();
        assert_eq!(send(&state, options).await.status(), StatusCode::NO_CONTENT);

        let post = Request::builder()
            .method(Method::POST)
            .uri("/index.html")
            .body(())
            .unwrap();
        let resp = send(&state, post).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], "GET, HEAD, OPTIONS");

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.requests_success, 1);
        assert_eq!(snap.requests_error, 1);
    }

    #[tokio::test]
    async fn test_health_counts_total_only() {
        let (_dir, state) = test_state();
        let _ = send(&state, get("/missing")).await;

        let resp = send(&state, get("/health")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        let value: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(value["status"], "UP");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["stats"]["requests"]["total"], 2);
        assert_eq!(value["stats"]["requests"]["error"], 1);
        assert_eq!(value["stats"]["requests"]["success"], 0);

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.requests_success + snap.requests_error, 1);
    }

    #[tokio::test]
    async fn test_health_degrades_after_errors() {
        let (_dir, state) = test_state();
        for _ in 0..11 {
            let _ = send(&state, get("/missing")).await;
        }
        let resp = send(&state, get("/health")).await;
        let value: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(value["status"], "DEGRADED");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_requests_all_counted() {
        let (_dir, state) = test_state();
        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let path = if i % 2 == 0 { "/index.html" } else { "/videos/intro.mp4" };
                    let resp = handle_request(get(path), state, None).await.unwrap();
                    body_bytes(resp).await.len()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap() > 0);
        }

        let snap = state.stats.snapshot();
        assert_eq!(snap.requests_total, 100);
        assert_eq!(snap.requests_success, 100);
        assert_eq!(snap.video_streams_total, 50);
        assert_eq!(snap.video_streams_active, 0);
    }
}
