//! File streaming with Range support for video
//!
//! Bodies are streamed from disk in chunks. The body reports its own
//! outcome to the stats registry: success once every promised byte is out,
//! error when a read fails or the file ends early. A video body also owns
//! the stream guard, so the active count drops whether the transfer
//! completes or the client leaves.

use futures_util::{Stream, TryStreamExt};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::{Response, StatusCode};
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::resolve::ResolvedTarget;
use super::router::RequestContext;
use crate::health::{StatsRegistry, VideoStreamGuard};
use crate::http::{self, mime, FileHeaders, ResponseBody};
use crate::logger;

/// Read buffer size per chunk
const CHUNK_SIZE: usize = 64 * 1024;

/// Byte stream that records its outcome once `remaining` bytes are out
///
/// hyper stops polling a body as soon as `Content-Length` bytes are
/// written, so completion is detected by count rather than end of stream.
pub struct TrackedStream<S> {
    inner: S,
    stats: Arc<StatsRegistry>,
    video: Option<VideoStreamGuard>,
    label: String,
    remaining: u64,
    finished: bool,
}

impl<S> TrackedStream<S> {
    pub const fn new(
        inner: S,
        length: u64,
        stats: Arc<StatsRegistry>,
        video: Option<VideoStreamGuard>,
        label: String,
    ) -> Self {
        Self {
            inner,
            stats,
            video,
            label,
            remaining: length,
            finished: false,
        }
    }

    fn complete(&mut self) {
        self.finished = true;
        self.video.take();
        self.stats.record_success();
    }

    fn fail(&mut self, err: &io::Error) {
        let message = format!("Stream error for {}: {err}", self.label);
        logger::log_error(&message);
        self.finished = true;
        self.video.take();
        self.stats.record_error(message);
    }
}

impl<S> Stream for TrackedStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        if self.remaining == 0 {
            self.complete();
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
                self.remaining = self.remaining.saturating_sub(len);
                if self.remaining == 0 {
                    self.complete();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.fail(&e);
                Poll::Ready(Some(Err(e)))
            }
            // File shrank under us; the body would fall short of Content-Length
            Poll::Ready(None) => {
                let err = io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} bytes missing", self.remaining),
                );
                self.fail(&err);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Serve a resolved file, honoring `Range` for video content
pub async fn serve_file(
    ctx: &RequestContext,
    target: &ResolvedTarget,
    stats: &Arc<StatsRegistry>,
) -> Response<ResponseBody> {
    let descriptor = mime::describe(&target.path);

    // HEAD never opens a stream, so it doesn't count as one
    let video = (descriptor.is_video && !ctx.is_head).then(|| stats.start_video_stream());

    let mut file = match File::open(&target.path).await {
        Ok(f) => f,
        Err(e) => return internal_error(stats, &format!("Failed to open {}: {e}", ctx.path)),
    };
    let size = match file.metadata().await {
        Ok(m) => m.len(),
        Err(e) => return internal_error(stats, &format!("Failed to stat {}: {e}", ctx.path)),
    };

    let range = match ctx.range_header.as_deref() {
        Some(raw) if descriptor.is_video => match http::parse_range_header(raw, size) {
            Ok(r) => Some(r),
            Err(e) => {
                let message = format!("Range not satisfiable for {}: {e}", ctx.path);
                logger::log_warning(&message);
                stats.record_error(message);
                return http::build_416_response(size);
            }
        },
        _ => None,
    };

    let (status, headers, start, length) = match range {
        Some(r) => (
            StatusCode::PARTIAL_CONTENT,
            FileHeaders::new(descriptor.mime_type, r.len()).with_content_range(r.content_range(size)),
            r.start,
            r.len(),
        ),
        None if descriptor.is_video => (
            StatusCode::OK,
            FileHeaders::new(descriptor.mime_type, size).with_accept_ranges(),
            0,
            size,
        ),
        None => (StatusCode::OK, FileHeaders::new(descriptor.mime_type, size), 0, size),
    };

    // hyper never polls a body it knows to be empty
    if ctx.is_head || length == 0 {
        stats.record_success();
        return http::build_file_response(status, headers, http::empty_body());
    }

    if start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            return internal_error(stats, &format!("Failed to seek {}: {e}", ctx.path));
        }
    }

    let reader = ReaderStream::with_capacity(file.take(length), CHUNK_SIZE);
    let tracked = TrackedStream::new(reader, length, Arc::clone(stats), video, ctx.path.clone());
    let body = StreamBody::new(tracked.map_ok(Frame::data)).boxed_unsync();

    http::build_file_response(status, headers, body)
}

/// Failure before any header was written: answer 500 and record it
fn internal_error(stats: &StatsRegistry, message: &str) -> Response<ResponseBody> {
    logger::log_error(message);
    stats.record_error(message);
    http::build_500_response()
}
