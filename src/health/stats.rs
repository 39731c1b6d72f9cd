//! Request and stream counters shared by every handler
//!
//! Counters are atomics so concurrent requests never lose an increment.
//! `last_error` is the only field behind a lock.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Process-wide request statistics, owned by `AppState`
#[derive(Debug)]
pub struct StatsRegistry {
    started: Instant,
    started_at: DateTime<Utc>,
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_error: AtomicU64,
    video_streams_total: AtomicU64,
    video_streams_active: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_error: u64,
    pub video_streams_total: u64,
    pub video_streams_active: u64,
    pub last_error: Option<String>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            requests_total: AtomicU64::new(0),
            requests_success: AtomicU64::new(0),
            requests_error: AtomicU64::new(0),
            video_streams_total: AtomicU64::new(0),
            video_streams_active: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Wall-clock time the registry was created
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Count an incoming request; called once per request on arrival
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a failed request and overwrite the last error message
    pub fn record_error(&self, message: impl Into<String>) {
        self.requests_error.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(message.into());
        }
    }

    /// Register a new video stream. The returned guard marks it finished
    /// when dropped.
    pub fn start_video_stream(self: &Arc<Self>) -> VideoStreamGuard {
        self.video_streams_total.fetch_add(1, Ordering::SeqCst);
        self.video_streams_active.fetch_add(1, Ordering::SeqCst);
        VideoStreamGuard {
            stats: Arc::clone(self),
        }
    }

    fn finish_video_stream(&self) {
        // Clamp at zero
        let _ = self
            .video_streams_active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            });
    }

    pub fn active_video_streams(&self) -> u64 {
        self.video_streams_active.load(Ordering::SeqCst)
    }

    /// Copy all counters
    ///
    /// `requests_total` is read last: outcomes are only recorded after the
    /// arrival count, so `success + error <= total` holds in every snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        let requests_success = self.requests_success.load(Ordering::SeqCst);
        let requests_error = self.requests_error.load(Ordering::SeqCst);
        let video_streams_total = self.video_streams_total.load(Ordering::SeqCst);
        let video_streams_active = self.video_streams_active.load(Ordering::SeqCst);
        let last_error = self.last_error.lock().ok().and_then(|e| e.clone());
        let requests_total = self.requests_total.load(Ordering::SeqCst);

        StatsSnapshot {
            uptime: self.started.elapsed(),
            requests_total,
            requests_success,
            requests_error,
            video_streams_total,
            video_streams_active,
            last_error,
        }
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Live video stream marker; decrements the active count exactly once
#[derive(Debug)]
pub struct VideoStreamGuard {
    stats: Arc<StatsRegistry>,
}

impl Drop for VideoStreamGuard {
    fn drop(&mut self) {
        self.stats.finish_video_stream();
    }
}
