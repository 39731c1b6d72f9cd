//! Access log format module
//!
//! One line per request: plain text or JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::net::SocketAddr;

use crate::config::AccessLogFormat;

/// Access log entry, recorded when a request arrives
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub remote_addr: Option<SocketAddr>,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(method: String, path: String, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            time: Utc::now(),
            method,
            path,
            remote_addr,
        }
    }

    pub fn format(&self, format: AccessLogFormat) -> String {
        match format {
            AccessLogFormat::Text => self.format_text(),
            AccessLogFormat::Json => self.format_json(),
        }
    }

    /// `2026-01-01T00:00:00.000Z - GET /index.html (127.0.0.1:50000)`
    fn format_text(&self) -> String {
        let time = self.time.to_rfc3339_opts(SecondsFormat::Millis, true);
        match self.remote_addr {
            Some(addr) => format!("{time} - {} {} ({addr})", self.method, self.path),
            None => format!("{time} - {} {}", self.method, self.path),
        }
    }

    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.format_text())
    }
}

fn serialize_time<S: serde::Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}
