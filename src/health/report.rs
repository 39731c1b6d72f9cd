//! Health document rendered at `/health`

use serde::Serialize;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use super::stats::{StatsRegistry, StatsSnapshot};

/// Version string reported by the health endpoint
pub const HEALTH_VERSION: &str = "1.0";

/// Error rate above which the server reports itself degraded
const DEGRADED_ERROR_RATE: f64 = 0.5;
/// Minimum number of requests before the error rate is considered
const DEGRADED_MIN_REQUESTS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Degraded,
}

impl HealthStatus {
    /// `Degraded` once more than 10 requests were seen and over half failed
    #[allow(clippy::cast_precision_loss)]
    pub fn from_snapshot(snapshot: &StatsSnapshot) -> Self {
        let total = snapshot.requests_total;
        let error_rate = snapshot.requests_error as f64 / total.max(1) as f64;
        if error_rate > DEGRADED_ERROR_RATE && total > DEGRADED_MIN_REQUESTS {
            Self::Degraded
        } else {
            Self::Up
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Whole seconds since start
    pub uptime: u64,
    pub started_at: String,
    pub version: &'static str,
    pub stats: HealthStats,
    pub last_error: Option<String>,
    pub memory: Option<MemoryUsage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStats {
    pub requests: RequestCounts,
    pub video_streams: VideoStreamCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCounts {
    pub total: u64,
    pub success: u64,
    pub error: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoStreamCounts {
    pub total: u64,
    pub active: u64,
}

/// Process memory in bytes
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MemoryUsage {
    pub rss: u64,
    #[serde(rename = "virtual")]
    pub virtual_memory: u64,
}

impl HealthReport {
    /// Snapshot the registry and the process memory
    pub fn collect(stats: &StatsRegistry) -> Self {
        let snapshot = stats.snapshot();
        Self::from_snapshot(
            &snapshot,
            stats.started_at().to_rfc3339(),
            current_memory_usage(),
        )
    }

    pub fn from_snapshot(
        snapshot: &StatsSnapshot,
        started_at: String,
        memory: Option<MemoryUsage>,
    ) -> Self {
        Self {
            status: HealthStatus::from_snapshot(snapshot),
            uptime: snapshot.uptime.as_secs(),
            started_at,
            version: HEALTH_VERSION,
            stats: HealthStats {
                requests: RequestCounts {
                    total: snapshot.requests_total,
                    success: snapshot.requests_success,
                    error: snapshot.requests_error,
                },
                video_streams: VideoStreamCounts {
                    total: snapshot.video_streams_total,
                    active: snapshot.video_streams_active,
                },
            },
            last_error: snapshot.last_error.clone(),
            memory,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Memory of the current process, `None` where the platform can't tell
fn current_memory_usage() -> Option<MemoryUsage> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );
    let process = system.process(pid)?;
    Some(MemoryUsage {
        rss: process.memory(),
        virtual_memory: process.virtual_memory(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snapshot(total: u64, error: u64) -> StatsSnapshot {
        StatsSnapshot {
            requests_total: total,
            requests_error: error,
            requests_success: total - error,
            ..StatsSnapshot::default()
        }
    }

    #[test]
    fn test_degraded_threshold() {
        assert_eq!(HealthStatus::from_snapshot(&snapshot(11, 6)), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_snapshot(&snapshot(11, 5)), HealthStatus::Up);
    }

    #[test]
    fn test_needs_more_than_ten_requests() {
        assert_eq!(HealthStatus::from_snapshot(&snapshot(10, 10)), HealthStatus::Up);
        assert_eq!(HealthStatus::from_snapshot(&snapshot(0, 0)), HealthStatus::Up);
        assert_eq!(HealthStatus::from_snapshot(&snapshot(100, 51)), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_snapshot(&snapshot(100, 50)), HealthStatus::Up);
    }

    #[test]
    fn test_report_json_shape() {
        let snap = StatsSnapshot {
            uptime: Duration::from_millis(12_900),
            requests_total: 7,
            requests_success: 4,
            requests_error: 2,
            video_streams_total: 3,
            video_streams_active: 1,
            last_error: Some("File not found: /missing".into()),
        };
        let memory = Some(MemoryUsage {
            rss: 1024,
            virtual_memory: 4096,
        });
        let report = HealthReport::from_snapshot(&snap, "2026-01-01T00:00:00+00:00".into(), memory);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["status"], "UP");
        assert_eq!(value["uptime"], 12);
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["startedAt"], "2026-01-01T00:00:00+00:00");
        assert_eq!(value["stats"]["requests"]["total"], 7);
        assert_eq!(value["stats"]["requests"]["success"], 4);
        assert_eq!(value["stats"]["requests"]["error"], 2);
        assert_eq!(value["stats"]["videoStreams"]["total"], 3);
        assert_eq!(value["stats"]["videoStreams"]["active"], 1);
        assert_eq!(value["lastError"], "File not found: /missing");
        assert_eq!(value["memory"]["rss"], 1024);
        assert_eq!(value["memory"]["virtual"], 4096);
    }

    #[test]
    fn test_collect_reads_registry() {
        let stats = StatsRegistry::new();
        for _ in 0..12 {
            stats.record_request();
            stats.record_error("nope");
        }
        let report = HealthReport::collect(&stats);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.stats.requests.total, 12);
        assert_eq!(report.last_error.as_deref(), Some("nope"));
    }
}
