//! Health statistics and the `/health` document

pub mod report;
pub mod stats;

pub use report::{HealthReport, HealthStatus};
pub use stats::{StatsRegistry, StatsSnapshot, VideoStreamGuard};
