// Application state module
// Shared by every connection: configuration, public root and statistics

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::Config;
use crate::error::ServerError;
use crate::health::StatsRegistry;

/// Application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical public root, every served path must stay under it
    pub public_root: PathBuf,
    pub stats: Arc<StatsRegistry>,
}

impl AppState {
    /// Create `AppState` with a fresh statistics registry
    pub fn new(config: Config) -> Result<Self, ServerError> {
        Self::with_stats(config, Arc::new(StatsRegistry::new()))
    }

    /// Create `AppState` around an existing registry
    pub fn with_stats(config: Config, stats: Arc<StatsRegistry>) -> Result<Self, ServerError> {
        let public_root = canonical_root(Path::new(&config.server.public_dir))?;
        Ok(Self {
            config,
            public_root,
            stats,
        })
    }

    pub fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}

fn canonical_root(dir: &Path) -> Result<PathBuf, ServerError> {
    let root = dir.canonicalize().map_err(|source| ServerError::PublicRoot {
        path: dir.to_path_buf(),
        source,
    })?;
    if !root.is_dir() {
        return Err(ServerError::PublicRoot {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }
    Ok(root)
}
