//! Error types
//!
//! `ServeError` covers failures local to a single request, `ServerError`
//! covers startup failures that terminate the process.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Per-request failure while resolving or opening a file
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("directory has no index file: {0}")]
    DirectoryWithoutIndex(String),

    #[error("failed to access {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// HTTP status code the error is reported with
    pub const fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::DirectoryWithoutIndex(_) => 404,
            Self::Filesystem { .. } => 500,
        }
    }
}

/// Startup failure; any of these ends the process with exit code 1
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address: {0}")]
    Address(String),

    #[error("address {0} is already in use")]
    AddrInUse(SocketAddr),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("public root {} is not accessible: {source}", path.display())]
    PublicRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
