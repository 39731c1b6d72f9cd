//! display-server
//!
//! Static-asset HTTP server with a health endpoint and range-request video
//! streaming, built on Tokio and Hyper.

pub mod config;
pub mod error;
pub mod handler;
pub mod health;
pub mod http;
pub mod logger;
pub mod server;

pub use crate::config::{AppState, Config};
pub use error::{ServeError, ServerError};
pub use health::StatsRegistry;
