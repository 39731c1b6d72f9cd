// Configuration module entry point
// Layered configuration (defaults, optional file, environment) and runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{AccessLogFormat, Config, LoggingConfig, PerformanceConfig, ServerConfig};

/// Environment variable naming the config file (without extension)
pub const CONFIG_PATH_ENV: &str = "DISPLAY_CONFIG";
/// Prefix for environment overrides, e.g. `DISPLAY_SERVER__PUBLIC_DIR`
pub const ENV_PREFIX: &str = "DISPLAY";

impl Config {
    /// Load configuration using `DISPLAY_CONFIG` or "config" as file path
    pub fn load() -> Result<Self, ServerError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Precedence: defaults < file < `DISPLAY_*` variables < `PORT`.
    pub fn load_from(config_path: &str) -> Result<Self, ServerError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ServerError::Address(format!("{}:{}: {e}", self.server.host, self.server.port)))
    }
}
