// Server module entry point
// Listener creation, connection handling and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the file is mounted under another name
#[path = "loop.rs"]
pub mod server_loop;

use std::sync::Arc;

use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::logger;

pub use listener::create_listener;
pub use server_loop::serve;

/// Bind, serve until SIGINT/SIGTERM, then drain and return
pub async fn run(config: Config) -> Result<(), ServerError> {
    let addr = config.get_socket_addr()?;
    let state = Arc::new(AppState::new(config)?);
    let listener = create_listener(addr)?;
    let local_addr = listener.local_addr()?;

    logger::log_server_start(&local_addr, &state.public_root, &state.config);
    serve(listener, state, signal::shutdown_signal()).await;
    Ok(())
}
