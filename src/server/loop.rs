// Server loop module
// Accepts connections until the shutdown future resolves, then drains

use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener` until `shutdown` completes.
///
/// After shutdown the listener is closed, in-flight connections get up to
/// `performance.shutdown_timeout` seconds to finish, and the function
/// returns.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &graceful,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => break,
        }
    }

    // Stop accepting before draining
    drop(listener);
    logger::log_shutdown_started();

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    tokio::select! {
        () = graceful.shutdown() => logger::log_shutdown_complete(),
        () = tokio::time::sleep(grace) => {
            logger::log_warning(&format!(
                "Connections still open after {}s, shutting down anyway",
                grace.as_secs()
            ));
        }
    }
}
