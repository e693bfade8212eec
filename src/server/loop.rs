// Server loop module
// Accepts connections until a shutdown signal arrives

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::connection::accept_connection;
use crate::config::AppState;

/// How often `drain_connections` rechecks the open connection count
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Accept errors (e.g. running out of file descriptors) are logged and the
/// loop keeps going. Connections already accepted keep running after return.
pub async fn start_server_loop<S>(listener: TcpListener, state: Arc<AppState>, shutdown: S)
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => error!("Failed to accept connection: {e}"),
                }
            }

            () = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }
}

/// Wait for open connections to finish, giving up after `grace`.
///
/// Returns the number of connections still open when it gave up.
pub async fn drain_connections(state: &AppState, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let open = state.active_connections();
        if open == 0 {
            info!("All connections closed");
            return 0;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(open, "Grace period elapsed with connections still open");
            return open;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
