// Connection handling module
// Accepts a single TCP connection and serves it with hyper

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::AppState;
use crate::handler;

/// Accept and process a connection, checking the connection limit.
///
/// Connections over `performance.max_connections` are dropped immediately.
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    let Some(open) = state.acquire_connection() else {
        warn!(
            peer = %peer_addr,
            max = ?state.config.performance.max_connections,
            "Max connections reached. Connection rejected."
        );
        drop(stream);
        return;
    };
    debug!(peer = %peer_addr, open, "Accepted connection");

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve a connection in a spawned task.
///
/// The whole connection is bounded by max(read_timeout, write_timeout)
/// so a stalled client cannot hold a slot forever. The connection slot is
/// released when the task ends.
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout_duration = connection_timeout(&state);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(peer = %peer_addr, "Failed to serve connection: {err}"),
            Err(_) => warn!(
                peer = %peer_addr,
                "Connection timeout after {} seconds",
                timeout_duration.as_secs()
            ),
        }

        state.release_connection();
    });
}

fn connection_timeout(state: &AppState) -> Duration {
    let perf = &state.config.performance;
    Duration::from_secs(perf.read_timeout.max(perf.write_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_connection_timeout_uses_larger_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.root = dir.path().to_string_lossy().into_owned();
        config.performance.read_timeout = 5;
        config.performance.write_timeout = 12;
        let state = AppState::new(config).unwrap();
        assert_eq!(connection_timeout(&state), Duration::from_secs(12));
    }
}
