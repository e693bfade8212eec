use std::sync::Arc;
use std::time::Duration;

use savefile_server::config::{self, AppState, Config};
use savefile_server::{logger, server};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    // Optional first argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Create Tokio runtime, thread count from `server.workers`
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), BoxError> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(AppState::new(cfg)?);
    let listener = server::create_listener(addr)?;

    logger::log_server_start(&addr, &state.config, state.root.path());

    server::start_server_loop(
        listener,
        Arc::clone(&state),
        server::signal::shutdown_signal(),
    )
    .await;

    let perf = &state.config.performance;
    let grace = Duration::from_secs(perf.read_timeout.max(perf.write_timeout));
    server::drain_connections(&state, grace).await;
    Ok(())
}
