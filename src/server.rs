use std::net::SocketAddr;

use log::LevelFilter;
use simple_logger::SimpleLogger;

use crate::{api, state::SharedState};

/// Logs at the level named by `RUST_LOG`, `info` when unset or unknown.
pub fn init_logging() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Logger already initialised: {e}");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("Shutdown signal received");
}

pub async fn serve(state: SharedState) -> Result<(), warp::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let routes = api::routes(state);

    let (addr, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown_signal())?;
    log::info!("Listening on {addr}");

    server.await;
    log::info!("Server stopped");
    Ok(())
}
