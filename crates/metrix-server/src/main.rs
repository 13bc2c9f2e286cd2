//! Metrix collector.
//!
//! - JSON and URL-form metric updates, single and batched
//! - Value lookups and an HTML summary
//! - Memory or database storage, picked from config

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use metrix_core::error::{MetrixError, Result};
use metrix_server::{app_state, config, router};

const DEFAULT_CONFIG: &str = "metrix-server.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| MetrixError::Config(format!("server.listen must be a socket address: {e}")))?;

    let state = app_state::AppState::new(&cfg).await?;
    let app = router::build_router(state);

    info!(%listen, config = %path, "metrix-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MetrixError::Internal(format!("bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MetrixError::Internal(format!("server failed: {e}")))?;

    info!("metrix-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(err = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(err = %e, "SIGTERM handler unavailable");
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
    info!("shutdown signal received");
}
