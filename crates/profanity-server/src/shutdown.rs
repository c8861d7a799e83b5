//! Graceful shutdown on SIGTERM / SIGINT.

use tracing::{info, warn};

/// Resolves once the process receives SIGTERM or SIGINT (Ctrl-C elsewhere).
///
/// Passed to `axum::serve(..).with_graceful_shutdown`, which then stops
/// accepting connections and drains in-flight requests.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Shutdown signal received (SIGTERM)"),
                    _ = sigint.recv() => info!("Shutdown signal received (SIGINT)"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers, falling back to Ctrl-C");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received (Ctrl-C)"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C, shutdown only by termination");
            std::future::pending::<()>().await;
        }
    }
}
