//! OS signal handling.

use crate::lifecycle::shutdown::Shutdown;

/// Resolve on Ctrl+C, or SIGTERM on unix.
pub async fn terminate() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}

/// Wait for a termination signal and broadcast shutdown.
pub async fn trigger_on_signal(shutdown: &Shutdown) {
    terminate().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}
