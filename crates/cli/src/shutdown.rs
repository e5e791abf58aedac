use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Listens for SIGINT/SIGTERM and cancels the token so a running
/// migration stops at the next record boundary.
pub fn register_handlers(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install SIGINT handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), stopping at the next record boundary");
            }
            _ = terminate => {
                info!("Received SIGTERM, stopping at the next record boundary");
            }
        }

        cancel_token.cancel();
    });
}
