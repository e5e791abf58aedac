pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;

pub use routes::{AppState, create_routes};

/// Binds the listener and serves the control API until the process exits.
pub async fn serve(addr: std::net::SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Control API listening");
    axum::serve(listener, create_routes(state)).await
}
