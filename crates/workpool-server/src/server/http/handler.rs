use super::counter::RequestCounter;
use crate::server::telemetry::increment_http_requests;
use axum::{Router, extract::State, routing::get};
use core::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Simulated per-request work.
pub const REQUEST_DELAY: Duration = Duration::from_millis(100);

/// Builds the router serving the request counter on `GET /`.
pub fn router(counter: RequestCounter) -> Router {
    Router::new().route("/", get(count_request)).with_state(counter)
}

async fn count_request(State(counter): State<RequestCounter>) -> String {
    let count = counter.increment();
    increment_http_requests();
    tokio::time::sleep(REQUEST_DELAY).await;

    #[cfg(feature = "tracing")]
    tracing::info!("Handled request #{count}");

    format!("Hello! Request #{count}\n")
}

/// Serves the request counter on `addr` until `shutdown_token` is cancelled,
/// then lets in-flight requests finish.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    addr: String,
    counter: RequestCounter,
    shutdown_token: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;

    #[cfg(feature = "tracing")]
    tracing::info!("Serving request counter on http://{}", listener.local_addr()?);

    axum::serve(listener, router(counter))
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!("HTTP server stopped");

    Ok(())
}
