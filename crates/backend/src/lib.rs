//! HTTP health-check service.
//!
//! Serves `GET /api/health` behind a configurable cross-origin policy that
//! defaults to allowing any origin, method and header with credentials.

pub mod config;
pub mod cors;
pub mod error;
pub mod routes;

use std::future::Future;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use config::CorsConfig;
use error::ServerError;

/// Creates the Axum application router with the CORS policy installed.
pub fn create_app(cors: &CorsConfig) -> Router {
    let router = Router::new().route("/api/health", get(routes::health::check));

    cors::apply(router, cors).layer(TraceLayer::new_for_http())
}

/// Binds `addr` for [`serve`].
pub async fn bind(addr: &str) -> error::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))
}

/// Serves `app` on `listener` until `shutdown` resolves, then drains
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> error::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "starting API server");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}
