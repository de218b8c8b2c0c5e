use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Liveness routes. Neither probes downstream services.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/", get(root)).route("/health", get(health))
}

pub async fn root() -> (StatusCode, &'static str) {
    (StatusCode::OK, "claimdesk is running")
}

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            service: "claimdesk-server",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
