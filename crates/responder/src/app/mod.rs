//! HTTP surface. Only the health probe is served here; flora reads go over the
//! broker.

use std::sync::Arc;

use axum::{Extension, Json, Router, http::StatusCode, response::IntoResponse, routing::get};

use flora_infra::HealthCheck;

pub const HEALTH_PATH: &str = "/actuator/health";

/// Build the router around a shared health check.
pub fn build_app(health: Arc<dyn HealthCheck>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_report))
        .layer(Extension(health))
}

async fn health_report(Extension(health): Extension<Arc<dyn HealthCheck>>) -> impl IntoResponse {
    let report = health.report().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}
