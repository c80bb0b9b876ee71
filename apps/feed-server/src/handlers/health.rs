//! Health check endpoint.

use actix_web::{HttpResponse, web};

use feed_core::ports::StoreHealth;
use feed_shared::dto::HealthResponse;

use crate::state::AppState;

/// Health check endpoint - reports whether the store accepts writes.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = match state.posts.health() {
        StoreHealth::Healthy => HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: "healthy".to_string(),
            detail: None,
        },
        StoreHealth::Degraded(reason) => HealthResponse {
            status: "degraded".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: "read-only".to_string(),
            detail: Some(reason),
        },
    };

    HttpResponse::Ok().json(response)
}
