pub mod books;
pub mod models;

// Re-exports
pub use models::*;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

pub async fn health_handler(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let store = state.lookup.store();
    Json(models::HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: store.backend().to_string(),
        table: store.table_name().to_string(),
        variant: state.lookup.variant().to_string(),
    })
}

/// Builds the full router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(books::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
