use crate::api::models::AppState;
use crate::api::books::handlers::{get_books_handler, invoke_handler};
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(get_books_handler))
        .route("/invoke", post(invoke_handler))
}
