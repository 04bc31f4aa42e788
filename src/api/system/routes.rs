use crate::api::models::AppState;
use crate::api::system::handlers::{cpu_handler, ok_handler, version_handler};
use axum::{Router, routing::get};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ok", get(ok_handler))
        .route("/version", get(version_handler))
        .route("/cpu", get(cpu_handler))
}
