pub mod auth;
pub mod chat;
pub mod files;
pub mod middleware;
pub mod users;

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// GET / -- service banner
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Astra Space Research AI Platform API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub fn build_router(state: AppState) -> Router {
    // Dev frontends only; bearer auth does not need CORS credentials.
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse::<HeaderValue>().expect("static origin"),
            "http://localhost:5173".parse::<HeaderValue>().expect("static origin"),
        ])
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave headroom above the registry's own limit for multipart framing;
    // the registry check is the one that produces the 413 contract.
    let body_limit = state.config.max_file_size + 64 * 1024;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
        .route("/api/files", get(files::list_files))
        .route("/api/files/upload", post(files::upload))
        .route("/api/files/:id", get(files::file_info).delete(files::delete_file))
        .route("/api/files/:id/download", get(files::download))
        .route("/api/files/:id/analyze", post(files::analyze))
        .route("/api/chat/message", post(chat::send_message))
        .route("/api/chat/history", get(chat::history).delete(chat::clear_history))
        .route("/api/chat/analyze", post(chat::analyze))
        .route("/api/users/profile", get(users::profile).put(users::update_profile))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
