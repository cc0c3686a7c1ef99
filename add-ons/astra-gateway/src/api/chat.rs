use crate::api::middleware::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use astra_core::{ChatMessage, MultiFileAnalysis};
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;

/// History key for messages sent without a bearer token.
const ANONYMOUS_IDENTITY: &str = "anonymous";

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub content: String,
    #[serde(default)]
    pub file_context: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatAnalyzeRequest {
    pub file_ids: Vec<String>,
    pub query: String,
}

/// POST /api/chat/message
///
/// The resolver is total: provider outages degrade to canned responses, so
/// this handler never fails for a non-empty utterance.
#[tracing::instrument(skip(state, auth, req))]
pub async fn send_message(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("Message content must not be empty".to_string()));
    }

    let identity = auth
        .map(|a| a.0.sub)
        .unwrap_or_else(|| ANONYMOUS_IDENTITY.to_string());
    let file_hint_count = req.file_context.as_ref().map(|files| files.len());

    // Provider calls run before any session-store writes, so no lock is
    // held while a request is in flight.
    let reply = state.resolver.resolve(&req.content, file_hint_count).await;

    state.chat.append(&identity, ChatMessage::user(req.content));
    state.chat.append(&identity, reply.clone());

    Ok(Json(reply))
}

/// GET /api/chat/history
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<serde_json::Value> {
    Json(json!({ "messages": state.chat.history(&auth.0.sub) }))
}

/// DELETE /api/chat/history
#[tracing::instrument(skip(state, auth))]
pub async fn clear_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<serde_json::Value> {
    state.chat.clear(&auth.0.sub);
    Json(json!({ "message": "Chat history cleared" }))
}

/// POST /api/chat/analyze
#[tracing::instrument(skip(state, _auth, req))]
pub async fn analyze(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<ChatAnalyzeRequest>,
) -> Result<Json<MultiFileAnalysis>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::Validation("Query must not be empty".to_string()));
    }
    let analysis = state.resolver.analyze_files(&req.file_ids, &req.query).await;
    Ok(Json(analysis))
}
