use crate::api::middleware::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use astra_core::UserRecord;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total_files: usize,
    pub total_storage_bytes: u64,
    pub ai_queries_count: usize,
    pub recent_uploads: usize,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub full_name: String,
    pub joined_at: DateTime<Utc>,
    pub stats: UserStats,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// GET /api/users/profile
///
/// A bearer token selects the account; without one, the most recently
/// registered account is shown (reference wire behavior for the demo
/// frontend). Stats are aggregated live from the registry and chat store.
#[tracing::instrument(skip(state, auth))]
pub async fn profile(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
) -> Result<Json<UserProfile>, ApiError> {
    let user: UserRecord = match auth {
        Some(auth) => state
            .users
            .find(&auth.0.sub)
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?,
        None => state
            .users
            .latest_registered()
            .ok_or_else(|| ApiError::NotFound("No registered users".to_string()))?,
    };

    let stats = UserStats {
        total_files: state.registry.count().await,
        total_storage_bytes: state.registry.total_bytes().await,
        ai_queries_count: state.chat.user_query_count(&user.email),
        recent_uploads: state.registry.recent_uploads(chrono::Duration::days(7)).await,
    };

    Ok(Json(UserProfile {
        email: user.email,
        full_name: user.name,
        joined_at: user.joined_at,
        stats,
    }))
}

/// PUT /api/users/profile
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = auth.0.sub;

    let record = match req.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => state
            .users
            .update_name(&email, name)
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?,
        None => state
            .users
            .find(&email)
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?,
    };

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "email": record.email,
        "full_name": record.name,
    })))
}
