use crate::api::middleware::{AuthUser, BearerToken};
use crate::error::ApiError;
use crate::state::AppState;
use astra_core::{hash_password, issue_token, refresh_token, verify_password};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// POST /api/auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !req.email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("Password must not be empty".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    state.users.register(&req.name, &req.email, &password_hash)?;

    let token = issue_token(&req.email, state.config.token_ttl_secs, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// POST /api/auth/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .find(&req.email)
        .ok_or_else(|| ApiError::Unauthorized("Incorrect email or password".to_string()))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Incorrect email or password".to_string()));
    }

    let token = issue_token(&user.email, state.config.token_ttl_secs, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// POST /api/auth/refresh
///
/// Stateless refresh: the old token is not invalidated and stays valid
/// until its own expiry.
#[tracing::instrument(skip(state, bearer))]
pub async fn refresh(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = refresh_token(&bearer.0, state.config.token_ttl_secs, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// GET /api/auth/me
#[tracing::instrument(skip(state, auth))]
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .users
        .find(&auth.0.sub)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(Json(MeResponse {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}
