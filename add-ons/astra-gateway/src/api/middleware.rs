use crate::error::ApiError;
use crate::state::AppState;
use astra_core::{validate_token, Claims};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Extractor that validates a JWT Bearer token and provides the claims.
/// Use `Option<AuthUser>` where unauthenticated access is allowed.
/// All validation failures collapse to 401.
#[derive(Debug)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
        let claims = validate_token(token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;
        Ok(AuthUser(claims))
    }
}

/// Raw bearer token, unvalidated. Used by the refresh endpoint, which
/// validates the token itself as part of re-issuing it.
#[derive(Debug)]
pub struct BearerToken(pub String);

#[async_trait]
impl FromRequestParts<AppState> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(|t| BearerToken(t.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
