//! Token service: HS256 access tokens plus argon2id password hashing.
//!
//! Tokens are stateless — validity is signature + expiry only, there is no
//! revocation list. `refresh` issues a new token without invalidating the old
//! one; the old token stays valid until its own expiry.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Claims embedded in an access token. `sub` is the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Hash a password using argon2id with a generated salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Create an access token for `subject` expiring `ttl_secs` from now.
pub fn issue_token(subject: &str, ttl_secs: i64, secret: &str) -> Result<String, AuthError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Validate an access token and return its claims.
///
/// Expiry is exact (no leeway): a token is rejected at or after `exp`.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken,
    })?;

    if data.claims.sub.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(data.claims)
}

/// Validate `token`, then issue a fresh token for the same subject.
pub fn refresh_token(token: &str, ttl_secs: i64, secret: &str) -> Result<String, AuthError> {
    let claims = validate_token(token, secret)?;
    issue_token(&claims.sub, ttl_secs, secret)
}
