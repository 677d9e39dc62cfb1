//! Identity collaborator boundary.
//!
//! Authentication itself is external: an identity provider issues bearer
//! tokens. This module only verifies them and yields the stable user id
//! that scopes every catalog and ledger query.

use crate::errors::ServiceError;
use crate::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

/// The verified caller. All service calls are scoped by `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// Verifies a bearer token and extracts the user id it was issued for.
pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ServiceError::Unauthorized("token subject is not a user id".to_string()))
}

/// Issues a token for `user_id`. Used by tests and local tooling; in
/// production the identity provider signs tokens with the shared secret.
pub fn issue_token(secret: &str, user_id: Uuid, ttl_secs: u64) -> Result<String, ServiceError> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + ttl_secs as usize,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to issue token: {}", e)))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("missing Authorization header".to_string())
            })?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ServiceError::Unauthorized("Authorization header is not a bearer token".to_string())
        })?;

        let id = verify_token(&state.config.jwt_secret, token)?;
        Ok(AuthenticatedUser { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "a_sufficiently_long_test_secret_value_0123456789";

    #[test]
    fn issued_tokens_verify_back_to_the_same_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, 3600).expect("issue");
        let verified = verify_token(SECRET, &token).expect("verify");
        assert_eq!(verified, user_id);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = issue_token("another_secret_that_is_also_long_enough_000", Uuid::new_v4(), 3600)
            .expect("issue");
        assert_matches!(
            verify_token(SECRET, &token),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert_matches!(
            verify_token(SECRET, "not-a-token"),
            Err(ServiceError::Unauthorized(_))
        );
    }
}
