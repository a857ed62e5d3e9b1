//! Credential resolution at the session boundary
//!
//! Tokens are issued by the external identity service; this module only
//! validates them and extracts the identity and role bound to a session.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use staffdesk_shared::{AuthUser, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried by identity-service tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity)
    pub sub: Uuid,
    /// Role derived from the identity
    pub role: Role,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Resolve an identity from a presented credential.
///
/// Fails with `AUTHENTICATION_ERROR` when the token is missing, expired,
/// malformed or signed with the wrong key.
pub fn resolve_identity(token: &str, secret: &str) -> Result<AuthUser, ApiError> {
    // Explicit algorithm prevents algorithm confusion attacks
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!(error = ?e, "Credential validation failed");
        ApiError::Unauthenticated
    })?;

    Ok(AuthUser::new(data.claims.sub, data.claims.role))
}

/// Bearer-token middleware for the REST backfill routes; inserts
/// [`AuthUser`] as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let user = resolve_identity(token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    pub fn issue_token(identity: Uuid, role: Role, secret: &str) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: identity,
            role,
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }
}
