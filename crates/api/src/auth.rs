//! JWT issuance, verification and request extractors.
//!
//! Tokens are HS256-signed and carry a `token_type` claim: `x-access`
//! tokens authenticate API calls, `x-refresh` tokens are only accepted
//! by the refresh endpoint. Extractors pull the bearer token from the
//! `Authorization` header and turn its claims into a [`Caller`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use common::{Role, User};
use domain::Caller;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use store::{OrderStore, UserStore};

use crate::AppState;
use crate::error::ApiError;

/// Token type claim for API-call tokens.
pub const TOKEN_TYPE_ACCESS: &str = "x-access";

/// Token type claim for refresh tokens.
pub const TOKEN_TYPE_REFRESH: &str = "x-refresh";

/// Claims stored in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (subject).
    pub sub: String,
    /// User role name.
    pub role: String,
    /// Token type, `x-access` or `x-refresh`.
    pub token_type: String,
    /// Expiry timestamp.
    pub exp: i64,
    /// Issued-at timestamp.
    pub iat: i64,
}

impl Claims {
    /// Turns the claims into an authenticated caller.
    fn to_caller(&self) -> Result<Caller, ApiError> {
        let user_id = self
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::Unauthorized("malformed token subject".to_string()))?;
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::Unauthorized("malformed token role".to_string()))?;
        Ok(Caller {
            user_id: user_id.into(),
            role,
        })
    }
}

/// Access and refresh tokens issued together at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing and verification keys plus token lifetimes.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthKeys {
    /// Builds the key pair from a shared secret.
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Issues a fresh access + refresh token pair for a user.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.issue(user, TOKEN_TYPE_ACCESS, self.access_ttl)?,
            refresh_token: self.issue(user, TOKEN_TYPE_REFRESH, self.refresh_ttl)?,
        })
    }

    fn issue(&self, user: &User, token_type: &str, ttl: Duration) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            token_type: token_type.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verifies a token's signature, expiry and type.
    pub fn verify(&self, token: &str, expected_type: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))?;

        if data.claims.token_type != expected_type {
            return Err(ApiError::Unauthorized(format!(
                "wrong token type: expected {expected_type}"
            )));
        }
        Ok(data.claims)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))
}

/// Any authenticated caller.
pub struct AuthUser(pub Caller);

impl<S> FromRequestParts<Arc<AppState<S>>> for AuthUser
where
    S: OrderStore + UserStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let claims = state.auth.verify(bearer_token(parts)?, TOKEN_TYPE_ACCESS)?;
        Ok(AuthUser(claims.to_caller()?))
    }
}

/// An authenticated caller holding the admin role.
pub struct AdminUser(pub Caller);

impl<S> FromRequestParts<Arc<AppState<S>>> for AdminUser
where
    S: OrderStore + UserStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        if !caller.is_admin() {
            return Err(ApiError::Forbidden("admin role required".to_string()));
        }
        Ok(AdminUser(caller))
    }
}

/// The caller's refresh token claims, for the refresh endpoint only.
pub struct RefreshUser(pub Caller);

impl<S> FromRequestParts<Arc<AppState<S>>> for RefreshUser
where
    S: OrderStore + UserStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let claims = state.auth.verify(bearer_token(parts)?, TOKEN_TYPE_REFRESH)?;
        Ok(RefreshUser(claims.to_caller()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{UserId, Version};

    fn sample_user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(42),
            first_name: "Ada".to_string(),
            last_name: "L".to_string(),
            email: "ada@example.com".to_string(),
            password: "hash".to_string(),
            role,
            is_banned: false,
            created_at: now,
            updated_at: now,
            version: Version::first(),
        }
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = AuthKeys::new("test-secret", 3600, 7200);
        let pair = keys.issue_pair(&sample_user(Role::Customer)).unwrap();

        let claims = keys.verify(&pair.access_token, TOKEN_TYPE_ACCESS).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, "customer");

        let claims = keys.verify(&pair.refresh_token, TOKEN_TYPE_REFRESH).unwrap();
        assert_eq!(claims.token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn refresh_token_is_rejected_as_access() {
        let keys = AuthKeys::new("test-secret", 3600, 7200);
        let pair = keys.issue_pair(&sample_user(Role::Customer)).unwrap();

        assert!(keys.verify(&pair.refresh_token, TOKEN_TYPE_ACCESS).is_err());
        assert!(keys.verify(&pair.access_token, TOKEN_TYPE_REFRESH).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative ttl puts the expiry beyond the validation leeway.
        let keys = AuthKeys::new("test-secret", -300, 7200);
        let pair = keys.issue_pair(&sample_user(Role::Customer)).unwrap();
        assert!(keys.verify(&pair.access_token, TOKEN_TYPE_ACCESS).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let keys = AuthKeys::new("test-secret", 3600, 7200);
        let other = AuthKeys::new("other-secret", 3600, 7200);
        let pair = keys.issue_pair(&sample_user(Role::Admin)).unwrap();
        assert!(other.verify(&pair.access_token, TOKEN_TYPE_ACCESS).is_err());
    }

    #[test]
    fn claims_convert_to_caller() {
        let keys = AuthKeys::new("test-secret", 3600, 7200);
        let pair = keys.issue_pair(&sample_user(Role::Admin)).unwrap();
        let claims = keys.verify(&pair.access_token, TOKEN_TYPE_ACCESS).unwrap();

        let caller = claims.to_caller().unwrap();
        assert_eq!(caller.user_id, UserId::new(42));
        assert!(caller.is_admin());
    }
}
