use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Owner;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
}

/// Caller identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(Owner),
    Anonymous,
}

impl Identity {
    /// The owner for scoped operations, or `Unauthorized`.
    pub fn require_owner(&self) -> Result<&Owner, AppError> {
        match self {
            Identity::Authenticated(owner) => Ok(owner),
            Identity::Anonymous => Err(AppError::Unauthorized),
        }
    }
}

/// Display-safe owner label: the username claim when present, otherwise a
/// short prefix of the user id.
pub fn owner_handle(user_id: Uuid, preferred_username: Option<&str>) -> String {
    match preferred_username.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("user-{}", &user_id.simple().to_string()[..8]),
    }
}

/// HS256 bearer-token verification against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Resolve an `Authorization` header value. Missing or unusable tokens
    /// resolve to `Anonymous`.
    pub fn resolve(&self, authorization: Option<&str>) -> Identity {
        let Some(token) = authorization.and_then(|h| h.strip_prefix("Bearer ")) else {
            return Identity::Anonymous;
        };

        let claims = match decode::<Claims>(token.trim(), &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                warn!("Rejected bearer token: {}", e);
                return Identity::Anonymous;
            }
        };

        match Uuid::parse_str(&claims.sub) {
            Ok(user_id) => Identity::Authenticated(Owner {
                user_id,
                handle: owner_handle(user_id, claims.preferred_username.as_deref()),
            }),
            Err(_) => {
                warn!("Bearer token subject is not a user id: {}", claims.sub);
                Identity::Anonymous
            }
        }
    }

    pub fn issue_token(
        &self,
        user_id: Uuid,
        preferred_username: Option<&str>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp().max(0) as usize,
            preferred_username: preferred_username.map(str::to_string),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Persistence(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Ok(state.tokens.resolve(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_token_resolves_owner() {
        let verifier = TokenVerifier::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = verifier.issue_token(user_id, Some("aurelia"), Duration::hours(1)).unwrap();

        let identity = verifier.resolve(Some(&format!("Bearer {}", token)));
        assert_eq!(
            identity,
            Identity::Authenticated(Owner { user_id, handle: "aurelia".to_string() })
        );
    }

    #[test]
    fn test_wrong_secret_or_missing_header_is_anonymous() {
        let issuer = TokenVerifier::new("one");
        let verifier = TokenVerifier::new("two");
        let token = issuer.issue_token(Uuid::new_v4(), None, Duration::hours(1)).unwrap();

        assert_eq!(verifier.resolve(Some(&format!("Bearer {}", token))), Identity::Anonymous);
        assert_eq!(verifier.resolve(None), Identity::Anonymous);
        assert_eq!(verifier.resolve(Some("Basic abc")), Identity::Anonymous);
    }

    #[test]
    fn test_expired_token_is_anonymous() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier
            .issue_token(Uuid::new_v4(), None, Duration::hours(-2))
            .unwrap();
        assert_eq!(verifier.resolve(Some(&format!("Bearer {}", token))), Identity::Anonymous);
    }

    #[test]
    fn test_handle_falls_back_to_id_prefix() {
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        assert_eq!(owner_handle(id, None), "user-1b4e28ba");
        assert_eq!(owner_handle(id, Some("  ")), "user-1b4e28ba");
        assert_eq!(owner_handle(id, Some("midas")), "midas");
    }

    #[test]
    fn test_anonymous_cannot_own() {
        assert!(matches!(Identity::Anonymous.require_owner(), Err(AppError::Unauthorized)));
    }
}
