// src/services/tokens.rs
//! Session JWT issuance and response sanitization

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::auth::models::{Client, ClientView};
use crate::common::ApiError;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token generation failed")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token")]
    Invalid,
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => ApiError::InternalServer(err.to_string()),
            TokenError::Invalid => ApiError::Unauthorized(err.to_string()),
        }
    }
}

/// Session JWT claims: the client id in `sub` plus the email
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

/// Signs session tokens with the primary secret and strips sensitive
/// fields from client records before they leave the core.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, client: &Client) -> Result<String, TokenError> {
        let exp = (Utc::now() + self.ttl).timestamp() as usize;
        let claims = SessionClaims {
            sub: client.id.clone(),
            email: client.email.clone(),
            exp,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            warn!(error = %e, "Session token validation failed");
            TokenError::Invalid
        })?;

        Ok(data.claims)
    }

    /// The only path a client record takes toward a response body.
    pub fn sanitize(&self, client: Client) -> ClientView {
        ClientView::from(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{PasswordState, PlanType};

    fn test_client() -> Client {
        Client {
            id: "C_TEST01".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password: PasswordState::Hash("$2b$04$fakefakefakefakefake".to_string()),
            plan: PlanType::Free,
            created_at: "2025-01-01 00:00:00".to_string(),
            updated_at: "2025-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = TokenIssuer::new("session-test-secret", Duration::days(1));
        let token = issuer.issue(&test_client()).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, "C_TEST01");
        assert_eq!(claims.email, "alice@example.com");
    }

    #[test]
    fn test_verify_fails_with_wrong_secret() {
        let issuer = TokenIssuer::new("session-test-secret", Duration::days(1));
        let other = TokenIssuer::new("some-other-secret", Duration::days(1));
        let token = issuer.issue(&test_client()).unwrap();

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_sanitize_drops_password() {
        let issuer = TokenIssuer::new("session-test-secret", Duration::days(1));
        let view = issuer.sanitize(test_client());
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "alice@example.com");
    }
}
