// src/services/state_token.rs
//! Short-lived CSRF state tokens for OAuth redirects
//!
//! The state token proves a callback originated from a redirect we issued.
//! It is a signed JWT wrapping a random 256-bit nonce, with its own secret
//! and a 5 minute lifetime, both independent of the session token.
//! Verification is stateless: only the signature and expiry are checked.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::common::ApiError;

const STATE_TTL_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum StateTokenError {
    #[error("state token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),

    // One message for every verification failure mode, so a caller probing
    // the endpoint cannot distinguish expired from forged
    #[error("invalid or expired state")]
    Invalid,
}

impl From<StateTokenError> for ApiError {
    fn from(err: StateTokenError) -> Self {
        match err {
            StateTokenError::Signing(_) => ApiError::InternalServer(err.to_string()),
            StateTokenError::Invalid => ApiError::Unauthorized(err.to_string()),
        }
    }
}

/// Claims carried by a state token
#[derive(Debug, Serialize, Deserialize)]
pub struct StateClaims {
    pub csrf: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies CSRF state tokens. No server-side store of issued
/// tokens exists; replay within the TTL window is accepted risk.
#[derive(Clone)]
pub struct StateTokenManager {
    secret: String,
    ttl: Duration,
}

impl StateTokenManager {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::minutes(STATE_TTL_MINUTES),
        }
    }

    /// Override the TTL; used by tests to produce already-expired tokens.
    pub fn with_ttl(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self) -> Result<String, StateTokenError> {
        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);

        let now = Utc::now();
        let claims = StateClaims {
            csrf: hex::encode(nonce),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(StateTokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<StateClaims, StateTokenError> {
        if token.is_empty() {
            warn!("State verification failed: no state parameter supplied");
            return Err(StateTokenError::Invalid);
        }

        // Zero leeway: a 5 minute lifetime should mean 5 minutes
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<StateClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!(error = %e, "State verification failed");
            StateTokenError::Invalid
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let manager = StateTokenManager::new("state-test-secret");
        let token = manager.issue().unwrap();
        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.csrf.len(), 64); // 32 bytes hex-encoded
    }

    #[test]
    fn test_nonces_are_unique() {
        let manager = StateTokenManager::new("state-test-secret");
        let first = manager.verify(&manager.issue().unwrap()).unwrap();
        let second = manager.verify(&manager.issue().unwrap()).unwrap();
        assert_ne!(first.csrf, second.csrf);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager =
            StateTokenManager::with_ttl("state-test-secret", Duration::seconds(-30));
        let token = manager.issue().unwrap();
        assert!(matches!(
            manager.verify(&token),
            Err(StateTokenError::Invalid)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = StateTokenManager::new("state-test-secret");
        let token = manager.issue().unwrap();

        // Flip a single byte of the signature
        let mut tampered: Vec<char> = token.chars().collect();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        assert!(matches!(
            manager.verify(&tampered),
            Err(StateTokenError::Invalid)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = StateTokenManager::new("state-test-secret");
        let verifier = StateTokenManager::new("another-secret");
        let token = issuer.issue().unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(StateTokenError::Invalid)
        ));
    }

    #[test]
    fn test_missing_token_rejected() {
        let manager = StateTokenManager::new("state-test-secret");
        assert!(matches!(manager.verify(""), Err(StateTokenError::Invalid)));
    }
}
