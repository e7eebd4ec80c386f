// src/services/oauth.rs
//! Shared types for the OAuth provider adapters

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::error;

use crate::common::ApiError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authorization code is missing")]
    MissingCode,

    #[error("provider rejected the authorization code")]
    TokenRejected,

    #[error("{0}")]
    IncompleteProfile(String),

    #[error("no verified primary email")]
    NoVerifiedEmail,

    #[error("provider request failed")]
    Network(#[from] reqwest::Error),
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCode | ProviderError::TokenRejected => {
                ApiError::Unauthorized(err.to_string())
            }
            ProviderError::IncompleteProfile(_) | ProviderError::NoVerifiedEmail => {
                ApiError::BadRequest(err.to_string())
            }
            ProviderError::Network(e) if e.is_decode() => {
                error!(error = %e, "Identity provider returned an unreadable body");
                ApiError::BadRequest("malformed provider profile".to_string())
            }
            ProviderError::Network(e) => {
                // Timeouts land here too; callers may retry, we never do
                error!(error = %e, "HTTP error contacting identity provider");
                ApiError::InternalServer("provider request failed".to_string())
            }
        }
    }
}

/// OAuth application credentials for a single provider
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthProviderConfig {
    /// Reads `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET` and
    /// `<PREFIX>_REDIRECT_URI`. Returns None when any of them is absent,
    /// which marks the provider as not configured.
    pub fn from_env(prefix: &str) -> Option<Self> {
        let client_id = env::var(format!("{}_CLIENT_ID", prefix)).ok()?;
        let client_secret = env::var(format!("{}_CLIENT_SECRET", prefix)).ok()?;
        let redirect_uri = env::var(format!("{}_REDIRECT_URI", prefix)).ok()?;

        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

/// Canonical identity shape every provider callback normalizes into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedIdentity {
    pub provider_account_id: String,
    pub email: String,
    pub name: String,
}

/// Fallback display name when the provider profile has none:
/// the local part of the email address.
pub fn display_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
