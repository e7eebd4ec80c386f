// src/services/google.rs
//! Google OAuth adapter: authorize URL, code exchange, profile fetch

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::oauth::{display_name_from_email, NormalizedIdentity, OAuthProviderConfig, ProviderError};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

// Minimum scopes to read email + profile
const SCOPES: &str = "https://www.googleapis.com/auth/userinfo.email \
                      https://www.googleapis.com/auth/userinfo.profile";

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

/// Google OAuth adapter. Holds only immutable app credentials and the
/// shared HTTP client; every per-request value is passed as an argument.
#[derive(Clone)]
pub struct GoogleService {
    http: Client,
    config: OAuthProviderConfig,
}

impl GoogleService {
    pub fn new(http: Client, config: OAuthProviderConfig) -> Self {
        Self { http, config }
    }

    /// Authorization URL carrying the signed CSRF state as `state`
    pub fn build_auth_url(&self, state_token: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state_token),
        )
    }

    /// Exchanges the callback code and normalizes the Google profile
    pub async fn handle_callback(&self, code: &str) -> Result<NormalizedIdentity, ProviderError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_profile(&access_token).await
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                http_status = %response.status(),
                "Google rejected the authorization code"
            );
            return Err(ProviderError::TokenRejected);
        }

        let tokens: GoogleTokenResponse = response.json().await?;
        tokens.access_token.ok_or(ProviderError::TokenRejected)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<NormalizedIdentity, ProviderError> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                http_status = %response.status(),
                "Google userinfo request rejected"
            );
            return Err(ProviderError::TokenRejected);
        }

        let profile: GoogleProfile = response.json().await?;
        debug!(provider = "google", "Fetched Google user profile");

        normalize_profile(profile)
    }
}

fn normalize_profile(profile: GoogleProfile) -> Result<NormalizedIdentity, ProviderError> {
    let id = profile.id.filter(|s| !s.is_empty());
    let email = profile.email.filter(|s| !s.is_empty());

    let (id, email) = match (id, email) {
        (Some(id), Some(email)) => (id, email),
        _ => {
            return Err(ProviderError::IncompleteProfile(
                "incomplete user data from Google".to_string(),
            ))
        }
    };

    let name = profile
        .name
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| display_name_from_email(&email));

    Ok(NormalizedIdentity {
        provider_account_id: id,
        email,
        name,
    })
}
