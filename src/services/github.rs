// src/services/github.rs
//! GitHub OAuth adapter
//!
//! GitHub profiles do not reliably carry an email, so the adapter performs
//! a secondary /user/emails fetch and accepts only the primary verified
//! entry.

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::oauth::{display_name_from_email, NormalizedIdentity, OAuthProviderConfig, ProviderError};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";

const SCOPES: &str = "read:user user:email";

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// GitHub OAuth adapter. Immutable credentials only; per-request values
/// are always arguments.
#[derive(Clone)]
pub struct GithubService {
    http: Client,
    config: OAuthProviderConfig,
}

impl GithubService {
    pub fn new(http: Client, config: OAuthProviderConfig) -> Self {
        Self { http, config }
    }

    /// Authorization URL carrying the signed CSRF state as `state`
    pub fn build_auth_url(&self, state_token: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}&allow_signup=true",
            AUTHORIZE_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state_token),
        )
    }

    /// Exchanges the callback code, then runs the two-step profile fetch
    pub async fn handle_callback(&self, code: &str) -> Result<NormalizedIdentity, ProviderError> {
        let access_token = self.exchange_code(code).await?;
        let user = self.fetch_user(&access_token).await?;
        let email = self.fetch_primary_email(&access_token).await?;

        let id = match user.id {
            Some(id) => id.to_string(),
            None => {
                return Err(ProviderError::IncompleteProfile(
                    "incomplete user data from GitHub".to_string(),
                ))
            }
        };

        let name = user
            .name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| display_name_from_email(&email));

        Ok(NormalizedIdentity {
            provider_account_id: id,
            email,
            name,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                http_status = %response.status(),
                "GitHub rejected the authorization code"
            );
            return Err(ProviderError::TokenRejected);
        }

        let tokens: GithubTokenResponse = response.json().await?;
        tokens.access_token.ok_or(ProviderError::TokenRejected)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GithubUser, ProviderError> {
        let response = self
            .http
            .get(USER_URL)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                http_status = %response.status(),
                "GitHub user request rejected"
            );
            return Err(ProviderError::TokenRejected);
        }

        let user: GithubUser = response.json().await?;
        debug!(provider = "github", "Fetched GitHub user profile");

        Ok(user)
    }

    async fn fetch_primary_email(&self, access_token: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(EMAILS_URL)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                http_status = %response.status(),
                "GitHub emails request rejected"
            );
            return Err(ProviderError::TokenRejected);
        }

        let emails: Vec<GithubEmail> = response.json().await?;

        select_verified_primary(&emails)
            .map(|entry| entry.email.clone())
            .ok_or(ProviderError::NoVerifiedEmail)
    }
}

fn select_verified_primary(emails: &[GithubEmail]) -> Option<&GithubEmail> {
    emails.iter().find(|entry| entry.primary && entry.verified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(addr: &str, primary: bool, verified: bool) -> GithubEmail {
        GithubEmail {
            email: addr.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn test_select_verified_primary() {
        let emails = vec![
            email("old@example.com", false, true),
            email("alice@example.com", true, true),
        ];

        let selected = select_verified_primary(&emails).unwrap();
        assert_eq!(selected.email, "alice@example.com");
    }

    #[test]
    fn test_primary_but_unverified_is_skipped() {
        let emails = vec![
            email("alice@example.com", true, false),
            email("side@example.com", false, true),
        ];

        assert!(select_verified_primary(&emails).is_none());
    }

    #[test]
    fn test_empty_email_list() {
        assert!(select_verified_primary(&[]).is_none());
    }

    #[test]
    fn test_auth_url_embeds_state_and_scopes() {
        let service = GithubService::new(
            Client::new(),
            OAuthProviderConfig {
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "http://localhost:2000/api/auth/github/callback".to_string(),
            },
        );

        let url = service.build_auth_url("signed-state-token");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("state=signed-state-token"));
        assert!(url.contains("scope=read%3Auser%20user%3Aemail"));
        assert!(!url.contains("secret"));
    }
}
