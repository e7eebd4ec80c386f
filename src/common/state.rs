// Application state shared across all modules

use reqwest::Client;
use std::sync::Arc;

use crate::auth::service::AuthService;
use crate::auth::store::ClientStore;
use crate::services::{OAuthProviderConfig, StateTokenManager, TokenIssuer};

/// Application state containing the store, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub http: Client,
    pub frontend_url: String,
    pub secure_cookies: bool,
    pub store: ClientStore,
    pub auth: Arc<AuthService>,
    pub session_tokens: TokenIssuer,
    pub state_tokens: StateTokenManager,
    pub google: Option<OAuthProviderConfig>,
    pub github: Option<OAuthProviderConfig>,
}
