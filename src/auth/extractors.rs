//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated client extractor
///
/// Validates the session JWT (Bearer header or authToken cookie) and
/// confirms the client still exists before the handler runs.
#[derive(Debug)]
pub struct AuthedClient {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedClient
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let token = match bearer_token(parts).or_else(|| cookie_token(parts)) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: no session token supplied");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        let claims = app_state.session_tokens.verify(&token)?;

        let client = app_state.store.get_client_by_id(&claims.sub).await?;
        match client {
            Some(c) => {
                debug!(
                    client_id = %c.id,
                    email = %safe_email_log(&c.email),
                    "Client authentication successful via extractor"
                );
                Ok(AuthedClient {
                    id: c.id,
                    email: c.email,
                })
            }
            None => {
                warn!(client_id = %claims.sub, "Authentication failed: client not found");
                Err(ApiError::Unauthorized("client not found".into()))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    Some(token.to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("authToken=").map(str::to_string))
}
