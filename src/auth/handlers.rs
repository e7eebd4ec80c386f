//! Authentication handlers

use axum::extract::{Extension, Json, Query};
use axum::http::{header::SET_COOKIE, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::extractors::AuthedClient;
use super::models::{
    LoginRequest, OAuthCallbackParams, PlanType, Provider, RegisterRequest, RegistrationRequest,
};
use crate::common::{safe_email_log, ApiError, AppState, Validator};
use crate::services::{GithubService, GoogleService, NormalizedIdentity, ProviderError};

/// Session cookie lifetime (seven days), independent of the JWT expiry
const SESSION_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Renders the `Set-Cookie` value carrying the session token.
/// HttpOnly always; Secure only outside local development.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "authToken={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        token, SESSION_COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /api/auth/login
/// Authenticates a client with local credentials
///
/// # Request Body
/// ```json
/// {
///   "email": "alice@example.com",
///   "password": "..."
/// }
/// ```
pub async fn login_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = payload.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    info!(email = %safe_email_log(&payload.email), "🔐 Local login attempt");

    let response = state.auth.login(payload).await?;
    let cookie = session_cookie(&response.token, state.secure_cookies);

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(response)))
}

/// POST /api/auth/register
/// Registers a client with local credentials; responds 201 on success
pub async fn register_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = payload.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    info!(email = %safe_email_log(&payload.email), "Local registration attempt");

    let response = state
        .auth
        .register(RegistrationRequest {
            email: payload.email,
            name: payload.name,
            password: Some(payload.password),
            provider: Provider::Local,
            provider_account_id: None,
            plan: payload.plan.unwrap_or_default(),
        })
        .await?;

    let cookie = session_cookie(&response.token, state.secure_cookies);

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(response),
    ))
}

/// GET /api/auth/google - start the Google OAuth flow
pub async fn google_oauth_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Redirect, ApiError> {
    let state = state_lock.read().await.clone();
    let config = state.google.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("google oauth is not configured".to_string())
    })?;

    let service = GoogleService::new(state.http.clone(), config);
    let state_token = state.state_tokens.issue()?;
    let auth_url = service.build_auth_url(&state_token);

    info!("Redirecting to Google authorization endpoint");
    Ok(Redirect::to(&auth_url))
}

/// GET /api/auth/google/callback
/// Verifies the CSRF state, exchanges the code, reconciles the identity,
/// sets the session cookie and redirects to the front end
pub async fn google_oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();
    let config = state.google.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("google oauth is not configured".to_string())
    })?;

    if let Some(err) = params.error.as_deref() {
        warn!(oauth_error = %err, provider = "google", "Provider returned an error on callback");
        return Err(ApiError::Unauthorized(
            "provider authorization was denied".to_string(),
        ));
    }

    // State first: an unverified callback is not worth a provider round trip
    state
        .state_tokens
        .verify(params.state.as_deref().unwrap_or_default())?;

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ProviderError::MissingCode)?;

    let service = GoogleService::new(state.http.clone(), config);
    let identity = service.handle_callback(code).await?;

    complete_oauth_login(&state, Provider::Google, identity).await
}

/// GET /api/auth/github - start the GitHub OAuth flow
pub async fn github_oauth_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Redirect, ApiError> {
    let state = state_lock.read().await.clone();
    let config = state.github.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("github oauth is not configured".to_string())
    })?;

    let service = GithubService::new(state.http.clone(), config);
    let state_token = state.state_tokens.issue()?;
    let auth_url = service.build_auth_url(&state_token);

    info!("Redirecting to GitHub authorization endpoint");
    Ok(Redirect::to(&auth_url))
}

/// GET /api/auth/github/callback
pub async fn github_oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();
    let config = state.github.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("github oauth is not configured".to_string())
    })?;

    if let Some(err) = params.error.as_deref() {
        warn!(oauth_error = %err, provider = "github", "Provider returned an error on callback");
        return Err(ApiError::Unauthorized(
            "provider authorization was denied".to_string(),
        ));
    }

    state
        .state_tokens
        .verify(params.state.as_deref().unwrap_or_default())?;

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ProviderError::MissingCode)?;

    let service = GithubService::new(state.http.clone(), config);
    let identity = service.handle_callback(code).await?;

    complete_oauth_login(&state, Provider::Github, identity).await
}

/// Common tail of both OAuth callbacks: reconcile the normalized identity,
/// set the session cookie and send the client home
async fn complete_oauth_login(
    state: &AppState,
    provider: Provider,
    identity: NormalizedIdentity,
) -> Result<Response, ApiError> {
    let response = state
        .auth
        .register(RegistrationRequest {
            email: identity.email,
            name: identity.name,
            password: None,
            provider,
            provider_account_id: Some(identity.provider_account_id),
            plan: PlanType::Free,
        })
        .await?;

    info!(
        client_id = %response.client.id,
        provider = %provider,
        is_new_user = response.is_new_user,
        "OAuth login completed"
    );

    let cookie = session_cookie(&response.token, state.secure_cookies);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to(&state.frontend_url),
    )
        .into_response())
}

/// GET /api/me
/// Returns the current authenticated client
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedClient,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let client = state
        .store
        .get_client_by_id(&authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("client not found".to_string()))?;

    let view = state.session_tokens.sanitize(client);
    Ok(Json(serde_json::json!({ "client": view })))
}

/// POST /api/auth/logout
/// Sessions are stateless JWTs, so logout is client-side token removal;
/// this endpoint only acknowledges the request
pub async fn logout_handler(_authed: AuthedClient) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Client logout acknowledged");
    Ok(Json(serde_json::json!({ "message": "logout successful" })))
}
