//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/login` - Local credential login
/// - `POST /api/auth/register` - Local registration
/// - `GET /api/auth/google` + `/callback` - Google OAuth flow
/// - `GET /api/auth/github` + `/callback` - GitHub OAuth flow
/// - `POST /api/auth/logout` - Logout (client-side token removal)
/// - `GET /api/me` - Current client information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/login", post(handlers::login_handler))
        .route("/api/auth/register", post(handlers::register_handler))
        .route("/api/auth/google", get(handlers::google_oauth_start))
        .route(
            "/api/auth/google/callback",
            get(handlers::google_oauth_callback),
        )
        .route("/api/auth/github", get(handlers::github_oauth_start))
        .route(
            "/api/auth/github/callback",
            get(handlers::github_oauth_callback),
        )
        .route("/api/auth/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
