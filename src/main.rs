// src/main.rs
use axum::{extract::Extension, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod services;

use auth::service::AuthService;
use auth::store::ClientStore;
use common::{parse_duration, AppState};
use services::{OAuthProviderConfig, PasswordCodec, StateTokenManager, TokenIssuer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://auth_api.db".to_string());

    // The two secrets are deliberately separate: compromise of the state
    // key must not compromise sessions, and vice versa
    let jwt_secret =
        env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    let state_secret = env::var("STATE_TOKEN_SECRET")
        .map_err(|_| anyhow::anyhow!("STATE_TOKEN_SECRET must be set"))?;

    let session_ttl = env::var("JWT_EXPIRES_IN")
        .ok()
        .and_then(|v| parse_duration(&v))
        .unwrap_or_else(|| chrono::Duration::days(1));

    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let secure_cookies = env::var("APP_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    // Provider calls are the only blocking operations; the timeout bounds
    // them and surfaces as a retryable internal error
    let http_client = Client::builder()
        .user_agent(concat!("auth-api/", env!("CARGO_PKG_VERSION")))
        .timeout(StdDuration::from_secs(10))
        .build()?;

    let store = ClientStore::new(pool);
    let session_tokens = TokenIssuer::new(jwt_secret, session_ttl);
    let state_tokens = StateTokenManager::new(state_secret);

    let auth_service = Arc::new(AuthService::new(
        store.clone(),
        session_tokens.clone(),
        PasswordCodec::new(),
    ));
    info!("AuthService initialized");

    let google = OAuthProviderConfig::from_env("GOOGLE");
    if google.is_none() {
        warn!("Google OAuth not configured; /api/auth/google will answer 503");
    }
    let github = OAuthProviderConfig::from_env("GITHUB");
    if github.is_none() {
        warn!("GitHub OAuth not configured; /api/auth/github will answer 503");
    }

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        http: http_client,
        frontend_url,
        secure_cookies,
        store,
        auth: auth_service,
        session_tokens,
        state_tokens,
        google,
        github,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .layer(Extension(shared.clone()))
        .layer({
            let cors_origins = env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string());

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(2000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
