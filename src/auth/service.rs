//! Auth use cases: the only component that knows both the local and the
//! OAuth registration paths

use tracing::error;

use super::models::{
    AuthResponse, LoginRequest, Provider, ReconciliationRequest, RegistrationOutcome,
    RegistrationRequest,
};
use super::reconciler::IdentityReconciler;
use super::store::ClientStore;
use super::validators::validate_password_strength;
use super::verifier::CredentialVerifier;
use crate::common::ApiError;
use crate::services::{PasswordCodec, TokenIssuer};

pub struct AuthService {
    reconciler: IdentityReconciler,
    verifier: CredentialVerifier,
    codec: PasswordCodec,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: ClientStore, tokens: TokenIssuer, codec: PasswordCodec) -> Self {
        Self {
            reconciler: IdentityReconciler::new(store.clone()),
            verifier: CredentialVerifier::new(store, codec.clone()),
            codec,
            tokens,
        }
    }

    /// Local login: verify credentials, then issue a session token
    pub async fn login(&self, credentials: LoginRequest) -> Result<AuthResponse, ApiError> {
        self.login_inner(credentials)
            .await
            .map_err(|e| guard_unexpected(e, "authentication service temporarily unavailable"))
    }

    async fn login_inner(&self, credentials: LoginRequest) -> Result<AuthResponse, ApiError> {
        let client = self
            .verifier
            .login(&credentials.email, &credentials.password)
            .await?;

        let token = self.tokens.issue(&client)?;

        Ok(AuthResponse {
            message: "login successful".to_string(),
            client: self.tokens.sanitize(client),
            token,
            auth_type: "local",
            is_new_user: false,
        })
    }

    /// Registration for both paths. Local requests pass the strength gate
    /// and are hashed before reconciliation; the reconciler never sees
    /// plaintext.
    pub async fn register(&self, request: RegistrationRequest) -> Result<AuthResponse, ApiError> {
        self.register_inner(request)
            .await
            .map_err(|e| guard_unexpected(e, "registration service temporarily unavailable"))
    }

    async fn register_inner(&self, request: RegistrationRequest) -> Result<AuthResponse, ApiError> {
        let RegistrationRequest {
            email,
            name,
            password,
            provider,
            provider_account_id,
            plan,
        } = request;

        let password_hash = match (provider, &password) {
            (Provider::Local, Some(plain)) => {
                validate_password_strength(plain)?;
                Some(self.codec.hash(plain)?)
            }
            _ => None,
        };

        let outcome = self
            .reconciler
            .reconcile(ReconciliationRequest {
                email,
                name,
                password_hash,
                provider,
                provider_account_id,
                plan,
            })
            .await?;

        let message = match &outcome {
            RegistrationOutcome::NewClient(_) => "registration successful",
            RegistrationOutcome::AccountLinked(_) => "account linked successfully",
            RegistrationOutcome::ExistingAccountLogin(_) => "login successful",
            RegistrationOutcome::PasswordClaimed(_) => "password set for existing account",
        }
        .to_string();

        let auth_type = match provider {
            Provider::Local => "local",
            Provider::Google | Provider::Github => "oauth",
        };

        let is_new_user = outcome.is_new_client();
        let client = outcome.into_client();
        let token = self.tokens.issue(&client)?;

        Ok(AuthResponse {
            message,
            client: self.tokens.sanitize(client),
            token,
            auth_type,
            is_new_user,
        })
    }
}

/// Domain errors pass through untouched; anything unexpected collapses to
/// a generic InternalServer so raw store messages never reach a response.
fn guard_unexpected(err: ApiError, message: &str) -> ApiError {
    match err {
        ApiError::DatabaseError(e) => {
            error!(error = %e, "Unexpected store failure in auth use case");
            ApiError::InternalServer(message.to_string())
        }
        other => other,
    }
}
