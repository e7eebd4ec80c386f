//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use thiserror::Error;

use crate::common::ApiError;

/// Identity providers a linked account can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
    Local,
}

/// Raised when a provider string from outside the type system (a stored
/// row, a config value) names no known provider. Should be unreachable
/// through validated input.
#[derive(Debug, Error)]
#[error("unsupported provider")]
pub struct UnsupportedProvider(pub String);

impl From<UnsupportedProvider> for ApiError {
    fn from(err: UnsupportedProvider) -> Self {
        tracing::error!(provider = %err.0, "Unrecognized provider value");
        ApiError::InternalServer(err.to_string())
    }
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Local => "local",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnsupportedProvider> {
        match value {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::Github),
            "local" => Ok(Provider::Local),
            other => Err(UnsupportedProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription plan attached to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Free,
    Pro,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Pro => "pro",
        }
    }

    fn from_stored(value: &str) -> Self {
        match value {
            "pro" => PlanType::Pro,
            _ => PlanType::Free,
        }
    }
}

/// Whether a client can authenticate locally.
///
/// A client created through an OAuth provider has no password until it
/// claims one; modelling that as a sum type keeps the distinction out of
/// nullable-string territory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordState {
    NotSet,
    Hash(String),
}

impl PasswordState {
    pub fn from_stored(value: Option<String>) -> Self {
        match value {
            Some(hash) if !hash.is_empty() => PasswordState::Hash(hash),
            _ => PasswordState::NotSet,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, PasswordState::Hash(_))
    }

    pub fn as_hash(&self) -> Option<&str> {
        match self {
            PasswordState::Hash(hash) => Some(hash),
            PasswordState::NotSet => None,
        }
    }
}

/// Client database model. Never serialized directly; responses go
/// through [`ClientView`].
#[derive(Debug, Clone)]
pub struct Client {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: PasswordState,
    pub plan: PlanType,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for Client {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let plan: String = row.try_get("plan")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password: PasswordState::from_stored(row.try_get("password_hash")?),
            plan: PlanType::from_stored(&plan),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Client shape that leaves the core: everything except the password
#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub plan: PlanType,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Client> for ClientView {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            email: client.email,
            name: client.name,
            plan: client.plan,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// External-provider account linked to a client
#[derive(Debug, Clone, Serialize)]
pub struct LinkedAccount {
    pub id: String,
    pub client_id: String,
    pub provider: Provider,
    pub provider_account_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for LinkedAccount {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let provider_raw: String = row.try_get("provider")?;
        let provider =
            Provider::parse(&provider_raw).map_err(|e| sqlx::Error::ColumnDecode {
                index: "provider".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            provider,
            provider_account_id: row.try_get("provider_account_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Ephemeral registration input handed to the orchestrator.
/// `password` is plaintext and only ever present for local registrations.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub provider: Provider,
    pub provider_account_id: Option<String>,
    pub plan: PlanType,
}

/// Reconciler-facing registration data. The plaintext password never
/// crosses this boundary; only its hash does.
#[derive(Debug, Clone)]
pub struct ReconciliationRequest {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub provider: Provider,
    pub provider_account_id: Option<String>,
    pub plan: PlanType,
}

/// Outcome of reconciling a registration request against the store
#[derive(Debug)]
pub enum RegistrationOutcome {
    /// A brand new client was created (with its first linked account)
    NewClient(Client),
    /// A new provider account was linked to an existing client
    AccountLinked(Client),
    /// The (provider, account) pair was already linked; nothing written
    ExistingAccountLogin(Client),
    /// An OAuth-only client set a local password for the first time
    PasswordClaimed(Client),
}

impl RegistrationOutcome {
    pub fn into_client(self) -> Client {
        match self {
            RegistrationOutcome::NewClient(c)
            | RegistrationOutcome::AccountLinked(c)
            | RegistrationOutcome::ExistingAccountLogin(c)
            | RegistrationOutcome::PasswordClaimed(c) => c,
        }
    }

    /// True only when a new client record was created
    pub fn is_new_client(&self) -> bool {
        matches!(self, RegistrationOutcome::NewClient(_))
    }
}

// ---- Request / response DTOs ----

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub plan: Option<PlanType>,
}

/// Query parameters a provider sends back to our callback endpoint
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Body returned by login, register and the OAuth login path
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub client: ClientView,
    pub token: String,
    pub auth_type: &'static str,
    pub is_new_user: bool,
}
