//! Identity reconciliation: the registration state machine
//!
//! Decides, for any incoming registration, whether to create a client,
//! link a provider account to an existing client, reject a duplicate, or
//! let an OAuth-only client claim a local password. Every multi-record
//! write goes through a transactional store primitive; the store's unique
//! constraints arbitrate concurrent registrations and surface as Conflict.

use tracing::{debug, info};

use super::models::{PasswordState, Provider, ReconciliationRequest, RegistrationOutcome};
use super::store::{ClientStore, NewClient};
use crate::common::{safe_email_log, ApiError};

#[derive(Clone)]
pub struct IdentityReconciler {
    store: ClientStore,
}

impl IdentityReconciler {
    pub fn new(store: ClientStore) -> Self {
        Self { store }
    }

    pub async fn reconcile(
        &self,
        request: ReconciliationRequest,
    ) -> Result<RegistrationOutcome, ApiError> {
        match request.provider {
            Provider::Local => self.reconcile_local(request).await,
            Provider::Google | Provider::Github => self.reconcile_oauth(request).await,
        }
    }

    async fn reconcile_local(
        &self,
        request: ReconciliationRequest,
    ) -> Result<RegistrationOutcome, ApiError> {
        match self.store.get_client_by_email(&request.email).await? {
            None => {
                let client = self
                    .store
                    .create_client_with_account(
                        NewClient {
                            email: &request.email,
                            name: &request.name,
                            password_hash: request.password_hash.as_deref(),
                            plan: request.plan,
                        },
                        Provider::Local,
                        None,
                    )
                    .await?;

                info!(
                    client_id = %client.id,
                    email = %safe_email_log(&client.email),
                    "New client registered locally"
                );
                Ok(RegistrationOutcome::NewClient(client))
            }
            Some(client) => match &client.password {
                // An OAuth-only client registering locally is claiming the
                // account: set the password in place, create nothing
                PasswordState::NotSet => {
                    let hash = request.password_hash.as_deref().ok_or_else(|| {
                        ApiError::InternalServer(
                            "missing password hash for local registration".to_string(),
                        )
                    })?;

                    let updated = self.store.update_password(&client.id, hash).await?;
                    info!(
                        client_id = %updated.id,
                        "OAuth-only client claimed a local password"
                    );
                    Ok(RegistrationOutcome::PasswordClaimed(updated))
                }
                PasswordState::Hash(_) => {
                    Err(ApiError::Conflict("user already exists".to_string()))
                }
            },
        }
    }

    async fn reconcile_oauth(
        &self,
        request: ReconciliationRequest,
    ) -> Result<RegistrationOutcome, ApiError> {
        let provider_account_id = request.provider_account_id.as_deref().ok_or_else(|| {
            ApiError::BadRequest("provider account id is required".to_string())
        })?;

        match self.store.get_client_by_email(&request.email).await? {
            Some(client) => {
                let linked = self
                    .store
                    .get_linked_account(request.provider, provider_account_id)
                    .await?;

                if linked.is_some() {
                    debug!(
                        client_id = %client.id,
                        provider = %request.provider,
                        "Provider account already linked; nothing to write"
                    );
                    Ok(RegistrationOutcome::ExistingAccountLogin(client))
                } else {
                    self.store
                        .link_account(&client.id, request.provider, provider_account_id)
                        .await?;

                    info!(
                        client_id = %client.id,
                        provider = %request.provider,
                        "Linked new provider account to existing client"
                    );
                    Ok(RegistrationOutcome::AccountLinked(client))
                }
            }
            None => {
                let client = self
                    .store
                    .create_client_with_account(
                        NewClient {
                            email: &request.email,
                            name: &request.name,
                            password_hash: None,
                            plan: request.plan,
                        },
                        request.provider,
                        Some(provider_account_id),
                    )
                    .await?;

                info!(
                    client_id = %client.id,
                    email = %safe_email_log(&client.email),
                    provider = %request.provider,
                    "New client registered via OAuth"
                );
                Ok(RegistrationOutcome::NewClient(client))
            }
        }
    }
}
