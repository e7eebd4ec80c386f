//! Local credential verification

use tracing::{debug, warn};

use super::models::Client;
use super::store::ClientStore;
use crate::common::{safe_email_log, ApiError};
use crate::services::PasswordCodec;

/// The local login path: email lookup followed by a bcrypt comparison
#[derive(Clone)]
pub struct CredentialVerifier {
    store: ClientStore,
    codec: PasswordCodec,
}

impl CredentialVerifier {
    pub fn new(store: ClientStore, codec: PasswordCodec) -> Self {
        Self { store, codec }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Client, ApiError> {
        let client = self
            .store
            .get_client_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("client not found".to_string()))?;

        let hash = match client.password.as_hash() {
            Some(hash) => hash.to_string(),
            None => {
                warn!(
                    client_id = %client.id,
                    "Local login attempted against an OAuth-only client"
                );
                return Err(ApiError::Unauthorized("password not set".to_string()));
            }
        };

        if !self.codec.verify(password, &hash)? {
            warn!(
                email = %safe_email_log(email),
                "Login failed: password mismatch"
            );
            return Err(ApiError::Unauthorized("invalid password".to_string()));
        }

        debug!(client_id = %client.id, "Credentials verified");
        Ok(client)
    }
}
