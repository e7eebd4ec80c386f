// src/services/password.rs
//! Local credential hashing and verification (bcrypt)

use thiserror::Error;
use tracing::error;

use crate::common::ApiError;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed")]
    Hash(#[source] bcrypt::BcryptError),

    #[error("password verification failed")]
    Verify(#[source] bcrypt::BcryptError),
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        error!(error = %err, "Password codec failure");
        ApiError::InternalServer(err.to_string())
    }
}

/// Hashes and verifies local credentials with a fixed work factor.
/// Plaintext is never compared directly; bcrypt's salted, constant-time
/// comparison is the only path.
#[derive(Debug, Clone)]
pub struct PasswordCodec {
    cost: u32,
}

impl PasswordCodec {
    pub fn new() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Lower-cost codec for tests; production always uses `new`.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plain, self.cost).map_err(PasswordError::Hash)
    }

    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(plain, hash).map_err(PasswordError::Verify)
    }
}

impl Default for PasswordCodec {
    fn default() -> Self {
        Self::new()
    }
}
