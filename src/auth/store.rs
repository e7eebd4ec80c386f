//! Client and linked-account persistence
//!
//! All sequences that touch more than one record run inside a single
//! transaction, so concurrent requests observe either the committed
//! client+account pair or neither. Uniqueness races are settled by the
//! store's constraints and surface as [`StoreError::Duplicate`].

use sqlx::SqlitePool;
use thiserror::Error;

use super::models::{Client, LinkedAccount, PlanType, Provider};
use crate::common::{generate_account_id, generate_client_id, ApiError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record")]
    Duplicate,

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Conflict("user already exists".to_string()),
            StoreError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

/// Column values for a client insert
pub struct NewClient<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub plan: PlanType,
}

/// Atomic create/find/update primitives over the clients and
/// linked_accounts tables
#[derive(Clone)]
pub struct ClientStore {
    pool: SqlitePool,
}

impl ClientStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_client_by_email(&self, email: &str) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    pub async fn get_client_by_id(&self, id: &str) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    pub async fn get_linked_account(
        &self,
        provider: Provider,
        provider_account_id: &str,
    ) -> Result<Option<LinkedAccount>, StoreError> {
        let account = sqlx::query_as::<_, LinkedAccount>(
            "SELECT * FROM linked_accounts WHERE provider = ? AND provider_account_id = ?",
        )
        .bind(provider.as_str())
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Sets a client's password hash in place (the claiming path)
    pub async fn update_password(
        &self,
        client_id: &str,
        password_hash: &str,
    ) -> Result<Client, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE clients SET password_hash = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(password_hash)
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(client_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(client)
    }

    /// Creates a client together with its first linked account in one
    /// transaction. Partial application is impossible: either both rows
    /// commit or neither does.
    pub async fn create_client_with_account(
        &self,
        data: NewClient<'_>,
        provider: Provider,
        provider_account_id: Option<&str>,
    ) -> Result<Client, StoreError> {
        let mut tx = self.pool.begin().await?;

        let client_id = generate_client_id();
        sqlx::query(
            "INSERT INTO clients (id, email, name, password_hash, plan) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&client_id)
        .bind(data.email)
        .bind(data.name)
        .bind(data.password_hash)
        .bind(data.plan.as_str())
        .execute(&mut *tx)
        .await?;

        // Local accounts have no provider-side id; the client id stands in
        let account_ref = provider_account_id.unwrap_or(client_id.as_str());
        sqlx::query(
            "INSERT INTO linked_accounts (id, client_id, provider, provider_account_id) VALUES (?, ?, ?, ?)",
        )
        .bind(generate_account_id())
        .bind(&client_id)
        .bind(provider.as_str())
        .bind(account_ref)
        .execute(&mut *tx)
        .await?;

        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(&client_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(client)
    }

    /// Attaches a provider account to an existing client
    pub async fn link_account(
        &self,
        client_id: &str,
        provider: Provider,
        provider_account_id: &str,
    ) -> Result<LinkedAccount, StoreError> {
        let mut tx = self.pool.begin().await?;

        let id = generate_account_id();
        sqlx::query(
            "INSERT INTO linked_accounts (id, client_id, provider, provider_account_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(client_id)
        .bind(provider.as_str())
        .bind(provider_account_id)
        .execute(&mut *tx)
        .await?;

        let account = sqlx::query_as::<_, LinkedAccount>("SELECT * FROM linked_accounts WHERE id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(account)
    }
}
