//! User credential repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::UserCredentialStore;
use warden_entity::SecretBlob;

/// Repository for per-identity second-factor credentials.
#[derive(Debug, Clone)]
pub struct UserCredentialRepository {
    pool: PgPool,
}

impl UserCredentialRepository {
    /// Create a new credential repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserCredentialStore for UserCredentialRepository {
    async fn is_enabled(&self, player_id: Uuid) -> AppResult<bool> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT enabled FROM twofa_users WHERE player_id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to read enabled flag", e)
                })?;

        Ok(enabled.unwrap_or(false))
    }

    async fn get_secret(&self, player_id: Uuid) -> AppResult<Option<SecretBlob>> {
        let secret: Option<Option<SecretBlob>> =
            sqlx::query_scalar("SELECT secret FROM twofa_users WHERE player_id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to read secret", e)
                })?;

        Ok(secret.flatten())
    }

    async fn upsert_secret(
        &self,
        player_id: Uuid,
        secret: Option<SecretBlob>,
        enabled: bool,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO twofa_users (player_id, enabled, secret) VALUES ($1, $2, $3) \
             ON CONFLICT (player_id) DO UPDATE SET enabled = $2, secret = $3",
        )
        .bind(player_id)
        .bind(enabled)
        .bind(secret)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert credential", e))?;

        Ok(())
    }

    async fn set_enabled(&self, player_id: Uuid, enabled: bool) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO twofa_users (player_id, enabled) VALUES ($1, $2) \
             ON CONFLICT (player_id) DO UPDATE SET enabled = $2",
        )
        .bind(player_id)
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update enabled flag", e)
        })?;

        Ok(())
    }
}
