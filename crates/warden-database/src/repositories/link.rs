//! Messenger link repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::MessengerLinkStore;
use warden_entity::MessengerLink;

/// Repository for identity-to-messenger bindings.
#[derive(Debug, Clone)]
pub struct MessengerLinkRepository {
    pool: PgPool,
}

impl MessengerLinkRepository {
    /// Create a new messenger link repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessengerLinkStore for MessengerLinkRepository {
    async fn find(&self, player_id: Uuid) -> AppResult<Option<MessengerLink>> {
        sqlx::query_as::<_, MessengerLink>(
            "SELECT * FROM twofa_messenger_links WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find link", e))
    }

    async fn upsert(
        &self,
        player_id: Uuid,
        messenger_id: i64,
        username: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO twofa_messenger_links (player_id, messenger_id, messenger_username) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (player_id) \
             DO UPDATE SET messenger_id = $2, messenger_username = $3, linked_at = NOW()",
        )
        .bind(player_id)
        .bind(messenger_id)
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert link", e))?;

        Ok(())
    }

    async fn touch_verified(&self, player_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE twofa_messenger_links SET last_verified_at = $2 WHERE player_id = $1")
            .bind(player_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch link", e))?;

        Ok(())
    }

    async fn delete(&self, player_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM twofa_messenger_links WHERE player_id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete link", e))?;

        Ok(())
    }
}
