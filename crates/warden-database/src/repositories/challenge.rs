//! Link challenge repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::ChallengeStore;
use warden_entity::Challenge;

/// Repository for one-shot link challenges.
#[derive(Debug, Clone)]
pub struct ChallengeRepository {
    pool: PgPool,
}

impl ChallengeRepository {
    /// Create a new challenge repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeStore for ChallengeRepository {
    async fn create(&self, challenge: &Challenge) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO twofa_challenges (token, player_id, player_name, expires_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (token) DO UPDATE SET player_id = $2, player_name = $3, expires_at = $4",
        )
        .bind(&challenge.token)
        .bind(challenge.player_id)
        .bind(&challenge.player_name)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create challenge", e))?;

        Ok(())
    }

    async fn find_valid_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Challenge>> {
        sqlx::query_as::<_, Challenge>(
            "SELECT * FROM twofa_challenges WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find challenge", e))
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM twofa_challenges WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete challenge", e)
            })?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM twofa_challenges WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to purge expired challenges", e)
            })?;

        Ok(result.rows_affected())
    }
}
