//! Approval session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::ApprovalSessionStore;
use warden_entity::ApprovalStatus;

/// Repository for out-of-band approval sessions.
///
/// Terminal statuses are written with a `status = 'PENDING'` guard so an
/// already resolved record can never be flipped.
#[derive(Debug, Clone)]
pub struct ApprovalSessionRepository {
    pool: PgPool,
}

impl ApprovalSessionRepository {
    /// Create a new approval session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalSessionStore for ApprovalSessionRepository {
    async fn create_pending(
        &self,
        player_id: Uuid,
        expires_at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            "INSERT INTO twofa_approval_sessions (player_id, expires_at, ip) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(player_id)
        .bind(expires_at)
        .bind(ip)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create approval session", e)
        })
    }

    async fn latest_status(&self, player_id: Uuid) -> AppResult<Option<ApprovalStatus>> {
        sqlx::query_scalar(
            "SELECT status FROM twofa_approval_sessions \
             WHERE player_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read approval status", e)
        })
    }

    async fn mark_approved(&self, player_id: Uuid, approved_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE twofa_approval_sessions SET status = 'APPROVED', approved_at = $2 \
             WHERE id = (SELECT id FROM twofa_approval_sessions \
                         WHERE player_id = $1 AND status = 'PENDING' \
                         ORDER BY id DESC LIMIT 1)",
        )
        .bind(player_id)
        .bind(approved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to approve session", e)
        })?;

        Ok(())
    }

    async fn mark_denied(&self, player_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE twofa_approval_sessions SET status = 'DENIED' \
             WHERE id = (SELECT id FROM twofa_approval_sessions \
                         WHERE player_id = $1 AND status = 'PENDING' \
                         ORDER BY id DESC LIMIT 1)",
        )
        .bind(player_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to deny session", e))?;

        Ok(())
    }
}
