//! Trusted device repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::TrustedDeviceStore;
use warden_entity::{DeviceFingerprint, TrustedDevice};

/// Repository for trusted device records.
#[derive(Debug, Clone)]
pub struct TrustedDeviceRepository {
    pool: PgPool,
}

impl TrustedDeviceRepository {
    /// Create a new trusted device repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrustedDeviceStore for TrustedDeviceRepository {
    async fn find(
        &self,
        player_id: Uuid,
        fingerprint: &DeviceFingerprint,
    ) -> AppResult<Option<TrustedDevice>> {
        sqlx::query_as::<_, TrustedDevice>(
            "SELECT * FROM twofa_trusted_devices \
             WHERE player_id = $1 AND ip = $2 AND locale = $3 AND platform = $4",
        )
        .bind(player_id)
        .bind(&fingerprint.ip)
        .bind(&fingerprint.locale)
        .bind(&fingerprint.platform)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find trusted device", e)
        })
    }

    async fn upsert(
        &self,
        player_id: Uuid,
        fingerprint: &DeviceFingerprint,
        trusted_until: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO twofa_trusted_devices (player_id, ip, locale, platform, trusted_until) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (player_id, ip, locale, platform) \
             DO UPDATE SET trusted_until = $5, last_used = NOW()",
        )
        .bind(player_id)
        .bind(&fingerprint.ip)
        .bind(&fingerprint.locale)
        .bind(&fingerprint.platform)
        .bind(trusted_until)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert trusted device", e)
        })?;

        Ok(())
    }

    async fn touch(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE twofa_trusted_devices SET last_used = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to touch trusted device", e)
            })?;

        Ok(())
    }

    async fn delete_all(&self, player_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM twofa_trusted_devices WHERE player_id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete trusted devices", e)
            })?;

        Ok(result.rows_affected())
    }
}
