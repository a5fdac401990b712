//! Embedded schema migration.
//!
//! The schema is small enough to ship as idempotent DDL executed at
//! startup, mirroring how the stores expect the tables to look.

use sqlx::PgPool;
use tracing::info;

use warden_core::error::{AppError, ErrorKind};

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS twofa_users (
        player_id UUID PRIMARY KEY,
        enabled BOOLEAN NOT NULL DEFAULT FALSE,
        secret BYTEA NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS twofa_trusted_devices (
        id BIGSERIAL PRIMARY KEY,
        player_id UUID NOT NULL,
        ip TEXT NOT NULL,
        locale TEXT NOT NULL,
        platform TEXT NOT NULL,
        trusted_until TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_used TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (player_id, ip, locale, platform)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS twofa_challenges (
        token VARCHAR(16) PRIMARY KEY,
        player_id UUID NOT NULL,
        player_name TEXT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    DO $$ BEGIN
        CREATE TYPE approval_status AS ENUM ('PENDING', 'APPROVED', 'DENIED');
    EXCEPTION
        WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS twofa_approval_sessions (
        id BIGSERIAL PRIMARY KEY,
        player_id UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        expires_at TIMESTAMPTZ NOT NULL,
        status approval_status NOT NULL DEFAULT 'PENDING',
        approved_at TIMESTAMPTZ NULL,
        ip TEXT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_approval_player_status
        ON twofa_approval_sessions (player_id, status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS twofa_messenger_links (
        player_id UUID PRIMARY KEY,
        messenger_id BIGINT NOT NULL,
        messenger_username TEXT NULL,
        linked_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_verified_at TIMESTAMPTZ NULL
    )
    "#,
];

/// Create the Warden schema if it does not exist yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Ensuring Warden schema exists");

    for statement in DDL {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Schema migration failed: {e}"), e)
        })?;
    }

    info!("Warden schema is up to date");
    Ok(())
}
