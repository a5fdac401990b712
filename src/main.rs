//! Warden server harness.
//!
//! Wires the trust engine together: configuration, logging, database,
//! repositories, and the engine services. The host environment is
//! expected to embed the engine and implement `CapabilityControl`; the
//! standalone binary ships a logging stand-in so the wiring can run and
//! be health-checked on its own.

use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use warden_auth::{
    AccountService, ApprovalFlow, CooldownPolicy, FreezeController, Gate, SecretVault,
    SessionTracker, TotpEngine, TrustedDeviceLedger,
};
use warden_core::clock::{Clock, SystemClock};
use warden_core::config::AppConfig;
use warden_core::error::AppError;
use warden_core::traits::{CapabilityControl, DisconnectReason, NoopPlatformDetector};
use warden_database::repositories::{
    ApprovalSessionRepository, ChallengeRepository, MessengerLinkRepository,
    TrustedDeviceRepository, UserCredentialRepository,
};
use warden_database::DatabasePool;

/// Stand-in capability control that only logs its calls.
#[derive(Debug)]
struct LoggingCapabilityControl;

#[async_trait]
impl CapabilityControl for LoggingCapabilityControl {
    async fn freeze(&self, player_id: Uuid) {
        tracing::info!(player_id = %player_id, "freeze requested");
    }

    async fn unfreeze(&self, player_id: Uuid) {
        tracing::info!(player_id = %player_id, "unfreeze requested");
    }

    async fn disconnect(&self, player_id: Uuid, reason: DisconnectReason) {
        tracing::info!(player_id = %player_id, reason = ?reason, "disconnect requested");
    }

    async fn is_connected(&self, _player_id: Uuid) -> bool {
        false
    }
}

#[tokio::main]
async fn main() {
    let env = std::env::var("WARDEN_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;

    tracing::info!("Running schema migrations...");
    warden_database::migration::run_migrations(db.pool()).await?;

    let credentials = Arc::new(UserCredentialRepository::new(db.pool().clone()));
    let devices = Arc::new(TrustedDeviceRepository::new(db.pool().clone()));
    let challenges = Arc::new(ChallengeRepository::new(db.pool().clone()));
    let approvals = Arc::new(ApprovalSessionRepository::new(db.pool().clone()));
    let links = Arc::new(MessengerLinkRepository::new(db.pool().clone()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let control: Arc<dyn CapabilityControl> = Arc::new(LoggingCapabilityControl);
    let platform = Arc::new(NoopPlatformDetector);

    let vault = SecretVault::from_config(&config.vault);
    if !vault.is_encrypting() {
        tracing::warn!("Secret vault is running in plaintext mode");
    }

    let totp = TotpEngine::new(config.totp.clone(), clock.clone());
    let policy = CooldownPolicy::from_config(&config.cooldown);
    let tracker = Arc::new(SessionTracker::new(
        &config.session,
        policy.clone(),
        clock.clone(),
    ));
    let ledger = TrustedDeviceLedger::new(devices, clock.clone(), config.trusted_devices.clone());
    let freeze = FreezeController::new(control.clone());

    let approval = ApprovalFlow::new(
        challenges,
        approvals,
        links,
        control,
        freeze.clone(),
        clock.clone(),
        config.approval.clone(),
    );

    let _accounts = AccountService::new(
        credentials.clone(),
        vault,
        totp,
        policy.clone(),
        tracker.clone(),
        ledger.clone(),
        freeze.clone(),
        approval.clone(),
        platform.clone(),
    );

    let _gate = Gate::new(
        credentials,
        policy,
        tracker,
        ledger,
        freeze,
        approval.clone(),
        platform,
        config.gate.clone(),
    );

    // Reap unclaimed link challenges once per TTL.
    let cleanup_flow = approval.clone();
    let cleanup_period = std::time::Duration::from_secs(config.approval.challenge_ttl_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = cleanup_flow.purge_expired_challenges().await {
                tracing::error!(error = %e, "Challenge cleanup cycle failed");
            }
        }
    });

    tracing::info!("Warden trust engine ready");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;

    tracing::info!("Shutting down");
    db.close().await;

    Ok(())
}
