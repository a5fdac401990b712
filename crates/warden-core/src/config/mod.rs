//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. The merged configuration is a static snapshot: services
//! copy the sections they need at construction and are rebuilt, not
//! mutated, on reload.

pub mod approval;
pub mod cooldown;
pub mod gate;
pub mod logging;
pub mod session;
pub mod totp;
pub mod trusted;
pub mod vault;

use serde::{Deserialize, Serialize};

pub use self::approval::ApprovalConfig;
pub use self::cooldown::{CooldownConfig, CooldownRuleConfig};
pub use self::gate::GateConfig;
pub use self::logging::LoggingConfig;
pub use self::session::SessionConfig;
pub use self::totp::TotpConfig;
pub use self::trusted::TrustedDeviceConfig;
pub use self::vault::VaultConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default.toml + environment overlay + `WARDEN__` env vars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// TOTP code engine settings.
    #[serde(default)]
    pub totp: TotpConfig,
    /// Secret vault settings.
    #[serde(default)]
    pub vault: VaultConfig,
    /// In-memory session tracking settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Re-verification cooldown policy.
    #[serde(default)]
    pub cooldown: CooldownConfig,
    /// Trusted device ledger settings.
    #[serde(default)]
    pub trusted_devices: TrustedDeviceConfig,
    /// Out-of-band approval flow settings.
    #[serde(default)]
    pub approval: ApprovalConfig,
    /// Gate policy (which subjects must verify, what is allowed while
    /// pending).
    #[serde(default)]
    pub gate: GateConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific
    /// overlay and environment variables prefixed with `WARDEN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;

        Ok(config)
    }

    /// Reject invalid values at load time rather than defaulting silently
    /// deep in business logic.
    pub fn validate(&self) -> Result<(), AppError> {
        self.totp.validate()?;
        self.trusted_devices.validate()?;
        self.approval.validate()?;
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}
