//! In-memory collaborator doubles and a wired-up engine for tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

use warden_auth::{
    AccountService, ApprovalFlow, CooldownPolicy, FreezeController, Gate, SecretVault,
    SessionTracker, TotpEngine, TrustedDeviceLedger,
};
use warden_core::clock::{Clock, ManualClock};
use warden_core::config::{
    ApprovalConfig, CooldownConfig, GateConfig, SessionConfig, TotpConfig, TrustedDeviceConfig,
};
use warden_core::result::AppResult;
use warden_core::traits::{
    ApprovalSessionStore, CapabilityControl, ChallengeStore, DisconnectReason, MessengerLinkStore,
    NoopPlatformDetector, TrustedDeviceStore, UserCredentialStore,
};
use warden_entity::{
    ApprovalStatus, Challenge, DeviceFingerprint, MessengerLink, SecretBlob, TrustedDevice,
};

/// Capability control that records every call.
#[derive(Debug, Default)]
pub struct RecordingControl {
    pub freezes: Mutex<Vec<Uuid>>,
    pub unfreezes: Mutex<Vec<Uuid>>,
    pub disconnects: Mutex<Vec<(Uuid, DisconnectReason)>>,
    disconnected: AtomicBool,
}

impl RecordingControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.lock().unwrap().len()
    }
}

#[async_trait]
impl CapabilityControl for RecordingControl {
    async fn freeze(&self, player_id: Uuid) {
        self.freezes.lock().unwrap().push(player_id);
    }

    async fn unfreeze(&self, player_id: Uuid) {
        self.unfreezes.lock().unwrap().push(player_id);
    }

    async fn disconnect(&self, player_id: Uuid, reason: DisconnectReason) {
        self.disconnects.lock().unwrap().push((player_id, reason));
        self.disconnected.store(true, Ordering::SeqCst);
    }

    async fn is_connected(&self, _player_id: Uuid) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    rows: Mutex<HashMap<Uuid, (bool, Option<SecretBlob>)>>,
}

#[async_trait]
impl UserCredentialStore for MemoryCredentialStore {
    async fn is_enabled(&self, player_id: Uuid) -> AppResult<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&player_id)
            .map(|(enabled, _)| *enabled)
            .unwrap_or(false))
    }

    async fn get_secret(&self, player_id: Uuid) -> AppResult<Option<SecretBlob>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&player_id)
            .and_then(|(_, secret)| secret.clone()))
    }

    async fn upsert_secret(
        &self,
        player_id: Uuid,
        secret: Option<SecretBlob>,
        enabled: bool,
    ) -> AppResult<()> {
        self.rows.lock().unwrap().insert(player_id, (enabled, secret));
        Ok(())
    }

    async fn set_enabled(&self, player_id: Uuid, enabled: bool) -> AppResult<()> {
        self.rows
            .lock()
            .unwrap()
            .entry(player_id)
            .or_insert((false, None))
            .0 = enabled;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    rows: Mutex<Vec<TrustedDevice>>,
    next_id: AtomicI64,
}

#[async_trait]
impl TrustedDeviceStore for MemoryDeviceStore {
    async fn find(
        &self,
        player_id: Uuid,
        fingerprint: &DeviceFingerprint,
    ) -> AppResult<Option<TrustedDevice>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|d| {
                d.player_id == player_id
                    && d.ip == fingerprint.ip
                    && d.locale == fingerprint.locale
                    && d.platform == fingerprint.platform
            })
            .cloned())
    }

    async fn upsert(
        &self,
        player_id: Uuid,
        fingerprint: &DeviceFingerprint,
        trusted_until: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|d| {
            d.player_id == player_id
                && d.ip == fingerprint.ip
                && d.locale == fingerprint.locale
                && d.platform == fingerprint.platform
        }) {
            existing.trusted_until = trusted_until;
            return Ok(());
        }

        let now = Utc::now();
        rows.push(TrustedDevice {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            player_id,
            ip: fingerprint.ip.clone(),
            locale: fingerprint.locale.clone(),
            platform: fingerprint.platform.clone(),
            trusted_until,
            created_at: now,
            last_used: now,
        });
        Ok(())
    }

    async fn touch(&self, id: i64) -> AppResult<()> {
        if let Some(device) = self.rows.lock().unwrap().iter_mut().find(|d| d.id == id) {
            device.last_used = Utc::now();
        }
        Ok(())
    }

    async fn delete_all(&self, player_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|d| d.player_id != player_id);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    rows: Mutex<HashMap<String, Challenge>>,
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn create(&self, challenge: &Challenge) -> AppResult<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(challenge.token.clone(), challenge.clone());
        Ok(())
    }

    async fn find_valid_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Challenge>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(token)
            .filter(|c| c.expires_at > now)
            .cloned())
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        self.rows.lock().unwrap().remove(token);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, c| c.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Debug)]
struct ApprovalRow {
    id: i64,
    player_id: Uuid,
    status: ApprovalStatus,
}

#[derive(Debug, Default)]
pub struct MemoryApprovalStore {
    rows: Mutex<Vec<ApprovalRow>>,
    next_id: AtomicI64,
}

#[async_trait]
impl ApprovalSessionStore for MemoryApprovalStore {
    async fn create_pending(
        &self,
        player_id: Uuid,
        _expires_at: DateTime<Utc>,
        _ip: Option<&str>,
    ) -> AppResult<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.lock().unwrap().push(ApprovalRow {
            id,
            player_id,
            status: ApprovalStatus::Pending,
        });
        Ok(id)
    }

    async fn latest_status(&self, player_id: Uuid) -> AppResult<Option<ApprovalStatus>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.player_id == player_id)
            .max_by_key(|row| row.id)
            .map(|row| row.status))
    }

    async fn mark_approved(&self, player_id: Uuid, _approved_at: DateTime<Utc>) -> AppResult<()> {
        self.resolve(player_id, ApprovalStatus::Approved);
        Ok(())
    }

    async fn mark_denied(&self, player_id: Uuid) -> AppResult<()> {
        self.resolve(player_id, ApprovalStatus::Denied);
        Ok(())
    }
}

impl MemoryApprovalStore {
    fn resolve(&self, player_id: Uuid, status: ApprovalStatus) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .filter(|row| row.player_id == player_id && row.status == ApprovalStatus::Pending)
            .max_by_key(|row| row.id)
        {
            row.status = status;
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    rows: Mutex<HashMap<Uuid, MessengerLink>>,
}

#[async_trait]
impl MessengerLinkStore for MemoryLinkStore {
    async fn find(&self, player_id: Uuid) -> AppResult<Option<MessengerLink>> {
        Ok(self.rows.lock().unwrap().get(&player_id).cloned())
    }

    async fn upsert(
        &self,
        player_id: Uuid,
        messenger_id: i64,
        username: Option<&str>,
    ) -> AppResult<()> {
        self.rows.lock().unwrap().insert(
            player_id,
            MessengerLink {
                player_id,
                messenger_id,
                messenger_username: username.map(str::to_owned),
                linked_at: Utc::now(),
                last_verified_at: None,
            },
        );
        Ok(())
    }

    async fn touch_verified(&self, player_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(link) = self.rows.lock().unwrap().get_mut(&player_id) {
            link.last_verified_at = Some(at);
        }
        Ok(())
    }

    async fn delete(&self, player_id: Uuid) -> AppResult<()> {
        self.rows.lock().unwrap().remove(&player_id);
        Ok(())
    }
}

/// The engine wired over in-memory doubles and a manual clock.
pub struct Harness {
    pub clock: ManualClock,
    pub control: Arc<RecordingControl>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub devices: Arc<MemoryDeviceStore>,
    pub challenges: Arc<MemoryChallengeStore>,
    pub approvals: Arc<MemoryApprovalStore>,
    pub links: Arc<MemoryLinkStore>,
    pub tracker: Arc<SessionTracker>,
    pub freeze: FreezeController,
    pub flow: ApprovalFlow,
    pub gate: Gate,
    pub accounts: AccountService,
}

/// Configuration knobs a test can tweak before wiring.
pub struct HarnessConfig {
    pub totp: TotpConfig,
    pub cooldown: CooldownConfig,
    pub session: SessionConfig,
    pub trusted: TrustedDeviceConfig,
    pub approval: ApprovalConfig,
    pub gate: GateConfig,
    pub master_key: Option<Vec<u8>>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            totp: TotpConfig::default(),
            cooldown: CooldownConfig::default(),
            session: SessionConfig::default(),
            trusted: TrustedDeviceConfig::default(),
            approval: ApprovalConfig::default(),
            gate: GateConfig::default(),
            master_key: None,
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with(HarnessConfig::default())
    }

    pub fn with(config: HarnessConfig) -> Self {
        let clock = ManualClock::starting_now();
        let clock_arc: Arc<dyn Clock> = Arc::new(clock.clone());

        let control = RecordingControl::new();
        let credentials = Arc::new(MemoryCredentialStore::default());
        let devices = Arc::new(MemoryDeviceStore::default());
        let challenges = Arc::new(MemoryChallengeStore::default());
        let approvals = Arc::new(MemoryApprovalStore::default());
        let links = Arc::new(MemoryLinkStore::default());

        let vault = SecretVault::new(config.master_key);
        let totp = TotpEngine::new(config.totp, clock_arc.clone());
        let policy = CooldownPolicy::from_config(&config.cooldown);
        let tracker = Arc::new(SessionTracker::new(
            &config.session,
            policy.clone(),
            clock_arc.clone(),
        ));
        let ledger = TrustedDeviceLedger::new(devices.clone(), clock_arc.clone(), config.trusted);
        let freeze = FreezeController::new(control.clone());

        let flow = ApprovalFlow::new(
            challenges.clone(),
            approvals.clone(),
            links.clone(),
            control.clone(),
            freeze.clone(),
            clock_arc.clone(),
            config.approval,
        );

        let platform = Arc::new(NoopPlatformDetector);

        let accounts = AccountService::new(
            credentials.clone(),
            vault,
            totp,
            policy.clone(),
            tracker.clone(),
            ledger.clone(),
            freeze.clone(),
            flow.clone(),
            platform.clone(),
        );

        let gate = Gate::new(
            credentials.clone(),
            policy,
            tracker.clone(),
            ledger,
            freeze.clone(),
            flow.clone(),
            platform,
            config.gate,
        );

        Self {
            clock,
            control,
            credentials,
            devices,
            challenges,
            approvals,
            links,
            tracker,
            freeze,
            flow,
            gate,
            accounts,
        }
    }
}

/// Builds a subject holding the default required permission.
pub fn gated_subject(name: &str, ip: &str) -> warden_entity::Subject {
    let mut subject = warden_entity::Subject::new(Uuid::new_v4(), name);
    subject.ip = Some(ip.to_string());
    subject.locale = Some("en_us".to_string());
    subject.permissions.insert("warden.required".to_string());
    subject
}

/// Computes the expected TOTP code for a secret at an instant,
/// independently of the engine under test.
pub fn code_for(secret: &str, at: DateTime<Utc>, digits: u32, period_seconds: u64) -> String {
    let key = BASE32_NOPAD
        .decode(secret.trim_end_matches('=').to_ascii_uppercase().as_bytes())
        .expect("valid base32 secret");
    let counter = at.timestamp() as u64 / period_seconds;

    let mut mac = Hmac::<Sha1>::new_from_slice(&key).expect("any key length");
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(hash[offset] & 0x7f) << 24)
        | (u32::from(hash[offset + 1]) << 16)
        | (u32::from(hash[offset + 2]) << 8)
        | u32::from(hash[offset + 3]);

    let code = u64::from(binary) % 10u64.pow(digits);
    format!("{:0width$}", code, width = digits as usize)
}
