//! TOTP code engine.
//!
//! Stateless secret generation, provisioning URI construction, and code
//! verification with a clock-skew tolerance window. Rate limiting is the
//! caller's responsibility.

use std::sync::Arc;

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use sha1::Sha1;

use warden_core::clock::Clock;
use warden_core::config::TotpConfig;

type HmacSha1 = Hmac<Sha1>;

/// Characters left bare when percent-encoding URI components.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Generates, provisions, and verifies time-based one-time-password codes.
#[derive(Debug, Clone)]
pub struct TotpEngine {
    config: TotpConfig,
    clock: Arc<dyn Clock>,
}

impl TotpEngine {
    /// Creates a code engine from validated TOTP parameters.
    pub fn new(config: TotpConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Generates a fresh 160-bit secret, base32-encoded without padding.
    pub fn generate_secret(&self) -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32_NOPAD.encode(&bytes)
    }

    /// Builds the `otpauth://` provisioning URI for an account label.
    ///
    /// Issuer, digit count, and period are embedded as query parameters;
    /// label and issuer are percent-encoded.
    pub fn build_provisioning_uri(&self, account_label: &str, secret: &str) -> String {
        let issuer = utf8_percent_encode(&self.config.issuer, URI_COMPONENT);
        let label = utf8_percent_encode(account_label, URI_COMPONENT);
        format!(
            "otpauth://totp/{issuer}:{label}?secret={secret}&issuer={issuer}&digits={digits}&period={period}",
            issuer = issuer,
            label = label,
            secret = secret,
            digits = self.config.digits,
            period = self.config.period_seconds,
        )
    }

    /// Builds a QR rendering link for a provisioning URI, if a template
    /// is configured.
    pub fn build_qr_link(&self, provisioning_uri: &str) -> Option<String> {
        let template = self.config.qr_link_template.as_deref()?;
        let encoded = utf8_percent_encode(provisioning_uri, URI_COMPONENT).to_string();
        Some(template.replace("{uri}", &encoded))
    }

    /// Verifies a submitted code against the secret.
    ///
    /// Rejects codes that are not exactly `digits` decimal characters,
    /// then checks the inclusive window of time steps
    /// `[counter - W, counter + W]`, returning true on the first match.
    pub fn verify(&self, secret: &str, submitted: &str) -> bool {
        if submitted.len() != self.config.digits as usize
            || !submitted.bytes().all(|b| b.is_ascii_digit())
        {
            return false;
        }

        let key = match decode_secret(secret) {
            Some(key) => key,
            None => return false,
        };

        let counter = self.clock.now().timestamp() as u64 / self.config.period_seconds;
        let window = i64::from(self.config.window_steps);

        for delta in -window..=window {
            let candidate = counter.wrapping_add_signed(delta);
            if self.code_at(&key, candidate) == submitted {
                return true;
            }
        }

        false
    }

    /// Computes the code for a raw key at a specific time-step counter.
    ///
    /// HMAC-SHA1 of the big-endian counter with standard dynamic
    /// truncation: 4 bytes starting at the low nibble of the last hash
    /// byte, top bit masked, reduced modulo `10^digits`.
    fn code_at(&self, key: &[u8], counter: u64) -> String {
        let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key length");
        mac.update(&counter.to_be_bytes());
        let hash = mac.finalize().into_bytes();

        let offset = (hash[hash.len() - 1] & 0x0f) as usize;
        let binary = (u32::from(hash[offset] & 0x7f) << 24)
            | (u32::from(hash[offset + 1]) << 16)
            | (u32::from(hash[offset + 2]) << 8)
            | u32::from(hash[offset + 3]);

        let code = u64::from(binary) % 10u64.pow(self.config.digits);
        format!("{:0width$}", code, width = self.config.digits as usize)
    }
}

/// Decodes a base32 secret, tolerating trailing padding and lowercase.
fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let normalized = secret.trim_end_matches('=').to_ascii_uppercase();
    BASE32_NOPAD.decode(normalized.as_bytes()).ok()
}
