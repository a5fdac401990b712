//! Account flow tests: setup, confirmation, disable, and messenger
//! linking.

mod common;

use warden_auth::account::{ConfirmOutcome, DisableOutcome};
use warden_core::clock::Clock;
use warden_core::error::ErrorKind;
use warden_core::traits::{TrustedDeviceStore, UserCredentialStore};
use warden_entity::SecretBlob;

use common::{code_for, gated_subject, Harness, HarnessConfig};

#[tokio::test]
async fn test_setup_and_confirm() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let setup = h.accounts.begin_setup(&subject).await.unwrap();
    assert!(setup.provisioning_uri.starts_with("otpauth://totp/"));
    assert!(setup.provisioning_uri.contains(&setup.secret));

    // Not yet enforced, but verification is pending.
    let status = h.accounts.status(subject.id).await.unwrap();
    assert!(!status.enabled);
    assert!(status.pending);

    assert_eq!(
        h.accounts.confirm(&subject, "not-a-code").await.unwrap(),
        ConfirmOutcome::InvalidCode
    );

    let code = code_for(&setup.secret, h.clock.now(), 6, 30);
    assert_eq!(
        h.accounts.confirm(&subject, &code).await.unwrap(),
        ConfirmOutcome::Enabled
    );

    let status = h.accounts.status(subject.id).await.unwrap();
    assert!(status.enabled);
    assert!(status.verified);
    assert!(!status.pending);

    // The confirm call remembered the device fingerprint.
    let devices = h.devices.delete_all(subject.id).await.unwrap();
    assert_eq!(devices, 1);
}

#[tokio::test]
async fn test_confirm_without_setup() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    assert_eq!(
        h.accounts.confirm(&subject, "123456").await.unwrap(),
        ConfirmOutcome::NotConfigured
    );
}

#[tokio::test]
async fn test_secret_is_encrypted_at_rest_with_key() {
    let mut config = HarnessConfig::default();
    config.master_key = Some((0u8..32).collect());
    let h = Harness::with(config);
    let subject = gated_subject("steve", "10.0.0.1");

    let setup = h.accounts.begin_setup(&subject).await.unwrap();
    let stored = h.credentials.get_secret(subject.id).await.unwrap().unwrap();
    assert!(stored.is_encrypted());

    let code = code_for(&setup.secret, h.clock.now(), 6, 30);
    assert_eq!(
        h.accounts.confirm(&subject, &code).await.unwrap(),
        ConfirmOutcome::Enabled
    );
}

#[tokio::test]
async fn test_disable_requires_valid_code() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let setup = h.accounts.begin_setup(&subject).await.unwrap();
    let code = code_for(&setup.secret, h.clock.now(), 6, 30);
    h.accounts.confirm(&subject, &code).await.unwrap();

    assert_eq!(
        h.accounts.disable(&subject, "000000").await.unwrap(),
        DisableOutcome::InvalidCode
    );
    assert!(h.accounts.status(subject.id).await.unwrap().enabled);

    let code = code_for(&setup.secret, h.clock.now(), 6, 30);
    assert_eq!(
        h.accounts.disable(&subject, &code).await.unwrap(),
        DisableOutcome::Disabled
    );

    let status = h.accounts.status(subject.id).await.unwrap();
    assert!(!status.enabled);
    assert!(h.credentials.get_secret(subject.id).await.unwrap().is_none());

    // Trusted devices were forgotten with the credential.
    assert_eq!(h.devices.delete_all(subject.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_disable_when_not_enabled() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    assert_eq!(
        h.accounts.disable(&subject, "123456").await.unwrap(),
        DisableOutcome::NotEnabled
    );
}

#[tokio::test]
async fn test_force_disable_clears_everything() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let setup = h.accounts.begin_setup(&subject).await.unwrap();
    let code = code_for(&setup.secret, h.clock.now(), 6, 30);
    h.accounts.confirm(&subject, &code).await.unwrap();

    h.accounts.force_disable(subject.id).await.unwrap();

    let status = h.accounts.status(subject.id).await.unwrap();
    assert!(!status.enabled);
    assert!(!status.verified);
    assert_eq!(h.devices.delete_all(subject.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_legacy_plaintext_secret_still_verifies() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    // A record written before blobs carried tags.
    let secret = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
    h.credentials
        .upsert_secret(subject.id, Some(SecretBlob::new(secret.as_bytes().to_vec())), true)
        .await
        .unwrap();

    let code = code_for(secret, h.clock.now(), 6, 30);
    assert_eq!(
        h.accounts.confirm(&subject, &code).await.unwrap(),
        ConfirmOutcome::Verified
    );
}

#[tokio::test]
async fn test_encrypted_secret_without_key_cannot_verify() {
    let mut config = HarnessConfig::default();
    config.master_key = Some((0u8..32).collect());
    let writer = Harness::with(config);
    let subject = gated_subject("steve", "10.0.0.1");

    writer.accounts.begin_setup(&subject).await.unwrap();
    let stored = writer.credentials.get_secret(subject.id).await.unwrap().unwrap();

    // Same record read by an instance with no key configured.
    let reader = Harness::new();
    reader
        .credentials
        .upsert_secret(subject.id, Some(stored), false)
        .await
        .unwrap();

    let err = reader.accounts.confirm(&subject, "123456").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test]
async fn test_link_lifecycle() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let issued = h.accounts.link(&subject).await.unwrap();
    assert!(issued.deep_link.contains("t.me/WardenAuthBot"));

    let challenge = h
        .flow
        .complete_link(&issued.token, 42, Some("steve_tg"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(challenge.player_id, subject.id);
    assert_eq!(challenge.player_name.as_deref(), Some("steve"));

    let link = h.accounts.link_status(subject.id).await.unwrap().unwrap();
    assert_eq!(link.messenger_id, 42);
    assert!(h.accounts.status(subject.id).await.unwrap().linked);

    // Linking twice is a conflict until the link is removed.
    assert_eq!(
        h.accounts.link(&subject).await.unwrap_err().kind,
        ErrorKind::Conflict
    );

    h.accounts.unlink(subject.id).await.unwrap();
    assert!(h.accounts.link_status(subject.id).await.unwrap().is_none());
}
