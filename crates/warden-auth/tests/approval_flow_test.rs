//! Out-of-band approval flow tests: challenge lifecycle and the
//! poller/timeout race.

mod common;

use std::time::Duration as StdDuration;

use chrono::Duration;

use warden_auth::approval::JoinApproval;
use warden_core::error::ErrorKind;
use warden_core::traits::{DisconnectReason, MessengerLinkStore};

use common::{gated_subject, Harness, HarnessConfig};

fn race_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.approval.kick_after_seconds = 5;
    config.approval.poll_interval_ms = 500;
    config
}

#[tokio::test]
async fn test_challenge_token_single_use() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let issued = h.flow.issue_challenge(subject.id, Some("steve")).await.unwrap();
    assert_eq!(issued.token.len(), 16);
    assert!(issued.deep_link.contains(&issued.token));

    // Resolving just before expiry returns the original identity.
    h.clock.advance(Duration::seconds(599));
    let challenge = h.flow.resolve_challenge(&issued.token).await.unwrap();
    assert_eq!(challenge.unwrap().player_id, subject.id);

    // The token was consumed; a second resolve finds nothing.
    assert!(h.flow.resolve_challenge(&issued.token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_challenge_is_as_if_never_issued() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let issued = h.flow.issue_challenge(subject.id, None).await.unwrap();

    h.clock.advance(Duration::seconds(601));
    assert!(h.flow.resolve_challenge(&issued.token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cleanup_reaps_only_expired_challenges() {
    let h = Harness::new();
    let stale = gated_subject("steve", "10.0.0.1");
    let fresh = gated_subject("alex", "10.0.0.2");

    h.flow.issue_challenge(stale.id, None).await.unwrap();
    h.clock.advance(Duration::seconds(300));
    let live = h.flow.issue_challenge(fresh.id, None).await.unwrap();

    // Only the first token is past its 600s TTL.
    h.clock.advance(Duration::seconds(301));
    assert_eq!(h.flow.purge_expired_challenges().await.unwrap(), 1);
    assert_eq!(h.flow.purge_expired_challenges().await.unwrap(), 0);
    assert!(h.flow.resolve_challenge(&live.token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_challenge_conflicts_with_existing_link() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    let issued = h.flow.issue_challenge(subject.id, None).await.unwrap();
    let challenge = h.flow.complete_link(&issued.token, 42, Some("steve_tg")).await.unwrap();
    assert_eq!(challenge.unwrap().player_id, subject.id);

    let err = h.flow.issue_challenge(subject.id, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    h.flow.unlink(subject.id).await.unwrap();
    assert!(h.flow.issue_challenge(subject.id, None).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_approval_before_deadline_wins_the_race() {
    let h = Harness::with(race_config());
    let subject = gated_subject("steve", "10.0.0.1");
    h.links.upsert(subject.id, 42, Some("steve_tg")).await.unwrap();

    let outcome = h.flow.on_join(&subject).await;
    assert_eq!(outcome, JoinApproval::Pending);
    assert!(h.freeze.is_frozen(subject.id));
    assert_eq!(h.control.freezes.lock().unwrap().len(), 1);

    // Approval arrives at t=3s, inside the 5s deadline.
    tokio::time::sleep(StdDuration::from_secs(3)).await;
    h.flow.mark_approved(subject.id).await.unwrap();

    tokio::time::sleep(StdDuration::from_secs(1)).await;
    assert!(!h.freeze.is_frozen(subject.id));
    assert_eq!(h.control.unfreezes.lock().unwrap().len(), 1);

    // The t=5s timeout must be a no-op.
    tokio::time::sleep(StdDuration::from_secs(5)).await;
    assert_eq!(h.control.disconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_disconnects_exactly_once() {
    let h = Harness::with(race_config());
    let subject = gated_subject("steve", "10.0.0.1");
    h.links.upsert(subject.id, 42, None).await.unwrap();

    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);

    tokio::time::sleep(StdDuration::from_secs(10)).await;
    let disconnects = h.control.disconnects.lock().unwrap().clone();
    assert_eq!(disconnects, vec![(subject.id, DisconnectReason::ApprovalTimeout)]);
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_without_quit_still_times_out() {
    let h = Harness::with(race_config());
    let subject = gated_subject("steve", "10.0.0.1");
    h.links.upsert(subject.id, 42, None).await.unwrap();

    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);

    // A second join replaces the watcher; the replaced tasks must not
    // tear down the new one's cancellation handle.
    tokio::time::sleep(StdDuration::from_secs(1)).await;
    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);

    tokio::time::sleep(StdDuration::from_secs(20)).await;
    let disconnects = h.control.disconnects.lock().unwrap().clone();
    assert_eq!(disconnects, vec![(subject.id, DisconnectReason::ApprovalTimeout)]);
}

#[tokio::test(start_paused = true)]
async fn test_denial_disconnects_and_timeout_is_noop() {
    let h = Harness::with(race_config());
    let subject = gated_subject("steve", "10.0.0.1");
    h.links.upsert(subject.id, 42, None).await.unwrap();

    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);

    tokio::time::sleep(StdDuration::from_secs(1)).await;
    h.flow.mark_denied(subject.id).await.unwrap();

    tokio::time::sleep(StdDuration::from_secs(9)).await;
    let disconnects = h.control.disconnects.lock().unwrap().clone();
    assert_eq!(disconnects, vec![(subject.id, DisconnectReason::ApprovalDenied)]);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_watchers() {
    let h = Harness::with(race_config());
    let subject = gated_subject("steve", "10.0.0.1");
    h.links.upsert(subject.id, 42, None).await.unwrap();

    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);

    tokio::time::sleep(StdDuration::from_secs(1)).await;
    h.flow.on_disconnect(subject.id);

    // Neither the poller nor the timeout acts on a departed subject.
    tokio::time::sleep(StdDuration::from_secs(10)).await;
    assert_eq!(h.control.disconnect_count(), 0);
    assert_eq!(h.control.unfreezes.lock().unwrap().len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recent_approval_pre_approves_next_join() {
    let h = Harness::with(race_config());
    let subject = gated_subject("steve", "10.0.0.1");
    h.links.upsert(subject.id, 42, None).await.unwrap();

    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);
    tokio::time::sleep(StdDuration::from_secs(1)).await;
    h.flow.mark_approved(subject.id).await.unwrap();
    tokio::time::sleep(StdDuration::from_secs(1)).await;
    h.flow.on_disconnect(subject.id);

    // Rejoining inside the approval cooldown skips the whole flow.
    h.clock.advance(Duration::minutes(30));
    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::PreApproved);

    // Past the cooldown it is required again.
    h.clock.advance(Duration::minutes(31));
    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::Pending);
}

#[tokio::test]
async fn test_unlinked_identity_skips_flow() {
    let h = Harness::new();
    let subject = gated_subject("steve", "10.0.0.1");

    assert_eq!(h.flow.on_join(&subject).await, JoinApproval::NotRequired);
    assert!(!h.freeze.is_frozen(subject.id));
}
