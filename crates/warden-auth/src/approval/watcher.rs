//! Approval resolution watcher.
//!
//! Two independently cancellable timers per pending approval: a poller
//! reading the session status on a fixed interval, and a one-shot
//! kick-after timeout. Whichever resolves first wins; the loser's
//! action is a no-op guarded by a shared resolution flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use warden_core::config::ApprovalConfig;
use warden_core::traits::{ApprovalSessionStore, CapabilityControl, DisconnectReason};
use warden_entity::ApprovalStatus;

use crate::freeze::{FreezeController, HoldKind};

/// Everything a watcher needs, detached from the flow that spawned it.
pub(super) struct WatcherContext {
    pub sessions: Arc<dyn ApprovalSessionStore>,
    pub control: Arc<dyn CapabilityControl>,
    pub freeze: FreezeController,
    pub watchers: Arc<DashMap<Uuid, WatcherHandle>>,
    pub config: ApprovalConfig,
}

/// Registered cancellation handle for one join's watcher pair.
///
/// The generation lets a finished task evict only the entry it was
/// registered under; a rejoin replaces the handle, and the stale tasks'
/// cleanup must not remove the replacement.
pub(super) struct WatcherHandle {
    pub generation: u64,
    pub cancel: watch::Sender<()>,
}

/// Spawns the poller and timeout tasks for one pending approval.
///
/// Returns the cancellation handle; sending on it (or dropping it) stops
/// both tasks.
pub(super) fn spawn(ctx: WatcherContext, player_id: Uuid, generation: u64) -> watch::Sender<()> {
    let (cancel_tx, cancel_rx) = watch::channel(());
    let resolved = Arc::new(AtomicBool::new(false));

    tokio::spawn(run_poller(
        ctx.sessions.clone(),
        ctx.control.clone(),
        ctx.freeze.clone(),
        ctx.watchers.clone(),
        ctx.config.poll_interval_ms,
        player_id,
        generation,
        resolved.clone(),
        cancel_rx.clone(),
    ));

    tokio::spawn(run_timeout(
        ctx.control,
        ctx.watchers,
        ctx.config.kick_after_seconds,
        player_id,
        generation,
        resolved,
        cancel_rx,
    ));

    cancel_tx
}

#[allow(clippy::too_many_arguments)]
async fn run_poller(
    sessions: Arc<dyn ApprovalSessionStore>,
    control: Arc<dyn CapabilityControl>,
    freeze: FreezeController,
    watchers: Arc<DashMap<Uuid, WatcherHandle>>,
    poll_interval_ms: u64,
    player_id: Uuid,
    generation: u64,
    resolved: Arc<AtomicBool>,
    mut cancel: watch::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(poll_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; skip it so a resolution written
    // in the same instant as the join is still observed on a real tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            _ = ticker.tick() => {
                match sessions.latest_status(player_id).await {
                    Ok(Some(ApprovalStatus::Approved)) => {
                        if claim(&resolved) {
                            info!(player_id = %player_id, "Approval granted; lifting hold");
                            freeze.release(player_id, HoldKind::OutOfBand).await;
                        }
                        break;
                    }
                    Ok(Some(ApprovalStatus::Denied)) => {
                        if claim(&resolved) {
                            warn!(player_id = %player_id, "Approval denied; disconnecting");
                            control.disconnect(player_id, DisconnectReason::ApprovalDenied).await;
                        }
                        break;
                    }
                    Ok(_) => {
                        if !control.is_connected(player_id).await {
                            debug!(player_id = %player_id, "Subject departed while pending; stopping watcher");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Approval status read failed; no decision yet");
                    }
                }
            }
        }
    }

    watchers.remove_if(&player_id, |_, handle| handle.generation == generation);
}

async fn run_timeout(
    control: Arc<dyn CapabilityControl>,
    watchers: Arc<DashMap<Uuid, WatcherHandle>>,
    kick_after_seconds: u64,
    player_id: Uuid,
    generation: u64,
    resolved: Arc<AtomicBool>,
    mut cancel: watch::Receiver<()>,
) {
    tokio::select! {
        _ = cancel.changed() => return,
        _ = tokio::time::sleep(Duration::from_secs(kick_after_seconds)) => {}
    }

    if claim(&resolved) {
        warn!(player_id = %player_id, "No approval before deadline; disconnecting");
        control
            .disconnect(player_id, DisconnectReason::ApprovalTimeout)
            .await;
        watchers.remove_if(&player_id, |_, handle| handle.generation == generation);
    }
}

/// Atomically claims the right to act on this approval attempt.
fn claim(resolved: &AtomicBool) -> bool {
    resolved
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}
