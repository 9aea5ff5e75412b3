//! Background driver: scheduled and visibility-triggered verification.
//!
//! # Responsibility
//! - Poll the synchronizer on a fixed interval while the surface is visible.
//! - Force one immediate check when visibility returns after the threshold.
//! - Release the timer, the visibility subscription and every in-flight
//!   verification when the handle shuts down or is dropped.
//!
//! # Invariants
//! - No scheduled verification runs while hidden.
//! - Regaining visibility triggers at most one verification; missed ticks
//!   are never replayed.
//! - Overlapping verifications are allowed; ordering is the synchronizer's
//!   concern.

use crate::auth::session::{AuthSession, SessionReader};
use crate::auth::synchronizer::{AuthSynchronizer, LogoutOutcome, VerifyTrigger};
use crate::config::AuthSyncConfig;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Foreground state of the consuming surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Owner of the running driver task.
///
/// Dropping the handle aborts the driver and its in-flight verifications.
pub struct AuthSyncHandle {
    synchronizer: Arc<AuthSynchronizer>,
    visibility: watch::Sender<Visibility>,
    manual: mpsc::UnboundedSender<()>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AuthSyncHandle {
    /// Spawns the driver on the current tokio runtime.
    ///
    /// Must be called from within a runtime context. When `initial` is
    /// visible, a startup verification runs immediately.
    pub fn start(
        synchronizer: Arc<AuthSynchronizer>,
        config: &AuthSyncConfig,
        initial: Visibility,
    ) -> Self {
        let (visibility_tx, visibility_rx) = watch::channel(initial);
        let (manual_tx, manual_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let driver = Driver {
            synchronizer: Arc::clone(&synchronizer),
            poll_interval: config.poll_interval,
            recheck_after: config.visibility_recheck_after,
            in_flight: JoinSet::new(),
        };
        let task = tokio::spawn(driver.run(visibility_rx, manual_rx, shutdown_rx));
        info!(
            "event=auth_sync_start module=auth status=ok poll_secs={} recheck_secs={} ordering={}",
            config.poll_interval.as_secs(),
            config.visibility_recheck_after.as_secs(),
            config.ordering.as_str()
        );

        Self {
            synchronizer,
            visibility: visibility_tx,
            manual: manual_tx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn session(&self) -> SessionReader {
        self.synchronizer.session()
    }

    pub fn snapshot(&self) -> AuthSession {
        self.synchronizer.snapshot()
    }

    pub fn synchronizer(&self) -> &Arc<AuthSynchronizer> {
        &self.synchronizer
    }

    /// Reports a foreground/background transition.
    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility.send_if_modified(|current| {
            if *current == visibility {
                return false;
            }
            *current = visibility;
            true
        });
    }

    /// Queues a manual verification on the driver; returns immediately.
    pub fn request_verify(&self) {
        let _ = self.manual.send(());
    }

    /// Runs a manual verification and waits for its result.
    pub async fn verify_now(&self) -> AuthSession {
        self.synchronizer.verify(VerifyTrigger::Manual).await
    }

    pub async fn logout(&self) -> LogoutOutcome {
        self.synchronizer.logout().await
    }

    /// Stops the driver and waits until it has released its resources.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if err.is_panic() {
                    error!("event=auth_sync_stop module=auth status=error reason=driver_panic");
                }
            }
        }
    }
}

impl Drop for AuthSyncHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Driver {
    synchronizer: Arc<AuthSynchronizer>,
    poll_interval: Duration,
    recheck_after: Duration,
    in_flight: JoinSet<()>,
}

impl Driver {
    async fn run(
        mut self,
        mut visibility_rx: watch::Receiver<Visibility>,
        mut manual_rx: mpsc::UnboundedReceiver<()>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let mut visible = *visibility_rx.borrow_and_update() == Visibility::Visible;
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if visible {
            self.spawn_verify(VerifyTrigger::Startup);
        }

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick(), if visible => {
                    self.spawn_verify(VerifyTrigger::Scheduled);
                }
                changed = visibility_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now_visible = *visibility_rx.borrow_and_update() == Visibility::Visible;
                    if now_visible && !visible && self.check_is_stale() {
                        self.spawn_verify(VerifyTrigger::VisibilityRegained);
                        ticker.reset();
                    }
                    visible = now_visible;
                }
                request = manual_rx.recv() => match request {
                    Some(()) => self.spawn_verify(VerifyTrigger::Manual),
                    None => break,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            error!("event=auth_verify module=auth status=error reason=task_panic");
                        }
                    }
                }
            }
        }

        self.in_flight.shutdown().await;
        info!("event=auth_sync_stop module=auth status=ok");
    }

    fn check_is_stale(&self) -> bool {
        self.synchronizer
            .elapsed_since_last_check()
            .map_or(true, |elapsed| elapsed > self.recheck_after)
    }

    fn spawn_verify(&mut self, trigger: VerifyTrigger) {
        let synchronizer = Arc::clone(&self.synchronizer);
        self.in_flight.spawn(async move {
            synchronizer.verify(trigger).await;
        });
    }
}
