//! Session verification and reconciliation.
//!
//! # Responsibility
//! - Run one verification round trip and reconcile `AuthSession` with it.
//! - Redirect to the login route whenever the session degrades.
//! - End the session locally on logout, whatever the remote answers.
//!
//! # Invariants
//! - Every failure (deny, transport, unavailable, decode) degrades to
//!   unauthenticated; none is surfaced to callers.
//! - No redirect is issued while the navigator already shows the login route.
//! - A verification cancelled mid-flight never leaves the session in
//!   `Checking`.
//! - Under `LatestIssuedWins`, a response older than the applied one is
//!   discarded; under `LastCompletedWins`, the last to complete wins.

use crate::auth::navigator::{is_same_route, Navigator};
use crate::auth::session::{
    AuthFailure, AuthSession, CheckTicket, SessionCell, SessionReader, SessionUpdate,
};
use crate::auth::transport::AuthTransport;
use crate::config::{AuthSyncConfig, ResponseOrdering};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What caused a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyTrigger {
    Startup,
    Scheduled,
    VisibilityRegained,
    Manual,
}

impl VerifyTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Scheduled => "scheduled",
            Self::VisibilityRegained => "visibility",
            Self::Manual => "manual",
        }
    }
}

/// Result of `AuthSynchronizer::logout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// Whether the remote logout call succeeded. Local state is cleared
    /// either way.
    pub remote_acknowledged: bool,
}

/// Sole writer of the session cell.
pub struct AuthSynchronizer {
    session: SessionCell,
    transport: Arc<dyn AuthTransport>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    ordering: ResponseOrdering,
    last_completed: Mutex<Option<Instant>>,
}

impl AuthSynchronizer {
    pub fn new(
        config: &AuthSyncConfig,
        transport: Arc<dyn AuthTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            session: SessionCell::new(),
            transport,
            navigator,
            login_route: config.login_route.clone(),
            ordering: config.ordering,
            last_completed: Mutex::new(None),
        }
    }

    /// Read-only accessor for UI consumers.
    pub fn session(&self) -> SessionReader {
        self.session.reader()
    }

    pub fn snapshot(&self) -> AuthSession {
        self.session.current()
    }

    pub fn ordering(&self) -> ResponseOrdering {
        self.ordering
    }

    /// Time since the last verification completed, `None` if none has.
    pub fn elapsed_since_last_check(&self) -> Option<Duration> {
        self.with_last_completed(|last| last.map(|instant| instant.elapsed()))
    }

    /// Verifies the session against the remote and returns the snapshot
    /// after reconciliation.
    pub async fn verify(&self, trigger: VerifyTrigger) -> AuthSession {
        let ticket = self.session.begin_check();
        let sequence = ticket.sequence();
        debug!(
            "event=auth_verify module=auth status=start trigger={} seq={}",
            trigger.as_str(),
            sequence
        );

        let update = match self.transport.fetch_status().await {
            Ok(response) if response.authenticated => {
                SessionUpdate::Authenticated(response.identity())
            }
            Ok(_) => SessionUpdate::Unauthenticated(AuthFailure::Denied),
            Err(err) => {
                warn!(
                    "event=auth_verify module=auth status=error trigger={} seq={} error={}",
                    trigger.as_str(),
                    sequence,
                    err
                );
                SessionUpdate::Unauthenticated(err.into())
            }
        };

        self.complete(ticket, trigger, update)
    }

    /// Ends the session locally and remotely, then redirects to login.
    ///
    /// The local clear takes a fresh sequence number after the remote call,
    /// so verifications issued earlier cannot resurrect the session.
    pub async fn logout(&self) -> LogoutOutcome {
        let remote = self.transport.logout().await;
        if let Err(err) = &remote {
            warn!("event=auth_logout module=auth status=remote_error error={err}");
        }

        let sequence = self
            .session
            .apply_latest(SessionUpdate::Unauthenticated(AuthFailure::LoggedOut));
        info!(
            "event=auth_logout module=auth status=ok seq={} remote_ok={}",
            sequence,
            remote.is_ok()
        );
        self.redirect_to_login();

        LogoutOutcome {
            remote_acknowledged: remote.is_ok(),
        }
    }

    fn complete(
        &self,
        ticket: CheckTicket<'_>,
        trigger: VerifyTrigger,
        update: SessionUpdate,
    ) -> AuthSession {
        let sequence = ticket.sequence();
        self.with_last_completed(|last| *last = Some(Instant::now()));

        let degraded = matches!(update, SessionUpdate::Unauthenticated(_));
        let ordering = self.ordering;
        let applied = ticket.finish(update, |current| match ordering {
            ResponseOrdering::LatestIssuedWins => sequence > current.applied_sequence(),
            ResponseOrdering::LastCompletedWins => true,
        });

        if !applied {
            debug!(
                "event=auth_verify module=auth status=stale_discarded trigger={} seq={}",
                trigger.as_str(),
                sequence
            );
            return self.session.current();
        }

        let snapshot = self.session.current();
        info!(
            "event=auth_verify module=auth status=applied trigger={} seq={} phase={}",
            trigger.as_str(),
            sequence,
            snapshot.phase().as_str()
        );
        if degraded {
            self.redirect_to_login();
        }
        snapshot
    }

    fn redirect_to_login(&self) {
        let current = self.navigator.current_route();
        if is_same_route(&current, &self.login_route) {
            debug!("event=auth_redirect module=auth status=skipped reason=already_at_login");
            return;
        }
        self.navigator.redirect(&self.login_route);
        info!("event=auth_redirect module=auth status=ok");
    }

    fn with_last_completed<R>(&self, f: impl FnOnce(&mut Option<Instant>) -> R) -> R {
        match self.last_completed.lock() {
            Ok(mut last) => f(&mut last),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
