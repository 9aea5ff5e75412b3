//! Local belief about the remote authentication session.
//!
//! # Responsibility
//! - Define `AuthSession`, the snapshot every UI consumer reads.
//! - Own the single shared cell that holds it (`SessionCell`) and hand out
//!   read-only accessors (`SessionReader`).
//!
//! # Invariants
//! - `user` is `Some` only while `authenticated` is `true`.
//! - Only the synchronizer writes; readers cannot mutate.
//! - Each write is one atomic `send_modify` on the watch channel.
//! - A request sequence number is issued in the same write that enters
//!   `Checking`.
//! - `Checking` is left once no started check remains outstanding, whether
//!   it was applied, discarded as stale or cancelled.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Lifecycle phase of the session belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// No verification has completed yet.
    Unknown,
    /// A verification is in flight.
    Checking,
    Authenticated,
    Unauthenticated,
}

impl AuthPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Checking => "checking",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// Additional identity linked to the same account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIdentity {
    pub character_id: i64,
    pub display_name: String,
}

/// Opaque identity fields reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: i64,
    pub character_id: Option<i64>,
    pub display_name: Option<String>,
    pub linked_identities: Vec<LinkedIdentity>,
}

/// Why the last verification degraded to unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum AuthFailure {
    /// Remote explicitly reported no session.
    Denied,
    /// Remote answered with a non-auth error status (e.g. 502/503/504).
    Unavailable(u16),
    /// Request never completed (connect error, timeout).
    Network(String),
    /// Response body could not be decoded.
    Decode(String),
    /// Session was ended locally through logout.
    LoggedOut,
}

impl Display for AuthFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied => write!(f, "session denied by remote"),
            Self::Unavailable(status) => write!(f, "auth service unavailable (HTTP {status})"),
            Self::Network(details) => write!(f, "auth request failed: {details}"),
            Self::Decode(details) => write!(f, "auth response invalid: {details}"),
            Self::LoggedOut => write!(f, "logged out"),
        }
    }
}

/// Snapshot of the local session belief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    phase: AuthPhase,
    authenticated: bool,
    user: Option<UserIdentity>,
    last_checked_at_ms: Option<i64>,
    last_failure: Option<AuthFailure>,
    applied_sequence: u64,
    #[serde(skip)]
    issued_sequence: u64,
    #[serde(skip)]
    in_flight: u32,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Unknown,
            authenticated: false,
            user: None,
            last_checked_at_ms: None,
            last_failure: None,
            applied_sequence: 0,
            issued_sequence: 0,
            in_flight: 0,
        }
    }
}

impl AuthSession {
    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    /// Unix epoch milliseconds of the last applied verification result.
    pub fn last_checked_at_ms(&self) -> Option<i64> {
        self.last_checked_at_ms
    }

    pub fn last_failure(&self) -> Option<&AuthFailure> {
        self.last_failure.as_ref()
    }

    /// Request sequence number whose result this snapshot reflects.
    pub fn applied_sequence(&self) -> u64 {
        self.applied_sequence
    }

    fn begin_check(&mut self) -> u64 {
        self.issued_sequence += 1;
        self.in_flight += 1;
        self.phase = AuthPhase::Checking;
        self.issued_sequence
    }

    /// Drops one outstanding check; returns whether the phase changed.
    fn end_check(&mut self) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight > 0 || self.phase != AuthPhase::Checking {
            return false;
        }
        self.phase = if self.authenticated {
            AuthPhase::Authenticated
        } else if self.applied_sequence > 0 {
            AuthPhase::Unauthenticated
        } else {
            AuthPhase::Unknown
        };
        true
    }

    fn apply(&mut self, sequence: u64, update: SessionUpdate) {
        match update {
            SessionUpdate::Authenticated(user) => self.apply_authenticated(sequence, user),
            SessionUpdate::Unauthenticated(failure) => {
                self.apply_unauthenticated(sequence, failure)
            }
        }
    }

    fn apply_authenticated(&mut self, sequence: u64, user: Option<UserIdentity>) {
        self.phase = AuthPhase::Authenticated;
        self.authenticated = true;
        self.user = user;
        self.last_checked_at_ms = Some(now_epoch_ms());
        self.last_failure = None;
        self.applied_sequence = sequence;
    }

    fn apply_unauthenticated(&mut self, sequence: u64, failure: AuthFailure) {
        self.phase = AuthPhase::Unauthenticated;
        self.authenticated = false;
        self.user = None;
        self.last_checked_at_ms = Some(now_epoch_ms());
        self.last_failure = Some(failure);
        self.applied_sequence = sequence;
    }
}

/// Result a verification wants to write into the cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionUpdate {
    Authenticated(Option<UserIdentity>),
    Unauthenticated(AuthFailure),
}

/// Single shared cell holding the session belief.
#[derive(Debug)]
pub struct SessionCell {
    sender: watch::Sender<AuthSession>,
}

impl Default for SessionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCell {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(AuthSession::default());
        Self { sender }
    }

    /// Returns a read-only accessor.
    pub fn reader(&self) -> SessionReader {
        SessionReader {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn current(&self) -> AuthSession {
        self.sender.borrow().clone()
    }

    /// Issues the next sequence number and enters `Checking`.
    ///
    /// Dropping the ticket without `finish` (e.g. a cancelled request)
    /// still releases the check.
    pub(crate) fn begin_check(&self) -> CheckTicket<'_> {
        let mut sequence = 0;
        self.sender.send_modify(|session| sequence = session.begin_check());
        CheckTicket {
            cell: self,
            sequence,
            finished: false,
        }
    }

    /// Applies `update` under a freshly issued sequence number, superseding
    /// every check started before.
    pub(crate) fn apply_latest(&self, update: SessionUpdate) -> u64 {
        let mut sequence = 0;
        self.sender.send_modify(|session| {
            session.issued_sequence += 1;
            sequence = session.issued_sequence;
            session.apply(sequence, update);
        });
        sequence
    }
}

/// One started check, released exactly once.
#[derive(Debug)]
pub(crate) struct CheckTicket<'a> {
    cell: &'a SessionCell,
    sequence: u64,
    finished: bool,
}

impl CheckTicket<'_> {
    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Writes `update` unless `guard` rejects the current snapshot, and
    /// releases the check in the same modification.
    ///
    /// Returns whether the update was applied.
    pub(crate) fn finish(
        mut self,
        update: SessionUpdate,
        guard: impl FnOnce(&AuthSession) -> bool,
    ) -> bool {
        self.finished = true;
        let sequence = self.sequence;
        let mut applied = false;
        self.cell.sender.send_if_modified(|session| {
            let settled = session.end_check();
            if !guard(session) {
                return settled;
            }
            session.apply(sequence, update);
            applied = true;
            true
        });
        applied
    }
}

impl Drop for CheckTicket<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cell.sender.send_if_modified(AuthSession::end_check);
        }
    }
}

/// Read-only accessor for UI consumers.
#[derive(Debug, Clone)]
pub struct SessionReader {
    receiver: watch::Receiver<AuthSession>,
}

impl SessionReader {
    pub fn current(&self) -> AuthSession {
        self.receiver.borrow().clone()
    }

    /// Waits for the next write and returns the new snapshot.
    ///
    /// Returns `None` once the owning cell is gone.
    pub async fn changed(&mut self) -> Option<AuthSession> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
