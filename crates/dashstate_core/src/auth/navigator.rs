//! Navigation seam used for redirect-to-login.
//!
//! # Invariants
//! - The synchronizer never redirects while the navigator already shows the
//!   login route.

use std::collections::VecDeque;
use std::sync::Mutex;

/// UI navigation as seen by the synchronizer.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    fn redirect(&self, route: &str);
}

/// Returns whether `current` names the same route as `login_route`.
///
/// Query string, fragment and trailing slash are ignored.
pub fn is_same_route(current: &str, login_route: &str) -> bool {
    normalize_route(current) == normalize_route(login_route)
}

fn normalize_route(route: &str) -> &str {
    let path = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[derive(Debug, Default)]
struct RedirectState {
    current_route: String,
    pending: VecDeque<String>,
}

/// Navigator that records redirects for a UI shell to drain.
///
/// A redirect updates the tracked route right away, so repeated failures do
/// not queue repeated redirects before the UI reports a new route.
#[derive(Debug, Default)]
pub struct RedirectQueue {
    state: Mutex<RedirectState>,
}

impl RedirectQueue {
    pub fn new(initial_route: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(RedirectState {
                current_route: initial_route.into(),
                pending: VecDeque::new(),
            }),
        }
    }

    /// Called by the UI after it navigates on its own.
    pub fn set_current_route(&self, route: impl Into<String>) {
        self.with_state(|state| state.current_route = route.into());
    }

    /// Pops the oldest pending redirect.
    pub fn take_redirect(&self) -> Option<String> {
        self.with_state(|state| state.pending.pop_front())
    }

    pub fn pending_len(&self) -> usize {
        self.with_state(|state| state.pending.len())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RedirectState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Navigator for RedirectQueue {
    fn current_route(&self) -> String {
        self.with_state(|state| state.current_route.clone())
    }

    fn redirect(&self, route: &str) {
        self.with_state(|state| {
            state.current_route = route.to_string();
            state.pending.push_back(route.to_string());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{is_same_route, Navigator, RedirectQueue};

    #[test]
    fn same_route_ignores_query_fragment_and_trailing_slash() {
        assert!(is_same_route("/login", "/login"));
        assert!(is_same_route("/login/?next=%2Fmail", "/login"));
        assert!(is_same_route("/login#sso", "/login/"));
        assert!(!is_same_route("/login-help", "/login"));
        assert!(!is_same_route("/dashboard", "/login"));
    }

    #[test]
    fn redirect_queue_tracks_route_and_drains_fifo() {
        let queue = RedirectQueue::new("/dashboard");
        queue.redirect("/login");
        assert_eq!(queue.current_route(), "/login");
        assert_eq!(queue.take_redirect().as_deref(), Some("/login"));
        assert_eq!(queue.take_redirect(), None);

        queue.set_current_route("/mail");
        assert_eq!(queue.current_route(), "/mail");
    }
}
