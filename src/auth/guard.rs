//! Navigation policy.
//!
//! `AccessGuard` turns a route's declared requirements plus the current
//! session state into a redirect decision. Rules are evaluated in a fixed
//! order; the first matching redirect wins.

use tracing::debug;

use super::session::SessionStore;

/// Requirements a route declares about who may visit it.
#[derive(Debug, Clone, Default)]
pub struct RouteRules {
    /// Route requires a signed-in session.
    pub requires_auth: bool,
    /// Route is only for unauthenticated visitors (login, register).
    pub guest_only: bool,
    /// When non-empty, only sessions with one of these roles may visit.
    pub roles: Vec<String>,
}

/// Outcome of a navigation policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send to the login screen, remembering where the visitor was headed.
    RedirectToLogin { return_to: String },
    RedirectToDashboard,
}

pub struct AccessGuard {
    store: SessionStore,
}

impl AccessGuard {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Decide whether a navigation to `path` may proceed.
    pub fn decide(&self, rules: &RouteRules, path: &str) -> GuardDecision {
        // Lazy eviction: a token that can neither be used nor renewed is
        // dropped on navigation rather than on a timer.
        let session = self.store.current();
        if !session.token.is_empty() && !self.store.is_token_valid() && !self.store.can_refresh() {
            debug!("Evicting unusable session on navigation");
            self.store.clear();
        }

        if rules.requires_auth && !self.store.is_authenticated() {
            return GuardDecision::RedirectToLogin {
                return_to: path.to_string(),
            };
        }

        if rules.guest_only && self.store.is_authenticated() {
            return GuardDecision::RedirectToDashboard;
        }

        if !rules.roles.is_empty() {
            let allowed = self
                .store
                .role()
                .map(|role| rules.roles.contains(&role))
                .unwrap_or(false);
            if !allowed {
                return GuardDecision::RedirectToDashboard;
            }
        }

        GuardDecision::Allow
    }
}
