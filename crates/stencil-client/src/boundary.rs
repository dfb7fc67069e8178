//! UI boundary: the hook through which the session policy asks the host
//! application to send the user to the login screen.

use parking_lot::Mutex;

/// Why a login redirect was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// A real token was rejected with 401.
    SessionExpired,
    /// The backend reported a tenant isolation violation.
    IsolationViolation,
}

/// Host application hooks used by the session policy.
pub trait UiBoundary: Send + Sync {
    /// Whether the active view needs an authenticated context.
    fn requires_authentication(&self) -> bool;

    fn redirect_to_login(&self, reason: RedirectReason);
}

/// Boundary with a fixed answer that records redirect requests.
///
/// Used by the CLI, which has no login screen, and by tests.
#[derive(Debug, Default)]
pub struct StaticBoundary {
    requires_auth: bool,
    redirects: Mutex<Vec<RedirectReason>>,
}

impl StaticBoundary {
    pub fn new(requires_auth: bool) -> Self {
        Self {
            requires_auth,
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Redirects requested so far, oldest first.
    pub fn redirects(&self) -> Vec<RedirectReason> {
        self.redirects.lock().clone()
    }
}

impl UiBoundary for StaticBoundary {
    fn requires_authentication(&self) -> bool {
        self.requires_auth
    }

    fn redirect_to_login(&self, reason: RedirectReason) {
        self.redirects.lock().push(reason);
    }
}
