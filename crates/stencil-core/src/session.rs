//! # Session
//!
//! The client never owns credentials; it asks a [`SessionProvider`] for them
//! on every request. [`MemorySession`] is the in-process implementation used
//! by the CLI and the tests.
//!
//! ## Demo Sessions
//! ```text
//! token = "demo_token_abc"
//!      │
//!      ├─► never sent as `Authorization: Bearer ...`
//!      └─► clear_auth(false) keeps it; only clear_auth(true) removes it
//! ```

use parking_lot::RwLock;

use crate::types::{TenantInfo, UserType};
use crate::DEFAULT_DEMO_TOKEN_PREFIX;

// =============================================================================
// Provider Contract
// =============================================================================

/// Source of truth for the signed-in identity.
///
/// Implementations must be cheap to query; the client reads the session on
/// every request instead of caching it.
pub trait SessionProvider: Send + Sync {
    /// True when a token is present.
    fn is_authenticated(&self) -> bool;

    fn token(&self) -> Option<String>;

    /// Identity of the signed-in account, if any.
    fn account_type(&self) -> Option<UserType>;

    fn current_tenant(&self) -> Option<TenantInfo>;

    fn user_id(&self) -> Option<String>;

    /// Whether `token` is a demo token.
    fn is_demo_token(&self, token: &str) -> bool;

    /// Drops the credential. Without `force`, a demo token is kept.
    fn clear_auth(&self, force: bool);
}

/// True when `token` starts with `prefix`.
pub fn is_demo_token(token: &str, prefix: &str) -> bool {
    !prefix.is_empty() && token.starts_with(prefix)
}

// =============================================================================
// In-Memory Session
// =============================================================================

/// Snapshot of everything a session knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub account_type: Option<UserType>,
    pub tenant: Option<TenantInfo>,
    pub user_id: Option<String>,
}

/// Thread-safe, process-local session.
#[derive(Debug)]
pub struct MemorySession {
    state: RwLock<SessionState>,
    demo_prefix: String,
}

impl MemorySession {
    /// Empty session recognizing `demo_prefix` as the demo marker.
    pub fn new(demo_prefix: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            demo_prefix: demo_prefix.into(),
        }
    }

    /// Empty session with the default demo prefix.
    pub fn anonymous() -> Self {
        Self::new(DEFAULT_DEMO_TOKEN_PREFIX)
    }

    /// Session signed in as a tenant member.
    pub fn tenant(token: impl Into<String>, tenant: TenantInfo) -> Self {
        let session = Self::anonymous();
        session.sign_in(SessionState {
            token: Some(token.into()),
            account_type: Some(UserType::Tenant),
            tenant: Some(tenant),
            user_id: None,
        });
        session
    }

    /// Session signed in as a platform operator.
    pub fn platform(token: impl Into<String>) -> Self {
        let session = Self::anonymous();
        session.sign_in(SessionState {
            token: Some(token.into()),
            account_type: Some(UserType::Platform),
            tenant: None,
            user_id: None,
        });
        session
    }

    /// Replaces the whole session state.
    pub fn sign_in(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Switches the active tenant without touching the credential.
    pub fn set_tenant(&self, tenant: Option<TenantInfo>) {
        self.state.write().tenant = tenant;
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl SessionProvider for MemorySession {
    fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    fn account_type(&self) -> Option<UserType> {
        self.state.read().account_type
    }

    fn current_tenant(&self) -> Option<TenantInfo> {
        self.state.read().tenant.clone()
    }

    fn user_id(&self) -> Option<String> {
        self.state.read().user_id.clone()
    }

    fn is_demo_token(&self, token: &str) -> bool {
        is_demo_token(token, &self.demo_prefix)
    }

    fn clear_auth(&self, force: bool) {
        let mut state = self.state.write();
        let keep = !force
            && state
                .token
                .as_deref()
                .is_some_and(|token| is_demo_token(token, &self.demo_prefix));
        if !keep {
            *state = SessionState::default();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_session_reports_identity() {
        let session = MemorySession::tenant("tok", TenantInfo::new("T1", "acme"));
        assert!(session.is_authenticated());
        assert_eq!(session.account_type(), Some(UserType::Tenant));
        assert_eq!(session.current_tenant().unwrap().id, "T1");
    }

    #[test]
    fn test_clear_auth_keeps_demo_token_unless_forced() {
        let session = MemorySession::tenant("demo_token_abc", TenantInfo::new("T1", "acme"));
        session.clear_auth(false);
        assert_eq!(session.token().as_deref(), Some("demo_token_abc"));

        session.clear_auth(true);
        assert!(!session.is_authenticated());
        assert!(session.current_tenant().is_none());
    }

    #[test]
    fn test_clear_auth_drops_real_token() {
        let session = MemorySession::platform("real");
        session.clear_auth(false);
        assert_eq!(session.snapshot(), SessionState::default());
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        assert!(!is_demo_token("anything", ""));
        assert!(is_demo_token("demo_token_1", DEFAULT_DEMO_TOKEN_PREFIX));
    }
}
