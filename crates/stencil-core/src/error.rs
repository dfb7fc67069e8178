//! # Error Types
//!
//! Errors raised by the tenant guard before any request is issued.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stencil-core errors (this file)                                       │
//! │  └── GuardError       - Identity / tenant-scope violations             │
//! │                                                                         │
//! │  stencil-client errors (separate crate)                                │
//! │  ├── ApiError         - Normalized, caller-facing failure              │
//! │  └── ConfigError      - Bad or unreadable configuration                │
//! │                                                                         │
//! │  Flow: GuardError → ApiError → caller                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A guard error always means the request was never sent.

use thiserror::Error;

use crate::types::UserType;

/// Result alias for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

// =============================================================================
// Guard Error
// =============================================================================

/// Tenant guard failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// No credential is present in the session.
    #[error("Authentication required")]
    Unauthenticated,

    /// A tenant-scoped caller has no tenant in the session.
    ///
    /// ## When This Occurs
    /// - Tenant user signed in but the tenant switcher never ran
    /// - Session restored from storage without the tenant record
    #[error("Tenant context required for tenant users")]
    TenantContextMissing,

    /// A filter or payload names a tenant other than the caller's.
    ///
    /// ## User Workflow
    /// ```text
    /// list({ tenant_id: "T2" })  as tenant T1
    ///      │
    ///      ▼
    /// TenantMismatch { requested: "T2", actual: "T1" }
    ///      │
    ///      ▼
    /// UI shows: "Cannot access data from other tenants"
    /// ```
    #[error("Cannot access data from other tenants (requested {requested}, session {actual})")]
    TenantMismatch { requested: String, actual: String },

    /// A platform mutation did not say which tenant it targets.
    #[error("tenant_id is required for platform mutations")]
    TenantTargetRequired,

    /// The identity string is not one of anonymous / tenant / platform.
    #[error("Unknown user type: {0}")]
    UnknownUserType(String),

    /// The session identity does not match the service it is driving.
    #[error("Session identity {actual} cannot use a {expected} service")]
    IdentityMismatch { expected: UserType, actual: UserType },
}

impl GuardError {
    /// True when the caller asked for another tenant's data.
    pub fn is_isolation_breach(&self) -> bool {
        matches!(self, GuardError::TenantMismatch { .. })
    }

    /// True for problems with the client's own setup rather than the caller's input.
    pub fn is_context_problem(&self) -> bool {
        matches!(
            self,
            GuardError::TenantContextMissing
                | GuardError::TenantTargetRequired
                | GuardError::UnknownUserType(_)
                | GuardError::IdentityMismatch { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_both_tenants() {
        let err = GuardError::TenantMismatch {
            requested: "T2".into(),
            actual: "T1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("T2"));
        assert!(msg.contains("T1"));
        assert!(err.is_isolation_breach());
        assert!(!err.is_context_problem());
    }

    #[test]
    fn test_context_problems() {
        assert!(GuardError::TenantContextMissing.is_context_problem());
        assert!(GuardError::UnknownUserType("root".into()).is_context_problem());
        assert!(!GuardError::Unauthenticated.is_context_problem());
    }
}
