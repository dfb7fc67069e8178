//! # Identity Types
//!
//! The three caller identities, the resolved auth context and the response
//! envelopes the backend wraps its payloads in.
//!
//! ## Identity Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UserType     Credential          Scope                Prefix           │
//! │  ─────────    ─────────────────   ──────────────────   ──────────       │
//! │  anonymous    none                public content       /public/...      │
//! │  tenant       bearer + tenant id  exactly one tenant   /...             │
//! │  platform     bearer              every tenant         /platform/...    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::GuardError;

// =============================================================================
// User Type
// =============================================================================

/// Caller identity. Parsing an unrecognized value fails instead of
/// defaulting, so a typo never silently downgrades a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Unauthenticated visitor of the public site.
    Anonymous,
    /// Member of exactly one tenant.
    Tenant,
    /// Platform operator with cross-tenant reach.
    Platform,
}

impl UserType {
    /// Every identity, in privilege order.
    pub const ALL: [UserType; 3] = [UserType::Anonymous, UserType::Tenant, UserType::Platform];

    /// Wire name, also sent as the `X-User-Type` header.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UserType::Anonymous => "anonymous",
            UserType::Tenant => "tenant",
            UserType::Platform => "platform",
        }
    }

    /// Whether this identity carries a credential.
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, UserType::Anonymous)
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anonymous" => Ok(UserType::Anonymous),
            "tenant" => Ok(UserType::Tenant),
            "platform" => Ok(UserType::Platform),
            _ => Err(GuardError::UnknownUserType(s.to_string())),
        }
    }
}

// =============================================================================
// Tenant + Auth Context
// =============================================================================

/// Tenant record held by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantInfo {
    /// Tenant id as the backend knows it.
    pub id: String,
    /// Optional UUID form of the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// URL slug, sent as `X-Tenant-Slug`.
    pub slug: String,
}

impl TenantInfo {
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: None,
            slug: slug.into(),
        }
    }
}

/// Derived view of the session for one operation.
///
/// Built fresh per call by [`crate::guard::get_auth_context`], never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_type: UserType,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
}

impl AuthContext {
    /// Context for a caller with no credential.
    pub fn anonymous() -> Self {
        Self {
            user_type: UserType::Anonymous,
            tenant_id: None,
            user_id: None,
        }
    }

    pub fn is_tenant(&self) -> bool {
        self.user_type == UserType::Tenant
    }

    pub fn is_platform(&self) -> bool {
        self.user_type == UserType::Platform
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

// =============================================================================
// Envelopes
// =============================================================================

/// Standard `{ data, message, success, errors }` response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApiEnvelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

fn default_true() -> bool {
    true
}

/// Paginated collection as returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

/// Pagination metadata, after key conversion to camelCase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub current_page: u64,
    #[serde(default)]
    pub per_page: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub last_page: u64,
}

/// Strips the `{ success, data }` wrapper when present.
///
/// Bodies without a `data` key are returned as-is.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_type_round_trips_through_str() {
        for user_type in UserType::ALL {
            assert_eq!(user_type.as_str().parse::<UserType>().unwrap(), user_type);
        }
        assert_eq!(" Tenant ".parse::<UserType>().unwrap(), UserType::Tenant);
    }

    #[test]
    fn test_unknown_user_type_is_rejected() {
        let err = "admin".parse::<UserType>().unwrap_err();
        assert_eq!(err, GuardError::UnknownUserType("admin".into()));
    }

    #[test]
    fn test_user_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(UserType::Platform).unwrap(), json!("platform"));
    }

    #[test]
    fn test_unwrap_data() {
        assert_eq!(unwrap_data(json!({"success": true, "data": {"id": 1}})), json!({"id": 1}));
        assert_eq!(unwrap_data(json!({"id": 1})), json!({"id": 1}));
        assert_eq!(unwrap_data(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_paginated_tolerates_missing_meta() {
        let page: Paginated<Value> = serde_json::from_value(json!({"data": [1]})).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.meta.is_none());
    }
}
