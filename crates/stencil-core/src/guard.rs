//! # Tenant Guard
//!
//! Client-side checks that keep a tenant caller inside its own tenant.
//!
//! ## Where Each Check Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation     Check                         On violation               │
//! │  ───────────   ───────────────────────────   ─────────────────────────  │
//! │  any           get_auth_context              Unauthenticated /          │
//! │                                              TenantContextMissing       │
//! │  list / query  validate_filters              TenantMismatch (reject)    │
//! │  create/update enforce_mutation_tenant       overwrite (tenant) or      │
//! │                                              TenantTargetRequired       │
//! │  responses     validate_response_ownership   TenantMismatch, when the   │
//! │                                              payload names a tenant     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Filters are rejected but mutation payloads are coerced: a query for
//! another tenant is almost always a bug worth surfacing, while a stale
//! `tenant_id` in a form is simply replaced.
//!
//! All functions here are pure. Logging happens in the caller.

use serde_json::{Map, Value};

use crate::error::{GuardError, GuardResult};
use crate::session::SessionProvider;
use crate::types::{AuthContext, UserType};
use crate::TENANT_ID_FIELD;

// =============================================================================
// Auth Context
// =============================================================================

/// Builds the auth context for one operation.
///
/// A session without an account type is treated as anonymous.
///
/// # Errors
/// - [`GuardError::Unauthenticated`] when no token is present
/// - [`GuardError::TenantContextMissing`] when `require_tenant` is set for a
///   tenant caller whose session has no tenant
pub fn get_auth_context(
    session: &dyn SessionProvider,
    require_tenant: bool,
) -> GuardResult<AuthContext> {
    if !session.is_authenticated() {
        return Err(GuardError::Unauthenticated);
    }

    let user_type = session.account_type().unwrap_or(UserType::Anonymous);
    let tenant_id = session.current_tenant().map(|tenant| tenant.id);

    if user_type == UserType::Tenant && require_tenant && tenant_id.is_none() {
        return Err(GuardError::TenantContextMissing);
    }

    Ok(AuthContext {
        user_type,
        tenant_id,
        user_id: session.user_id(),
    })
}

/// Checks that the session identity is the one a service was built for.
pub fn expect_identity(ctx: &AuthContext, expected: UserType) -> GuardResult<()> {
    if ctx.user_type == expected {
        Ok(())
    } else {
        Err(GuardError::IdentityMismatch {
            expected,
            actual: ctx.user_type,
        })
    }
}

// =============================================================================
// Filters (reject)
// =============================================================================

/// Rejects filters that name a tenant other than the caller's.
///
/// Only tenant callers are constrained; platform filters pass untouched.
/// A `null` tenant filter counts as absent.
pub fn validate_filters(filters: &Map<String, Value>, ctx: &AuthContext) -> GuardResult<()> {
    if !ctx.is_tenant() {
        return Ok(());
    }
    match filters.get(TENANT_ID_FIELD) {
        None | Some(Value::Null) => Ok(()),
        Some(value) => ensure_same_tenant(value, ctx),
    }
}

/// Pins a tenant caller's filters to its own tenant.
///
/// Call after [`validate_filters`]; this never widens scope.
pub fn scope_filters(filters: &mut Map<String, Value>, ctx: &AuthContext) {
    if let (true, Some(tenant_id)) = (ctx.is_tenant(), ctx.tenant_id()) {
        filters.insert(TENANT_ID_FIELD.to_string(), Value::String(tenant_id.to_string()));
    }
}

// =============================================================================
// Mutations (coerce)
// =============================================================================

/// How the tenant target of a mutation was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationScope {
    /// Tenant caller: payload forced to the session tenant.
    /// Carries the conflicting value that was discarded, if any.
    Forced { discarded: Option<String> },
    /// Platform caller: explicit target taken from the payload.
    Explicit(String),
    /// Anonymous caller: no tenant involved.
    Unscoped,
}

/// Settles the tenant target of a create/update payload (snake_case keys).
///
/// - tenant: `tenant_id` is overwritten with the session tenant
/// - platform: `tenant_id` must be present and non-empty
/// - anonymous: payload untouched
pub fn enforce_mutation_tenant(
    payload: &mut Map<String, Value>,
    ctx: &AuthContext,
) -> GuardResult<MutationScope> {
    match ctx.user_type {
        UserType::Tenant => {
            let tenant_id = ctx.tenant_id().ok_or(GuardError::TenantContextMissing)?;
            let previous = payload.insert(
                TENANT_ID_FIELD.to_string(),
                Value::String(tenant_id.to_string()),
            );
            let discarded = previous
                .as_ref()
                .and_then(tenant_value)
                .filter(|value| value != tenant_id);
            Ok(MutationScope::Forced { discarded })
        }
        UserType::Platform => payload
            .get(TENANT_ID_FIELD)
            .and_then(tenant_value)
            .filter(|value| !value.is_empty())
            .map(MutationScope::Explicit)
            .ok_or(GuardError::TenantTargetRequired),
        UserType::Anonymous => Ok(MutationScope::Unscoped),
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Result of checking a response for foreign-tenant records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipCheck {
    /// At least one record named a tenant and all matched.
    Verified,
    /// Nothing in the payload names a tenant; ownership cannot be checked.
    Unverifiable,
    /// Caller is not tenant-scoped.
    NotApplicable,
}

/// Checks that records in a response belong to the caller's tenant.
///
/// Looks at the payload itself, at `data`, at `data.data`, and at each
/// element of an array in any of those places. Records without `tenant_id` are skipped, since the
/// backend does not always expose it.
pub fn validate_response_ownership(payload: &Value, ctx: &AuthContext) -> GuardResult<OwnershipCheck> {
    if !ctx.is_tenant() {
        return Ok(OwnershipCheck::NotApplicable);
    }

    let mut verified = false;
    for record in records(payload) {
        if let Some(value) = record.get(TENANT_ID_FIELD).filter(|v| !v.is_null()) {
            ensure_same_tenant(value, ctx)?;
            verified = true;
        }
    }

    Ok(if verified {
        OwnershipCheck::Verified
    } else {
        OwnershipCheck::Unverifiable
    })
}

fn records(payload: &Value) -> Vec<&Map<String, Value>> {
    let mut out = Vec::new();
    collect_records(payload, &mut out);
    if let Some(data) = payload.get("data") {
        collect_records(data, &mut out);
        // `{ success, data: { data: [...], meta } }`
        if let Some(inner) = data.get("data") {
            collect_records(inner, &mut out);
        }
    }
    out
}

fn collect_records<'a>(value: &'a Value, out: &mut Vec<&'a Map<String, Value>>) {
    match value {
        Value::Object(map) => out.push(map),
        Value::Array(items) => out.extend(items.iter().filter_map(Value::as_object)),
        _ => {}
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// String form of a tenant id value. Numbers are accepted since some
/// backends emit integer ids.
fn tenant_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn ensure_same_tenant(value: &Value, ctx: &AuthContext) -> GuardResult<()> {
    let actual = ctx.tenant_id().unwrap_or_default();
    match tenant_value(value) {
        Some(requested) if requested == actual => Ok(()),
        requested => Err(GuardError::TenantMismatch {
            requested: requested.unwrap_or_else(|| value.to_string()),
            actual: actual.to_string(),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use crate::types::TenantInfo;
    use serde_json::json;

    fn tenant_ctx() -> AuthContext {
        AuthContext {
            user_type: UserType::Tenant,
            tenant_id: Some("T1".into()),
            user_id: None,
        }
    }

    fn platform_ctx() -> AuthContext {
        AuthContext {
            user_type: UserType::Platform,
            tenant_id: None,
            user_id: None,
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_auth_context_requires_token() {
        let session = MemorySession::anonymous();
        assert_eq!(get_auth_context(&session, false), Err(GuardError::Unauthenticated));
    }

    #[test]
    fn test_auth_context_requires_tenant_when_asked() {
        let session = MemorySession::tenant("tok", TenantInfo::new("T1", "acme"));
        session.set_tenant(None);
        assert_eq!(get_auth_context(&session, true), Err(GuardError::TenantContextMissing));

        let ctx = get_auth_context(&session, false).unwrap();
        assert_eq!(ctx.user_type, UserType::Tenant);
        assert!(ctx.tenant_id.is_none());
    }

    #[test]
    fn test_auth_context_for_tenant() {
        let session = MemorySession::tenant("tok", TenantInfo::new("T1", "acme"));
        assert_eq!(get_auth_context(&session, true).unwrap(), tenant_ctx());
    }

    #[test]
    fn test_expect_identity() {
        assert!(expect_identity(&tenant_ctx(), UserType::Tenant).is_ok());
        assert_eq!(
            expect_identity(&tenant_ctx(), UserType::Platform),
            Err(GuardError::IdentityMismatch {
                expected: UserType::Platform,
                actual: UserType::Tenant
            })
        );
    }

    #[test]
    fn test_filters_for_other_tenant_are_rejected() {
        let err = validate_filters(&map(json!({"tenant_id": "T2"})), &tenant_ctx()).unwrap_err();
        assert_eq!(
            err,
            GuardError::TenantMismatch {
                requested: "T2".into(),
                actual: "T1".into()
            }
        );
    }

    #[test]
    fn test_filters_for_own_tenant_or_none_pass() {
        assert!(validate_filters(&map(json!({"tenant_id": "T1"})), &tenant_ctx()).is_ok());
        assert!(validate_filters(&map(json!({"tenant_id": null})), &tenant_ctx()).is_ok());
        assert!(validate_filters(&map(json!({"search": "x"})), &tenant_ctx()).is_ok());
    }

    #[test]
    fn test_platform_filters_are_unconstrained() {
        assert!(validate_filters(&map(json!({"tenant_id": "T9"})), &platform_ctx()).is_ok());
    }

    #[test]
    fn test_scope_filters_pins_tenant() {
        let mut filters = map(json!({"page": 1}));
        scope_filters(&mut filters, &tenant_ctx());
        assert_eq!(filters.get("tenant_id"), Some(&json!("T1")));

        let mut filters = map(json!({"page": 1}));
        scope_filters(&mut filters, &platform_ctx());
        assert!(!filters.contains_key("tenant_id"));
    }

    #[test]
    fn test_tenant_mutation_is_coerced() {
        let mut payload = map(json!({"name": "Widget", "tenant_id": "other"}));
        let scope = enforce_mutation_tenant(&mut payload, &tenant_ctx()).unwrap();
        assert_eq!(
            scope,
            MutationScope::Forced {
                discarded: Some("other".into())
            }
        );
        assert_eq!(payload.get("tenant_id"), Some(&json!("T1")));
    }

    #[test]
    fn test_tenant_mutation_without_tenant_id_gets_one() {
        let mut payload = map(json!({"name": "Widget"}));
        let scope = enforce_mutation_tenant(&mut payload, &tenant_ctx()).unwrap();
        assert_eq!(scope, MutationScope::Forced { discarded: None });
        assert_eq!(payload.get("tenant_id"), Some(&json!("T1")));
    }

    #[test]
    fn test_platform_mutation_requires_target() {
        let mut payload = map(json!({"name": "Widget"}));
        assert_eq!(
            enforce_mutation_tenant(&mut payload, &platform_ctx()),
            Err(GuardError::TenantTargetRequired)
        );

        let mut payload = map(json!({"name": "Widget", "tenant_id": ""}));
        assert!(enforce_mutation_tenant(&mut payload, &platform_ctx()).is_err());

        let mut payload = map(json!({"name": "Widget", "tenant_id": "T5"}));
        assert_eq!(
            enforce_mutation_tenant(&mut payload, &platform_ctx()).unwrap(),
            MutationScope::Explicit("T5".into())
        );
    }

    #[test]
    fn test_response_without_tenant_is_unverifiable() {
        let body = json!({"data": [{"id": "p1"}, {"id": "p2"}]});
        assert_eq!(
            validate_response_ownership(&body, &tenant_ctx()).unwrap(),
            OwnershipCheck::Unverifiable
        );
    }

    #[test]
    fn test_response_with_foreign_record_is_rejected() {
        let body = json!({"data": [{"id": "p1", "tenant_id": "T1"}, {"id": "p2", "tenant_id": "T2"}]});
        assert!(validate_response_ownership(&body, &tenant_ctx()).is_err());

        let body = json!({"id": "p1", "tenant_id": "T1"});
        assert_eq!(
            validate_response_ownership(&body, &tenant_ctx()).unwrap(),
            OwnershipCheck::Verified
        );
    }

    #[test]
    fn test_enveloped_page_records_are_checked() {
        let body = json!({
            "success": true,
            "data": {"data": [{"id": "p1", "tenant_id": "T2"}], "meta": {"total": 1}}
        });
        assert_eq!(
            validate_response_ownership(&body, &tenant_ctx()),
            Err(GuardError::TenantMismatch {
                requested: "T2".into(),
                actual: "T1".into(),
            })
        );

        let body = json!({"success": true, "data": {"data": [{"id": "p1", "tenant_id": "T1"}]}});
        assert_eq!(
            validate_response_ownership(&body, &tenant_ctx()).unwrap(),
            OwnershipCheck::Verified
        );
    }

    #[test]
    fn test_numeric_tenant_ids_compare_as_strings() {
        let ctx = AuthContext {
            tenant_id: Some("42".into()),
            ..tenant_ctx()
        };
        assert!(validate_filters(&map(json!({"tenant_id": 42})), &ctx).is_ok());
    }
}
