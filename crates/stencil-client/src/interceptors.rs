//! # Interceptors
//!
//! The request and response steps each context client is assembled from.
//!
//! ## Chains per Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Client     Request chain                      Response chain           │
//! │  ─────────  ─────────────────────────────────  ───────────────────────  │
//! │  anonymous  DefaultHeaders → PublicWriteGuard  ExchangeLogger           │
//! │  tenant     DefaultHeaders → TenantCredentials ExchangeLogger →         │
//! │                                                SessionPolicy            │
//! │  platform   DefaultHeaders → PlatformCredentials ExchangeLogger →       │
//! │                                                SessionPolicy            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Credentials are read from the session on every request, never captured
//! at construction. Tokens are never logged.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use stencil_core::{GuardError, SessionProvider, UserType};
use tracing::{debug, error, warn};

use crate::boundary::{RedirectReason, UiBoundary};
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::transport::{OutgoingRequest, RawResponse, RequestInterceptor, ResponseInterceptor};

/// Identity marker header.
pub const X_USER_TYPE: &str = "x-user-type";
/// Set on every anonymous request.
pub const X_REQUEST_TYPE: &str = "x-request-type";
pub const X_TENANT_ID: &str = "x-tenant-id";
pub const X_TENANT_SLUG: &str = "x-tenant-slug";
pub const X_PLATFORM_ADMIN: &str = "x-platform-admin";

fn header_value(raw: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|_| ApiError::context(format!("Value is not a valid header: {raw:?}")))
}

/// Adds `Authorization: Bearer` for a real token. Demo tokens are never sent.
fn attach_bearer(headers: &mut HeaderMap, session: &dyn SessionProvider) -> ApiResult<()> {
    match session.token() {
        Some(token) if !session.is_demo_token(&token) => {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        Some(_) => {
            debug!(demo_token = true, "Demo session, sending request without bearer token");
            headers.remove(AUTHORIZATION);
        }
        None => {
            headers.remove(AUTHORIZATION);
        }
    }
    Ok(())
}

// =============================================================================
// Default Headers
// =============================================================================

/// JSON content negotiation plus the identity marker.
pub struct DefaultHeaders {
    identity: UserType,
}

impl DefaultHeaders {
    pub fn new(identity: UserType) -> Self {
        Self { identity }
    }
}

impl RequestInterceptor for DefaultHeaders {
    fn name(&self) -> &'static str {
        "default-headers"
    }

    fn intercept(&self, mut request: OutgoingRequest) -> ApiResult<OutgoingRequest> {
        let headers = &mut request.headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(X_USER_TYPE, HeaderValue::from_static(self.identity.as_str()));
        if self.identity == UserType::Anonymous {
            headers.insert(X_REQUEST_TYPE, HeaderValue::from_static("public"));
        }
        Ok(request)
    }
}

// =============================================================================
// Tenant Credentials
// =============================================================================

/// Tenant headers and bearer token from the live session.
///
/// A session without a tenant fails the call before anything is sent.
pub struct TenantCredentials {
    session: Arc<dyn SessionProvider>,
}

impl TenantCredentials {
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for TenantCredentials {
    fn name(&self) -> &'static str {
        "tenant-credentials"
    }

    fn intercept(&self, mut request: OutgoingRequest) -> ApiResult<OutgoingRequest> {
        let Some(tenant) = self.session.current_tenant() else {
            error!(path = %request.path, "[RBAC] Tenant request without tenant context");
            return Err(GuardError::TenantContextMissing.into());
        };

        request.headers.insert(X_TENANT_ID, header_value(&tenant.id)?);
        if !tenant.slug.is_empty() {
            request.headers.insert(X_TENANT_SLUG, header_value(&tenant.slug)?);
        }
        attach_bearer(&mut request.headers, self.session.as_ref())?;
        Ok(request)
    }
}

// =============================================================================
// Platform Credentials
// =============================================================================

/// Bearer token plus the platform admin marker.
pub struct PlatformCredentials {
    session: Arc<dyn SessionProvider>,
}

impl PlatformCredentials {
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for PlatformCredentials {
    fn name(&self) -> &'static str {
        "platform-credentials"
    }

    fn intercept(&self, mut request: OutgoingRequest) -> ApiResult<OutgoingRequest> {
        attach_bearer(&mut request.headers, self.session.as_ref())?;
        request
            .headers
            .insert(X_PLATFORM_ADMIN, HeaderValue::from_static("true"));
        Ok(request)
    }
}

// =============================================================================
// Public Write Guard
// =============================================================================

/// Blocks anonymous writes outside an allow-list of public paths.
///
/// Patterns are matched segment by segment against the path with any
/// leading `/public/` removed; `*` matches one segment.
pub struct PublicWriteGuard {
    allow_list: Vec<String>,
}

impl PublicWriteGuard {
    pub fn new(allow_list: Vec<String>) -> Self {
        Self { allow_list }
    }

    pub fn is_allowed(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or_default().trim_matches('/');
        let path = path.strip_prefix("public/").unwrap_or(path);
        self.allow_list
            .iter()
            .any(|pattern| segments_match(pattern.trim_matches('/'), path))
    }
}

fn segments_match(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').collect();
    let path: Vec<&str> = path.split('/').collect();
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| *p == "*" || p == s)
}

impl RequestInterceptor for PublicWriteGuard {
    fn name(&self) -> &'static str {
        "public-write-guard"
    }

    fn intercept(&self, request: OutgoingRequest) -> ApiResult<OutgoingRequest> {
        if request.is_read() || self.is_allowed(&request.path) {
            return Ok(request);
        }
        warn!(
            method = %request.method,
            path = %request.path,
            "Blocked anonymous write to a non-public endpoint"
        );
        Err(ApiError::permission(format!(
            "Anonymous users cannot {} {}",
            request.method, request.path
        )))
    }
}

// =============================================================================
// Exchange Logger
// =============================================================================

/// Debug log line per exchange. Passes the outcome through unchanged.
pub struct ExchangeLogger {
    identity: UserType,
}

impl ExchangeLogger {
    pub fn new(identity: UserType) -> Self {
        Self { identity }
    }
}

impl ResponseInterceptor for ExchangeLogger {
    fn name(&self) -> &'static str {
        "exchange-logger"
    }

    fn intercept(
        &self,
        request: &OutgoingRequest,
        result: ApiResult<RawResponse>,
    ) -> ApiResult<RawResponse> {
        match &result {
            Ok(response) => debug!(
                identity = %self.identity,
                method = %request.method,
                path = %request.path,
                status = response.status.as_u16(),
                "API exchange succeeded"
            ),
            Err(err) => debug!(
                identity = %self.identity,
                method = %request.method,
                path = %request.path,
                kind = ?err.kind,
                status = ?err.status(),
                cause = ?err.cause.as_ref().map(ToString::to_string),
                "API exchange failed"
            ),
        }
        result
    }
}

// =============================================================================
// Session Policy
// =============================================================================

/// Reacts to credential failures on authenticated clients.
///
/// ```text
/// 401, demo token  ──► keep session, no redirect
/// 401, real token  ──► clear_auth(false); redirect if the view needs auth
/// 422 + TENANT_ISOLATION_VIOLATION ──► clear_auth(true); always redirect
/// ```
///
/// The client never retries; 403, 429 and 5xx pass through untouched.
pub struct SessionPolicy {
    identity: UserType,
    session: Arc<dyn SessionProvider>,
    boundary: Arc<dyn UiBoundary>,
}

impl SessionPolicy {
    pub fn new(
        identity: UserType,
        session: Arc<dyn SessionProvider>,
        boundary: Arc<dyn UiBoundary>,
    ) -> Self {
        Self {
            identity,
            session,
            boundary,
        }
    }

    fn on_unauthorized(&self, request: &OutgoingRequest) {
        let token = self.session.token();
        if token
            .as_deref()
            .is_some_and(|token| self.session.is_demo_token(token))
        {
            warn!(
                identity = %self.identity,
                path = %request.path,
                demo_token = true,
                "401 on demo session, keeping credentials"
            );
            return;
        }

        warn!(
            identity = %self.identity,
            path = %request.path,
            has_token = token.is_some(),
            "401 received, clearing session"
        );
        self.session.clear_auth(false);
        if self.boundary.requires_authentication() {
            self.boundary.redirect_to_login(RedirectReason::SessionExpired);
        }
    }

    fn on_isolation_violation(&self, request: &OutgoingRequest, err: ApiError) -> ApiError {
        error!(
            identity = %self.identity,
            path = %request.path,
            tenant_id = ?self.session.current_tenant().map(|tenant| tenant.id),
            "[RBAC] Backend reported tenant isolation violation, forcing re-authentication"
        );
        self.session.clear_auth(true);
        self.boundary.redirect_to_login(RedirectReason::IsolationViolation);
        ApiError {
            kind: ErrorKind::Permission,
            message: "Tenant isolation violation detected, please sign in again".to_string(),
            ..err
        }
    }
}

impl ResponseInterceptor for SessionPolicy {
    fn name(&self) -> &'static str {
        "session-policy"
    }

    fn intercept(
        &self,
        request: &OutgoingRequest,
        result: ApiResult<RawResponse>,
    ) -> ApiResult<RawResponse> {
        let err = match result {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };
        match err.status() {
            Some(401) => {
                self.on_unauthorized(request);
                Err(err)
            }
            Some(422) if err.is_isolation_violation() => {
                Err(self.on_isolation_violation(request, err))
            }
            _ => Err(err),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
