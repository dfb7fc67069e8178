//! # API Error Type
//!
//! One error shape for every failure a caller can see, whether it came from
//! the tenant guard, the network, or the backend.
//!
//! ## Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                        ErrorKind            Retry?  Fallback?   │
//! │  ────────────────────────────  ───────────────────  ──────  ─────────   │
//! │  no token                      Auth                 no      no          │
//! │  tenant guard                  Permission / Context no      no          │
//! │  HTTP 400 / 422                Validation (+fields) no      no          │
//! │  HTTP 401                      Auth                 no      no          │
//! │  HTTP 403                      Permission           no      no          │
//! │  HTTP 404                      NotFound             no      yes         │
//! │  HTTP 429                      RateLimited          yes     no          │
//! │  HTTP 5xx                      ServiceUnavailable   yes     yes         │
//! │  no response                   Unreachable          yes     yes         │
//! │  caller cancelled              Cancelled            no      no          │
//! │  anything else                 Api                  no      no          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Server-error bodies are never copied into messages; the raw exchange is
//! kept on [`ApiError::cause`] for logging only.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use stencil_core::GuardError;
use thiserror::Error;

/// Result alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Backend code for a tenant isolation breach reported on a 422.
pub const TENANT_ISOLATION_VIOLATION: &str = "TENANT_ISOLATION_VIOLATION";

// =============================================================================
// Error Kind
// =============================================================================

/// Category of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or expired credential (401, or no token at all).
    Auth,
    /// Caller may not do this (403, cross-tenant access).
    Permission,
    NotFound,
    /// Request rejected as invalid (400/422), with per-field messages.
    Validation,
    /// Throttled (429).
    RateLimited,
    /// Backend failed (5xx).
    ServiceUnavailable,
    /// No response at all: DNS, connect, timeout.
    Unreachable,
    /// Client-side setup problem: no tenant selected, unknown identity.
    Context,
    /// Caller cancelled before a response arrived.
    Cancelled,
    /// Anything else.
    Api,
}

// =============================================================================
// Transport Failure
// =============================================================================

/// Raw details of a failed exchange, kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} {url} failed: {detail}")]
pub struct TransportFailure {
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub detail: String,
}

// =============================================================================
// API Error
// =============================================================================

/// Normalized client error.
///
/// ## Serialization
/// ```json
/// {
///   "kind": "VALIDATION",
///   "message": "The given data was invalid.",
///   "fieldErrors": { "name": ["The name field is required."] }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub kind: ErrorKind,

    /// Human-readable message, safe to show.
    pub message: String,

    /// Field → messages, populated for validation failures.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, Vec<String>>,

    /// Machine-readable backend code, when one was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip)]
    pub cause: Option<TransportFailure>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
            field_errors: BTreeMap::new(),
            code: None,
            cause: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Auth, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Permission, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>, fields: BTreeMap<String, Vec<String>>) -> Self {
        ApiError {
            field_errors: fields,
            ..ApiError::new(ErrorKind::Validation, message)
        }
    }

    pub fn context(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Context, message)
    }

    pub fn cancelled() -> Self {
        ApiError::new(ErrorKind::Cancelled, "Request cancelled")
    }

    pub fn unreachable() -> Self {
        ApiError::new(
            ErrorKind::Unreachable,
            "Unable to reach the server, please check your connection",
        )
    }

    pub fn api(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::Api, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_cause(mut self, cause: TransportFailure) -> Self {
        self.cause = Some(cause);
        self
    }

    /// HTTP status of the failed exchange, if a response arrived.
    pub fn status(&self) -> Option<u16> {
        self.cause.as_ref().and_then(|cause| cause.status)
    }

    /// True when the backend reported a tenant isolation breach.
    pub fn is_isolation_violation(&self) -> bool {
        self.code.as_deref() == Some(TENANT_ISOLATION_VIOLATION)
    }

    // =========================================================================
    // Categorization
    // =========================================================================

    /// Returns true if repeating the same request later may succeed.
    ///
    /// The client itself never retries; this is advice for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RateLimited | ErrorKind::ServiceUnavailable | ErrorKind::Unreachable
        )
    }

    /// Returns true if a read may be retried against the public catalog.
    ///
    /// Only "not there" and "not reachable" qualify; auth, permission and
    /// validation failures must reach the caller.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NotFound | ErrorKind::ServiceUnavailable | ErrorKind::Unreachable
        )
    }

    /// Returns true for failures that point at a bug in the calling code.
    pub fn is_defect(&self) -> bool {
        matches!(self.kind, ErrorKind::Context)
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    /// Maps a non-2xx response to an error.
    pub fn from_response(status: StatusCode, body: &Value, failure: TransportFailure) -> Self {
        // 5xx bodies are never surfaced, not even their code.
        let code = if status.is_server_error() {
            None
        } else {
            backend_code(body)
        };
        let error = match status.as_u16() {
            400 | 422 => ApiError::validation(
                body_message(body).unwrap_or_else(|| "The given data was invalid.".to_string()),
                field_errors(body),
            ),
            401 => ApiError::auth("Session expired, please login again"),
            403 => ApiError::permission("You do not have permission to perform this action"),
            404 => ApiError::not_found("Resource not found"),
            429 => ApiError::new(
                ErrorKind::RateLimited,
                "Too many requests, please try again later",
            ),
            500..=599 => ApiError::new(
                ErrorKind::ServiceUnavailable,
                "Service temporarily unavailable, please try again later",
            ),
            other => ApiError::api(format!("Request failed with status {other}")),
        };
        let error = error.with_cause(failure);
        match code {
            Some(code) => error.with_code(code),
            None => error,
        }
    }

    /// Replaces the message of an uncategorized error with
    /// `Failed to {operation}`. Categorized errors keep their message.
    pub fn for_operation(mut self, operation: &str) -> Self {
        if self.kind == ErrorKind::Api {
            self.message = format!("Failed to {operation}");
        }
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Body Helpers
// =============================================================================

fn body_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

/// `error.code` wins over a top-level `code`.
fn backend_code(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|error| error.get("code"))
        .or_else(|| body.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Accepts `{ field: ["msg", ...] }` and `{ field: "msg" }`.
fn field_errors(body: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(errors) = body.get("errors").and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    errors
        .iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                Value::String(message) => vec![message.clone()],
                other => vec![other.to_string()],
            };
            (field.clone(), messages)
        })
        .collect()
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Unauthenticated => ApiError::auth("Authentication required"),
            GuardError::TenantMismatch { .. } => {
                ApiError::permission("Cannot access data from other tenants")
                    .with_code("TENANT_MISMATCH")
            }
            GuardError::TenantContextMissing
            | GuardError::TenantTargetRequired
            | GuardError::UnknownUserType(_)
            | GuardError::IdentityMismatch { .. } => ApiError::context(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::context(format!("Invalid request: {err}"))
        } else if err.is_decode() {
            ApiError::api("Invalid response from server")
        } else if let Some(status) = err.status() {
            ApiError::api(format!("Request failed with status {}", status.as_u16()))
        } else {
            // connect, timeout, DNS, TLS, or the connection dropped mid-body
            ApiError::unreachable()
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::api(format!("Unexpected response shape: {err}"))
    }
}

// =============================================================================
// Tests
// =============================================================================
