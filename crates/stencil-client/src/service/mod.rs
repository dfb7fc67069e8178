//! # Resource Services
//!
//! Tenant-guarded CRUD over one backend resource for one identity.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. auth context      session ──► AuthContext (fresh per call)          │
//! │  2. guard             filters: reject   │  payloads: coerce             │
//! │  3. resolve           identity ──► client + /platform | / | /public     │
//! │  4. call              client verb, cancellation passed through          │
//! │  5. verify            records naming a tenant must name ours            │
//! │  6. normalize         any failure ──► handle_error(operation)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Guard failures never reach the network.

mod products;

pub use products::{create_product_service, ProductService};

use std::sync::Arc;

use reqwest::Method;
use serde_json::{Map, Value};
use stencil_core::casing::snake_case_keys;
use stencil_core::guard::{self, MutationScope, OwnershipCheck};
use stencil_core::routing::resolve_endpoint;
use stencil_core::{AuthContext, GuardError, UserType};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::clients::ApiClient;
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::resolver::ApiClients;
use crate::transport::RequestOptions;

/// Builds a guarded service for `resource` as seen by `user_type`.
pub fn create_resource_service(
    clients: Arc<ApiClients>,
    resource: impl Into<String>,
    user_type: UserType,
) -> ResourceService {
    ResourceService::new(clients, user_type, resource)
}

/// Guarded CRUD for one resource and identity.
pub struct ResourceService {
    clients: Arc<ApiClients>,
    client: Arc<dyn ApiClient>,
    user_type: UserType,
    resource: String,
}

impl ResourceService {
    pub fn new(clients: Arc<ApiClients>, user_type: UserType, resource: impl Into<String>) -> Self {
        let client = clients.resolve_client(user_type);
        Self {
            clients,
            client,
            user_type,
            resource: resource.into(),
        }
    }

    pub fn user_type(&self) -> UserType {
        self.user_type
    }

    pub fn clients(&self) -> &Arc<ApiClients> {
        &self.clients
    }

    /// Identity-prefixed endpoint for `resource/suffix`.
    pub fn endpoint(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            resolve_endpoint(self.user_type, &self.resource)
        } else {
            resolve_endpoint(self.user_type, &format!("{}/{}", self.resource, suffix))
        }
    }

    // =========================================================================
    // Guard
    // =========================================================================

    /// Auth context for this service's identity.
    ///
    /// Anonymous services need no credential. Authenticated services require
    /// a session of the same identity, and tenant services a tenant.
    pub fn auth_context(&self, operation: &str) -> ApiResult<AuthContext> {
        if self.user_type == UserType::Anonymous {
            return Ok(AuthContext::anonymous());
        }
        let require_tenant = self.user_type == UserType::Tenant;
        let ctx = guard::get_auth_context(self.clients.session().as_ref(), require_tenant)
            .map_err(|err| self.guard_failure(operation, err))?;
        guard::expect_identity(&ctx, self.user_type)
            .map_err(|err| self.guard_failure(operation, err))?;
        Ok(ctx)
    }

    fn guard_failure(&self, operation: &str, err: GuardError) -> ApiError {
        match &err {
            GuardError::TenantMismatch { requested, actual } => error!(
                operation,
                user_type = %self.user_type,
                requested = %requested,
                actual = %actual,
                "[RBAC] Cross-tenant access blocked"
            ),
            GuardError::Unauthenticated => warn!(
                operation,
                user_type = %self.user_type,
                "Operation requires authentication"
            ),
            other => error!(
                operation,
                user_type = %self.user_type,
                error = %other,
                "[RBAC] Invalid tenant context"
            ),
        }
        err.into()
    }

    fn verify_ownership(&self, body: &Value, ctx: &AuthContext, operation: &str) -> ApiResult<()> {
        match guard::validate_response_ownership(body, ctx) {
            Ok(OwnershipCheck::Unverifiable) => {
                debug!(operation, tenant_id = ?ctx.tenant_id(), "Response carries no tenant_id, ownership unchecked");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) => Err(self.guard_failure(operation, err)),
        }
    }

    fn settle_tenant(
        &self,
        payload: &mut Map<String, Value>,
        ctx: &AuthContext,
        operation: &str,
    ) -> ApiResult<()> {
        let scope = guard::enforce_mutation_tenant(payload, ctx)
            .map_err(|err| self.guard_failure(operation, err))?;
        if let MutationScope::Forced {
            discarded: Some(requested),
        } = scope
        {
            warn!(
                operation,
                requested = %requested,
                tenant_id = ?ctx.tenant_id(),
                "[RBAC] Replaced foreign tenant_id in payload with session tenant"
            );
        }
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Lists the collection. Filters naming another tenant are rejected;
    /// tenant callers are pinned to their own tenant.
    pub async fn list(
        &self,
        filters: Map<String, Value>,
        cancel: Option<&CancellationToken>,
        operation: &str,
    ) -> ApiResult<Value> {
        let ctx = self.auth_context(operation)?;
        guard::validate_filters(&filters, &ctx).map_err(|err| self.guard_failure(operation, err))?;

        let mut scoped = filters;
        guard::scope_filters(&mut scoped, &ctx);

        let options = RequestOptions::new().query_map(&scoped).cancel_on(cancel);
        let body = self
            .client
            .get(&self.endpoint(""), options)
            .await
            .map_err(|err| self.handle_error(err, operation))?;
        self.verify_ownership(&body, &ctx, operation)?;
        Ok(body)
    }

    /// Reads `resource/suffix`.
    pub async fn fetch(
        &self,
        suffix: &str,
        cancel: Option<&CancellationToken>,
        operation: &str,
    ) -> ApiResult<Value> {
        let ctx = self.auth_context(operation)?;
        let body = self
            .client
            .get(&self.endpoint(suffix), RequestOptions::new().cancel_on(cancel))
            .await
            .map_err(|err| self.handle_error(err, operation))?;
        self.verify_ownership(&body, &ctx, operation)?;
        Ok(body)
    }

    /// Creates a record. Keys are sent snake_case with the tenant settled.
    pub async fn create(
        &self,
        payload: Map<String, Value>,
        cancel: Option<&CancellationToken>,
        operation: &str,
    ) -> ApiResult<Value> {
        let ctx = self.auth_context(operation)?;
        let mut payload = snake_case_keys(payload);
        self.settle_tenant(&mut payload, &ctx, operation)?;

        let body = self
            .client
            .post(
                &self.endpoint(""),
                Some(Value::Object(payload)),
                RequestOptions::new().cancel_on(cancel),
            )
            .await
            .map_err(|err| self.handle_error(err, operation))?;
        self.verify_ownership(&body, &ctx, operation)?;
        Ok(body)
    }

    /// Replaces fields of `resource/suffix`, tenant settled as for create.
    pub async fn update(
        &self,
        suffix: &str,
        payload: Map<String, Value>,
        cancel: Option<&CancellationToken>,
        operation: &str,
    ) -> ApiResult<Value> {
        let ctx = self.auth_context(operation)?;
        let mut payload = snake_case_keys(payload);
        self.settle_tenant(&mut payload, &ctx, operation)?;

        let body = self
            .client
            .put(
                &self.endpoint(suffix),
                Some(Value::Object(payload)),
                RequestOptions::new().cancel_on(cancel),
            )
            .await
            .map_err(|err| self.handle_error(err, operation))?;
        self.verify_ownership(&body, &ctx, operation)?;
        Ok(body)
    }

    pub async fn remove(
        &self,
        suffix: &str,
        cancel: Option<&CancellationToken>,
        operation: &str,
    ) -> ApiResult<Value> {
        self.auth_context(operation)?;
        self.client
            .delete(&self.endpoint(suffix), RequestOptions::new().cancel_on(cancel))
            .await
            .map_err(|err| self.handle_error(err, operation))
    }

    /// Any other verb on `resource/suffix` (bulk actions, toggles).
    pub async fn action(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
        cancel: Option<&CancellationToken>,
        operation: &str,
    ) -> ApiResult<Value> {
        let ctx = self.auth_context(operation)?;
        let response = self
            .client
            .send(
                method,
                &self.endpoint(suffix),
                body,
                RequestOptions::new().cancel_on(cancel),
            )
            .await
            .map_err(|err| self.handle_error(err, operation))?;
        self.verify_ownership(&response, &ctx, operation)?;
        Ok(response)
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Logs a failed call and gives uncategorized failures an
    /// operation-specific message.
    pub fn handle_error(&self, err: ApiError, operation: &str) -> ApiError {
        let err = err.for_operation(operation);
        match err.kind {
            ErrorKind::Cancelled => debug!(operation, "Operation cancelled"),
            _ => warn!(
                operation,
                user_type = %self.user_type,
                kind = ?err.kind,
                status = ?err.status(),
                message = %err.message,
                "Operation failed"
            ),
        }
        err
    }
}
