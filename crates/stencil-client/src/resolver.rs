//! # Context Resolver
//!
//! Holds the one client per identity and hands out the right one.
//!
//! Built once from a [`ClientConfig`] and shared through `Arc`; clients are
//! never rebuilt per call. Pointing an identity at a new base URL means
//! building a new registry.

use std::sync::Arc;

use stencil_core::routing::resolve_endpoint;
use stencil_core::{SessionProvider, UserType};
use tracing::info;

use crate::boundary::UiBoundary;
use crate::clients::{AnonymousClient, ApiClient, PlatformClient, TenantClient};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

/// Registry of context clients.
pub struct ApiClients {
    anonymous: Arc<AnonymousClient>,
    tenant: Arc<TenantClient>,
    platform: Arc<PlatformClient>,
    session: Arc<dyn SessionProvider>,
}

impl ApiClients {
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionProvider>,
        boundary: Arc<dyn UiBoundary>,
    ) -> ApiResult<Self> {
        let clients = Self {
            anonymous: Arc::new(AnonymousClient::new(config)?),
            tenant: Arc::new(TenantClient::new(config, session.clone(), boundary.clone())?),
            platform: Arc::new(PlatformClient::new(config, session.clone(), boundary)?),
            session,
        };
        info!(
            anonymous = config.base_url_for(UserType::Anonymous),
            tenant = config.base_url_for(UserType::Tenant),
            platform = config.base_url_for(UserType::Platform),
            "API clients ready"
        );
        Ok(clients)
    }

    /// The client for an identity.
    pub fn resolve_client(&self, user_type: UserType) -> Arc<dyn ApiClient> {
        match user_type {
            UserType::Anonymous => self.anonymous.clone(),
            UserType::Tenant => self.tenant.clone(),
            UserType::Platform => self.platform.clone(),
        }
    }

    /// [`Self::resolve_client`] for an identity given as a string.
    ///
    /// Unknown identities fail with a context error instead of defaulting.
    pub fn resolve_client_named(&self, user_type: &str) -> ApiResult<Arc<dyn ApiClient>> {
        let user_type: UserType = user_type.parse().map_err(ApiError::from)?;
        Ok(self.resolve_client(user_type))
    }

    /// Client and identity-prefixed endpoint in one step.
    pub fn resolve(&self, user_type: UserType, resource: &str) -> (Arc<dyn ApiClient>, String) {
        (
            self.resolve_client(user_type),
            resolve_endpoint(user_type, resource),
        )
    }

    pub fn anonymous(&self) -> &AnonymousClient {
        &self.anonymous
    }

    pub fn tenant(&self) -> &TenantClient {
        &self.tenant
    }

    pub fn platform(&self) -> &PlatformClient {
        &self.platform
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::StaticBoundary;
    use crate::error::ErrorKind;
    use stencil_core::MemorySession;

    fn clients() -> ApiClients {
        ApiClients::new(
            &ClientConfig::default(),
            Arc::new(MemorySession::anonymous()),
            Arc::new(StaticBoundary::new(false)),
        )
        .unwrap()
    }

    #[test]
    fn test_resolves_each_identity() {
        let clients = clients();
        for user_type in UserType::ALL {
            assert_eq!(clients.resolve_client(user_type).identity(), user_type);
        }
    }

    #[test]
    fn test_same_instance_every_time() {
        let clients = clients();
        let first = clients.resolve_client(UserType::Tenant);
        let second = clients.resolve_client(UserType::Tenant);
        assert!(std::ptr::eq(first.transport(), second.transport()));
    }

    #[test]
    fn test_unknown_identity_fails() {
        let err = clients().resolve_client_named("superadmin").err().unwrap();
        assert_eq!(err.kind, ErrorKind::Context);
    }

    #[test]
    fn test_resolve_pairs_client_and_endpoint() {
        let (client, endpoint) = clients().resolve(UserType::Platform, "products");
        assert_eq!(client.identity(), UserType::Platform);
        assert_eq!(endpoint, "/platform/products");
    }
}
