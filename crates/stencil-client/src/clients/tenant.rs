use std::sync::Arc;

use stencil_core::{SessionProvider, UserType};

use super::ApiClient;
use crate::boundary::UiBoundary;
use crate::config::ClientConfig;
use crate::error::ApiResult;
use crate::interceptors::{DefaultHeaders, ExchangeLogger, SessionPolicy, TenantCredentials};
use crate::transport::Transport;

/// Client for members of a single tenant.
///
/// Every request carries `X-Tenant-ID` / `X-Tenant-Slug` from the session;
/// a session without a tenant fails before anything is sent.
#[derive(Debug)]
pub struct TenantClient {
    transport: Transport,
}

impl TenantClient {
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionProvider>,
        boundary: Arc<dyn UiBoundary>,
    ) -> ApiResult<Self> {
        let identity = UserType::Tenant;
        let transport = Transport::builder(identity, config.base_url_for(identity))
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .request_interceptor(DefaultHeaders::new(identity))
            .request_interceptor(TenantCredentials::new(session.clone()))
            .response_interceptor(ExchangeLogger::new(identity))
            .response_interceptor(SessionPolicy::new(identity, session, boundary))
            .build()?;
        Ok(Self { transport })
    }
}

impl ApiClient for TenantClient {
    fn identity(&self) -> UserType {
        UserType::Tenant
    }

    fn transport(&self) -> &Transport {
        &self.transport
    }
}
