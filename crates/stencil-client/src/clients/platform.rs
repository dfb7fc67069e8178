use std::sync::Arc;

use stencil_core::{SessionProvider, UserType};

use super::ApiClient;
use crate::boundary::UiBoundary;
use crate::config::ClientConfig;
use crate::error::ApiResult;
use crate::interceptors::{DefaultHeaders, ExchangeLogger, PlatformCredentials, SessionPolicy};
use crate::transport::Transport;

/// Client for platform operators. Requests may span tenants and are
/// marked with `X-Platform-Admin: true`.
#[derive(Debug)]
pub struct PlatformClient {
    transport: Transport,
}

impl PlatformClient {
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionProvider>,
        boundary: Arc<dyn UiBoundary>,
    ) -> ApiResult<Self> {
        let identity = UserType::Platform;
        let transport = Transport::builder(identity, config.base_url_for(identity))
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .request_interceptor(DefaultHeaders::new(identity))
            .request_interceptor(PlatformCredentials::new(session.clone()))
            .response_interceptor(ExchangeLogger::new(identity))
            .response_interceptor(SessionPolicy::new(identity, session, boundary))
            .build()?;
        Ok(Self { transport })
    }
}

impl ApiClient for PlatformClient {
    fn identity(&self) -> UserType {
        UserType::Platform
    }

    fn transport(&self) -> &Transport {
        &self.transport
    }
}
