use serde_json::Value;
use stencil_core::product::ProductQuery;
use stencil_core::routing::resolve_endpoint;
use stencil_core::types::unwrap_data;
use stencil_core::UserType;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::ApiClient;
use crate::config::ClientConfig;
use crate::defaults::{default_catalog, default_page};
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::interceptors::{DefaultHeaders, ExchangeLogger, PublicWriteGuard};
use crate::transport::{RequestOptions, Transport};

/// Client for unauthenticated visitors.
///
/// Sends no credentials, writes only to allow-listed public paths, and
/// serves built-in defaults when public content cannot be fetched.
#[derive(Debug)]
pub struct AnonymousClient {
    transport: Transport,
}

impl AnonymousClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let identity = UserType::Anonymous;
        let transport = Transport::builder(identity, config.base_url_for(identity))
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .request_interceptor(DefaultHeaders::new(identity))
            .request_interceptor(PublicWriteGuard::new(
                config.anonymous.write_allow_list.clone(),
            ))
            .response_interceptor(ExchangeLogger::new(identity))
            .build()?;
        Ok(Self { transport })
    }

    /// Platform page content by slug (`home`, `about`, `faq`, ...).
    ///
    /// Any failure except cancellation yields the default page.
    pub async fn platform_content(
        &self,
        slug: &str,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Value> {
        let path = resolve_endpoint(
            UserType::Anonymous,
            &format!("content/pages/{}", urlencoding::encode(slug)),
        );
        let result = self
            .get(&path, RequestOptions::new().cancel_on(cancel))
            .await
            .map(unwrap_data);
        or_default(result, "platform page", slug, || default_page(slug))
    }

    /// First-party public catalog. Falls back to an empty page.
    pub async fn public_products(
        &self,
        query: &ProductQuery,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Value> {
        let path = resolve_endpoint(UserType::Anonymous, "products");
        let filters = match serde_json::to_value(query)? {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        let options = RequestOptions::new().query_map(&filters).cancel_on(cancel);
        let result = self.get(&path, options).await;
        or_default(result, "public catalog", "products", default_catalog)
    }
}

fn or_default(
    result: ApiResult<Value>,
    what: &str,
    slug: &str,
    default: impl FnOnce() -> Value,
) -> ApiResult<Value> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.kind == ErrorKind::Cancelled => Err(err),
        Err(err) => {
            log_fallback(what, slug, &err);
            Ok(default())
        }
    }
}

fn log_fallback(what: &str, slug: &str, err: &ApiError) {
    warn!(
        slug,
        kind = ?err.kind,
        status = ?err.status(),
        "Serving default {what}, backend unavailable"
    );
}

impl ApiClient for AnonymousClient {
    fn identity(&self) -> UserType {
        UserType::Anonymous
    }

    fn transport(&self) -> &Transport {
        &self.transport
    }
}
