//! # Context Clients
//!
//! One HTTP wrapper per identity. Each owns its own [`Transport`] (base URL,
//! default headers, interceptor chains) and exposes the same verb surface
//! through [`ApiClient`].
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  dyn ApiClient   │  get / post / put / patch / delete
//!                 └────────┬─────────┘
//!        ┌─────────────────┼──────────────────┐
//!        ▼                 ▼                  ▼
//! AnonymousClient     TenantClient      PlatformClient
//!  /public/...          /...             /platform/...
//! ```

mod anonymous;
mod platform;
mod tenant;

pub use anonymous::AnonymousClient;
pub use platform::PlatformClient;
pub use tenant::TenantClient;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use stencil_core::UserType;

use crate::error::ApiResult;
use crate::transport::{RequestOptions, Transport};

/// Verb surface shared by the context clients.
///
/// Methods return the raw JSON body; unwrapping `data` is left to the
/// resource services.
#[async_trait]
pub trait ApiClient: Send + Sync {
    fn identity(&self) -> UserType;

    fn transport(&self) -> &Transport;

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ApiResult<Value> {
        let response = self.transport().execute(method, path, body, options).await?;
        Ok(response.body)
    }

    async fn get(&self, path: &str, options: RequestOptions) -> ApiResult<Value> {
        self.send(Method::GET, path, None, options).await
    }

    async fn post(&self, path: &str, body: Option<Value>, options: RequestOptions) -> ApiResult<Value> {
        self.send(Method::POST, path, body, options).await
    }

    async fn put(&self, path: &str, body: Option<Value>, options: RequestOptions) -> ApiResult<Value> {
        self.send(Method::PUT, path, body, options).await
    }

    async fn patch(&self, path: &str, body: Option<Value>, options: RequestOptions) -> ApiResult<Value> {
        self.send(Method::PATCH, path, body, options).await
    }

    async fn delete(&self, path: &str, options: RequestOptions) -> ApiResult<Value> {
        self.send(Method::DELETE, path, None, options).await
    }
}
