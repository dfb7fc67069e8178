//! # HTTP Transport
//!
//! One configured HTTP client per identity, with ordered interceptor chains.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Transport::execute                              │
//! │                                                                         │
//! │  cancelled already? ──yes──► Err(Cancelled)   (no chain, no request)    │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  request chain  ─── DefaultHeaders → Credentials / PublicWriteGuard     │
//! │        │             any Err ──► returned as-is, nothing sent           │
//! │        ▼                                                                │
//! │  reqwest send + read body ◄── raced against the CancellationToken       │
//! │        │             cancel wins ──► Err(Cancelled), chain skipped      │
//! │        ▼                                                                │
//! │  2xx ──► Ok(RawResponse)      else ──► Err(ApiError::from_response)     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  response chain ─── ExchangeLogger → SessionPolicy                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use stencil_core::UserType;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::{ApiError, ApiResult, TransportFailure};

// =============================================================================
// Request / Response
// =============================================================================

/// A request as seen by the interceptor chain.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    /// Path relative to the transport base URL, e.g. `/products`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl OutgoingRequest {
    /// Methods that never change server state.
    pub fn is_read(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Parsed JSON body, `Null` when the body was empty.
    pub body: Value,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// Aborts the call when triggered, before or during the exchange.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends every non-null entry of a filter object as a query pair.
    /// Strings are sent raw, everything else in its JSON form.
    pub fn query_map(mut self, filters: &Map<String, Value>) -> Self {
        for (key, value) in filters {
            let value = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            self.query.push((key.clone(), value));
        }
        self
    }

    pub fn cancel_on(mut self, token: Option<&CancellationToken>) -> Self {
        self.cancel = token.cloned();
        self
    }
}

// =============================================================================
// Interceptors
// =============================================================================

/// Runs before a request is sent. An `Err` aborts the call.
pub trait RequestInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept(&self, request: OutgoingRequest) -> ApiResult<OutgoingRequest>;
}

/// Runs on the outcome of a sent request, success or failure.
pub trait ResponseInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept(
        &self,
        request: &OutgoingRequest,
        result: ApiResult<RawResponse>,
    ) -> ApiResult<RawResponse>;
}

// =============================================================================
// Transport
// =============================================================================

/// HTTP client bound to one identity and base URL.
pub struct Transport {
    identity: UserType,
    base_url: String,
    http: reqwest::Client,
    request_chain: Vec<Arc<dyn RequestInterceptor>>,
    response_chain: Vec<Arc<dyn ResponseInterceptor>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("identity", &self.identity)
            .field("base_url", &self.base_url)
            .field(
                "request_chain",
                &self.request_chain.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field(
                "response_chain",
                &self.response_chain.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Transport {
    pub fn builder(identity: UserType, base_url: impl Into<String>) -> TransportBuilder {
        TransportBuilder {
            identity,
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            request_chain: Vec::new(),
            response_chain: Vec::new(),
        }
    }

    pub fn identity(&self) -> UserType {
        self.identity
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request through both interceptor chains.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ApiResult<RawResponse> {
        let RequestOptions {
            query,
            headers,
            cancel,
        } = options;

        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            debug!(identity = %self.identity, path, "Request cancelled before dispatch");
            return Err(ApiError::cancelled());
        }

        let mut request = OutgoingRequest {
            method,
            path: path.to_string(),
            query,
            headers,
            body,
        };
        for interceptor in &self.request_chain {
            request = interceptor.intercept(request)?;
        }

        let url = self.url_for(&request.path)?;
        let exchange = self.dispatch(&request, url);
        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(identity = %self.identity, path = %request.path, "Request cancelled in flight");
                    return Err(ApiError::cancelled());
                }
                result = exchange => result,
            },
            None => exchange.await,
        };

        self.response_chain
            .iter()
            .fold(result, |result, interceptor| interceptor.intercept(&request, result))
    }

    async fn dispatch(&self, request: &OutgoingRequest, url: Url) -> ApiResult<RawResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.network_failure(request, &url, err))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.network_failure(request, &url, err))?;

        let parsed = if bytes.is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_slice::<Value>(&bytes)
        };

        if status.is_success() {
            let body = parsed.map_err(|err| {
                ApiError::from(err).with_cause(failure(request, &url, Some(status), "invalid JSON body"))
            })?;
            return Ok(RawResponse { status, body });
        }

        // error bodies are best-effort; a non-JSON error page reads as empty
        let body = parsed.unwrap_or(Value::Null);
        let detail = if status.is_server_error() {
            status.to_string()
        } else {
            body.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string())
        };
        Err(ApiError::from_response(
            status,
            &body,
            failure(request, &url, Some(status), detail),
        ))
    }

    fn network_failure(&self, request: &OutgoingRequest, url: &Url, err: reqwest::Error) -> ApiError {
        let status = err.status();
        let detail = err.to_string();
        ApiError::from(err).with_cause(failure(request, url, status, detail))
    }

    fn url_for(&self, path: &str) -> ApiResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ApiError::context(format!("Invalid request URL {joined}: {e}")))
    }
}

fn failure(
    request: &OutgoingRequest,
    url: &Url,
    status: Option<StatusCode>,
    detail: impl Into<String>,
) -> TransportFailure {
    TransportFailure {
        method: request.method.to_string(),
        url: url.to_string(),
        status: status.map(|s| s.as_u16()),
        detail: detail.into(),
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct TransportBuilder {
    identity: UserType,
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
    request_chain: Vec<Arc<dyn RequestInterceptor>>,
    response_chain: Vec<Arc<dyn ResponseInterceptor>>,
}

impl TransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Appends to the request chain. Interceptors run in registration order.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_chain.push(Arc::new(interceptor));
        self
    }

    /// Appends to the response chain. Interceptors run in registration order.
    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_chain.push(Arc::new(interceptor));
        self
    }

    pub fn build(self) -> ApiResult<Transport> {
        Url::parse(&self.base_url)
            .map_err(|e| ApiError::context(format!("Invalid base URL {}: {e}", self.base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("stencil-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(
            identity = %self.identity,
            base_url = %self.base_url,
            request_interceptors = self.request_chain.len(),
            response_interceptors = self.response_chain.len(),
            "Transport built"
        );

        Ok(Transport {
            identity: self.identity,
            base_url: self.base_url,
            http,
            request_chain: self.request_chain,
            response_chain: self.response_chain,
        })
    }
}
