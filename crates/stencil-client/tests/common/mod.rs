//! In-process fake backend for the client integration tests.
//!
//! Binds `127.0.0.1:0`, records every request, and answers from a stub
//! table keyed by method and path. Unstubbed routes answer 404.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use stencil_client::{ApiClients, ClientConfig, StaticBoundary};
use stencil_core::{MemorySession, TenantInfo};

/// API prefix every stub path is mounted under.
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Clone)]
struct Stub {
    method: Method,
    path: String,
    status: StatusCode,
    body: Value,
    delay: Option<Duration>,
}

#[derive(Default)]
struct Shared {
    stubs: Mutex<Vec<Stub>>,
    requests: Mutex<Vec<Recorded>>,
}

pub struct FakeBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, shared }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }

    /// Answers `method path` (relative to the API prefix) with `status` and `body`.
    /// Later stubs win over earlier ones.
    pub fn stub(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push_stub(method, path, status, body, None);
    }

    /// Like [`FakeBackend::stub`], but the answer is held back for `delay`.
    pub fn stub_delayed(&self, method: Method, path: &str, status: u16, body: Value, delay: Duration) {
        self.push_stub(method, path, status, body, Some(delay));
    }

    fn push_stub(&self, method: Method, path: &str, status: u16, body: Value, delay: Option<Duration>) {
        self.shared.stubs.lock().unwrap().push(Stub {
            method,
            path: format!("{API_PREFIX}{path}"),
            status: StatusCode::from_u16(status).unwrap(),
            body,
            delay,
        });
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    /// Requests received for `path` (relative to the API prefix).
    pub fn hits(&self, path: &str) -> Vec<Recorded> {
        let full = format!("{API_PREFIX}{path}");
        self.requests().into_iter().filter(|r| r.path == full).collect()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_base_url(self.base_url())
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    let path = uri.path().to_string();
    shared.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    let stub = shared
        .stubs
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find(|stub| stub.method == method && stub.path == path)
        .cloned();
    match stub {
        Some(stub) => {
            if let Some(delay) = stub.delay {
                tokio::time::sleep(delay).await;
            }
            (stub.status, Json(stub.body))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "No stub"}))),
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub const TENANT_ID: &str = "T1";
pub const PRODUCT_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

pub struct Harness {
    pub clients: Arc<ApiClients>,
    pub session: Arc<MemorySession>,
    pub boundary: Arc<StaticBoundary>,
}

pub fn harness(config: &ClientConfig, session: MemorySession, requires_auth: bool) -> Harness {
    let session = Arc::new(session);
    let boundary = Arc::new(StaticBoundary::new(requires_auth));
    let clients = Arc::new(ApiClients::new(config, session.clone(), boundary.clone()).unwrap());
    Harness {
        clients,
        session,
        boundary,
    }
}

pub fn tenant_session(token: &str) -> MemorySession {
    MemorySession::tenant(token, TenantInfo::new(TENANT_ID, "acme"))
}

pub fn product_json(tenant_id: Option<&str>) -> Value {
    let mut product = json!({
        "id": PRODUCT_ID,
        "slug": "brass-plaque",
        "name": "Brass plaque",
        "price": 125.0,
        "stock_quantity": 8,
        "status": "published"
    });
    if let Some(tenant_id) = tenant_id {
        product["tenant_id"] = json!(tenant_id);
    }
    product
}

pub fn page_json(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({
        "data": items,
        "meta": {"current_page": 1, "per_page": 15, "total": total, "last_page": 1}
    })
}
