//! # stencil-client: Context-Aware API Clients
//!
//! Three HTTP clients (anonymous, tenant, platform) and the tenant-guarded
//! services on top of them.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        stencil-client                                   │
//! │                                                                         │
//! │  ProductService::list(query)                                            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ResourceService ── guard (stencil-core) ── reject / coerce             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ApiClients::resolve_client(user_type)                                  │
//! │        │                                                                │
//! │        ├──► AnonymousClient  /public/...    no credentials              │
//! │        ├──► TenantClient     /...           bearer + X-Tenant-ID        │
//! │        └──► PlatformClient   /platform/...  bearer + X-Platform-Admin   │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  Transport ── request chain ── reqwest ── response chain                │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  ApiError (normalized)  /  JSON payload                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Normalized [`ApiError`]
//! - [`transport`] - HTTP transport and interceptor traits
//! - [`interceptors`] - Header, credential and session-policy interceptors
//! - [`boundary`] - Login-redirect hook into the host UI
//! - [`clients`] - The three context clients
//! - [`resolver`] - Client registry
//! - [`fallback`] - Explicit public fallback for reads
//! - [`defaults`] - Built-in public content
//! - [`service`] - Resource services (products)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stencil_client::{create_product_service, ApiClients, ClientConfig, StaticBoundary};
//! use stencil_core::product::ProductQuery;
//! use stencil_core::{MemorySession, TenantInfo, UserType};
//!
//! # async fn run() -> Result<(), stencil_client::ApiError> {
//! let session = Arc::new(MemorySession::tenant("token", TenantInfo::new("T1", "acme")));
//! let clients = Arc::new(ApiClients::new(
//!     &ClientConfig::default(),
//!     session,
//!     Arc::new(StaticBoundary::new(true)),
//! )?);
//!
//! let products = create_product_service(clients, UserType::Tenant);
//! let page = products.list(&ProductQuery::default(), None).await?;
//! println!("{} products", page.data.len());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod boundary;
pub mod clients;
pub mod config;
pub mod defaults;
pub mod error;
pub mod fallback;
pub mod interceptors;
pub mod resolver;
pub mod service;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use boundary::{RedirectReason, StaticBoundary, UiBoundary};
pub use clients::{AnonymousClient, ApiClient, PlatformClient, TenantClient};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use resolver::ApiClients;
pub use service::{create_product_service, create_resource_service, ProductService, ResourceService};
pub use transport::{RequestOptions, Transport};
