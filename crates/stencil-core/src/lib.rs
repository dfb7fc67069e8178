//! # stencil-core: Pure Tenant-Isolation Logic for Stencil
//!
//! This crate contains every decision the API client makes *before* a byte
//! hits the network: who is calling, which tenant they belong to, which
//! endpoint prefix they may use and what a payload must look like.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stencil Client Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Resource services (stencil-client)                 │   │
//! │  │    list ──► get ──► create ──► update ──► bulk actions          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stencil-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   guard   │  │  routing  │  │  session  │  │  casing   │  │   │
//! │  │   │ AuthCtx   │  │ /platform │  │ Provider  │  │ camel ⇄   │  │   │
//! │  │   │ filters   │  │ / /public │  │ demo tok  │  │  snake    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          Context clients + transport (stencil-client)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identity and envelope types (UserType, AuthContext, ...)
//! - [`product`] - Product DTOs and bulk request/response shapes
//! - [`session`] - Session provider contract and an in-memory implementation
//! - [`guard`] - Tenant guard: auth context, filter and mutation checks
//! - [`routing`] - Identity-specific endpoint prefixes
//! - [`casing`] - camelCase ⇄ snake_case key conversion
//! - [`error`] - Guard error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stencil_core::routing::resolve_endpoint;
//! use stencil_core::types::UserType;
//!
//! assert_eq!(resolve_endpoint(UserType::Platform, "products"), "/platform/products");
//! assert_eq!(resolve_endpoint(UserType::Tenant, "products"), "/products");
//! assert_eq!(resolve_endpoint(UserType::Anonymous, "products"), "/public/products");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod casing;
pub mod error;
pub mod guard;
pub mod product;
pub mod routing;
pub mod session;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{GuardError, GuardResult};
pub use session::{MemorySession, SessionProvider, SessionState};
pub use types::{AuthContext, TenantInfo, UserType};

// =============================================================================
// Constants
// =============================================================================

/// Token prefix that marks a demo session.
///
/// Demo tokens are never sent as bearer credentials and survive a 401.
pub const DEFAULT_DEMO_TOKEN_PREFIX: &str = "demo_token_";

/// Wire key carrying the owning tenant on filters, payloads and responses.
pub const TENANT_ID_FIELD: &str = "tenant_id";
