//! # Endpoint Routing
//!
//! Maps a resource path to the identity-specific endpoint.
//!
//! ```text
//! platform  + "products" ──► /platform/products
//! tenant    + "products" ──► /products
//! anonymous + "products" ──► /public/products
//! ```

use crate::error::GuardResult;
use crate::types::UserType;

/// Path prefix for an identity (no trailing slash).
pub const fn endpoint_prefix(user_type: UserType) -> &'static str {
    match user_type {
        UserType::Platform => "/platform",
        UserType::Tenant => "",
        UserType::Anonymous => "/public",
    }
}

/// Joins the identity prefix and a resource path.
///
/// Leading slashes on `resource` are ignored.
pub fn resolve_endpoint(user_type: UserType, resource: &str) -> String {
    format!(
        "{}/{}",
        endpoint_prefix(user_type),
        resource.trim_start_matches('/')
    )
}

/// [`resolve_endpoint`] for an identity given as a string.
///
/// Fails with [`crate::GuardError::UnknownUserType`] instead of guessing.
pub fn resolve_endpoint_named(user_type: &str, resource: &str) -> GuardResult<String> {
    Ok(resolve_endpoint(user_type.parse()?, resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;

    #[test]
    fn test_prefixes() {
        assert_eq!(resolve_endpoint(UserType::Platform, "products"), "/platform/products");
        assert_eq!(resolve_endpoint(UserType::Tenant, "products"), "/products");
        assert_eq!(resolve_endpoint(UserType::Anonymous, "products"), "/public/products");
    }

    #[test]
    fn test_nested_resources_and_leading_slash() {
        assert_eq!(
            resolve_endpoint(UserType::Platform, "/products/bulk-delete"),
            "/platform/products/bulk-delete"
        );
        assert_eq!(
            resolve_endpoint(UserType::Anonymous, "content/pages/about"),
            "/public/content/pages/about"
        );
    }

    #[test]
    fn test_named_identity() {
        assert_eq!(resolve_endpoint_named("tenant", "orders").unwrap(), "/orders");
        assert_eq!(
            resolve_endpoint_named("superuser", "orders"),
            Err(GuardError::UnknownUserType("superuser".into()))
        );
    }
}
