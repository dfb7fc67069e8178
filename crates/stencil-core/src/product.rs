//! # Product Types
//!
//! Product catalog DTOs exchanged with the backend.
//!
//! Callers build requests in camelCase; the client converts keys to
//! snake_case on the way out and back to camelCase on the way in, so every
//! type here uses `rename_all = "camelCase"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

// =============================================================================
// Enums
// =============================================================================

/// Publication state of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Published => "published",
            ProductStatus::Archived => "archived",
        }
    }
}

/// Stock availability label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    InStock,
    OutOfStock,
    PreOrder,
}

/// Kind of a customization field offered on a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CustomizationKind {
    Text,
    Select,
    Color,
    Image,
}

/// One customization field (engraving text, finish color, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomizationOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CustomizationKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product as returned by the backend.
///
/// Prices are whatever the backend sends; this client never does arithmetic
/// on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub price_unit: Option<String>,
    #[serde(default)]
    pub min_order: Option<u32>,
    #[serde(default)]
    pub max_order: Option<u32>,
    #[serde(default)]
    pub lead_time: Option<String>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub specifications: Option<Value>,
    #[serde(default)]
    pub customization_options: Vec<CustomizationOption>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub seo_keywords: Vec<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    /// Owning tenant, only when the backend chooses to expose it.
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Queries
// =============================================================================

/// List parameters and filters for product collections.
///
/// Serialized with snake_case keys, which become the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    /// Only honored for the caller's own tenant, or by platform callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

// =============================================================================
// Mutations
// =============================================================================

/// Optional product attributes shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customization_options: Vec<CustomizationOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
}

/// Payload for creating a product.
///
/// For tenant callers `tenant_id` is overwritten with the session tenant;
/// platform callers must set it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(flatten)]
    pub details: ProductDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Partial update of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: ProductDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

// =============================================================================
// Bulk Operations
// =============================================================================

/// How a bulk price change is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    Set,
    Add,
    Subtract,
    Multiply,
}

/// How a bulk stock change is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockMode {
    Set,
    Add,
    Subtract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceAdjustment {
    pub mode: PriceMode,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub mode: StockMode,
    pub value: i64,
}

/// Changes applied to every product in a bulk update.
///
/// Sent at the top level of the request body next to `product_ids`,
/// keeping the camelCase keys the bulk endpoint reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_update: Option<PriceAdjustment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_update: Option<StockAdjustment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkDeleteResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub deleted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkStatusResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub updated: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateFailure {
    // Nested under `errors`, so it arrives in the backend's snake_case.
    #[serde(alias = "product_id")]
    pub product_id: String,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkUpdateResult {
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub errors: Vec<BulkUpdateFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReorderResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_only_serializes_set_fields() {
        let request = CreateProductRequest {
            name: "Widget".into(),
            tenant_id: Some("other".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Widget", "tenantId": "other"})
        );
    }

    #[test]
    fn test_details_flatten_into_request() {
        let request = UpdateProductRequest {
            details: ProductDetails {
                stock_quantity: Some(4),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"stockQuantity": 4}));
    }

    #[test]
    fn test_product_deserializes_minimal_payload() {
        let product: Product = serde_json::from_value(json!({
            "id": "p1",
            "name": "Brass plaque",
            "availability": "in-stock",
            "customizationOptions": [{"name": "Finish", "type": "color", "required": true}]
        }))
        .unwrap();
        assert_eq!(product.availability, Some(Availability::InStock));
        assert_eq!(product.customization_options[0].kind, CustomizationKind::Color);
        assert!(product.tenant_id.is_none());
        assert!(!product.featured);
    }

    #[test]
    fn test_query_uses_snake_case_keys() {
        let query = ProductQuery {
            per_page: Some(20),
            status: Some(ProductStatus::Published),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"per_page": 20, "status": "published"})
        );
    }

    #[test]
    fn test_bulk_update_request_uses_backend_modes() {
        let request = BulkUpdateRequest {
            price_update: Some(PriceAdjustment {
                mode: PriceMode::Multiply,
                value: 1.1,
            }),
            stock_update: Some(StockAdjustment {
                mode: StockMode::Subtract,
                value: 2,
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "priceUpdate": {"mode": "multiply", "value": 1.1},
                "stockUpdate": {"mode": "subtract", "value": 2}
            })
        );
    }
}
