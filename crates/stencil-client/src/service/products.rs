//! Product catalog service.
//!
//! Typed façade over [`ResourceService`] for the `products` resource.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use stencil_core::casing::camel_case_value;
use stencil_core::product::{
    BulkDeleteResult, BulkStatusResult, BulkUpdateRequest, BulkUpdateResult,
    CreateProductRequest, Product, ProductQuery, ProductStatus, ReorderResult,
    UpdateProductRequest,
};
use stencil_core::types::{unwrap_data, PageMeta, Paginated};
use stencil_core::UserType;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::ResourceService;
use crate::error::{ApiError, ApiResult};
use crate::fallback::prefer_primary;
use crate::resolver::ApiClients;

/// Product service for `user_type`.
pub fn create_product_service(clients: Arc<ApiClients>, user_type: UserType) -> ProductService {
    ProductService::new(clients, user_type)
}

pub struct ProductService {
    resource: ResourceService,
}

impl ProductService {
    pub fn new(clients: Arc<ApiClients>, user_type: UserType) -> Self {
        Self {
            resource: ResourceService::new(clients, user_type, "products"),
        }
    }

    pub fn user_type(&self) -> UserType {
        self.resource.user_type()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Paginated product list. A tenant caller filtering on another tenant
    /// is rejected before any request.
    pub async fn list(
        &self,
        query: &ProductQuery,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Paginated<Product>> {
        let body = self
            .resource
            .list(to_map(query)?, cancel, "fetch products")
            .await?;
        self.decode(decode_page(body), "fetch products")
    }

    /// Product by id. Anything that is not a hyphenated UUID is looked up
    /// as a slug instead.
    pub async fn get_by_id(
        &self,
        id: &str,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        if !is_uuid(id) {
            debug!(id, "Product id is not a UUID, looking up by slug");
            return self.get_by_slug(id, cancel).await;
        }
        let body = self
            .resource
            .fetch(&urlencoding::encode(id), cancel, "fetch product")
            .await?;
        self.decode(decode_one(body), "fetch product")
    }

    pub async fn get_by_slug(
        &self,
        slug: &str,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        let suffix = format!("slug/{}", urlencoding::encode(slug));
        let body = self
            .resource
            .fetch(&suffix, cancel, "fetch product by slug")
            .await?;
        self.decode(decode_one(body), "fetch product by slug")
    }

    /// Slug lookup through this service's identity, then through the public
    /// catalog if the first read found nothing or could not reach the
    /// backend. Auth and permission failures are not retried publicly.
    pub async fn get_by_slug_or_public(
        &self,
        slug: &str,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        if self.user_type() == UserType::Anonymous {
            return self.get_by_slug(slug, cancel).await;
        }
        let public = ProductService::new(self.resource.clients().clone(), UserType::Anonymous);
        prefer_primary(
            "fetch product by slug",
            self.get_by_slug(slug, cancel),
            move || async move { public.get_by_slug(slug, cancel).await },
        )
        .await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates a product. Tenant callers always create in their own tenant;
    /// platform callers must name one.
    pub async fn create(
        &self,
        request: &CreateProductRequest,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        let operation = "create product";
        let body = self
            .resource
            .create(to_map(request)?, cancel, operation)
            .await?;
        self.decode(decode_one(body), operation)
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateProductRequest,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        let operation = "update product";
        let body = self
            .resource
            .update(&urlencoding::encode(id), to_map(request)?, cancel, operation)
            .await?;
        self.decode(decode_one(body), operation)
    }

    pub async fn delete(&self, id: &str, cancel: Option<&CancellationToken>) -> ApiResult<()> {
        self.resource
            .remove(&urlencoding::encode(id), cancel, "delete product")
            .await?;
        Ok(())
    }

    pub async fn bulk_delete(
        &self,
        ids: &[String],
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<BulkDeleteResult> {
        let operation = "delete products";
        let body = self
            .resource
            .action(
                Method::POST,
                "bulk-delete",
                Some(json!({ "ids": ids })),
                cancel,
                operation,
            )
            .await?;
        self.decode(decode_or_default(body), operation)
    }

    pub async fn bulk_status_update(
        &self,
        ids: &[String],
        status: ProductStatus,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<BulkStatusResult> {
        let operation = "update product status";
        let body = self
            .resource
            .action(
                Method::POST,
                "bulk-status",
                Some(json!({ "ids": ids, "status": status })),
                cancel,
                operation,
            )
            .await?;
        self.decode(decode_or_default(body), operation)
    }

    /// Applies the same price/stock/status changes to many products.
    ///
    /// The changes travel beside `product_ids` at the top level of the body,
    /// as `priceUpdate`, `stockUpdate`, `status`, `featured` and `category`.
    pub async fn bulk_update(
        &self,
        ids: &[String],
        changes: &BulkUpdateRequest,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<BulkUpdateResult> {
        let operation = "bulk update products";
        let mut payload = to_map(changes)?;
        payload.insert("product_ids".into(), json!(ids));
        let body = self
            .resource
            .action(
                Method::POST,
                "bulk-update",
                Some(Value::Object(payload)),
                cancel,
                operation,
            )
            .await?;
        self.decode(decode_or_default(body), operation)
    }

    pub async fn duplicate(
        &self,
        id: &str,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        let operation = "duplicate product";
        let suffix = format!("{}/duplicate", urlencoding::encode(id));
        let body = self
            .resource
            .action(Method::POST, &suffix, None, cancel, operation)
            .await?;
        self.decode(decode_one(body), operation)
    }

    /// Persists a new display order.
    pub async fn reorder(
        &self,
        ids: &[String],
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<ReorderResult> {
        let operation = "reorder products";
        let body = self
            .resource
            .action(
                Method::POST,
                "reorder",
                Some(json!({ "product_ids": ids })),
                cancel,
                operation,
            )
            .await?;
        self.decode(decode_or_default(body), operation)
    }

    pub async fn toggle_featured(
        &self,
        id: &str,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        let operation = "toggle featured product";
        let suffix = format!("{}/toggle-featured", urlencoding::encode(id));
        let body = self
            .resource
            .action(Method::PATCH, &suffix, None, cancel, operation)
            .await?;
        self.decode(decode_one(body), operation)
    }

    pub async fn update_stock(
        &self,
        id: &str,
        quantity: i64,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<Product> {
        let operation = "update product stock";
        let suffix = format!("{}/stock", urlencoding::encode(id));
        let body = self
            .resource
            .action(
                Method::PATCH,
                &suffix,
                Some(json!({ "stock_quantity": quantity })),
                cancel,
                operation,
            )
            .await?;
        self.decode(decode_one(body), operation)
    }

    /// Routes a decoding failure through the same handling as a failed call.
    fn decode<T>(&self, decoded: ApiResult<T>, operation: &str) -> ApiResult<T> {
        decoded.map_err(|err| {
            debug!(operation, detail = %err.message, "Response did not decode");
            self.resource.handle_error(err, operation)
        })
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn is_uuid(id: &str) -> bool {
    id.len() == 36 && Uuid::try_parse(id).is_ok()
}

fn to_map<T: Serialize>(value: &T) -> ApiResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::context("Request payload must be an object")),
    }
}

fn decode_one<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(camel_case_value(unwrap_data(body)))?)
}

/// Like [`decode_one`], but an empty body yields the default result.
fn decode_or_default<T: DeserializeOwned + Default>(body: Value) -> ApiResult<T> {
    match unwrap_data(body) {
        Value::Null => Ok(T::default()),
        data => Ok(serde_json::from_value(camel_case_value(data))?),
    }
}

/// Accepts `{ data: [...], meta }`, the same wrapped in `{ success, data }`,
/// or a bare array.
fn decode_page(body: Value) -> ApiResult<Paginated<Product>> {
    let wrapped = body
        .get("data")
        .is_some_and(|data| data.get("data").is_some());
    let page = if wrapped { unwrap_data(body) } else { body };

    match page {
        Value::Array(items) => Ok(Paginated {
            data: serde_json::from_value(camel_case_value(Value::Array(items)))?,
            meta: None,
        }),
        Value::Object(mut map) => {
            let data = map
                .remove("data")
                .map(camel_case_value)
                .unwrap_or_else(|| Value::Array(Vec::new()));
            let meta = match map.remove("meta") {
                Some(meta) if !meta.is_null() => {
                    Some(serde_json::from_value::<PageMeta>(camel_case_value(meta))?)
                }
                _ => None,
            };
            Ok(Paginated {
                data: serde_json::from_value(data)?,
                meta,
            })
        }
        _ => Err(ApiError::api("Unexpected product list response")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_detection() {
        assert!(is_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!is_uuid("brass-plaque"));
    }

    #[test]
    fn test_decode_page_shapes() {
        let flat = json!({
            "data": [{"id": "p1", "name": "Plaque", "stock_quantity": 3}],
            "meta": {"current_page": 2, "per_page": 10, "total": 11, "last_page": 2}
        });
        let page = decode_page(flat).unwrap();
        assert_eq!(page.data[0].stock_quantity, Some(3));
        assert_eq!(page.meta.unwrap().current_page, 2);

        let wrapped = json!({"success": true, "data": {"data": [{"id": "p1", "name": "Plaque"}]}});
        assert_eq!(decode_page(wrapped).unwrap().data.len(), 1);

        let bare = json!([{"id": "p1", "name": "Plaque"}]);
        assert!(decode_page(bare).unwrap().meta.is_none());
    }

    #[test]
    fn test_decode_one_unwraps_and_converts_keys() {
        let product: Product = decode_one(json!({
            "success": true,
            "data": {"id": "p1", "name": "Plaque", "long_description": "Solid brass"}
        }))
        .unwrap();
        assert_eq!(product.long_description.as_deref(), Some("Solid brass"));
    }

    #[test]
    fn test_decode_or_default_on_empty_body() {
        let result: BulkDeleteResult = decode_or_default(Value::Null).unwrap();
        assert_eq!(result, BulkDeleteResult::default());

        let result: BulkDeleteResult =
            decode_or_default(json!({"success": true, "deleted": 2})).unwrap();
        assert_eq!(result.deleted, 2);
    }
}
