//! Product handlers (catalog, recipes, availability)

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::allocation::ProductAvailability;
use crate::inventory::NewProduct;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, ErrorBody, ProductData, ProductListData, ProductUpdatedData,
    UpdateProductRequest, ValidatedJson, created, error_codes, ok,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityListData {
    pub availability: Vec<ProductAvailability>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityData {
    pub availability: ProductAvailability,
}

/// List products with their recipes
///
/// GET /api/v1/product
#[utoipa::path(
    get,
    path = "/api/v1/product",
    responses(
        (status = 200, description = "Catalog products with ingredients", body = ProductListData)
    ),
    tag = "Products"
)]
pub async fn list_products(State(state): State<Arc<AppState>>) -> ApiResult<ProductListData> {
    let products = state.catalog.list_products().await?;
    ok(ProductListData { products })
}

/// GET /api/v1/product/{product_id}
#[utoipa::path(
    get,
    path = "/api/v1/product/{product_id}",
    params(("product_id" = String, Path, description = "Product id or exact name")),
    responses(
        (status = 200, description = "Product with ingredients", body = ProductData),
        (status = 400, description = "Ambiguous name", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> ApiResult<ProductData> {
    let product = state.catalog.get_product(&product_id).await?;
    ok(ProductData { product })
}

/// Create a product and its recipe
///
/// POST /api/v1/product
#[utoipa::path(
    post,
    path = "/api/v1/product",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created", body = ProductData),
        (status = 400, description = "Invalid parameters or unknown stock items", body = ErrorBody)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<NewProduct>,
) -> ApiResult<ProductData> {
    let product = state.catalog.create_product(&req).await?;
    created(ProductData { product })
}

/// Update product fields and recipe. Unknown stock items are reported, not fatal.
///
/// PUT /api/v1/product/{product_id}
#[utoipa::path(
    put,
    path = "/api/v1/product/{product_id}",
    request_body = UpdateProductRequest,
    params(("product_id" = String, Path, description = "Product id or exact name")),
    responses(
        (status = 200, description = "Updated product", body = ProductUpdatedData),
        (status = 400, description = "Invalid parameters or nothing to update", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> ApiResult<ProductUpdatedData> {
    let updated = state
        .catalog
        .update_product(&product_id, &req.updates, &req.ingredients)
        .await?;
    ok(ProductUpdatedData {
        product: updated.product,
        missing_stock_items: updated.missing_stock_items,
    })
}

/// Producible units for every catalog product
///
/// GET /api/v1/product/availability
#[utoipa::path(
    get,
    path = "/api/v1/product/availability",
    responses(
        (status = 200, description = "Availability per product", body = AvailabilityListData)
    ),
    tag = "Products"
)]
pub async fn get_availability(State(state): State<Arc<AppState>>) -> ApiResult<AvailabilityListData> {
    let availability = state.catalog.availability(None).await?;
    ok(AvailabilityListData { availability })
}

/// Producible units for one product (id or exact name)
///
/// GET /api/v1/product/availability/{product_id}
#[utoipa::path(
    get,
    path = "/api/v1/product/availability/{product_id}",
    params(("product_id" = String, Path, description = "Product id or exact name")),
    responses(
        (status = 200, description = "Availability", body = AvailabilityData),
        (status = 404, description = "Unknown product", body = ErrorBody)
    ),
    tag = "Products"
)]
pub async fn get_product_availability(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> ApiResult<AvailabilityData> {
    let availability = state
        .catalog
        .availability(Some(&product_id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ApiError::not_found(
                error_codes::PRODUCT_NOT_FOUND,
                format!("Product not found: {}", product_id),
            )
        })?;
    ok(AvailabilityData { availability })
}
