//! Order handlers (validate, create, list, get, cancel, pay)

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Serialize;
use utoipa::ToSchema;

use validator::Validate;

use crate::allocation::AllocationReport;
use crate::core_types::OrderId;
use crate::inventory::Order;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateOrderRequest, ErrorBody, OrderListData, OrderListQuery,
    ValidateOrderRequest, ValidatedJson, created, ok,
};
use super::helpers::extract_user_id;

/// Create order response data
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreatedData {
    #[schema(value_type = String)]
    pub order_id: OrderId,
    #[schema(example = "Order created successfully")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderData {
    pub order: Order,
}

/// Validate order endpoint
///
/// POST /api/v1/order/validate
#[utoipa::path(
    post,
    path = "/api/v1/order/validate",
    request_body = ValidateOrderRequest,
    responses(
        (status = 200, description = "Per-line allocation against current stock", body = AllocationReport),
        (status = 400, description = "Invalid parameters", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn validate_order(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ValidateOrderRequest>,
) -> ApiResult<AllocationReport> {
    let requests = req.requests()?;
    let report = state.orders.validate_order(&requests).await?;
    ok(report)
}

/// Create order endpoint
///
/// POST /api/v1/order
#[utoipa::path(
    post,
    path = "/api/v1/order",
    request_body = CreateOrderRequest,
    params(("X-User-ID" = String, Header, description = "Caller identity")),
    responses(
        (status = 201, description = "Order created", body = OrderCreatedData),
        (status = 400, description = "Invalid parameters", body = ErrorBody),
        (status = 401, description = "Missing X-User-ID", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody),
        (status = 409, description = "Insufficient stock", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> ApiResult<OrderCreatedData> {
    let user_id = extract_user_id(&headers)?;
    let requests = req.requests()?;
    let order = state
        .orders
        .create_order(&user_id, &requests, req.custom)
        .await?;

    created(OrderCreatedData {
        order_id: order.id,
        message: "Order created successfully".to_string(),
    })
}

/// Get order endpoint
///
/// GET /api/v1/order/{order_id}
#[utoipa::path(
    get,
    path = "/api/v1/order/{order_id}",
    params(("order_id" = String, Path, description = "Order id (UUID)")),
    responses(
        (status = 200, description = "Order", body = OrderData),
        (status = 400, description = "Malformed order id", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> ApiResult<OrderData> {
    let order = state.orders.get_order(parse_order_id(&order_id)?).await?;
    ok(OrderData { order })
}

/// List orders
///
/// GET /api/v1/order
#[utoipa::path(
    get,
    path = "/api/v1/order",
    params(
        ("status" = Option<String>, Query, description = "pending, paid or cancelled"),
        ("user_id" = Option<String>, Query, description = "Only orders placed by this user"),
        ("start_date" = Option<String>, Query, description = "First day included (YYYY-MM-DD, UTC)"),
        ("end_date" = Option<String>, Query, description = "Last day included (YYYY-MM-DD, UTC)"),
        ("offset" = Option<u32>, Query, description = "Orders to skip"),
        ("limit" = Option<u32>, Query, description = "Page size, 1 to 500"),
        ("direction" = Option<String>, Query, description = "asc (default) or desc by created_at")
    ),
    responses(
        (status = 200, description = "One page of orders with counts", body = OrderListData),
        (status = 400, description = "Invalid query", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<OrderListData> {
    query
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let page = state.orders.list_orders(&query.to_filter()?).await?;
    ok(OrderListData { page })
}

/// Cancel a pending order and restore its stock. Only the order's owner may cancel.
///
/// POST /api/v1/order/{order_id}/cancel
#[utoipa::path(
    post,
    path = "/api/v1/order/{order_id}/cancel",
    params(
        ("order_id" = String, Path, description = "Order id (UUID)"),
        ("X-User-ID" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Cancelled order", body = OrderData),
        (status = 401, description = "Missing X-User-ID", body = ErrorBody),
        (status = 403, description = "Order belongs to another user", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order is no longer pending", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<OrderData> {
    let user_id = extract_user_id(&headers)?;
    let order = state
        .orders
        .cancel_order(parse_order_id(&order_id)?, &user_id)
        .await?;
    ok(OrderData { order })
}

/// Mark a pending order paid
///
/// POST /api/v1/order/{order_id}/pay
#[utoipa::path(
    post,
    path = "/api/v1/order/{order_id}/pay",
    params(
        ("order_id" = String, Path, description = "Order id (UUID)"),
        ("X-User-ID" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Paid order", body = OrderData),
        (status = 401, description = "Missing X-User-ID", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order is no longer pending", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn pay_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<OrderData> {
    let user_id = extract_user_id(&headers)?;
    let order = state
        .orders
        .pay_order(parse_order_id(&order_id)?, &user_id)
        .await?;
    ok(OrderData { order })
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid order id"))
}
