//! Stock handlers (list, get, create, update, delete, adjustment log)

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};

use crate::inventory::NewStockItem;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, ErrorBody, StockData, StockDeletedData, StockListData, StockLogData,
    StockLogQuery, UpdateStockRequest, ValidatedJson, created, ok,
};
use super::helpers::extract_user_id;

/// List stock, sorted by item name
///
/// GET /api/v1/stock
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    responses(
        (status = 200, description = "All stock items with fill level", body = StockListData)
    ),
    tag = "Stock"
)]
pub async fn list_stock(State(state): State<Arc<AppState>>) -> ApiResult<StockListData> {
    let stock = state.stock.list().await?;
    ok(StockListData { stock })
}

/// GET /api/v1/stock/{stock_id}
#[utoipa::path(
    get,
    path = "/api/v1/stock/{stock_id}",
    params(("stock_id" = String, Path, description = "Stock id")),
    responses(
        (status = 200, description = "Stock item", body = StockData),
        (status = 404, description = "Unknown stock id", body = ErrorBody)
    ),
    tag = "Stock"
)]
pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(stock_id): Path<String>,
) -> ApiResult<StockData> {
    let stock = state.stock.get(&stock_id).await?;
    ok(StockData { stock })
}

/// Create a stock item
///
/// POST /api/v1/stock
#[utoipa::path(
    post,
    path = "/api/v1/stock",
    request_body = NewStockItem,
    responses(
        (status = 201, description = "Stock item created", body = StockData),
        (status = 400, description = "Invalid or unstorable amounts", body = ErrorBody),
        (status = 409, description = "Item already exists", body = ErrorBody)
    ),
    tag = "Stock"
)]
pub async fn create_stock(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<NewStockItem>,
) -> ApiResult<StockData> {
    let stock = state.stock.create(&req).await?;
    created(StockData { stock })
}

/// Update a stock item. Quantity changes need a `reference` and are logged.
///
/// PUT /api/v1/stock/{stock_id}
#[utoipa::path(
    put,
    path = "/api/v1/stock/{stock_id}",
    request_body = UpdateStockRequest,
    params(
        ("stock_id" = String, Path, description = "Stock id"),
        ("X-User-ID" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Updated stock item", body = StockData),
        (status = 400, description = "Invalid parameters or missing reference", body = ErrorBody),
        (status = 401, description = "Missing X-User-ID", body = ErrorBody),
        (status = 404, description = "Unknown stock id", body = ErrorBody),
        (status = 409, description = "Item name already in use", body = ErrorBody)
    ),
    tag = "Stock"
)]
pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    Path(stock_id): Path<String>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<UpdateStockRequest>,
) -> ApiResult<StockData> {
    let user_id = extract_user_id(&headers)?;
    let (update, note) = req.into_parts(user_id);
    let stock = state.stock.update(&stock_id, &update, &note).await?;
    ok(StockData { stock })
}

/// Delete a stock item no recipe uses
///
/// DELETE /api/v1/stock/{stock_id}
#[utoipa::path(
    delete,
    path = "/api/v1/stock/{stock_id}",
    params(("stock_id" = String, Path, description = "Stock id")),
    responses(
        (status = 200, description = "Deleted stock item", body = StockDeletedData),
        (status = 404, description = "Unknown stock id", body = ErrorBody),
        (status = 409, description = "Stock item used by a product recipe", body = ErrorBody)
    ),
    tag = "Stock"
)]
pub async fn delete_stock(
    State(state): State<Arc<AppState>>,
    Path(stock_id): Path<String>,
) -> ApiResult<StockDeletedData> {
    let stock = state.stock.delete(&stock_id).await?;
    ok(StockDeletedData {
        stock,
        message: "Stock item deleted".to_string(),
    })
}

/// Stock adjustment log, newest first
///
/// GET /api/v1/stock/log
#[utoipa::path(
    get,
    path = "/api/v1/stock/log",
    params(("stock_id" = Option<String>, Query, description = "Only entries for this stock id")),
    responses(
        (status = 200, description = "Adjustment log", body = StockLogData)
    ),
    tag = "Stock"
)]
pub async fn stock_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StockLogQuery>,
) -> ApiResult<StockLogData> {
    let adjustments = state.stock.adjustments(query.stock_id.as_deref()).await?;
    ok(StockLogData { adjustments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::handlers::demo_state;
    use crate::gateway::types::error_codes;
    use axum::http::{HeaderValue, StatusCode};
    use rust_decimal::Decimal;

    fn user_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-ID", HeaderValue::from_static("manager"));
        headers
    }

    #[tokio::test]
    async fn test_list_sorted_with_percentage() {
        let (_, axum::Json(body)) = list_stock(State(demo_state())).await.unwrap();
        let items: Vec<_> = body.data.stock.iter().map(|s| s.item.as_str()).collect();
        assert_eq!(items, vec!["Chocolate syrup", "Espresso beans", "Full cream milk"]);
        assert_eq!(body.data.stock[0].percentage_left, Decimal::from(9));
        assert_eq!(body.data.stock[2].percentage_left, Decimal::from(10));
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let state = demo_state();
        let new = NewStockItem {
            item: "Oat milk".to_string(),
            quantity: Decimal::from(4),
            unit_type: "l".to_string(),
            max_capacity: Some(Decimal::from(8)),
        };
        let (status, axum::Json(body)) =
            create_stock(State(state.clone()), ValidatedJson(new.clone()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.data.stock.percentage_left, Decimal::from(50));

        let err = create_stock(State(state), ValidatedJson(new))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, error_codes::STOCK_EXISTS);
    }

    #[tokio::test]
    async fn test_update_requires_reference_and_logs() {
        let state = demo_state();
        let without_reference = UpdateStockRequest {
            quantity: Some(Decimal::from(5)),
            ..Default::default()
        };
        let err = update_stock(
            State(state.clone()),
            Path("milk".to_string()),
            user_headers(),
            ValidatedJson(without_reference.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let with_reference = UpdateStockRequest {
            reference: Some("Delivery".to_string()),
            ..without_reference
        };
        let (_, axum::Json(body)) = update_stock(
            State(state.clone()),
            Path("milk".to_string()),
            user_headers(),
            ValidatedJson(with_reference),
        )
        .await
        .unwrap();
        assert_eq!(body.data.stock.quantity, Decimal::from(5));

        let query = StockLogQuery {
            stock_id: Some("milk".to_string()),
        };
        let (_, axum::Json(log)) = stock_log(State(state), Query(query)).await.unwrap();
        assert_eq!(log.data.adjustments.len(), 1);
        assert_eq!(log.data.adjustments[0].adjustment_qty, Decimal::from(3));
        assert_eq!(log.data.adjustments[0].reference_id, "manager");
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let state = demo_state();
        let new = NewStockItem {
            item: "Oat milk".to_string(),
            quantity: Decimal::from(-4),
            unit_type: "l".to_string(),
            max_capacity: None,
        };
        let err = create_stock(State(state.clone()), ValidatedJson(new))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let req = UpdateStockRequest {
            max_capacity: Some(Decimal::from(-1)),
            ..Default::default()
        };
        let err = update_stock(
            State(state),
            Path("milk".to_string()),
            user_headers(),
            ValidatedJson(req),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_stock() {
        let state = demo_state();
        let err = delete_stock(State(state.clone()), Path("milk".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, error_codes::STOCK_IN_USE);

        let new = NewStockItem {
            item: "Oat milk".to_string(),
            quantity: Decimal::from(4),
            unit_type: "l".to_string(),
            max_capacity: None,
        };
        let (_, axum::Json(body)) = create_stock(State(state.clone()), ValidatedJson(new))
            .await
            .unwrap();
        let oat_id = body.data.stock.id.clone();

        let (_, axum::Json(deleted)) = delete_stock(State(state.clone()), Path(oat_id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted.data.stock.item, "Oat milk");

        let err = delete_stock(State(state), Path(oat_id)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let state = demo_state();
        let err = update_stock(
            State(state.clone()),
            Path("milk".to_string()),
            user_headers(),
            ValidatedJson(UpdateStockRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let rename = UpdateStockRequest {
            unit_type: Some("ml".to_string()),
            ..Default::default()
        };
        let err = update_stock(
            State(state),
            Path("nope".to_string()),
            user_headers(),
            ValidatedJson(rename),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
