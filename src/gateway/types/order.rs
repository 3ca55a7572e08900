//! Order request types and the validating JSON extractor
//!
//! - `ProductLine` / `ValidateOrderRequest` / `CreateOrderRequest`: HTTP bodies
//! - `OrderListQuery`: GET /order query string
//! - `ValidatedJson<T>`: axum extractor that parses and `validate()`s a body

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::allocation::ProductRequest;
use crate::core_types::Units;
use crate::inventory::{OrderFilter, OrderPage, OrderStatus};

use super::response::ApiError;

/// Upper bound on a single line's quantity
const MAX_LINE_QUANTITY: i64 = 10_000;

/// Largest page GET /order returns
const MAX_PAGE_SIZE: u32 = 500;

/// One requested product line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductLine {
    /// Product id or exact display name
    #[validate(length(min = 1, message = "product is required"))]
    #[schema(example = "Latte")]
    pub product: String,
    #[validate(range(min = 1, max = MAX_LINE_QUANTITY, message = "quantity must be between 1 and 10000"))]
    #[schema(example = 2, minimum = 1, maximum = 10000)]
    pub quantity: i64,
}

impl ProductLine {
    fn to_request(&self) -> Result<ProductRequest, ApiError> {
        let quantity = Units::try_from(self.quantity)
            .map_err(|_| ApiError::bad_request("quantity must be between 1 and 10000"))?;
        Ok(ProductRequest::new(self.product.clone(), quantity))
    }
}

fn to_requests(lines: &[ProductLine]) -> Result<Vec<ProductRequest>, ApiError> {
    lines.iter().map(ProductLine::to_request).collect()
}

/// POST /order/validate body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ValidateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Products list is required"), nested)]
    pub products: Vec<ProductLine>,
}

impl ValidateOrderRequest {
    pub fn requests(&self) -> Result<Vec<ProductRequest>, ApiError> {
        to_requests(&self.products)
    }
}

/// POST /order body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Products list is required"), nested)]
    pub products: Vec<ProductLine>,
    /// Free-form order customisation, stored as-is
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub custom: Option<serde_json::Value>,
}

impl CreateOrderRequest {
    pub fn requests(&self) -> Result<Vec<ProductRequest>, ApiError> {
        to_requests(&self.products)
    }
}

/// Sort direction over `created_at`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// GET /order query. Dates are whole UTC days; `end_date` is inclusive.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub offset: u32,
    #[validate(range(min = 1, max = MAX_PAGE_SIZE, message = "limit must be between 1 and 500"))]
    pub limit: Option<u32>,
    #[serde(default)]
    pub direction: SortDirection,
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

impl OrderListQuery {
    pub fn to_filter(&self) -> Result<OrderFilter, ApiError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ApiError::bad_request("start_date must not be after end_date"));
            }
        }
        Ok(OrderFilter {
            status: self.status,
            user_id: self.user_id.clone(),
            created_from: self.start_date.map(start_of),
            created_before: self.end_date.and_then(|d| d.succ_opt()).map(start_of),
            newest_first: self.direction == SortDirection::Desc,
            offset: self.offset,
            limit: Some(self.limit.unwrap_or(MAX_PAGE_SIZE)),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListData {
    #[serde(flatten)]
    pub page: OrderPage,
}

// ============================================================================
// ValidatedJson: Axum Framework Integration
// ============================================================================

/// JSON body that has passed serde parsing and `Validate`.
///
/// Malformed JSON (including fractional or non-numeric quantities) and
/// failed field checks are both rejected with 400 before the handler runs.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value): Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        value
            .validate()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        Ok(ValidatedJson(value))
    }
}
