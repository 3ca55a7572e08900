//! API response wrapper, error type and error codes
//!
//! - `ApiResponse<T>`: `{ "success": true, ...data }`
//! - `ApiError`: `{ "error": <message>, "code": <int> }` with an HTTP status
//! - `error_codes`: error code constants

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::allocation::{Adjustment, AllocationError};
use crate::inventory::{CatalogError, InventoryError};
use crate::orders::OrderError;

// ============================================================================
// Success Responses
// ============================================================================

/// Success wrapper. The payload's fields sit next to `success`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 OK
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// Errors
// ============================================================================

/// Error body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Product not found: Flat white")]
    pub error: String,
    #[schema(example = 4001)]
    pub code: i32,
    /// Per-line allocation result when an order was rejected for stock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<Vec<Adjustment>>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
    pub adjustments: Option<Vec<Adjustment>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            adjustments: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::MISSING_AUTH, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_codes::FORBIDDEN, message)
    }

    pub fn not_found(code: i32, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: i32, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            message,
        )
    }

    /// Opaque 500; the cause is logged, never returned.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "Internal server error",
        )
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
            adjustments: self.adjustments,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::EmptyRequest => Self::bad_request(err.to_string()),
            AllocationError::ProductNotFound(_) => {
                Self::not_found(error_codes::PRODUCT_NOT_FOUND, err.to_string())
            }
            AllocationError::AmbiguousProduct(_) => Self::new(
                StatusCode::BAD_REQUEST,
                error_codes::AMBIGUOUS_PRODUCT,
                err.to_string(),
            ),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::StockNotFound(_) => {
                Self::not_found(error_codes::STOCK_NOT_FOUND, err.to_string())
            }
            InventoryError::StockAlreadyExists(_) => {
                Self::conflict(error_codes::STOCK_EXISTS, err.to_string())
            }
            InventoryError::StockInUse(_) => {
                Self::conflict(error_codes::STOCK_IN_USE, err.to_string())
            }
            InventoryError::InsufficientStock { .. } => {
                Self::conflict(error_codes::INSUFFICIENT_STOCK, err.to_string())
            }
            InventoryError::ProductNotFound(_) => {
                Self::not_found(error_codes::PRODUCT_NOT_FOUND, err.to_string())
            }
            InventoryError::OrderNotFound(_) => {
                Self::not_found(error_codes::ORDER_NOT_FOUND, err.to_string())
            }
            InventoryError::InvalidStatusTransition { .. } => {
                Self::conflict(error_codes::ORDER_STATUS_CONFLICT, err.to_string())
            }
            InventoryError::NoFieldsToUpdate
            | InventoryError::ReferenceRequired
            | InventoryError::InvalidValue(_) => Self::bad_request(err.to_string()),
            InventoryError::Database(_)
            | InventoryError::Corrupt(_)
            | InventoryError::Unavailable(_) => Self::internal(err),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Allocation(e) => e.into(),
            CatalogError::Inventory(e) => e.into(),
            CatalogError::StockItemsNotFound(_) => Self::bad_request(err.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidParameter(msg) => Self::bad_request(msg),
            OrderError::Allocation(e) => e.into(),
            OrderError::Inventory(e) => e.into(),
            OrderError::NotOrderOwner(_) => Self::forbidden(err.to_string()),
            OrderError::InsufficientStock(adjustments) => Self {
                adjustments: Some(adjustments),
                ..Self::conflict(
                    error_codes::INSUFFICIENT_STOCK,
                    "Insufficient stock for the requested products",
                )
            },
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_STOCK: i32 = 1002;
    pub const AMBIGUOUS_PRODUCT: i32 = 1003;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const FORBIDDEN: i32 = 2002;

    // Resource errors (4xxx)
    pub const PRODUCT_NOT_FOUND: i32 = 4001;
    pub const STOCK_NOT_FOUND: i32 = 4002;
    pub const ORDER_NOT_FOUND: i32 = 4003;
    pub const STOCK_EXISTS: i32 = 4091;
    pub const ORDER_STATUS_CONFLICT: i32 = 4092;
    pub const STOCK_IN_USE: i32 = 4093;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}
