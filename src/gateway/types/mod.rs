//! Gateway types module
//!
//! ## Input Types
//! - [`ValidatedJson`]: Axum extractor for framework-level body validation
//! - [`ValidateOrderRequest`], [`CreateOrderRequest`]: order bodies
//! - [`UpdateStockRequest`]: stock update body
//! - [`UpdateProductRequest`]: product update body
//! - [`OrderListQuery`]: order listing query
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: success wrapper
//! - [`ApiError`]: error response with status and code
//!
//! ## Submodules
//! - [`order`]: Order request types and the extractor
//! - [`product`]: Product request/response types
//! - [`stock`]: Stock request/response types
//! - [`response`]: Response types and error codes

pub mod order;
pub mod product;
pub mod response;
pub mod stock;

pub use order::{
    CreateOrderRequest, OrderListData, OrderListQuery, ProductLine, SortDirection,
    ValidateOrderRequest, ValidatedJson,
};
pub use product::{ProductData, ProductListData, ProductUpdatedData, UpdateProductRequest};
pub use response::{ApiError, ApiResponse, ApiResult, ErrorBody, created, error_codes, ok};
pub use stock::{
    StockData, StockDeletedData, StockListData, StockLogData, StockLogQuery, UpdateStockRequest,
};
