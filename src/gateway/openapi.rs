//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::allocation::{Adjustment, AllocationReport, ProductAvailability};
use crate::gateway::handlers::{
    AvailabilityData, AvailabilityListData, HealthResponse, OrderCreatedData, OrderData,
};
use crate::gateway::types::{
    CreateOrderRequest, ErrorBody, OrderListData, ProductData, ProductLine, ProductListData,
    ProductUpdatedData, StockData, StockDeletedData, StockListData, StockLogData,
    UpdateProductRequest, UpdateStockRequest, ValidateOrderRequest,
};
use crate::inventory::{
    Ingredient, NewProduct, NewStockItem, Order, OrderLine, OrderPage, OrderStatus, Product,
    ProductDetail, ProductUpdate, RecipeLine, ReferenceType, StockAdjustment, StockReport,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coffee POS API",
        version = "1.0.0",
        description = "Coffee shop backend: catalog and recipes, ingredient stock, and stock-constrained orders.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::validate_order,
        crate::gateway::handlers::create_order,
        crate::gateway::handlers::list_orders,
        crate::gateway::handlers::get_order,
        crate::gateway::handlers::cancel_order,
        crate::gateway::handlers::pay_order,
        crate::gateway::handlers::list_products,
        crate::gateway::handlers::get_product,
        crate::gateway::handlers::create_product,
        crate::gateway::handlers::update_product,
        crate::gateway::handlers::get_availability,
        crate::gateway::handlers::get_product_availability,
        crate::gateway::handlers::list_stock,
        crate::gateway::handlers::get_stock,
        crate::gateway::handlers::create_stock,
        crate::gateway::handlers::update_stock,
        crate::gateway::handlers::delete_stock,
        crate::gateway::handlers::stock_log,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            ProductLine,
            ValidateOrderRequest,
            CreateOrderRequest,
            Adjustment,
            AllocationReport,
            OrderCreatedData,
            OrderData,
            Order,
            OrderLine,
            OrderStatus,
            OrderPage,
            OrderListData,
            Product,
            RecipeLine,
            NewProduct,
            ProductUpdate,
            UpdateProductRequest,
            Ingredient,
            ProductDetail,
            ProductData,
            ProductListData,
            ProductUpdatedData,
            ProductAvailability,
            AvailabilityData,
            AvailabilityListData,
            NewStockItem,
            UpdateStockRequest,
            StockReport,
            StockData,
            StockListData,
            StockDeletedData,
            StockAdjustment,
            ReferenceType,
            StockLogData,
        )
    ),
    tags(
        (name = "Orders", description = "Order validation, creation and lifecycle"),
        (name = "Products", description = "Catalog, recipes and availability from current stock"),
        (name = "Stock", description = "Ingredient stock and adjustment log"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
