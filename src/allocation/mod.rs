//! Stock allocation
//!
//! Pure computations over inventory snapshots. Nothing here performs I/O.
//!
//! - [`validator`]: greedy per-ingredient reduction of requested quantities
//! - [`availability`]: producible units per product
//! - [`snapshot`]: usage/stock snapshots and product resolution

pub mod availability;
pub mod error;
pub mod snapshot;
pub mod validator;

pub use availability::{ProductAvailability, catalog_availability, product_availability};
pub use error::AllocationError;
pub use snapshot::{
    IngredientUsage, ProductRequest, ResolvedRequest, StockLevel, distinct_products, resolve,
    resolve_identifier,
};
pub use validator::{Adjustment, AllocationReport, allocate, validate};
