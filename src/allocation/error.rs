use thiserror::Error;

/// Reasons a whole allocation batch is rejected.
///
/// No partial report is ever produced alongside one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Products list is required")]
    EmptyRequest,

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product name is ambiguous: {0}")]
    AmbiguousProduct(String),
}
