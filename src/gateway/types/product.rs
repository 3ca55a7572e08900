//! Product request and response bodies

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::inventory::{ProductDetail, ProductUpdate, RecipeLine};

/// PUT /product/{id} body
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[serde(default)]
    #[validate(nested)]
    pub updates: ProductUpdate,
    /// Recipe changes; a quantity of 0 removes the ingredient
    #[serde(default)]
    #[validate(nested)]
    pub ingredients: Vec<RecipeLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListData {
    pub products: Vec<ProductDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductData {
    pub product: ProductDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductUpdatedData {
    pub product: ProductDetail,
    /// Recipe lines skipped because no stock item matched
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_stock_items: Vec<String>,
}
