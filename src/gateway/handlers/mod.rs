//! HTTP handlers
//!
//! - [`health`]: health check
//! - [`order`]: order validation and creation
//! - [`product`]: product availability
//! - [`stock`]: stock management
//! - [`helpers`]: shared utilities

pub mod health;
pub mod helpers;
pub mod order;
pub mod product;
pub mod stock;

pub use health::*;
pub use order::*;
pub use product::*;
pub use stock::*;

/// State over the demo seed in `fixtures/inventory.yaml`
#[cfg(test)]
pub(crate) fn demo_state() -> std::sync::Arc<super::state::AppState> {
    use crate::inventory::{InventorySeed, MemoryInventory};
    use std::sync::Arc;

    let seed = InventorySeed::from_yaml_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/inventory.yaml"
    ))
    .expect("demo seed");
    Arc::new(super::state::AppState::new(Arc::new(MemoryInventory::from_seed(seed))))
}
