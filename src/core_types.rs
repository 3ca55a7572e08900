//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! Ids are opaque strings: the database issues UUIDs, but nothing in the
//! allocation logic depends on their format.

/// Product ID - primary key of a catalog product.
pub type ProductId = String;

/// Stock ID - primary key of an ingredient stock row.
///
/// # Usage:
/// - Key of `StockLevel` and of the inner map of `IngredientUsage`
/// - Referenced by `stock_adjustments` audit rows
pub type StockId = String;

/// User ID - supplied by the authentication layer in front of the gateway.
pub type UserId = String;

/// Order ID - generated by the service (UUID v4) when an order is committed.
pub type OrderId = uuid::Uuid;

/// Whole units of a product (requested or allowed).
pub type Units = u32;
