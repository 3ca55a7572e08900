//! Order use cases: validation against stock, atomic creation, listing, cancel and pay

pub mod error;
pub mod service;

pub use error::OrderError;
pub use service::OrderService;
