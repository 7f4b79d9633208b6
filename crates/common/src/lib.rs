//! Shared identifier types for the checkout engine.

mod types;

pub use types::OrderId;
