//! Storage error types.

use common::OrderId;
use domain::{OrderStatus, ProductId, VoucherCode};
use thiserror::Error;

/// Errors that can occur when interacting with the storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional stock decrement found less stock than requested.
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product does not exist in the ledger.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The voucher code does not resolve to a record.
    #[error("voucher not found: {0}")]
    VoucherNotFound(VoucherCode),

    /// A compare-and-increment redemption found the voucher already at
    /// its usage cap.
    #[error("voucher exhausted at redemption time: {0}")]
    VoucherExhausted(VoucherCode),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested order status transition is not legal.
    #[error("illegal order status transition: {from} -> {to}")]
    IllegalStatusTransition { from: OrderStatus, to: OrderStatus },

    /// A stored record could not be interpreted.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    /// The backend rejected or could not perform the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
