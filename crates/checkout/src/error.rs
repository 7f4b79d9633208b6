//! Checkout error types.

use domain::{CartError, ProductId, VoucherCode, VoucherError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart failed structural validation.
    #[error("Invalid cart: {0}")]
    InvalidCart(#[from] CartError),

    /// The referenced voucher does not exist.
    #[error("Voucher not found: {0}")]
    VoucherNotFound(VoucherCode),

    /// The voucher exists but is not applicable to this cart.
    #[error(transparent)]
    Voucher(#[from] VoucherError),

    /// A product cannot cover the requested quantity.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order record could not be persisted.
    #[error("Order persistence failed: {0}")]
    OrderPersistence(String),

    /// A stock restore failed during compensation, leaving the named
    /// products in a known-inconsistent state.
    #[error("Compensation failed for products: {products:?}")]
    CompensationFailed { products: Vec<ProductId> },

    /// A storage call exceeded the configured deadline.
    #[error("Storage call '{operation}' timed out")]
    Timeout { operation: &'static str },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::VoucherNotFound(code) => CheckoutError::VoucherNotFound(code),
            StoreError::VoucherExhausted(code) => {
                CheckoutError::Voucher(VoucherError::Exhausted { code })
            }
            other => CheckoutError::Storage(other),
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_maps_from_store() {
        let err = StoreError::InsufficientStock {
            product_id: ProductId::new("SKU-001"),
            requested: 5,
            available: 2,
        };
        let mapped = CheckoutError::from(err);
        assert!(matches!(
            mapped,
            CheckoutError::InsufficientStock {
                requested: 5,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_voucher_exhausted_maps_to_voucher_error() {
        let err = StoreError::VoucherExhausted(VoucherCode::new("ONCE"));
        let mapped = CheckoutError::from(err);
        assert!(matches!(
            mapped,
            CheckoutError::Voucher(VoucherError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_backend_maps_to_storage() {
        let err = StoreError::Backend("down".to_string());
        let mapped = CheckoutError::from(err);
        assert!(matches!(mapped, CheckoutError::Storage(_)));
    }
}
