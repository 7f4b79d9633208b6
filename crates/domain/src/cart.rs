//! Cart lines and cart-level validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::{Money, ProductId};

/// A single line in a customer's cart.
///
/// Carts are ephemeral and owned by the client session; the checkout
/// saga receives the lines by value at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product being purchased.
    pub product_id: ProductId,
    /// Price per unit, captured at checkout time.
    pub unit_price: Money,
    /// Quantity purchased. Must be positive.
    pub quantity: u32,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(product_id: impl Into<ProductId>, unit_price: Money, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns the total price for this line (unit_price * quantity),
    /// or `None` when the product overflows the minor-unit range.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Errors raised when a cart fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart has no lines.
    #[error("cart is empty")]
    Empty,

    /// A line has quantity zero.
    #[error("line for product {product_id} has zero quantity")]
    ZeroQuantity { product_id: ProductId },

    /// A line has a negative unit price.
    #[error("line for product {product_id} has a negative unit price")]
    NegativeUnitPrice { product_id: ProductId },

    /// A line total or the running subtotal exceeds the representable
    /// amount range.
    #[error("line for product {product_id} overflows the order amount range")]
    AmountOverflow { product_id: ProductId },
}

/// Validates a cart before any pricing or mutation happens.
///
/// Rejects an empty cart, any line with zero quantity, and any line
/// with a negative unit price. Reports the first offending line.
pub fn validate_lines(lines: &[CartLine]) -> Result<(), CartError> {
    if lines.is_empty() {
        return Err(CartError::Empty);
    }

    for line in lines {
        if line.quantity == 0 {
            return Err(CartError::ZeroQuantity {
                product_id: line.product_id.clone(),
            });
        }
        if line.unit_price.is_negative() {
            return Err(CartError::NegativeUnitPrice {
                product_id: line.product_id.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_price_by_quantity() {
        let line = CartLine::new("SKU-001", Money::from_cents(1000), 3);
        assert_eq!(line.line_total(), Some(Money::from_cents(3000)));
    }

    #[test]
    fn line_total_overflow_yields_none() {
        let line = CartLine::new("SKU-001", Money::from_cents(i64::MAX), 2);
        assert_eq!(line.line_total(), None);
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert_eq!(validate_lines(&[]), Err(CartError::Empty));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let lines = vec![
            CartLine::new("SKU-001", Money::from_cents(1000), 1),
            CartLine::new("SKU-002", Money::from_cents(500), 0),
        ];
        assert_eq!(
            validate_lines(&lines),
            Err(CartError::ZeroQuantity {
                product_id: ProductId::new("SKU-002")
            })
        );
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let lines = vec![CartLine::new("SKU-001", Money::from_cents(-1), 1)];
        assert_eq!(
            validate_lines(&lines),
            Err(CartError::NegativeUnitPrice {
                product_id: ProductId::new("SKU-001")
            })
        );
    }

    #[test]
    fn valid_cart_passes() {
        let lines = vec![
            CartLine::new("SKU-001", Money::from_cents(1000), 2),
            CartLine::new("SKU-002", Money::zero(), 1),
        ];
        assert!(validate_lines(&lines).is_ok());
    }
}
