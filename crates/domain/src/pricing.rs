//! Cart pricing calculator.
//!
//! Pure function: cart lines and an optional voucher in, totals out.
//! No side effects, no mutation of inputs.

use serde::{Deserialize, Serialize};

use crate::cart::{CartError, CartLine, validate_lines};
use crate::value_objects::Money;
use crate::voucher::Voucher;

/// The totals computed for a checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Sum of unit_price * quantity across all lines.
    pub subtotal: Money,
    /// Voucher discount on the subtotal; zero without a voucher.
    pub discount_amount: Money,
    /// `subtotal - discount_amount`.
    pub final_amount: Money,
}

/// Prices a cart, applying an already-validated voucher if present.
///
/// Fails with [`CartError`] on an empty cart, a zero quantity, a
/// negative unit price, or when a total overflows the amount range.
/// Deterministic: the same inputs always produce the same breakdown.
pub fn price_cart(
    lines: &[CartLine],
    voucher: Option<&Voucher>,
) -> Result<PricingBreakdown, CartError> {
    validate_lines(lines)?;

    let mut subtotal = Money::zero();
    for line in lines {
        let overflow = || CartError::AmountOverflow {
            product_id: line.product_id.clone(),
        };
        let line_total = line.line_total().ok_or_else(overflow)?;
        subtotal = subtotal.checked_add(line_total).ok_or_else(overflow)?;
    }

    let discount_amount = voucher
        .map(|v| v.discount_on(subtotal))
        .unwrap_or_else(Money::zero);

    Ok(PricingBreakdown {
        subtotal,
        discount_amount,
        final_amount: subtotal - discount_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::VoucherCode;
    use chrono::{Duration, Utc};

    fn voucher(percent: u8) -> Voucher {
        let now = Utc::now();
        Voucher {
            code: VoucherCode::new("SAVE"),
            discount_percent: percent,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            min_order_amount: Money::zero(),
            max_usage: None,
            current_usage: 0,
        }
    }

    #[test]
    fn no_voucher_means_no_discount() {
        let lines = vec![
            CartLine::new("SKU-001", Money::from_cents(1000), 2),
            CartLine::new("SKU-002", Money::from_cents(2500), 1),
        ];

        let pricing = price_cart(&lines, None).unwrap();
        assert_eq!(pricing.subtotal.cents(), 4500);
        assert_eq!(pricing.discount_amount.cents(), 0);
        assert_eq!(pricing.final_amount, pricing.subtotal);
    }

    #[test]
    fn voucher_discount_is_applied() {
        let lines = vec![CartLine::new("SKU-001", Money::from_cents(10_000), 1)];
        let v = voucher(10);

        let pricing = price_cart(&lines, Some(&v)).unwrap();
        assert_eq!(pricing.subtotal.cents(), 10_000);
        assert_eq!(pricing.discount_amount.cents(), 1_000);
        assert_eq!(pricing.final_amount.cents(), 9_000);
    }

    #[test]
    fn discount_rounding_is_half_up() {
        let lines = vec![CartLine::new("SKU-001", Money::from_cents(105), 1)];
        let v = voucher(10);

        let pricing = price_cart(&lines, Some(&v)).unwrap();
        assert_eq!(pricing.discount_amount.cents(), 11);
        assert_eq!(pricing.final_amount.cents(), 94);
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert_eq!(price_cart(&[], None), Err(CartError::Empty));
    }

    #[test]
    fn invalid_line_is_rejected() {
        let lines = vec![CartLine::new("SKU-001", Money::from_cents(1000), 0)];
        assert!(matches!(
            price_cart(&lines, None),
            Err(CartError::ZeroQuantity { .. })
        ));
    }

    #[test]
    fn extreme_line_total_is_rejected_not_wrapped() {
        let lines = vec![CartLine::new("SKU-MAX", Money::from_cents(i64::MAX), 2)];
        assert_eq!(
            price_cart(&lines, None),
            Err(CartError::AmountOverflow {
                product_id: "SKU-MAX".into()
            })
        );
    }

    #[test]
    fn subtotal_overflow_is_rejected() {
        let lines = vec![
            CartLine::new("SKU-001", Money::from_cents(i64::MAX), 1),
            CartLine::new("SKU-002", Money::from_cents(1), 1),
        ];
        assert_eq!(
            price_cart(&lines, None),
            Err(CartError::AmountOverflow {
                product_id: "SKU-002".into()
            })
        );
    }

    #[test]
    fn pricing_does_not_mutate_input() {
        let lines = vec![CartLine::new("SKU-001", Money::from_cents(1000), 2)];
        let before = lines.clone();
        let _ = price_cart(&lines, None).unwrap();
        assert_eq!(lines, before);
    }

    #[test]
    fn pricing_is_deterministic() {
        let lines = vec![CartLine::new("SKU-001", Money::from_cents(777), 3)];
        let v = voucher(33);
        let a = price_cart(&lines, Some(&v)).unwrap();
        let b = price_cart(&lines, Some(&v)).unwrap();
        assert_eq!(a, b);
    }
}
