//! Voucher records and eligibility rules.
//!
//! Validation here is a pure, read-only decision over a fetched voucher
//! snapshot. Redemption (incrementing the usage counter) is a storage
//! concern with compare-and-increment semantics and lives in the `store`
//! crate; it is deliberately deferred until after the order is durably
//! created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::{Money, VoucherCode};

/// A discount voucher as fetched from the voucher store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique voucher code.
    pub code: VoucherCode,
    /// Percentage discount applied to the subtotal, 0–100.
    pub discount_percent: u8,
    /// Start of the validity window (inclusive).
    pub valid_from: DateTime<Utc>,
    /// End of the validity window (inclusive).
    pub valid_until: DateTime<Utc>,
    /// Minimum order subtotal required to apply the voucher.
    pub min_order_amount: Money,
    /// Usage cap. `None` means unlimited.
    pub max_usage: Option<u32>,
    /// Number of redemptions so far. Never exceeds `max_usage` when set.
    pub current_usage: u32,
}

/// Errors raised when a voucher fails an eligibility rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherError {
    /// The voucher is outside its validity window.
    #[error("voucher {code} is not valid at this time")]
    Expired { code: VoucherCode },

    /// The voucher's usage cap has been reached.
    #[error("voucher {code} has reached its usage limit")]
    Exhausted { code: VoucherCode },

    /// The order subtotal is below the voucher's minimum.
    #[error("voucher {code} requires a minimum order of {min_order_amount}, subtotal is {subtotal}")]
    MinimumNotMet {
        code: VoucherCode,
        min_order_amount: Money,
        subtotal: Money,
    },
}

impl Voucher {
    /// Checks the voucher's eligibility rules against a subtotal at a
    /// given instant. Read-only; does not record usage.
    pub fn validate(&self, subtotal: Money, now: DateTime<Utc>) -> Result<(), VoucherError> {
        if now < self.valid_from || now > self.valid_until {
            return Err(VoucherError::Expired {
                code: self.code.clone(),
            });
        }

        if let Some(max) = self.max_usage
            && self.current_usage >= max
        {
            return Err(VoucherError::Exhausted {
                code: self.code.clone(),
            });
        }

        if subtotal < self.min_order_amount {
            return Err(VoucherError::MinimumNotMet {
                code: self.code.clone(),
                min_order_amount: self.min_order_amount,
                subtotal,
            });
        }

        Ok(())
    }

    /// Returns the discount this voucher grants on a subtotal.
    ///
    /// Rounding rule: round-half-up on minor units, computed as
    /// `(subtotal_cents * percent + 50) / 100` in integer arithmetic.
    /// The intermediate product is widened to `i128`; with a percent of
    /// at most 100 the result never exceeds the subtotal, so it fits
    /// back into `i64`.
    pub fn discount_on(&self, subtotal: Money) -> Money {
        let cents =
            (i128::from(subtotal.cents()) * i128::from(self.discount_percent) + 50) / 100;
        Money::from_cents(cents as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn voucher(percent: u8) -> Voucher {
        let now = Utc::now();
        Voucher {
            code: VoucherCode::new("SAVE10"),
            discount_percent: percent,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            min_order_amount: Money::zero(),
            max_usage: None,
            current_usage: 0,
        }
    }

    #[test]
    fn valid_voucher_passes() {
        let v = voucher(10);
        assert!(v.validate(Money::from_cents(10_000), Utc::now()).is_ok());
    }

    #[test]
    fn voucher_before_window_is_expired() {
        let mut v = voucher(10);
        v.valid_from = Utc::now() + Duration::days(1);
        v.valid_until = Utc::now() + Duration::days(2);

        let err = v.validate(Money::from_cents(10_000), Utc::now()).unwrap_err();
        assert!(matches!(err, VoucherError::Expired { .. }));
    }

    #[test]
    fn voucher_after_window_is_expired() {
        let mut v = voucher(10);
        v.valid_from = Utc::now() - Duration::days(2);
        v.valid_until = Utc::now() - Duration::days(1);

        let err = v.validate(Money::from_cents(10_000), Utc::now()).unwrap_err();
        assert!(matches!(err, VoucherError::Expired { .. }));
    }

    #[test]
    fn exhausted_voucher_is_rejected() {
        let mut v = voucher(10);
        v.max_usage = Some(5);
        v.current_usage = 5;

        let err = v.validate(Money::from_cents(10_000), Utc::now()).unwrap_err();
        assert!(matches!(err, VoucherError::Exhausted { .. }));
    }

    #[test]
    fn unlimited_voucher_never_exhausts() {
        let mut v = voucher(10);
        v.max_usage = None;
        v.current_usage = u32::MAX;

        assert!(v.validate(Money::from_cents(10_000), Utc::now()).is_ok());
    }

    #[test]
    fn subtotal_below_minimum_is_rejected() {
        // Scenario: SAVE10, 10%, minimum 50000, subtotal 40000.
        let mut v = voucher(10);
        v.min_order_amount = Money::from_cents(50_000);

        let err = v.validate(Money::from_cents(40_000), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            VoucherError::MinimumNotMet {
                code: VoucherCode::new("SAVE10"),
                min_order_amount: Money::from_cents(50_000),
                subtotal: Money::from_cents(40_000),
            }
        );
    }

    #[test]
    fn subtotal_at_minimum_passes() {
        let mut v = voucher(10);
        v.min_order_amount = Money::from_cents(50_000);

        assert!(v.validate(Money::from_cents(50_000), Utc::now()).is_ok());
    }

    #[test]
    fn discount_rounds_half_up() {
        // 10% of 105 cents = 10.5 -> rounds up to 11.
        let v = voucher(10);
        assert_eq!(v.discount_on(Money::from_cents(105)).cents(), 11);

        // 10% of 104 cents = 10.4 -> rounds down to 10.
        assert_eq!(v.discount_on(Money::from_cents(104)).cents(), 10);
    }

    #[test]
    fn zero_percent_discounts_nothing() {
        let v = voucher(0);
        assert_eq!(v.discount_on(Money::from_cents(10_000)).cents(), 0);
    }

    #[test]
    fn hundred_percent_discounts_everything() {
        let v = voucher(100);
        assert_eq!(v.discount_on(Money::from_cents(10_000)).cents(), 10_000);
    }

    #[test]
    fn discount_on_extreme_subtotal_does_not_overflow() {
        let v = voucher(10);
        let expected = ((i128::from(i64::MAX) * 10 + 50) / 100) as i64;
        assert_eq!(v.discount_on(Money::from_cents(i64::MAX)).cents(), expected);
    }
}
