//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout as the coordinator drives it through its steps.
///
/// State transitions:
/// ```text
/// Pricing ──► VoucherCheck ──► StockCheck ──► Decrementing ──► Persisting ──► VoucherRedeem ──► Done
///                                                  │                │
///                                                  └────────┬───────┘
///                                                           ▼
///                                                     Compensating ──► Failed
/// ```
///
/// Failures before `Decrementing` abort directly to `Failed` without
/// compensation, since nothing has been mutated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Cart lines are being validated and priced.
    #[default]
    Pricing,

    /// Voucher is being fetched and validated against the subtotal.
    VoucherCheck,

    /// Stock availability is being pre-checked.
    StockCheck,

    /// Stock is being decremented line by line.
    Decrementing,

    /// The order record is being persisted.
    Persisting,

    /// The voucher redemption slot is being claimed.
    VoucherRedeem,

    /// Checkout completed successfully (terminal state).
    Done,

    /// A step failed after stock mutations; restores are in progress.
    Compensating,

    /// Checkout failed (terminal state).
    Failed,
}

impl CheckoutState {
    /// Returns true if a failure in this state requires stock restores.
    pub fn requires_compensation(&self) -> bool {
        matches!(
            self,
            CheckoutState::Decrementing | CheckoutState::Persisting
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Done | CheckoutState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Pricing => "Pricing",
            CheckoutState::VoucherCheck => "VoucherCheck",
            CheckoutState::StockCheck => "StockCheck",
            CheckoutState::Decrementing => "Decrementing",
            CheckoutState::Persisting => "Persisting",
            CheckoutState::VoucherRedeem => "VoucherRedeem",
            CheckoutState::Done => "Done",
            CheckoutState::Compensating => "Compensating",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
