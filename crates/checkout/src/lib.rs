//! Checkout saga orchestration.
//!
//! This crate drives a single checkout through its steps:
//! 1. Price the cart
//! 2. Validate the voucher
//! 3. Pre-check stock availability
//! 4. Decrement stock, line by line
//! 5. Persist the order
//! 6. Claim the voucher redemption slot
//! 7. Mark the order completed
//!
//! A failure during steps 4-5 restores already-decremented stock in
//! reverse order. A lost redemption in step 6 does not unwind the
//! committed order; it flags the order for reconciliation instead.

pub mod coordinator;
pub mod error;
pub mod state;

pub use coordinator::{CheckoutConfig, CheckoutCoordinator, CheckoutReceipt, CheckoutRequest};
pub use error::CheckoutError;
pub use state::CheckoutState;
