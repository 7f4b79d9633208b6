//! Pure checkout domain logic.
//!
//! Everything in this crate is deterministic and free of I/O: value
//! objects, cart validation, the pricing calculator, voucher eligibility
//! rules, and the order record types. Storage and orchestration live in
//! the `store` and `checkout` crates.

pub mod cart;
pub mod order;
pub mod pricing;
pub mod value_objects;
pub mod voucher;

pub use cart::{CartError, CartLine};
pub use order::{Order, OrderError, OrderLine, OrderStatus};
pub use pricing::{PricingBreakdown, price_cart};
pub use value_objects::{CustomerId, Money, ProductId, VoucherCode};
pub use voucher::{Voucher, VoucherError};
