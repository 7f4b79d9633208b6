//! Storage traits for the checkout engine's shared mutable state.

use async_trait::async_trait;
use common::OrderId;
use domain::{CartLine, Money, Order, OrderLine, OrderStatus, ProductId, Voucher, VoucherCode};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A product's catalog entry as held by the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    /// Current catalog price, used for display only; checkout captures
    /// the unit price from the cart snapshot, never from here.
    pub price: Money,
    pub available_quantity: u32,
}

/// Owns per-product available quantity.
///
/// `decrement` is the authoritative atomic operation: the availability
/// guard is re-checked at write time, never at an earlier read. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Pre-flight check across all lines. Fails on the first line whose
    /// available quantity is short, with the exact shortfall. Read-only
    /// and necessarily racy; it exists to fail fast before mutation.
    async fn check_availability(&self, lines: &[CartLine]) -> Result<()>;

    /// Atomically subtracts `quantity` if at least that much is
    /// available at the instant of application; otherwise fails with
    /// `InsufficientStock` and performs no partial update.
    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Restores stock. Compensation path only; no upper bound is
    /// enforced on restock.
    async fn increment(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Catalog read for the display surface.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>>;

    /// Creates or replaces a product entry. Management surface and
    /// test seeding.
    async fn put_product(&self, product: ProductRecord) -> Result<()>;
}

/// Owns voucher records and their usage counters.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Fetches a voucher snapshot by code.
    async fn get_voucher(&self, code: &VoucherCode) -> Result<Option<Voucher>>;

    /// Atomically increments `current_usage` by 1, guarded by the
    /// exhaustion check re-evaluated at increment time. Two concurrent
    /// redemptions of a voucher with one use left cannot both succeed.
    async fn redeem(&self, code: &VoucherCode) -> Result<()>;

    /// Creates or replaces a voucher. Management surface and test
    /// seeding.
    async fn put_voucher(&self, voucher: Voucher) -> Result<()>;
}

/// Persists order headers and their lines.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the header and all lines as a single logical unit and
    /// returns the order id.
    async fn create(&self, order: &Order, lines: &[OrderLine]) -> Result<OrderId>;

    /// Loads an order and its lines.
    async fn get(&self, order_id: OrderId) -> Result<Option<(Order, Vec<OrderLine>)>>;

    /// Single-field status transition. Only Processing -> Completed and
    /// Processing -> Cancelled are legal; anything else fails with
    /// `IllegalStatusTransition`.
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()>;

    /// Marks the order for manual voucher reconciliation after a lost
    /// redemption race.
    async fn flag_redemption_failed(&self, order_id: OrderId) -> Result<()>;

    /// Cleanup for an order with zero or partially-written lines, so
    /// the orchestrator can compensate a failure between header and
    /// line insertion.
    async fn delete(&self, order_id: OrderId) -> Result<()>;
}

/// Convenience bound for backends implementing all three storage roles.
pub trait Store: StockLedger + VoucherStore + OrderRepository {}

impl<T: StockLedger + VoucherStore + OrderRepository> Store for T {}
