//! In-memory storage backend for tests and local wiring.
//!
//! Provides the same trait surface as the PostgreSQL backend. Every
//! mutating operation performs its guard check and its write under a
//! single write-lock acquisition, which gives the same atomic
//! conditional-update semantics as the SQL backend's single-statement
//! updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{CartLine, Order, OrderLine, OrderStatus, ProductId, Voucher, VoucherCode};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{OrderRepository, ProductRecord, StockLedger, VoucherStore};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, ProductRecord>,
    vouchers: HashMap<VoucherCode, Voucher>,
    orders: HashMap<OrderId, (Order, Vec<OrderLine>)>,
    #[cfg(any(test, feature = "test-util"))]
    failures: FailureInjection,
}

/// Failure hooks for exercising the saga's compensation paths. Only
/// compiled into test builds or behind the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
struct FailureInjection {
    decrement_for: Option<ProductId>,
    on_increment: bool,
    on_create_order: bool,
    on_redeem: bool,
}

/// In-memory store implementing all three storage roles.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the available quantity for a product, if it exists.
    pub async fn available(&self, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .products
            .get(product_id)
            .map(|p| p.available_quantity)
    }

    /// Returns a voucher's current usage counter, if it exists.
    pub async fn voucher_usage(&self, code: &VoucherCode) -> Option<u32> {
        self.state
            .read()
            .await
            .vouchers
            .get(code)
            .map(|v| v.current_usage)
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl InMemoryStore {
    /// Forces `decrement` for the given product to fail with
    /// `InsufficientStock`, simulating a lost race between pre-flight
    /// check and decrement.
    pub async fn set_fail_decrement_for(&self, product_id: Option<ProductId>) {
        self.state.write().await.failures.decrement_for = product_id;
    }

    /// Forces `increment` to fail, simulating an unreachable ledger
    /// during compensation.
    pub async fn set_fail_on_increment(&self, fail: bool) {
        self.state.write().await.failures.on_increment = fail;
    }

    /// Forces `create` to fail, simulating an order persistence outage.
    pub async fn set_fail_on_create_order(&self, fail: bool) {
        self.state.write().await.failures.on_create_order = fail;
    }

    /// Forces `redeem` to report exhaustion, simulating a redemption
    /// slot lost to a concurrent checkout.
    pub async fn set_fail_on_redeem(&self, fail: bool) {
        self.state.write().await.failures.on_redeem = fail;
    }
}

#[async_trait]
impl StockLedger for InMemoryStore {
    async fn check_availability(&self, lines: &[CartLine]) -> Result<()> {
        let state = self.state.read().await;

        for line in lines {
            let product = state
                .products
                .get(&line.product_id)
                .ok_or_else(|| StoreError::ProductNotFound(line.product_id.clone()))?;

            if product.available_quantity < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available: product.available_quantity,
                });
            }
        }

        Ok(())
    }

    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut state = self.state.write().await;

        #[cfg(any(test, feature = "test-util"))]
        if state.failures.decrement_for.as_ref() == Some(product_id) {
            let available = state
                .products
                .get(product_id)
                .map(|p| p.available_quantity)
                .unwrap_or(0);
            return Err(StoreError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available,
            });
        }

        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;

        if product.available_quantity < quantity {
            return Err(StoreError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available: product.available_quantity,
            });
        }

        product.available_quantity -= quantity;
        Ok(())
    }

    async fn increment(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut state = self.state.write().await;

        #[cfg(any(test, feature = "test-util"))]
        if state.failures.on_increment {
            return Err(StoreError::Backend("stock ledger unavailable".to_string()));
        }

        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;

        product.available_quantity += quantity;
        Ok(())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn put_product(&self, product: ProductRecord) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.product_id.clone(), product);
        Ok(())
    }
}

#[async_trait]
impl VoucherStore for InMemoryStore {
    async fn get_voucher(&self, code: &VoucherCode) -> Result<Option<Voucher>> {
        Ok(self.state.read().await.vouchers.get(code).cloned())
    }

    async fn redeem(&self, code: &VoucherCode) -> Result<()> {
        let mut state = self.state.write().await;

        #[cfg(any(test, feature = "test-util"))]
        if state.failures.on_redeem {
            return Err(StoreError::VoucherExhausted(code.clone()));
        }

        let voucher = state
            .vouchers
            .get_mut(code)
            .ok_or_else(|| StoreError::VoucherNotFound(code.clone()))?;

        // Exhaustion re-checked at increment time: compare-and-increment.
        if let Some(max) = voucher.max_usage
            && voucher.current_usage >= max
        {
            return Err(StoreError::VoucherExhausted(code.clone()));
        }

        voucher.current_usage += 1;
        Ok(())
    }

    async fn put_voucher(&self, voucher: Voucher) -> Result<()> {
        self.state
            .write()
            .await
            .vouchers
            .insert(voucher.code.clone(), voucher);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create(&self, order: &Order, lines: &[OrderLine]) -> Result<OrderId> {
        let mut state = self.state.write().await;

        #[cfg(any(test, feature = "test-util"))]
        if state.failures.on_create_order {
            return Err(StoreError::Backend(
                "order repository unavailable".to_string(),
            ));
        }

        state
            .orders
            .insert(order.id, (order.clone(), lines.to_vec()));
        Ok(order.id)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<(Order, Vec<OrderLine>)>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;

        let (order, _) = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if !order.status.can_transition_to(status) {
            return Err(StoreError::IllegalStatusTransition {
                from: order.status,
                to: status,
            });
        }

        order.status = status;
        Ok(())
    }

    async fn flag_redemption_failed(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;

        let (order, _) = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        order.voucher_redemption_failed = true;
        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        self.state.write().await.orders.remove(&order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, PricingBreakdown};

    fn product(id: &str, qty: u32) -> ProductRecord {
        ProductRecord {
            product_id: ProductId::new(id),
            price: Money::from_cents(1000),
            available_quantity: qty,
        }
    }

    fn order_with_lines(cart: &[CartLine]) -> (Order, Vec<OrderLine>) {
        let pricing = PricingBreakdown {
            subtotal: Money::from_cents(1000),
            discount_amount: Money::zero(),
            final_amount: Money::from_cents(1000),
        };
        let order = Order::new(None, "table-1", None, &pricing, None);
        let lines = OrderLine::from_cart(order.id, cart);
        (order, lines)
    }

    #[tokio::test]
    async fn decrement_succeeds_with_enough_stock() {
        let store = InMemoryStore::new();
        store.put_product(product("SKU-001", 10)).await.unwrap();

        store
            .decrement(&ProductId::new("SKU-001"), 4)
            .await
            .unwrap();

        assert_eq!(store.available(&ProductId::new("SKU-001")).await, Some(6));
    }

    #[tokio::test]
    async fn decrement_fails_without_partial_update() {
        let store = InMemoryStore::new();
        store.put_product(product("SKU-001", 3)).await.unwrap();

        let err = store
            .decrement(&ProductId::new("SKU-001"), 5)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            }
        ));
        assert_eq!(store.available(&ProductId::new("SKU-001")).await, Some(3));
    }

    #[tokio::test]
    async fn decrement_unknown_product_fails() {
        let store = InMemoryStore::new();
        let err = store
            .decrement(&ProductId::new("SKU-404"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        let store = InMemoryStore::new();
        store.put_product(product("SKU-001", 10)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.decrement(&ProductId::new("SKU-001"), 3).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        // Only the decrements that fit may succeed.
        assert_eq!(successes, 3);
        assert_eq!(store.available(&ProductId::new("SKU-001")).await, Some(1));
    }

    #[tokio::test]
    async fn check_availability_is_idempotent() {
        let store = InMemoryStore::new();
        store.put_product(product("SKU-001", 5)).await.unwrap();

        let lines = vec![CartLine::new("SKU-001", Money::from_cents(1000), 5)];
        assert!(store.check_availability(&lines).await.is_ok());
        assert!(store.check_availability(&lines).await.is_ok());
        assert_eq!(store.available(&ProductId::new("SKU-001")).await, Some(5));
    }

    #[tokio::test]
    async fn check_availability_reports_first_shortfall() {
        let store = InMemoryStore::new();
        store.put_product(product("SKU-001", 5)).await.unwrap();
        store.put_product(product("SKU-002", 1)).await.unwrap();

        let lines = vec![
            CartLine::new("SKU-001", Money::from_cents(1000), 2),
            CartLine::new("SKU-002", Money::from_cents(1000), 4),
        ];

        let err = store.check_availability(&lines).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                requested: 4,
                available: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn increment_restores_stock() {
        let store = InMemoryStore::new();
        store.put_product(product("SKU-001", 2)).await.unwrap();

        store
            .increment(&ProductId::new("SKU-001"), 7)
            .await
            .unwrap();

        assert_eq!(store.available(&ProductId::new("SKU-001")).await, Some(9));
    }

    #[tokio::test]
    async fn redeem_increments_usage() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        store
            .put_voucher(Voucher {
                code: VoucherCode::new("SAVE10"),
                discount_percent: 10,
                valid_from: now,
                valid_until: now,
                min_order_amount: Money::zero(),
                max_usage: Some(2),
                current_usage: 0,
            })
            .await
            .unwrap();

        store.redeem(&VoucherCode::new("SAVE10")).await.unwrap();
        assert_eq!(
            store.voucher_usage(&VoucherCode::new("SAVE10")).await,
            Some(1)
        );
    }

    #[tokio::test]
    async fn redeem_at_cap_fails() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        store
            .put_voucher(Voucher {
                code: VoucherCode::new("ONCE"),
                discount_percent: 10,
                valid_from: now,
                valid_until: now,
                min_order_amount: Money::zero(),
                max_usage: Some(1),
                current_usage: 0,
            })
            .await
            .unwrap();

        store.redeem(&VoucherCode::new("ONCE")).await.unwrap();
        let err = store.redeem(&VoucherCode::new("ONCE")).await.unwrap_err();

        assert!(matches!(err, StoreError::VoucherExhausted(_)));
        assert_eq!(
            store.voucher_usage(&VoucherCode::new("ONCE")).await,
            Some(1)
        );
    }

    #[tokio::test]
    async fn concurrent_redeems_respect_the_cap() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        store
            .put_voucher(Voucher {
                code: VoucherCode::new("ONCE"),
                discount_percent: 10,
                valid_from: now,
                valid_until: now,
                min_order_amount: Money::zero(),
                max_usage: Some(1),
                current_usage: 0,
            })
            .await
            .unwrap();

        let a = store.clone();
        let b = store.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.redeem(&VoucherCode::new("ONCE")).await }),
            tokio::spawn(async move { b.redeem(&VoucherCode::new("ONCE")).await }),
        );

        let results = [ra.unwrap(), rb.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            store.voucher_usage(&VoucherCode::new("ONCE")).await,
            Some(1)
        );
    }

    #[tokio::test]
    async fn create_and_get_order_roundtrip() {
        let store = InMemoryStore::new();
        let cart = vec![CartLine::new("SKU-001", Money::from_cents(500), 2)];
        let (order, lines) = order_with_lines(&cart);

        let id = store.create(&order, &lines).await.unwrap();
        assert_eq!(id, order.id);

        let (loaded, loaded_lines) = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded, order);
        assert_eq!(loaded_lines, lines);
    }

    #[tokio::test]
    async fn update_status_enforces_legal_transitions() {
        let store = InMemoryStore::new();
        let (order, lines) = order_with_lines(&[CartLine::new("S", Money::zero(), 1)]);
        store.create(&order, &lines).await.unwrap();

        store
            .update_status(order.id, OrderStatus::Completed)
            .await
            .unwrap();

        let err = store
            .update_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::IllegalStatusTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
            }
        ));
    }

    #[tokio::test]
    async fn flag_redemption_failed_sets_the_flag() {
        let store = InMemoryStore::new();
        let (order, lines) = order_with_lines(&[CartLine::new("S", Money::zero(), 1)]);
        store.create(&order, &lines).await.unwrap();

        store.flag_redemption_failed(order.id).await.unwrap();

        let (loaded, _) = store.get(order.id).await.unwrap().unwrap();
        assert!(loaded.voucher_redemption_failed);
    }

    #[tokio::test]
    async fn delete_removes_the_order() {
        let store = InMemoryStore::new();
        let (order, lines) = order_with_lines(&[CartLine::new("S", Money::zero(), 1)]);
        store.create(&order, &lines).await.unwrap();

        store.delete(order.id).await.unwrap();
        assert!(store.get(order.id).await.unwrap().is_none());
    }
}
