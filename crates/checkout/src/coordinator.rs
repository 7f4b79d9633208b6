//! Checkout coordinator for orchestrating the checkout saga.

use std::time::{Duration, Instant};

use chrono::Utc;
use common::OrderId;
use domain::{
    CartLine, CustomerId, Order, OrderLine, OrderStatus, PricingBreakdown, Voucher, VoucherCode,
    price_cart,
};
use serde::{Deserialize, Serialize};
use store::{OrderRepository, StockLedger, VoucherStore};

use crate::error::CheckoutError;
use crate::state::CheckoutState;

/// Tuning knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Deadline applied to every individual storage call.
    pub call_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// A checkout submission: the cart plus its surrounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: Option<CustomerId>,
    pub lines: Vec<CartLine>,
    pub voucher_code: Option<VoucherCode>,
    pub channel_ref: String,
    pub notes: Option<String>,
}

/// What the caller gets back from a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub pricing: PricingBreakdown,
    /// True when the voucher redemption slot was lost after the order
    /// was persisted. The order stands at its discounted price and is
    /// flagged for reconciliation.
    pub voucher_redemption_failed: bool,
}

/// Orchestrates the execution of checkout sagas.
///
/// The coordinator drives a checkout through pricing, voucher
/// validation, stock decrements, order persistence, and voucher
/// redemption. Failures after the first stock mutation restore the
/// already-decremented lines in reverse order.
pub struct CheckoutCoordinator<L, V, O>
where
    L: StockLedger,
    V: VoucherStore,
    O: OrderRepository,
{
    ledger: L,
    vouchers: V,
    orders: O,
    config: CheckoutConfig,
}

impl<L, V, O> CheckoutCoordinator<L, V, O>
where
    L: StockLedger,
    V: VoucherStore,
    O: OrderRepository,
{
    /// Creates a new coordinator with default configuration.
    pub fn new(ledger: L, vouchers: V, orders: O) -> Self {
        Self::with_config(ledger, vouchers, orders, CheckoutConfig::default())
    }

    /// Creates a new coordinator with explicit configuration.
    pub fn with_config(ledger: L, vouchers: V, orders: O, config: CheckoutConfig) -> Self {
        Self {
            ledger,
            vouchers,
            orders,
            config,
        }
    }

    /// Executes a checkout end to end.
    ///
    /// On success the order is persisted in `Completed` status (or
    /// `Processing` if the final transition could not be recorded) and
    /// the receipt carries the priced totals.
    #[tracing::instrument(skip(self, request), fields(lines = request.lines.len(), has_voucher = request.voucher_code.is_some()))]
    pub async fn submit_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let checkout_start = Instant::now();

        let result = self.run(request).await;

        let duration = checkout_start.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_completed").increment(1);
                tracing::info!(order_id = %receipt.order_id, duration, "checkout completed");
            }
            Err(e) => {
                metrics::counter!("checkout_failed").increment(1);
                tracing::warn!(error = %e, "checkout failed");
            }
        }

        result
    }

    async fn run(&self, request: CheckoutRequest) -> Result<CheckoutReceipt, CheckoutError> {
        // 1. Price the cart without the voucher to establish the subtotal.
        //    Pure computation; failures here abort with nothing to undo.
        let mut state = CheckoutState::Pricing;
        tracing::debug!(%state, "checkout step");
        let base = price_cart(&request.lines, None)?;

        // 2. Fetch and validate the voucher against the subtotal, then
        //    reprice with the discount. Usage is not recorded yet.
        state = CheckoutState::VoucherCheck;
        tracing::debug!(%state, "checkout step");
        let voucher = self.validated_voucher(&request, &base).await?;
        let pricing = price_cart(&request.lines, voucher.as_ref())?;

        // 3. Pre-flight availability check. Advisory only: the decrement
        //    below re-checks atomically, this just fails fast.
        state = CheckoutState::StockCheck;
        tracing::debug!(%state, "checkout step");
        self.call("check_availability", async {
            self.ledger.check_availability(&request.lines).await
        })
        .await?;

        // 4. Decrement stock line by line, undoing on the first failure.
        state = CheckoutState::Decrementing;
        tracing::debug!(%state, "checkout step");
        self.decrement_all(&request.lines).await?;

        // 5. Persist the order header and lines.
        state = CheckoutState::Persisting;
        tracing::debug!(%state, "checkout step");
        let order = Order::new(
            request.customer_id,
            request.channel_ref.clone(),
            request.notes.clone(),
            &pricing,
            request.voucher_code.clone(),
        );
        let lines = OrderLine::from_cart(order.id, &request.lines);
        let order_id = match self
            .call("create_order", async {
                self.orders.create(&order, &lines).await
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "order persistence failed");
                if state.requires_compensation() {
                    state = CheckoutState::Compensating;
                    tracing::debug!(%state, "checkout step");
                    self.restore_stock(&request.lines).await?;
                }
                return Err(CheckoutError::OrderPersistence(e.to_string()));
            }
        };

        // 6. Claim the voucher's redemption slot. The order is already
        //    committed, so losing the slot to a concurrent checkout does
        //    not unwind it: the order is flagged for reconciliation and
        //    the checkout still succeeds.
        let mut redemption_failed = false;
        if let Some(code) = &request.voucher_code {
            state = CheckoutState::VoucherRedeem;
            tracing::debug!(%state, "checkout step");
            if let Err(e) = self
                .call("redeem_voucher", async { self.vouchers.redeem(code).await })
                .await
            {
                redemption_failed = true;
                metrics::counter!("checkout_redemption_flags_total").increment(1);
                tracing::warn!(
                    order_id = %order_id,
                    voucher = %code,
                    error = %e,
                    "voucher redemption lost, order flagged for reconciliation"
                );
                if let Err(flag_err) = self.orders.flag_redemption_failed(order_id).await {
                    tracing::error!(
                        order_id = %order_id,
                        error = %flag_err,
                        "failed to flag order for reconciliation"
                    );
                }
            }
        }

        // 7. Record completion. If the transition cannot be recorded the
        //    order stays Processing; the checkout itself has succeeded.
        if let Err(e) = self
            .call("complete_order", async {
                self.orders
                    .update_status(order_id, OrderStatus::Completed)
                    .await
            })
            .await
        {
            tracing::warn!(order_id = %order_id, error = %e, "completion transition not recorded");
        }

        state = CheckoutState::Done;
        tracing::debug!(%state, "checkout step");

        Ok(CheckoutReceipt {
            order_id,
            pricing,
            voucher_redemption_failed: redemption_failed,
        })
    }

    /// Fetches the requested voucher (if any) and checks its eligibility
    /// rules against the undiscounted subtotal.
    async fn validated_voucher(
        &self,
        request: &CheckoutRequest,
        base: &PricingBreakdown,
    ) -> Result<Option<Voucher>, CheckoutError> {
        let Some(code) = &request.voucher_code else {
            return Ok(None);
        };

        let voucher = self
            .call("get_voucher", async {
                self.vouchers.get_voucher(code).await
            })
            .await?
            .ok_or_else(|| CheckoutError::VoucherNotFound(code.clone()))?;

        voucher.validate(base.subtotal, Utc::now())?;
        Ok(Some(voucher))
    }

    /// Decrements stock for every line. On the first failure the
    /// already-applied lines are restored and the failure is returned.
    async fn decrement_all(&self, lines: &[CartLine]) -> Result<(), CheckoutError> {
        for (applied, line) in lines.iter().enumerate() {
            if let Err(e) = self
                .call("decrement_stock", async {
                    self.ledger.decrement(&line.product_id, line.quantity).await
                })
                .await
            {
                tracing::warn!(
                    product_id = %line.product_id,
                    error = %e,
                    "stock decrement failed, restoring applied lines"
                );
                self.restore_stock(&lines[..applied]).await?;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Restores stock for the given lines in reverse order of
    /// application. A failed restore is logged and recorded, and the
    /// remaining lines are still attempted.
    async fn restore_stock(&self, applied: &[CartLine]) -> Result<(), CheckoutError> {
        if applied.is_empty() {
            return Ok(());
        }
        metrics::counter!("checkout_compensations_total").increment(1);

        let mut inconsistent = Vec::new();
        for line in applied.iter().rev() {
            if let Err(e) = self
                .call("increment_stock", async {
                    self.ledger.increment(&line.product_id, line.quantity).await
                })
                .await
            {
                tracing::error!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %e,
                    "stock restore failed, manual reconciliation required"
                );
                inconsistent.push(line.product_id.clone());
            }
        }

        if inconsistent.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::CompensationFailed {
                products: inconsistent,
            })
        }
    }

    /// Applies the per-call deadline to a storage future.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CheckoutError>
    where
        F: Future<Output = store::Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(result) => result.map_err(CheckoutError::from),
            Err(_) => {
                tracing::warn!(operation, "storage call timed out");
                Err(CheckoutError::Timeout { operation })
            }
        }
    }
}
