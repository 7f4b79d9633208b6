//! Order records and the order status state machine.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLine;
use crate::pricing::PricingBreakdown;
use crate::value_objects::{CustomerId, Money, ProductId, VoucherCode};

/// The status of a persisted order.
///
/// Legal transitions:
/// ```text
/// Processing ──┬──► Completed
///              └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order is persisted and the saga is still in flight.
    #[default]
    Processing,

    /// Checkout completed successfully (terminal state).
    Completed,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the transition to `next` is legal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Processing, OrderStatus::Completed)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
        )
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "Processing" => Some(OrderStatus::Processing),
            "Completed" => Some(OrderStatus::Completed),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by order status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The requested status transition is not legal.
    #[error("illegal order status transition: {from} -> {to}")]
    IllegalStatusTransition { from: OrderStatus, to: OrderStatus },
}

/// An order header. Immutable after creation except `status` and the
/// voucher reconciliation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Anonymous checkout is permitted, so this may be absent.
    pub customer_id: Option<CustomerId>,
    /// Table number, terminal id, or sales-channel reference.
    pub channel_ref: String,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub final_amount: Money,
    pub status: OrderStatus,
    pub voucher_code: Option<VoucherCode>,
    /// Set when voucher redemption lost a race after the order was
    /// durably created; flags the order for manual reconciliation.
    pub voucher_redemption_failed: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order header in `Processing` status from the
    /// computed pricing.
    pub fn new(
        customer_id: Option<CustomerId>,
        channel_ref: impl Into<String>,
        notes: Option<String>,
        pricing: &PricingBreakdown,
        voucher_code: Option<VoucherCode>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            channel_ref: channel_ref.into(),
            notes,
            subtotal: pricing.subtotal,
            discount_amount: pricing.discount_amount,
            final_amount: pricing.final_amount,
            status: OrderStatus::Processing,
            voucher_code,
            voucher_redemption_failed: false,
            created_at: Utc::now(),
        }
    }
}

/// A persisted order line. Created atomically with its parent order;
/// immutable. The unit price is captured at checkout time and never
/// recomputed from the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_at_purchase: Money,
}

impl OrderLine {
    /// Builds the persisted lines for an order from the cart snapshot.
    pub fn from_cart(order_id: OrderId, lines: &[CartLine]) -> Vec<OrderLine> {
        lines
            .iter()
            .map(|line| OrderLine {
                order_id,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_at_purchase: line.unit_price,
            })
            .collect()
    }
}
