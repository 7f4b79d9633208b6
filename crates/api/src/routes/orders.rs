//! Order read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use serde::Serialize;
use store::{OrderRepository, Store};

use crate::error::ApiError;
use crate::routes::checkout::AppState;

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: Option<String>,
    pub channel_ref: String,
    pub status: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub voucher_code: Option<String>,
    pub voucher_redemption_failed: bool,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

// -- Handlers --

/// GET /orders/:id — load an order and its lines by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let (order, lines) = state
        .store
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    let lines: Vec<OrderLineResponse> = lines
        .iter()
        .map(|line| OrderLineResponse {
            product_id: line.product_id.to_string(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_at_purchase.cents(),
        })
        .collect();

    Ok(Json(OrderResponse {
        id: order.id.to_string(),
        customer_id: order.customer_id.map(|c| c.to_string()),
        channel_ref: order.channel_ref.clone(),
        status: order.status.to_string(),
        subtotal_cents: order.subtotal.cents(),
        discount_cents: order.discount_amount.cents(),
        total_cents: order.final_amount.cents(),
        voucher_code: order.voucher_code.map(|c| c.to_string()),
        voucher_redemption_failed: order.voucher_redemption_failed,
        created_at: order.created_at.to_rfc3339(),
        lines,
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(OrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
