//! Checkout submission endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::{CheckoutCoordinator, CheckoutRequest};
use domain::{CartLine, CustomerId, Money, ProductId, VoucherCode};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store + Clone> {
    pub coordinator: CheckoutCoordinator<S, S, S>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub customer_id: Option<String>,
    pub lines: Vec<CheckoutLineBody>,
    pub voucher_code: Option<String>,
    #[serde(default = "default_channel")]
    pub channel_ref: String,
    pub notes: Option<String>,
}

fn default_channel() -> String {
    "api".to_string()
}

#[derive(Deserialize)]
pub struct CheckoutLineBody {
    pub product_id: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub voucher_redemption_failed: bool,
}

// -- Handlers --

/// POST /checkout — run a checkout end to end.
#[tracing::instrument(skip(state, body))]
pub async fn submit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CheckoutBody>,
) -> Result<(axum::http::StatusCode, Json<CheckoutResponse>), ApiError> {
    let customer_id = body
        .customer_id
        .as_deref()
        .map(|id| {
            uuid::Uuid::parse_str(id)
                .map(CustomerId::from_uuid)
                .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))
        })
        .transpose()?;

    let lines: Vec<CartLine> = body
        .lines
        .iter()
        .map(|l| {
            CartLine::new(
                ProductId::new(l.product_id.as_str()),
                Money::from_cents(l.unit_price_cents),
                l.quantity,
            )
        })
        .collect();

    let request = CheckoutRequest {
        customer_id,
        lines,
        voucher_code: body.voucher_code.map(VoucherCode::new),
        channel_ref: body.channel_ref,
        notes: body.notes,
    };

    let receipt = state.coordinator.submit_checkout(request).await?;

    let response = CheckoutResponse {
        order_id: receipt.order_id.to_string(),
        subtotal_cents: receipt.pricing.subtotal.cents(),
        discount_cents: receipt.pricing.discount_amount.cents(),
        total_cents: receipt.pricing.final_amount.cents(),
        voucher_redemption_failed: receipt.voucher_redemption_failed,
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}
