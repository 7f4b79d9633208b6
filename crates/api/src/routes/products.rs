//! Product catalog read endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::ProductId;
use serde::Serialize;
use store::{StockLedger, Store};

use crate::error::ApiError;
use crate::routes::checkout::AppState;

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: String,
    /// Catalog price for display; checkout prices from the cart snapshot.
    pub price_cents: i64,
    pub available_quantity: u32,
}

/// GET /products/:id — catalog entry with current availability.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = ProductId::new(id.as_str());
    let product = state
        .store
        .get_product(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;

    Ok(Json(ProductResponse {
        product_id: product.product_id.to_string(),
        price_cents: product.price.cents(),
        available_quantity: product.available_quantity,
    }))
}
