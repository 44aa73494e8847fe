use std::sync::Arc;

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::shipping::ShippingTable;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ShippingQuoteRequest {
    pub postal_code: String,
}

#[derive(Debug, Serialize)]
pub struct ShippingQuoteResponse {
    pub cost: Decimal,
    pub message: String,
}

/// POST /api/shipping/quote
pub async fn quote_shipping(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ShippingQuoteRequest>,
) -> Json<ShippingQuoteResponse> {
    let cost = state.shipping.quote(&payload.postal_code);
    let message = ShippingTable::classify(&payload.postal_code)
        .map(|zone| zone.label().to_string())
        .unwrap_or_else(|| "Shipping cost".to_string());

    Json(ShippingQuoteResponse { cost, message })
}
