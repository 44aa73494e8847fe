use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::services::orders::Cart;
use crate::services::payments::CheckoutUrls;
use crate::{errors::ServiceError, AppState};

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
}

/// POST /api/checkout/session
///
/// Prices the cart and opens a hosted checkout session with the provider.
/// Validation failures come back with their taxonomy kind; nothing is
/// decremented here.
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    Json(cart): Json<Cart>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.orders.build_order(&cart).await?;
    let back_urls = CheckoutUrls::for_store(&state.config.store_base_url);
    let session_id = state
        .gateway
        .create_checkout_session(&order, &back_urls, state.config.webhook_url.as_deref())
        .await?;

    Ok(Json(CheckoutSessionResponse { session_id }))
}
