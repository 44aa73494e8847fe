pub mod checkout;
pub mod contact;
pub mod health;
pub mod payment_webhooks;
pub mod products;
pub mod shipping;
pub mod transfers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Assembles the public API router.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(products::list_products))
        .route("/shipping/quote", post(shipping::quote_shipping))
        .route("/checkout/session", post(checkout::create_checkout_session))
        .route("/payments/webhook", post(payment_webhooks::payment_webhook))
        .route("/orders/transfer", post(transfers::place_transfer_order))
        .route("/contact", post(contact::submit_contact_message))
}
