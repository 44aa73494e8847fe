//! Storefront API Library
//!
//! Catalog listing, postal-code shipping quotes, hosted-checkout sessions and
//! payment-webhook reconciliation for a small storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{
    catalog::CatalogStore, notifications::NotificationSender, orders::OrderService,
    payments::PaymentGateway, reconciliation::ReconciliationService, shipping::ShippingTable,
    transfers::TransferOrderService,
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub shipping: ShippingTable,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<OrderService>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn NotificationSender>,
    pub reconciliation: Arc<ReconciliationService>,
    pub transfers: Arc<TransferOrderService>,
}

/// Assembles the full application router with tracing and CORS applied.
pub fn app_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", handlers::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
