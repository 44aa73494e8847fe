use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use storefront_api as api;

use api::services::{
    catalog::{CatalogStore, SqlCatalogStore},
    notifications::{HttpMailer, NotificationSender},
    orders::OrderService,
    payments::{HttpPaymentGateway, PaymentGateway},
    processed_payments::{ProcessedPayments, SqlProcessedPayments},
    reconciliation::ReconciliationService,
    shipping::ShippingTable,
    transfers::TransferOrderService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Init DB
    let db = api::db::establish_connection(&cfg.database_url)
        .await
        .context("failed to connect to database")?;
    api::db::ensure_schema(&db)
        .await
        .context("failed to create schema")?;
    api::db::seed_catalog(&db, &cfg.catalog_seed_path)
        .await
        .context("failed to seed catalog")?;
    let db = Arc::new(db);

    // Build services
    let catalog: Arc<dyn CatalogStore> = Arc::new(SqlCatalogStore::new(db.clone()));
    let processed: Arc<dyn ProcessedPayments> = Arc::new(SqlProcessedPayments::new(db.clone()));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(&cfg.payment)?);
    let mailer: Arc<dyn NotificationSender> = Arc::new(HttpMailer::new(&cfg.mail)?);

    let shipping = ShippingTable::new(&cfg.shipping);
    let orders = Arc::new(OrderService::new(
        catalog.clone(),
        shipping.clone(),
        cfg.currency.clone(),
    ));
    let reconciliation = Arc::new(ReconciliationService::new(
        catalog.clone(),
        processed,
        gateway.clone(),
        mailer.clone(),
    ));
    let transfers = Arc::new(TransferOrderService::new(
        db.clone(),
        orders.clone(),
        catalog.clone(),
        mailer.clone(),
        cfg.uploads_dir.clone(),
    ));

    if cfg.webhook_url.is_none() {
        warn!("no webhook URL configured; the provider will not notify this instance");
    }

    // Compose shared app state
    let cors = build_cors(&cfg.cors_origins);
    let state = Arc::new(api::AppState {
        db,
        config: cfg.clone(),
        shipping,
        catalog,
        orders,
        gateway,
        mailer,
        reconciliation,
        transfers,
    });
    let app = api::app_router(state, cors);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "storefront API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        warn!("no CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
