//! Hand-rolled in-memory doubles for the service seams, with call counters
//! so tests can assert how often a side effect fired.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use storefront_api::entities::product::{self, PackDetails};
use storefront_api::errors::ServiceError;
use storefront_api::services::catalog::{CatalogStore, StockAdjustment, StockPool};
use storefront_api::services::notifications::{MailLineItem, NotificationSender};
use storefront_api::services::orders::{BuyerMeta, PricedOrder};
use storefront_api::services::payments::{CheckoutUrls, PaymentDetail, PaymentGateway};
use storefront_api::services::processed_payments::ProcessedPayments;

/// Builds a catalog product row for tests.
pub fn product(
    id: i32,
    name: &str,
    price: Decimal,
    stock: i32,
    pack: Option<PackDetails>,
) -> product::Model {
    product::Model {
        id,
        name: name.to_string(),
        description: format!("{name} description"),
        long_description: String::new(),
        sku: format!("SKU-{id}"),
        category: "wine".to_string(),
        price,
        stock,
        images: serde_json::json!([]),
        pack: pack.map(|details| serde_json::to_value(details).unwrap()),
    }
}

/// In-memory catalog double counting lookups and decrement batches.
#[derive(Default)]
pub struct MemoryCatalog {
    products: Mutex<HashMap<i32, product::Model>>,
    pub lookups: AtomicUsize,
    pub decrement_batches: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new(products: Vec<product::Model>) -> Self {
        Self {
            products: Mutex::new(products.into_iter().map(|p| (p.id, p)).collect()),
            lookups: AtomicUsize::new(0),
            decrement_batches: AtomicUsize::new(0),
        }
    }

    pub fn product(&self, id: i32) -> Option<product::Model> {
        self.products.lock().unwrap().get(&id).cloned()
    }

    pub fn simple_stock(&self, id: i32) -> i32 {
        self.product(id).map(|p| p.stock).unwrap_or(-1)
    }

    pub fn pack_stock(&self, id: i32) -> i32 {
        self.product(id)
            .and_then(|p| p.pack_details())
            .map(|d| d.stock)
            .unwrap_or(-1)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get(&self, product_id: i32) -> Result<Option<product::Model>, ServiceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.lock().unwrap().get(&product_id).cloned())
    }

    async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(self.products.lock().unwrap().values().cloned().collect())
    }

    async fn apply_decrements(&self, adjustments: &[StockAdjustment]) -> Result<(), ServiceError> {
        self.decrement_batches.fetch_add(1, Ordering::SeqCst);
        let mut products = self.products.lock().unwrap();
        for adjustment in adjustments {
            let Some(found) = products.get_mut(&adjustment.product_id) else {
                continue;
            };
            match adjustment.pool {
                StockPool::Simple => {
                    found.stock = (found.stock - adjustment.quantity).max(0);
                }
                StockPool::Pack => {
                    if let Some(mut details) = found.pack_details() {
                        details.stock = (details.stock - adjustment.quantity).max(0);
                        found.pack = Some(serde_json::to_value(&details).unwrap());
                    }
                }
            }
        }
        Ok(())
    }
}

/// In-memory processed-payment set.
#[derive(Default)]
pub struct MemoryProcessedPayments {
    seen: Mutex<std::collections::HashSet<String>>,
}

#[async_trait]
impl ProcessedPayments for MemoryProcessedPayments {
    async fn insert_if_absent(&self, payment_id: &str) -> Result<bool, ServiceError> {
        Ok(self.seen.lock().unwrap().insert(payment_id.to_string()))
    }
}

/// Mailer double that counts each notification kind and can be told to fail
/// the buyer confirmation.
#[derive(Default)]
pub struct RecordingMailer {
    pub confirmations: AtomicUsize,
    pub admin_alerts: AtomicUsize,
    pub transfer_confirmations: AtomicUsize,
    pub contact_notifications: AtomicUsize,
    pub fail_buyer_mail: AtomicBool,
}

#[async_trait]
impl NotificationSender for RecordingMailer {
    async fn send_order_confirmation(
        &self,
        _buyer: &BuyerMeta,
        _items: &[MailLineItem],
        _total: Decimal,
    ) -> Result<(), ServiceError> {
        if self.fail_buyer_mail.load(Ordering::SeqCst) {
            return Err(ServiceError::NotificationError(
                "mail API unavailable".to_string(),
            ));
        }
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_admin_alert(
        &self,
        _buyer: &BuyerMeta,
        _items: &[MailLineItem],
        _total: Decimal,
    ) -> Result<(), ServiceError> {
        self.admin_alerts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_transfer_confirmation(
        &self,
        _buyer: &BuyerMeta,
        _items: &[MailLineItem],
        _total: Decimal,
    ) -> Result<(), ServiceError> {
        self.transfer_confirmations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_contact_notification(
        &self,
        _name: &str,
        _email: &str,
        _message: &str,
    ) -> Result<(), ServiceError> {
        self.contact_notifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Gateway double serving canned payment details.
#[derive(Default)]
pub struct StubGateway {
    payments: Mutex<HashMap<String, PaymentDetail>>,
    pub lookups: AtomicUsize,
    pub fail_lookup: AtomicBool,
}

impl StubGateway {
    pub fn with_payment(payment_id: &str, detail: PaymentDetail) -> Self {
        let gateway = Self::default();
        gateway.insert(payment_id, detail);
        gateway
    }

    pub fn insert(&self, payment_id: &str, detail: PaymentDetail) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment_id.to_string(), detail);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout_session(
        &self,
        _order: &PricedOrder,
        _back_urls: &CheckoutUrls,
        _notification_url: Option<&str>,
    ) -> Result<String, ServiceError> {
        Ok("pref-123".to_string())
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetail, ServiceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(ServiceError::ProviderError(
                "provider unavailable".to_string(),
            ));
        }
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("payment {payment_id}")))
    }
}
