use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::errors::ServiceError;
use crate::services::catalog::{CatalogStore, StockAdjustment, StockPool};
use crate::services::item_tag::ItemTag;
use crate::services::notifications::{MailLineItem, NotificationSender};
use crate::services::payments::{PaymentDetail, PaymentGateway, PaymentStatus};
use crate::services::processed_payments::ProcessedPayments;

/// Inbound payment notification, reduced to the two fields that matter.
///
/// The payload itself is untrusted; the authoritative detail is re-fetched
/// from the provider by id.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookNotice {
    pub topic: Option<String>,
    pub payment_id: Option<String>,
}

/// What a single notification delivery amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Not a payment notification, no id attached, or deferred on an
    /// internal failure
    Ignored,
    /// Payment exists but is not approved
    NotApproved,
    /// This id was already reconciled by an earlier delivery
    Duplicate,
    /// Stock committed and mails dispatched
    Processed,
}

/// Turns approved-payment notifications into stock decrements and mails, at
/// most once per payment id.
#[derive(Clone)]
pub struct ReconciliationService {
    catalog: Arc<dyn CatalogStore>,
    processed: Arc<dyn ProcessedPayments>,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn NotificationSender>,
}

impl ReconciliationService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        processed: Arc<dyn ProcessedPayments>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            catalog,
            processed,
            gateway,
            mailer,
        }
    }

    /// Entry point for the webhook handler. Never fails outward: the
    /// provider's retries arrive as redeliveries of the same notification,
    /// which the dedup guard absorbs.
    #[instrument(skip(self))]
    pub async fn handle_notification(&self, notice: &WebhookNotice) -> ReconcileOutcome {
        if notice.topic.as_deref() != Some("payment") {
            return ReconcileOutcome::Ignored;
        }
        let Some(payment_id) = notice.payment_id.as_deref().filter(|id| !id.is_empty()) else {
            return ReconcileOutcome::Ignored;
        };

        match self.reconcile(payment_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Nothing recorded yet, so the provider's next redelivery of
                // this id retries from scratch.
                warn!(payment_id, error = %err, "reconciliation deferred");
                ReconcileOutcome::Ignored
            }
        }
    }

    async fn reconcile(&self, payment_id: &str) -> Result<ReconcileOutcome, ServiceError> {
        let payment = self.gateway.get_payment(payment_id).await?;
        if payment.status != PaymentStatus::Approved {
            info!(payment_id, status = ?payment.status, "ignoring non-approved payment");
            return Ok(ReconcileOutcome::NotApproved);
        }

        // Record before mutating stock: a failure below must not let a
        // redelivery decrement twice. Under-decrement beats double-decrement.
        if !self.processed.insert_if_absent(payment_id).await? {
            info!(payment_id, "duplicate delivery for already-reconciled payment");
            return Ok(ReconcileOutcome::Duplicate);
        }

        info!(
            payment_id,
            amount = %payment.transaction_amount,
            "payment approved, committing stock"
        );
        let adjustments = Self::stock_adjustments(&payment);
        if let Err(err) = self.catalog.apply_decrements(&adjustments).await {
            error!(payment_id, error = %err, "stock commit failed; payment stays recorded");
        }

        self.dispatch_mails(&payment).await;
        Ok(ReconcileOutcome::Processed)
    }

    /// Maps echoed line items back onto stock pools. Shipping lines and
    /// unparseable tags are skipped without a catalog lookup.
    fn stock_adjustments(payment: &PaymentDetail) -> Vec<StockAdjustment> {
        payment
            .items()
            .iter()
            .filter_map(|item| match ItemTag::parse(&item.id) {
                Some(ItemTag::Individual(product_id)) => Some(StockAdjustment {
                    product_id,
                    pool: StockPool::Simple,
                    quantity: item.quantity,
                }),
                Some(ItemTag::Pack(product_id)) => Some(StockAdjustment {
                    product_id,
                    pool: StockPool::Pack,
                    quantity: item.quantity,
                }),
                Some(ItemTag::Shipping) => None,
                None => {
                    warn!(raw = %item.id, "line item without a recognizable tag, skipping");
                    None
                }
            })
            .collect()
    }

    /// Mail dispatch runs after the stock transaction has completed; one
    /// recipient's failure never blocks the other.
    async fn dispatch_mails(&self, payment: &PaymentDetail) {
        let items: Vec<MailLineItem> = payment.items().iter().map(MailLineItem::from).collect();

        if let Err(err) = self
            .mailer
            .send_order_confirmation(&payment.metadata, &items, payment.transaction_amount)
            .await
        {
            error!(error = %err, "buyer confirmation mail failed");
        }
        if let Err(err) = self
            .mailer
            .send_admin_alert(&payment.metadata, &items, payment.transaction_amount)
            .await
        {
            error!(error = %err, "admin alert mail failed");
        }
    }
}
