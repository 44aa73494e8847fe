use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::entities::transfer_order;
use crate::errors::ServiceError;
use crate::services::catalog::{CatalogStore, StockAdjustment, StockPool};
use crate::services::item_tag::ItemTag;
use crate::services::notifications::{MailLineItem, NotificationSender};
use crate::services::orders::{Cart, OrderService};

/// Receipt returned after a transfer order is placed.
#[derive(Clone, Debug, Serialize)]
pub struct PlacedTransferOrder {
    pub order_id: Uuid,
    pub total: Decimal,
}

/// Bank-transfer checkout path.
///
/// The uploaded proof of transfer is this order's confirmation event, so
/// stock commits at submission through the same routine the webhook path
/// uses.
#[derive(Clone)]
pub struct TransferOrderService {
    db: Arc<DatabaseConnection>,
    orders: Arc<OrderService>,
    catalog: Arc<dyn CatalogStore>,
    mailer: Arc<dyn NotificationSender>,
    uploads_dir: String,
}

impl TransferOrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        orders: Arc<OrderService>,
        catalog: Arc<dyn CatalogStore>,
        mailer: Arc<dyn NotificationSender>,
        uploads_dir: String,
    ) -> Self {
        Self {
            db,
            orders,
            catalog,
            mailer,
            uploads_dir,
        }
    }

    #[instrument(skip(self, cart, receipt), fields(receipt_bytes = receipt.len()))]
    pub async fn place_order(
        &self,
        cart: &Cart,
        receipt_name: &str,
        receipt: &[u8],
    ) -> Result<PlacedTransferOrder, ServiceError> {
        let order = self.orders.build_order(cart).await?;
        let total = order.total();
        let order_id = Uuid::new_v4();

        let items: Vec<MailLineItem> = order.lines.iter().map(MailLineItem::from).collect();
        let stored_receipt = self.store_receipt(order_id, receipt_name, receipt).await?;

        let row = transfer_order::ActiveModel {
            id: Set(order_id),
            buyer: Set(serde_json::to_value(&order.metadata)
                .map_err(|err| ServiceError::InternalError(err.to_string()))?),
            items: Set(serde_json::to_value(&items)
                .map_err(|err| ServiceError::InternalError(err.to_string()))?),
            total: Set(total),
            receipt_file: Set(stored_receipt),
            created_at: Set(Utc::now()),
        };
        transfer_order::Entity::insert(row).exec(&*self.db).await?;

        let adjustments: Vec<StockAdjustment> = order
            .lines
            .iter()
            .filter_map(|line| match line.tag {
                ItemTag::Individual(product_id) => Some(StockAdjustment {
                    product_id,
                    pool: StockPool::Simple,
                    quantity: line.quantity,
                }),
                ItemTag::Pack(product_id) => Some(StockAdjustment {
                    product_id,
                    pool: StockPool::Pack,
                    quantity: line.quantity,
                }),
                ItemTag::Shipping => None,
            })
            .collect();
        self.catalog.apply_decrements(&adjustments).await?;

        if let Err(err) = self
            .mailer
            .send_transfer_confirmation(&order.metadata, &items, total)
            .await
        {
            error!(order_id = %order_id, error = %err, "transfer confirmation mail failed");
        }

        info!(order_id = %order_id, total = %total, "transfer order placed");
        Ok(PlacedTransferOrder { order_id, total })
    }

    async fn store_receipt(
        &self,
        order_id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let file_name = format!("{order_id}.{extension}");

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|err| {
                ServiceError::InternalError(format!("failed to create uploads dir: {err}"))
            })?;
        let path = Path::new(&self.uploads_dir).join(&file_name);
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            ServiceError::InternalError(format!("failed to store receipt: {err}"))
        })?;
        Ok(file_name)
    }
}
