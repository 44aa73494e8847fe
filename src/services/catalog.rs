use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait,
};
use tracing::warn;

use crate::entities::product;
use crate::errors::ServiceError;

/// Which of a product's two stock counters a decrement targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockPool {
    Simple,
    Pack,
}

/// One stock decrement to apply when a payment is confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i32,
    pub pool: StockPool,
    pub quantity: i32,
}

/// Read and mutate the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, product_id: i32) -> Result<Option<product::Model>, ServiceError>;

    async fn list(&self) -> Result<Vec<product::Model>, ServiceError>;

    /// Applies every decrement as one unit. Counters clamp at zero instead of
    /// going negative.
    async fn apply_decrements(&self, adjustments: &[StockAdjustment]) -> Result<(), ServiceError>;
}

/// sea-orm backed catalog store.
#[derive(Clone)]
pub struct SqlCatalogStore {
    db: Arc<DatabaseConnection>,
}

impl SqlCatalogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for SqlCatalogStore {
    async fn get(&self, product_id: i32) -> Result<Option<product::Model>, ServiceError> {
        Ok(product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?)
    }

    async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(product::Entity::find().all(&*self.db).await?)
    }

    async fn apply_decrements(&self, adjustments: &[StockAdjustment]) -> Result<(), ServiceError> {
        if adjustments.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        for adjustment in adjustments {
            let Some(found) = product::Entity::find_by_id(adjustment.product_id)
                .one(&txn)
                .await?
            else {
                warn!(
                    product_id = adjustment.product_id,
                    "skipping decrement for unknown product"
                );
                continue;
            };

            let mut active: product::ActiveModel = found.clone().into();
            match adjustment.pool {
                StockPool::Simple => {
                    active.stock = Set((found.stock - adjustment.quantity).max(0));
                }
                StockPool::Pack => {
                    let Some(mut details) = found.pack_details() else {
                        warn!(
                            product_id = adjustment.product_id,
                            "skipping pack decrement for product without a pack"
                        );
                        continue;
                    };
                    details.stock = (details.stock - adjustment.quantity).max(0);
                    // The descriptor is replaced wholesale, never mutated in
                    // place.
                    let raw = serde_json::to_value(&details)
                        .map_err(|err| ServiceError::InternalError(err.to_string()))?;
                    active.pack = Set(Some(raw));
                }
            }
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}
