use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{sea_query::OnConflict, ActiveValue::Set, DatabaseConnection, EntityTrait};

use crate::entities::processed_payment;
use crate::errors::ServiceError;

/// Durable at-most-once guard keyed by provider payment id.
///
/// Dedup survives process restart, and the insert doubles as the
/// serialization point for concurrent deliveries of the same payment id.
#[async_trait]
pub trait ProcessedPayments: Send + Sync {
    /// Records the id. `true` means this call newly recorded it and the
    /// caller owns the side effects; `false` means another delivery got there
    /// first.
    async fn insert_if_absent(&self, payment_id: &str) -> Result<bool, ServiceError>;
}

/// sea-orm backed processed-payment set.
#[derive(Clone)]
pub struct SqlProcessedPayments {
    db: Arc<DatabaseConnection>,
}

impl SqlProcessedPayments {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProcessedPayments for SqlProcessedPayments {
    async fn insert_if_absent(&self, payment_id: &str) -> Result<bool, ServiceError> {
        let row = processed_payment::ActiveModel {
            payment_id: Set(payment_id.to_string()),
            processed_at: Set(Utc::now()),
        };
        // A conflict on the primary key is the duplicate-delivery signal.
        let inserted = processed_payment::Entity::insert(row)
            .on_conflict(
                OnConflict::column(processed_payment::Column::PaymentId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(inserted > 0)
    }
}
