use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, Schema,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::entities::{processed_payment, product, transfer_order};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    debug!("Connecting to database");
    Database::connect(opt).await
}

/// Creates the schema on first start. Safe to run repeatedly.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = [
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(processed_payment::Entity),
        schema.create_table_from_entity(transfer_order::Entity),
    ];
    for stmt in &mut statements {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }
    Ok(())
}

/// One catalog entry in the seed file.
#[derive(Debug, Deserialize)]
struct SeedProduct {
    name: String,
    description: String,
    #[serde(default)]
    long_description: String,
    sku: String,
    category: String,
    price: Decimal,
    stock: i32,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    pack: Option<product::PackDetails>,
}

/// One-time catalog seed from a static JSON file.
///
/// No-op when products already exist or the seed file is absent; a malformed
/// file is an error rather than a silent empty catalog.
pub async fn seed_catalog(db: &DatabaseConnection, path: &str) -> anyhow::Result<()> {
    let existing = product::Entity::find().count(db).await?;
    if existing > 0 {
        debug!(existing, "catalog already seeded");
        return Ok(());
    }

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            info!(path, error = %err, "no catalog seed file, starting with an empty catalog");
            return Ok(());
        }
    };

    let seed: Vec<SeedProduct> =
        serde_json::from_str(&raw).with_context(|| format!("malformed catalog seed at {path}"))?;
    if seed.is_empty() {
        return Ok(());
    }

    let count = seed.len();
    let mut models = Vec::with_capacity(count);
    for entry in seed {
        let pack = entry
            .pack
            .map(|details| serde_json::to_value(details))
            .transpose()
            .context("unserializable pack descriptor in catalog seed")?;
        models.push(product::ActiveModel {
            name: Set(entry.name),
            description: Set(entry.description),
            long_description: Set(entry.long_description),
            sku: Set(entry.sku),
            category: Set(entry.category),
            price: Set(entry.price),
            stock: Set(entry.stock),
            images: Set(serde_json::json!(entry.images)),
            pack: Set(pack),
            ..Default::default()
        });
    }
    product::Entity::insert_many(models).exec(db).await?;

    info!(count, "seeded product catalog");
    Ok(())
}
