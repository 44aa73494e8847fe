use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product entity backing the storefront catalog.
///
/// Every product sells by the unit; `pack` optionally describes a bundled
/// variant with its own price and its own stock pool. The two counters are
/// independent and not fungible.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub long_description: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub images: Json,
    pub pack: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Bundled-purchase variant stored inside the product row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDetails {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

impl Model {
    /// Decoded pack descriptor, when the product has a bundled variant.
    pub fn pack_details(&self) -> Option<PackDetails> {
        self.pack
            .as_ref()
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
    }
}
