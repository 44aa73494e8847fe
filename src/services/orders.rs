use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::ServiceError;
use crate::services::catalog::CatalogStore;
use crate::services::item_tag::ItemTag;
use crate::services::shipping::ShippingTable;

/// Line-item variant selector sent by the storefront.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Individual,
    Pack,
}

/// One cart entry as submitted by the storefront.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i32,
    pub quantity: i32,
    #[serde(default)]
    pub variant: Variant,
}

/// Buyer profile attached to a cart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuyerInfo {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Cart submitted to the checkout endpoints. Request-scoped, never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub buyer: Option<BuyerInfo>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Priced line item ready for the payment provider.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub tag: ItemTag,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Payer sub-record forwarded to the provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub surname: String,
    pub email: String,
}

/// Buyer details carried through provider metadata into reconciliation mails.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
}

/// Output of the order builder: everything a checkout session needs.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<OrderLine>,
    pub currency: String,
    pub payer: Option<Payer>,
    pub metadata: BuyerMeta,
}

impl PricedOrder {
    /// Order total across all lines, shipping included.
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum()
    }
}

/// Builds priced orders from carts.
///
/// Read-only against the catalog: stock is validated here but only committed
/// at payment confirmation, so two concurrent checkouts can both pass
/// validation against the same stock. Nothing is reserved.
#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogStore>,
    shipping: ShippingTable,
    currency: String,
}

impl OrderService {
    pub fn new(catalog: Arc<dyn CatalogStore>, shipping: ShippingTable, currency: String) -> Self {
        Self {
            catalog,
            shipping,
            currency,
        }
    }

    #[instrument(skip(self, cart), fields(items = cart.items.len()))]
    pub async fn build_order(&self, cart: &Cart) -> Result<PricedOrder, ServiceError> {
        let mut lines = Vec::with_capacity(cart.items.len() + 1);
        let mut free_shipping = false;

        for item in &cart.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity must be positive for product {}",
                    item.id
                )));
            }

            let product = self
                .catalog
                .get(item.id)
                .await?
                .ok_or(ServiceError::ProductNotFound(item.id))?;

            match item.variant {
                Variant::Pack => {
                    let pack =
                        product
                            .pack_details()
                            .ok_or_else(|| ServiceError::NoPackVariant {
                                product: product.name.clone(),
                            })?;
                    if pack.stock < item.quantity {
                        return Err(ServiceError::InsufficientStock {
                            product: product.name.clone(),
                            requested: item.quantity,
                            available: pack.stock,
                        });
                    }
                    // Any pack in the cart waives shipping for the whole
                    // order.
                    free_shipping = true;
                    lines.push(OrderLine {
                        tag: ItemTag::Pack(product.id),
                        title: pack.name,
                        quantity: item.quantity,
                        unit_price: pack.price,
                    });
                }
                Variant::Individual => {
                    if product.stock < item.quantity {
                        return Err(ServiceError::InsufficientStock {
                            product: product.name.clone(),
                            requested: item.quantity,
                            available: product.stock,
                        });
                    }
                    lines.push(OrderLine {
                        tag: ItemTag::Individual(product.id),
                        title: product.name,
                        quantity: item.quantity,
                        unit_price: product.price,
                    });
                }
            }
        }

        if lines.is_empty() {
            return Err(ServiceError::EmptyOrder);
        }

        if !free_shipping {
            if let Some(postal_code) = cart.postal_code.as_deref() {
                let cost = self.shipping.quote(postal_code);
                if cost > Decimal::ZERO {
                    lines.push(OrderLine {
                        tag: ItemTag::Shipping,
                        title: "Shipping cost".to_string(),
                        quantity: 1,
                        unit_price: cost,
                    });
                }
            }
        }

        let payer = cart.buyer.as_ref().map(|buyer| Payer {
            name: buyer.name.clone(),
            surname: buyer.last_name.clone(),
            email: buyer.email.clone(),
        });
        let metadata = cart
            .buyer
            .as_ref()
            .map(|buyer| BuyerMeta {
                name: buyer.name.clone(),
                last_name: buyer.last_name.clone(),
                email: buyer.email.clone(),
                phone: buyer.phone.clone(),
                address: buyer.address.clone(),
                postal_code: cart.postal_code.clone().unwrap_or_default(),
            })
            .unwrap_or_default();

        Ok(PricedOrder {
            lines,
            currency: self.currency.clone(),
            payer,
            metadata,
        })
    }
}
