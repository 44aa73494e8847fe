pub mod processed_payment;
pub mod product;
pub mod transfer_order;

pub use processed_payment::Entity as ProcessedPayment;
pub use product::Entity as Product;
pub use transfer_order::Entity as TransferOrder;
