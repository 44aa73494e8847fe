use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::config::MailConfig;
use crate::errors::ServiceError;
use crate::services::orders::{BuyerMeta, OrderLine};
use crate::services::payments::EchoedItem;

/// Line item as rendered in outbound mail.
#[derive(Clone, Debug, Serialize)]
pub struct MailLineItem {
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl From<&EchoedItem> for MailLineItem {
    fn from(item: &EchoedItem) -> Self {
        Self {
            title: item.title.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

impl From<&OrderLine> for MailLineItem {
    fn from(line: &OrderLine) -> Self {
        Self {
            title: line.title.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

/// Transactional mail dispatch.
///
/// Fire-and-forget from the engine's perspective: callers log failures and
/// move on; nothing here is ever surfaced to the payment provider.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_order_confirmation(
        &self,
        buyer: &BuyerMeta,
        items: &[MailLineItem],
        total: Decimal,
    ) -> Result<(), ServiceError>;

    async fn send_admin_alert(
        &self,
        buyer: &BuyerMeta,
        items: &[MailLineItem],
        total: Decimal,
    ) -> Result<(), ServiceError>;

    async fn send_transfer_confirmation(
        &self,
        buyer: &BuyerMeta,
        items: &[MailLineItem],
        total: Decimal,
    ) -> Result<(), ServiceError>;

    async fn send_contact_notification(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), ServiceError>;
}

/// Client for an HTTP transactional-mail API.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    sender: String,
    admin_address: String,
}

#[derive(Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                ServiceError::InternalError(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            sender: config.sender.clone(),
            admin_address: config.admin_address.clone(),
        })
    }

    async fn deliver(
        &self,
        to: &str,
        subject: &str,
        html: Option<&str>,
        text: Option<&str>,
    ) -> Result<(), ServiceError> {
        if to.is_empty() {
            return Err(ServiceError::NotificationError(
                "recipient address missing".to_string(),
            ));
        }

        let mail = OutboundMail {
            from: &self.sender,
            to,
            subject,
            html,
            text,
        };
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&mail)
            .send()
            .await
            .map_err(|err| {
                ServiceError::NotificationError(format!("mail delivery to {to} failed: {err}"))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::NotificationError(format!(
                "mail API returned {} for {to}",
                response.status()
            )));
        }
        Ok(())
    }

    fn items_html(items: &[MailLineItem]) -> String {
        let mut html = String::from("<ul>");
        for item in items {
            html.push_str(&format!(
                "<li>{}x {} - ${}</li>",
                item.quantity, item.title, item.unit_price
            ));
        }
        html.push_str("</ul>");
        html
    }

    fn items_text(items: &[MailLineItem]) -> String {
        items
            .iter()
            .map(|item| format!("- {}x {}", item.quantity, item.title))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl NotificationSender for HttpMailer {
    #[instrument(skip(self, buyer, items))]
    async fn send_order_confirmation(
        &self,
        buyer: &BuyerMeta,
        items: &[MailLineItem],
        total: Decimal,
    ) -> Result<(), ServiceError> {
        let body = format!(
            "<html><body style=\"font-family: Arial, sans-serif;\">\
             <h2>Hi {name}, thanks for your purchase!</h2>\
             <p>We received your payment.</p>\
             <div style=\"background-color: #f9f9f9; padding: 15px;\">\
             <h3>Your order:</h3>{items}\
             <p><strong>Total paid: ${total}</strong></p></div>\
             <p>Registered delivery address:</p><p>{address}</p>\
             <hr><p>We will contact you shortly to arrange delivery.</p>\
             </body></html>",
            name = buyer.name,
            items = Self::items_html(items),
            total = total,
            address = buyer.address,
        );
        self.deliver(&buyer.email, "Your order is confirmed", Some(&body), None)
            .await
    }

    #[instrument(skip(self, buyer, items))]
    async fn send_admin_alert(
        &self,
        buyer: &BuyerMeta,
        items: &[MailLineItem],
        total: Decimal,
    ) -> Result<(), ServiceError> {
        let subject = format!("NEW SALE - {} {}", buyer.name, buyer.last_name);
        let body = format!(
            "NEW SALE RECEIVED\n\
             -----------------------\n\
             CUSTOMER: {} {}\n\
             EMAIL: {}\n\
             PHONE: {}\n\
             ADDRESS: {}\n\
             \n\
             ORDER:\n{}\n\
             \n\
             TOTAL: ${}\n\
             -----------------------\n\
             Check the provider dashboard to confirm settlement.",
            buyer.name,
            buyer.last_name,
            buyer.email,
            buyer.phone,
            buyer.address,
            Self::items_text(items),
            total,
        );
        self.deliver(&self.admin_address, &subject, None, Some(&body))
            .await
    }

    #[instrument(skip(self, buyer, items))]
    async fn send_transfer_confirmation(
        &self,
        buyer: &BuyerMeta,
        items: &[MailLineItem],
        total: Decimal,
    ) -> Result<(), ServiceError> {
        let body = format!(
            "<html><body style=\"font-family: Arial, sans-serif;\">\
             <h2>Hi {name}, we received your order!</h2>\
             <p>We are verifying your transfer receipt and will confirm\
             shortly.</p>\
             <div style=\"background-color: #f9f9f9; padding: 15px;\">\
             <h3>Your order:</h3>{items}\
             <p><strong>Total: ${total}</strong></p></div>\
             </body></html>",
            name = buyer.name,
            items = Self::items_html(items),
            total = total,
        );
        self.deliver(&buyer.email, "We received your order", Some(&body), None)
            .await
    }

    #[instrument(skip(self, message))]
    async fn send_contact_notification(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), ServiceError> {
        let subject = format!("Contact message from {name}");
        let body = format!("From: {name} <{email}>\n\n{message}");
        self.deliver(&self.admin_address, &subject, None, Some(&body))
            .await
    }
}
