use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::instrument;

use crate::config::PaymentConfig;
use crate::errors::ServiceError;
use crate::services::orders::{BuyerMeta, Payer, PricedOrder};

/// Payment status reported by the provider. Only `approved` drives
/// reconciliation; everything else is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
    #[serde(other)]
    Other,
}

/// Line item echoed back inside the provider's payment detail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EchoedItem {
    /// Encoded item tag, carried through the provider unmodified
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_quantity", deserialize_with = "int_or_string")]
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: Decimal,
}

fn default_quantity() -> i32 {
    1
}

/// The provider serializes echoed item numbers inconsistently, sometimes as
/// JSON numbers and sometimes as strings.
fn int_or_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i32),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Str(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Items as echoed by the provider, nested the way its API nests them.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AdditionalInfo {
    #[serde(default)]
    pub items: Vec<EchoedItem>,
}

/// Authoritative payment detail fetched from the provider by id.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentDetail {
    pub status: PaymentStatus,
    #[serde(default)]
    pub metadata: BuyerMeta,
    #[serde(default)]
    pub additional_info: AdditionalInfo,
    #[serde(default)]
    pub transaction_amount: Decimal,
}

impl PaymentDetail {
    pub fn items(&self) -> &[EchoedItem] {
        &self.additional_info.items
    }
}

/// Redirect targets for the provider's hosted checkout.
#[derive(Clone, Debug, Serialize)]
pub struct CheckoutUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl CheckoutUrls {
    /// Standard result pages under the public store base URL.
    pub fn for_store(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{base}/payment-success"),
            failure: format!("{base}/payment-failure"),
            pending: format!("{base}/payment-pending"),
        }
    }
}

/// External payment provider: hosted checkout sessions plus payment lookup.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted checkout session and returns the provider session id.
    async fn create_checkout_session(
        &self,
        order: &PricedOrder,
        back_urls: &CheckoutUrls,
        notification_url: Option<&str>,
    ) -> Result<String, ServiceError>;

    /// Fetches the authoritative payment detail behind a webhook
    /// notification.
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetail, ServiceError>;
}

/// reqwest-backed client for the hosted-checkout provider.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpPaymentGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                ServiceError::InternalError(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }
}

#[derive(Serialize)]
struct PreferenceItem<'a> {
    id: String,
    title: &'a str,
    quantity: i32,
    unit_price: Decimal,
    currency_id: &'a str,
}

#[derive(Serialize)]
struct PreferenceRequest<'a> {
    items: Vec<PreferenceItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<&'a Payer>,
    metadata: &'a BuyerMeta,
    back_urls: &'a CheckoutUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    auto_return: &'static str,
}

#[derive(Deserialize)]
struct PreferenceResponse {
    id: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, order, back_urls, notification_url))]
    async fn create_checkout_session(
        &self,
        order: &PricedOrder,
        back_urls: &CheckoutUrls,
        notification_url: Option<&str>,
    ) -> Result<String, ServiceError> {
        let request = PreferenceRequest {
            items: order
                .lines
                .iter()
                .map(|line| PreferenceItem {
                    id: line.tag.encode(),
                    title: &line.title,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    currency_id: &order.currency,
                })
                .collect(),
            payer: order.payer.as_ref(),
            metadata: &order.metadata,
            back_urls,
            notification_url,
            auto_return: "approved",
        };

        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                ServiceError::ProviderError(format!("checkout session request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ProviderError(format!(
                "checkout session rejected with {status}: {body}"
            )));
        }

        let preference: PreferenceResponse = response.json().await.map_err(|err| {
            ServiceError::ProviderError(format!("unexpected checkout session response: {err}"))
        })?;
        Ok(preference.id)
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetail, ServiceError> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| ServiceError::ProviderError(format!("payment lookup failed: {err}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("payment {payment_id}")));
        }
        if !response.status().is_success() {
            return Err(ServiceError::ProviderError(format!(
                "payment lookup returned {}",
                response.status()
            )));
        }
        response.json().await.map_err(|err| {
            ServiceError::ProviderError(format!("unexpected payment detail shape: {err}"))
        })
    }
}
