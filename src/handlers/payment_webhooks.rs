use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::services::reconciliation::WebhookNotice;
use crate::{errors::ServiceError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// POST /api/payments/webhook
///
/// Responds `200 {"status":"ok"}` regardless of internal outcome so the
/// provider does not amplify a transient internal fault into a retry storm;
/// its scheduled redeliveries are absorbed by the dedup guard instead. Only a
/// bad signature is rejected.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = state.config.payment.webhook_secret.as_deref() {
        let tolerance = state.config.payment.webhook_tolerance_secs;
        if !verify_signature(&headers, &body, secret, tolerance) {
            warn!("payment webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let notice = extract_notice(&params, &body);
    let outcome = state.reconciliation.handle_notification(&notice).await;
    debug!(?outcome, "payment webhook acknowledged");

    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}

/// The provider sends `topic`/`id` as query parameters on the older
/// notification format and `type`/`data.id` in the JSON body on the newer
/// one.
fn extract_notice(params: &HashMap<String, String>, body: &Bytes) -> WebhookNotice {
    let mut topic = params.get("topic").or_else(|| params.get("type")).cloned();
    let mut payment_id = params.get("id").or_else(|| params.get("data.id")).cloned();

    if topic.is_none() || payment_id.is_none() {
        if let Ok(payload) = serde_json::from_slice::<Value>(body) {
            if topic.is_none() {
                topic = payload
                    .get("type")
                    .or_else(|| payload.get("topic"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            if payment_id.is_none() {
                payment_id = payload.pointer("/data/id").and_then(|value| match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
            }
        }
    }

    WebhookNotice { topic, payment_id }
}

fn verify_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    let (Some(timestamp), Some(signature)) = (
        header_str(headers, "x-timestamp"),
        header_str(headers, "x-signature"),
    ) else {
        return false;
    };

    if let Ok(ts) = timestamp.parse::<i64>() {
        let now = chrono::Utc::now().timestamp();
        if (now - ts).unsigned_abs() > tolerance_secs {
            return false;
        }
    }

    let signed = format!(
        "{}.{}",
        timestamp,
        std::str::from_utf8(payload).unwrap_or("")
    );
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, signature)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
