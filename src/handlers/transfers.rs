use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::orders::Cart;
use crate::{errors::ServiceError, AppState};

/// POST /api/orders/transfer
///
/// Multipart form: an `order` part carrying the cart JSON and a `receipt`
/// part carrying the proof-of-transfer file.
pub async fn place_transfer_order(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let mut cart: Option<Cart> = None;
    let mut receipt: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ServiceError::BadRequest(format!("invalid multipart payload: {err}"))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("order") => {
                let raw = field.text().await.map_err(|err| {
                    ServiceError::BadRequest(format!("unreadable order part: {err}"))
                })?;
                cart = Some(serde_json::from_str(&raw).map_err(|err| {
                    ServiceError::BadRequest(format!("malformed order payload: {err}"))
                })?);
            }
            Some("receipt") => {
                let file_name = field.file_name().unwrap_or("receipt.bin").to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    ServiceError::BadRequest(format!("unreadable receipt upload: {err}"))
                })?;
                receipt = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let cart = cart.ok_or_else(|| ServiceError::BadRequest("missing order part".to_string()))?;
    let (receipt_name, receipt_bytes) =
        receipt.ok_or_else(|| ServiceError::BadRequest("missing receipt part".to_string()))?;

    let placed = state
        .transfers
        .place_order(&cart, &receipt_name, &receipt_bytes)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}
