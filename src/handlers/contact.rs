use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{errors::ServiceError, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ContactMessage {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub message: String,
}

/// POST /api/contact
pub async fn submit_contact_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactMessage>,
) -> Result<impl IntoResponse, ServiceError> {
    payload
        .validate()
        .map_err(|err| ServiceError::ValidationError(err.to_string()))?;

    state
        .mailer
        .send_contact_notification(&payload.name, &payload.email, &payload.message)
        .await?;

    Ok(Json(json!({ "status": "sent" })))
}
