use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::{errors::ServiceError, AppState};

/// GET /api/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.catalog.list().await?;
    Ok(Json(products))
}
