// src/handlers/cashback.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState};

// GET /api/customers/{id}/wallet
pub async fn wallet_info(
    State(app_state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // A carteira é criada sob demanda, mas só para clientes que existem.
    app_state
        .customers
        .find_by_id(customer_id)
        .await?
        .ok_or(AppError::CustomerNotFound)?;

    let info = app_state.cashback_service.wallet_info(customer_id).await?;
    Ok((StatusCode::OK, Json(info)))
}
