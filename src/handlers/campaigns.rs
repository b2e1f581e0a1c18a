// src/handlers/campaigns.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    services::campaign_service::BatchChannel,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SendCampaignPayload {
    pub channel: BatchChannel,

    #[validate(length(min = 1, message = "informe ao menos um cliente"))]
    pub customer_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CampaignListQuery {
    pub company_id: Option<Uuid>,
}

// POST /api/campaigns/{id}/send
pub async fn send_campaign(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendCampaignPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state
        .campaign_service
        .send_campaign(id, payload.channel, &payload.customer_ids)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// GET /api/campaigns
pub async fn list_campaigns(
    State(app_state): State<AppState>,
    Query(query): Query<CampaignListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let campaigns = app_state.campaign_service.list(query.company_id).await?;
    Ok((StatusCode::OK, Json(campaigns)))
}

// GET /api/campaigns/{id}
pub async fn get_campaign(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = app_state
        .campaign_service
        .find_by_id(id)
        .await?
        .ok_or(AppError::CampaignNotFound)?;
    Ok((StatusCode::OK, Json(campaign)))
}
