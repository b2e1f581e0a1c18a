// src/handlers/metrics.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::campaign::EventType};

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    pub metric: Option<EventType>,
    pub days: Option<i64>,
}

// GET /api/metrics
pub async fn overview(
    State(app_state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let metrics = app_state
        .metrics_service
        .campaign_metrics(query.company_id)
        .await?;
    Ok((StatusCode::OK, Json(metrics)))
}

// GET /api/metrics/timeseries?metric=open&days=7
pub async fn timeseries(
    State(app_state): State<AppState>,
    Query(query): Query<TimeseriesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let points = app_state
        .metrics_service
        .timeseries(query.metric.unwrap_or(EventType::Open), query.days.unwrap_or(7))
        .await?;
    Ok((StatusCode::OK, Json(points)))
}

// GET /api/metrics/channel
pub async fn channel_breakdown(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let breakdown = app_state.metrics_service.channel_breakdown().await?;
    Ok((StatusCode::OK, Json(breakdown)))
}
