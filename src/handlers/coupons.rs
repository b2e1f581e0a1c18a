// src/handlers/coupons.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateCouponsPayload {
    pub campaign_id: Uuid,

    #[validate(range(min = 1, max = 10_000, message = "count deve estar entre 1 e 10000"))]
    pub count: u32,

    pub discount_value: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RedeemCouponPayload {
    #[validate(length(min = 1, message = "required"))]
    pub code: String,

    #[validate(length(min = 1, message = "required"))]
    pub redeemed_by: String,

    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignCouponPayload {
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub code: Option<String>,
    pub limit_per_customer: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CouponListQuery {
    pub campaign_id: Option<Uuid>,
}

// POST /api/coupons/generate
pub async fn generate_coupons(
    State(app_state): State<AppState>,
    Json(payload): Json<GenerateCouponsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let coupons = app_state
        .coupon_service
        .generate(payload.campaign_id, payload.count, payload.discount_value)
        .await?;
    Ok((StatusCode::CREATED, Json(coupons)))
}

// POST /api/coupons/redeem
pub async fn redeem_coupon(
    State(app_state): State<AppState>,
    Json(payload): Json<RedeemCouponPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let coupon = app_state
        .coupon_service
        .redeem(&payload.code, &payload.redeemed_by, payload.customer_id)
        .await?;
    Ok((StatusCode::OK, Json(coupon)))
}

// POST /api/coupons/assign
pub async fn assign_coupon(
    State(app_state): State<AppState>,
    Json(payload): Json<AssignCouponPayload>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = app_state
        .coupon_service
        .assign(
            payload.campaign_id,
            payload.customer_id,
            payload.code,
            payload.limit_per_customer,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

// GET /api/coupons
pub async fn list_coupons(
    State(app_state): State<AppState>,
    Query(query): Query<CouponListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let coupons = app_state.coupon_service.list(query.campaign_id).await?;
    Ok((StatusCode::OK, Json(coupons)))
}
