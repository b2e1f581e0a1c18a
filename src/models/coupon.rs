// src/models/coupon.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Cupom do pool genérico: qualquer portador do código pode resgatar,
// exatamente uma vez (is_redeemed vira true e nunca volta).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub code: String,
    pub discount_value: Decimal,
    pub is_redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Cupom pré-vinculado a um cliente, com limite de usos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CouponAssignment {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub coupon_code: String,
    pub assigned_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub limit_per_customer: i32,
    pub usage_count: i32,
}

impl CouponAssignment {
    pub fn limit_reached(&self) -> bool {
        self.usage_count >= self.limit_per_customer.max(1)
    }
}
