// src/models/campaign.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "campaign_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Coupon,
    Cashback,
    Gift,
    CouponCashback,
}

impl CampaignType {
    // Campanhas "coupon_cashback" participam dos dois fluxos.
    pub fn includes_cashback(&self) -> bool {
        matches!(self, CampaignType::Cashback | CampaignType::CouponCashback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "send_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SendChannel {
    Email,
    Whatsapp,
}

impl SendChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendChannel::Email => "email",
            SendChannel::Whatsapp => "whatsapp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "send_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Open,
    Click,
    Redeem,
    CashbackCredit,
    CashbackDebit,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: CampaignType,
    pub discount_percent: Option<i32>,
    pub cashback_value: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub total_coupons: i32,
    pub total_available: Option<i32>,
    pub redeemed_coupons: i32,
    pub limit_per_customer: Option<i32>,
    pub message_template: Option<String>,
    pub image_url: Option<String>,
    pub landing_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    // Expirada = data final definida e já no passado. Sem data final, nunca expira.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_date, Some(end) if end < now)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }
}

// Um registro por (campanha, cliente, canal) despachado. O `tracking_id` é a
// única chave pela qual os hits de pixel/clique voltam a esta linha.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CampaignSend {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub channel: SendChannel,
    pub tracking_id: String,
    pub status: SendStatus,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CampaignEvent {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub send_id: Option<Uuid>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: EventType,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
