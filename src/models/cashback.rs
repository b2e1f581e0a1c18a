// src/models/cashback.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_direction", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxDirection {
    Credit,
    Debit,
}

// Cache materializado do saldo. ATENÇÃO: pode incluir valor de créditos já
// expirados; decisões de gasto usam sempre o saldo disponível recalculado
// a partir do ledger, nunca este campo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashbackWallet {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Lançamento do ledger: `amount` é sempre magnitude não-negativa, a direção
// diz se soma ou subtrai. Somente INSERT.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashbackTransaction {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub amount: Decimal,
    pub direction: TxDirection,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashbackTransaction {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}
