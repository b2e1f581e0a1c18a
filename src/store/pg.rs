// src/store/pg.rs
//
// Implementações Postgres dos contratos de store, uma struct por entidade,
// todas donas de um clone da pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::{
        campaign::{Campaign, CampaignEvent, CampaignSend, EventType, SendChannel, SendStatus},
        cashback::{CashbackTransaction, CashbackWallet},
        coupon::{Coupon, CouponAssignment},
        customer::EndCustomer,
    },
    store::{
        AssignmentStore, CampaignStore, CouponStore, CustomerDirectory, EventLog, NewAssignment,
        NewCoupon, NewEvent, NewSend, NewTransaction, SendStore, TransactionLog, WalletStore,
    },
};

// --- Campanhas ---

#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(campaign)
    }

    async fn list(&self, company_id: Option<Uuid>) -> Result<Vec<Campaign>, AppError> {
        let campaigns = match company_id {
            Some(company_id) => {
                sqlx::query_as::<_, Campaign>(
                    "SELECT * FROM campaigns WHERE company_id = $1 ORDER BY created_at DESC",
                )
                .bind(company_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(campaigns)
    }

    async fn increment_redeemed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE campaigns SET redeemed_coupons = redeemed_coupons + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_total_coupons(&self, id: Uuid, by: i32) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE campaigns SET total_coupons = total_coupons + $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// --- Envios ---

#[derive(Clone)]
pub struct PgSendStore {
    pool: PgPool,
}

impl PgSendStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SendStore for PgSendStore {
    async fn create(&self, new: NewSend) -> Result<CampaignSend, AppError> {
        let send = sqlx::query_as::<_, CampaignSend>(
            "INSERT INTO campaign_sends (campaign_id, customer_id, channel, tracking_id, status) \
             VALUES ($1, $2, $3, $4, 'pending') RETURNING *",
        )
        .bind(new.campaign_id)
        .bind(new.customer_id)
        .bind(new.channel)
        .bind(&new.tracking_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(send)
    }

    async fn set_status(&self, id: Uuid, status: SendStatus) -> Result<(), AppError> {
        sqlx::query("UPDATE campaign_sends SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<CampaignSend>, AppError> {
        let send = sqlx::query_as::<_, CampaignSend>(
            "SELECT * FROM campaign_sends WHERE tracking_id = $1",
        )
        .bind(tracking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(send)
    }

    async fn count_sent(&self, campaign_ids: &[Uuid]) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM campaign_sends \
             WHERE campaign_id = ANY($1) AND status = 'sent'",
        )
        .bind(campaign_ids.to_vec())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_by_channel(&self) -> Result<Vec<(SendChannel, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (SendChannel, i64)>(
            "SELECT channel, COUNT(*) FROM campaign_sends GROUP BY channel",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// --- Log de eventos ---

#[derive(Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn append(&self, new: NewEvent) -> Result<CampaignEvent, AppError> {
        let event = sqlx::query_as::<_, CampaignEvent>(
            "INSERT INTO campaign_events (campaign_id, customer_id, send_id, type, metadata) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.campaign_id)
        .bind(new.customer_id)
        .bind(new.send_id)
        .bind(new.kind)
        .bind(new.metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn count(&self, campaign_ids: &[Uuid], kind: EventType) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM campaign_events \
             WHERE campaign_id = ANY($1) AND type = $2",
        )
        .bind(campaign_ids.to_vec())
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list(
        &self,
        campaign_ids: &[Uuid],
        kind: EventType,
    ) -> Result<Vec<CampaignEvent>, AppError> {
        let events = sqlx::query_as::<_, CampaignEvent>(
            "SELECT * FROM campaign_events \
             WHERE campaign_id = ANY($1) AND type = $2 ORDER BY created_at ASC",
        )
        .bind(campaign_ids.to_vec())
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_between(
        &self,
        kind: EventType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CampaignEvent>, AppError> {
        let events = sqlx::query_as::<_, CampaignEvent>(
            "SELECT * FROM campaign_events \
             WHERE type = $1 AND created_at BETWEEN $2 AND $3 ORDER BY created_at ASC",
        )
        .bind(kind)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}

// --- Cupons ---

#[derive(Clone)]
pub struct PgCouponStore {
    pool: PgPool,
}

impl PgCouponStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponStore for PgCouponStore {
    async fn create_many(&self, new: Vec<NewCoupon>) -> Result<Vec<Coupon>, AppError> {
        let mut created = Vec::with_capacity(new.len());
        for coupon in new {
            let saved = sqlx::query_as::<_, Coupon>(
                "INSERT INTO coupons (campaign_id, code, discount_value) \
                 VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(coupon.campaign_id)
            .bind(&coupon.code)
            .bind(coupon.discount_value)
            .fetch_one(&self.pool)
            .await?;
            created.push(saved);
        }
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, AppError> {
        let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    async fn list(&self, campaign_id: Option<Uuid>) -> Result<Vec<Coupon>, AppError> {
        let coupons = match campaign_id {
            Some(campaign_id) => {
                sqlx::query_as::<_, Coupon>(
                    "SELECT * FROM coupons WHERE campaign_id = $1 ORDER BY created_at DESC",
                )
                .bind(campaign_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Coupon>(
                    "SELECT * FROM coupons ORDER BY created_at DESC LIMIT 100",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(coupons)
    }

    async fn mark_redeemed(
        &self,
        id: Uuid,
        redeemed_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        // A cláusula `is_redeemed = FALSE` é o check-and-set: sob corrida,
        // apenas um UPDATE afeta a linha.
        let result = sqlx::query(
            "UPDATE coupons SET is_redeemed = TRUE, redeemed_at = $2, redeemed_by = $3 \
             WHERE id = $1 AND is_redeemed = FALSE",
        )
        .bind(id)
        .bind(at)
        .bind(redeemed_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- Atribuições de cupom ---

#[derive(Clone)]
pub struct PgAssignmentStore {
    pool: PgPool,
}

impl PgAssignmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn create(&self, new: NewAssignment) -> Result<CouponAssignment, AppError> {
        let assignment = sqlx::query_as::<_, CouponAssignment>(
            "INSERT INTO coupon_assignments \
             (campaign_id, customer_id, coupon_code, limit_per_customer) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new.campaign_id)
        .bind(new.customer_id)
        .bind(&new.coupon_code)
        .bind(new.limit_per_customer)
        .fetch_one(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<CouponAssignment>, AppError> {
        let assignment = sqlx::query_as::<_, CouponAssignment>(
            "SELECT * FROM coupon_assignments WHERE coupon_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE coupon_assignments SET usage_count = usage_count + 1, redeemed_at = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_redeemed(&self, campaign_ids: &[Uuid]) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM coupon_assignments \
             WHERE campaign_id = ANY($1) AND redeemed_at IS NOT NULL",
        )
        .bind(campaign_ids.to_vec())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// --- Carteiras ---

#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn find_by_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<CashbackWallet>, AppError> {
        let wallet = sqlx::query_as::<_, CashbackWallet>(
            "SELECT * FROM cashback_wallets WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(wallet)
    }

    async fn create(&self, customer_id: Uuid) -> Result<CashbackWallet, AppError> {
        let wallet = sqlx::query_as::<_, CashbackWallet>(
            "INSERT INTO cashback_wallets (customer_id, balance) VALUES ($1, 0) RETURNING *",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(wallet)
    }

    async fn apply_delta(
        &self,
        customer_id: Uuid,
        delta: Decimal,
    ) -> Result<CashbackWallet, AppError> {
        let wallet = sqlx::query_as::<_, CashbackWallet>(
            "UPDATE cashback_wallets SET balance = balance + $2, updated_at = NOW() \
             WHERE customer_id = $1 RETURNING *",
        )
        .bind(customer_id)
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;
        Ok(wallet)
    }
}

// --- Ledger de cashback ---

#[derive(Clone)]
pub struct PgTransactionLog {
    pool: PgPool,
}

impl PgTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLog for PgTransactionLog {
    async fn append(&self, new: NewTransaction) -> Result<CashbackTransaction, AppError> {
        let tx = sqlx::query_as::<_, CashbackTransaction>(
            "INSERT INTO cashback_transactions \
             (customer_id, campaign_id, amount, direction, expires_at, used_at, reference) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(new.customer_id)
        .bind(new.campaign_id)
        .bind(new.amount)
        .bind(new.direction)
        .bind(new.expires_at)
        .bind(new.used_at)
        .bind(&new.reference)
        .fetch_one(&self.pool)
        .await?;
        Ok(tx)
    }

    async fn recent_by_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CashbackTransaction>, AppError> {
        let txs = sqlx::query_as::<_, CashbackTransaction>(
            "SELECT * FROM cashback_transactions WHERE customer_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(txs)
    }

    async fn sum_valid_credits(
        &self,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let sum = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM cashback_transactions \
             WHERE customer_id = $1 AND direction = 'credit' \
             AND (expires_at IS NULL OR expires_at > $2)",
        )
        .bind(customer_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn sum_debits(&self, customer_id: Uuid) -> Result<Decimal, AppError> {
        let sum = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM cashback_transactions \
             WHERE customer_id = $1 AND direction = 'debit'",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }
}

// --- Diretório de clientes ---

#[derive(Clone)]
pub struct PgCustomerDirectory {
    pool: PgPool,
}

impl PgCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerDirectory for PgCustomerDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EndCustomer>, AppError> {
        let customer = sqlx::query_as::<_, EndCustomer>(
            "SELECT * FROM end_customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }
}
