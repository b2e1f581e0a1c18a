// src/store/mod.rs
//
// Contratos estreitos de leitura/escrita por entidade. Os serviços dependem
// apenas destes traits, nunca de uma sessão genérica de ORM: em produção a
// implementação é Postgres (sqlx), nos testes é o store em memória.

pub mod memory;
pub mod pg;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        campaign::{Campaign, CampaignEvent, CampaignSend, EventType, SendChannel, SendStatus},
        cashback::{CashbackTransaction, CashbackWallet, TxDirection},
        coupon::{Coupon, CouponAssignment},
        customer::EndCustomer,
    },
};

// --- Payloads de inserção ---

#[derive(Debug, Clone)]
pub struct NewSend {
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub channel: SendChannel,
    pub tracking_id: String,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub campaign_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub send_id: Option<Uuid>,
    pub kind: EventType,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub campaign_id: Uuid,
    pub code: String,
    pub discount_value: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub coupon_code: String,
    pub limit_per_customer: i32,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub customer_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub amount: Decimal,
    pub direction: TxDirection,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
}

// --- Contratos ---

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>, AppError>;
    async fn list(&self, company_id: Option<Uuid>) -> Result<Vec<Campaign>, AppError>;
    async fn increment_redeemed(&self, id: Uuid) -> Result<(), AppError>;
    async fn increment_total_coupons(&self, id: Uuid, by: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait SendStore: Send + Sync {
    async fn create(&self, new: NewSend) -> Result<CampaignSend, AppError>;
    async fn set_status(&self, id: Uuid, status: SendStatus) -> Result<(), AppError>;
    async fn find_by_tracking_id(&self, tracking_id: &str)
        -> Result<Option<CampaignSend>, AppError>;
    /// Envios com status `sent` dentro do conjunto de campanhas.
    async fn count_sent(&self, campaign_ids: &[Uuid]) -> Result<i64, AppError>;
    async fn count_by_channel(&self) -> Result<Vec<(SendChannel, i64)>, AppError>;
}

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Somente INSERT; a ordem de inserção acompanha `created_at`.
    async fn append(&self, new: NewEvent) -> Result<CampaignEvent, AppError>;
    async fn count(&self, campaign_ids: &[Uuid], kind: EventType) -> Result<i64, AppError>;
    async fn list(&self, campaign_ids: &[Uuid], kind: EventType)
        -> Result<Vec<CampaignEvent>, AppError>;
    async fn list_between(
        &self,
        kind: EventType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CampaignEvent>, AppError>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn create_many(&self, new: Vec<NewCoupon>) -> Result<Vec<Coupon>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, AppError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError>;
    async fn list(&self, campaign_id: Option<Uuid>) -> Result<Vec<Coupon>, AppError>;
    /// Check-and-set condicional: só vira `is_redeemed` de false para true.
    /// Devolve false quando o cupom já estava resgatado.
    async fn mark_redeemed(
        &self,
        id: Uuid,
        redeemed_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn create(&self, new: NewAssignment) -> Result<CouponAssignment, AppError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<CouponAssignment>, AppError>;
    /// Incrementa `usage_count` e marca `redeemed_at`.
    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn count_redeemed(&self, campaign_ids: &[Uuid]) -> Result<i64, AppError>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn find_by_customer(&self, customer_id: Uuid)
        -> Result<Option<CashbackWallet>, AppError>;
    async fn create(&self, customer_id: Uuid) -> Result<CashbackWallet, AppError>;
    /// Ajusta o saldo em cache (delta positivo ou negativo).
    async fn apply_delta(
        &self,
        customer_id: Uuid,
        delta: Decimal,
    ) -> Result<CashbackWallet, AppError>;
}

#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, new: NewTransaction) -> Result<CashbackTransaction, AppError>;
    async fn recent_by_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CashbackTransaction>, AppError>;
    /// Soma dos créditos sem `expires_at` ou com vencimento no futuro.
    async fn sum_valid_credits(
        &self,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError>;
    async fn sum_debits(&self, customer_id: Uuid) -> Result<Decimal, AppError>;
}

// Diretório de clientes finais — colaborador externo, o núcleo só lê.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EndCustomer>, AppError>;
}

// O conjunto completo de stores que os serviços consomem. Produção monta a
// variante Postgres; os testes trocam tudo por um único MemoryStore.
#[derive(Clone)]
pub struct StoreBundle {
    pub campaigns: Arc<dyn CampaignStore>,
    pub sends: Arc<dyn SendStore>,
    pub events: Arc<dyn EventLog>,
    pub coupons: Arc<dyn CouponStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub ledger: Arc<dyn TransactionLog>,
    pub customers: Arc<dyn CustomerDirectory>,
}

impl StoreBundle {
    pub fn postgres(pool: &sqlx::PgPool) -> Self {
        Self {
            campaigns: Arc::new(pg::PgCampaignStore::new(pool.clone())),
            sends: Arc::new(pg::PgSendStore::new(pool.clone())),
            events: Arc::new(pg::PgEventLog::new(pool.clone())),
            coupons: Arc::new(pg::PgCouponStore::new(pool.clone())),
            assignments: Arc::new(pg::PgAssignmentStore::new(pool.clone())),
            wallets: Arc::new(pg::PgWalletStore::new(pool.clone())),
            ledger: Arc::new(pg::PgTransactionLog::new(pool.clone())),
            customers: Arc::new(pg::PgCustomerDirectory::new(pool.clone())),
        }
    }

    pub fn in_memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            campaigns: store.clone(),
            sends: store.clone(),
            events: store.clone(),
            coupons: store.clone(),
            assignments: store.clone(),
            wallets: store.clone(),
            ledger: store.clone(),
            customers: store,
        }
    }
}
