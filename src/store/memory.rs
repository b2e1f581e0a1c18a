// src/store/memory.rs
//
// Store em memória: implementa todos os contratos sobre um único Mutex.
// É o backend dos testes e serve de referência de semântica para o pg.
// Os vetores preservam ordem de inserção, o que garante a correlação
// inserção/`created_at` exigida pelo log de eventos.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

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

#[derive(Default)]
struct State {
    campaigns: Vec<Campaign>,
    customers: Vec<EndCustomer>,
    sends: Vec<CampaignSend>,
    events: Vec<CampaignEvent>,
    coupons: Vec<Coupon>,
    assignments: Vec<CouponAssignment>,
    wallets: Vec<CashbackWallet>,
    transactions: Vec<CashbackTransaction>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().expect("memory store envenenado");
        f(&mut state)
    }

    // --- Seeds (quem cria campanhas/clientes em produção é o CRUD externo) ---

    pub fn seed_campaign(&self, campaign: Campaign) {
        self.with(|s| s.campaigns.push(campaign));
    }

    pub fn seed_customer(&self, customer: EndCustomer) {
        self.with(|s| s.customers.push(customer));
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        Ok(self.with(|s| s.campaigns.iter().find(|c| c.id == id).cloned()))
    }

    async fn list(&self, company_id: Option<Uuid>) -> Result<Vec<Campaign>, AppError> {
        Ok(self.with(|s| {
            s.campaigns
                .iter()
                .filter(|c| company_id.is_none_or(|cid| c.company_id == cid))
                .cloned()
                .collect()
        }))
    }

    async fn increment_redeemed(&self, id: Uuid) -> Result<(), AppError> {
        self.with(|s| {
            if let Some(c) = s.campaigns.iter_mut().find(|c| c.id == id) {
                c.redeemed_coupons += 1;
                c.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn increment_total_coupons(&self, id: Uuid, by: i32) -> Result<(), AppError> {
        self.with(|s| {
            if let Some(c) = s.campaigns.iter_mut().find(|c| c.id == id) {
                c.total_coupons += by;
                c.updated_at = Utc::now();
            }
        });
        Ok(())
    }
}

#[async_trait]
impl SendStore for MemoryStore {
    async fn create(&self, new: NewSend) -> Result<CampaignSend, AppError> {
        let send = CampaignSend {
            id: Uuid::new_v4(),
            campaign_id: new.campaign_id,
            customer_id: new.customer_id,
            channel: new.channel,
            tracking_id: new.tracking_id,
            status: SendStatus::Pending,
            sent_at: Utc::now(),
        };
        self.with(|s| s.sends.push(send.clone()));
        Ok(send)
    }

    async fn set_status(&self, id: Uuid, status: SendStatus) -> Result<(), AppError> {
        self.with(|s| {
            if let Some(send) = s.sends.iter_mut().find(|x| x.id == id) {
                send.status = status;
            }
        });
        Ok(())
    }

    async fn find_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<CampaignSend>, AppError> {
        Ok(self.with(|s| s.sends.iter().find(|x| x.tracking_id == tracking_id).cloned()))
    }

    async fn count_sent(&self, campaign_ids: &[Uuid]) -> Result<i64, AppError> {
        Ok(self.with(|s| {
            s.sends
                .iter()
                .filter(|x| campaign_ids.contains(&x.campaign_id) && x.status == SendStatus::Sent)
                .count() as i64
        }))
    }

    async fn count_by_channel(&self) -> Result<Vec<(SendChannel, i64)>, AppError> {
        Ok(self.with(|s| {
            let mut email = 0i64;
            let mut whatsapp = 0i64;
            for send in &s.sends {
                match send.channel {
                    SendChannel::Email => email += 1,
                    SendChannel::Whatsapp => whatsapp += 1,
                }
            }
            vec![(SendChannel::Email, email), (SendChannel::Whatsapp, whatsapp)]
        }))
    }
}

#[async_trait]
impl EventLog for MemoryStore {
    async fn append(&self, new: NewEvent) -> Result<CampaignEvent, AppError> {
        let event = CampaignEvent {
            id: Uuid::new_v4(),
            campaign_id: new.campaign_id,
            customer_id: new.customer_id,
            send_id: new.send_id,
            kind: new.kind,
            metadata: new.metadata,
            created_at: Utc::now(),
        };
        self.with(|s| s.events.push(event.clone()));
        Ok(event)
    }

    async fn count(&self, campaign_ids: &[Uuid], kind: EventType) -> Result<i64, AppError> {
        Ok(self.with(|s| {
            s.events
                .iter()
                .filter(|e| campaign_ids.contains(&e.campaign_id) && e.kind == kind)
                .count() as i64
        }))
    }

    async fn list(
        &self,
        campaign_ids: &[Uuid],
        kind: EventType,
    ) -> Result<Vec<CampaignEvent>, AppError> {
        Ok(self.with(|s| {
            s.events
                .iter()
                .filter(|e| campaign_ids.contains(&e.campaign_id) && e.kind == kind)
                .cloned()
                .collect()
        }))
    }

    async fn list_between(
        &self,
        kind: EventType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CampaignEvent>, AppError> {
        Ok(self.with(|s| {
            s.events
                .iter()
                .filter(|e| e.kind == kind && e.created_at >= start && e.created_at <= end)
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn create_many(&self, new: Vec<NewCoupon>) -> Result<Vec<Coupon>, AppError> {
        let created: Vec<Coupon> = new
            .into_iter()
            .map(|c| Coupon {
                id: Uuid::new_v4(),
                campaign_id: c.campaign_id,
                code: c.code,
                discount_value: c.discount_value,
                is_redeemed: false,
                redeemed_at: None,
                redeemed_by: None,
                created_at: Utc::now(),
            })
            .collect();
        self.with(|s| s.coupons.extend(created.iter().cloned()));
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, AppError> {
        Ok(self.with(|s| s.coupons.iter().find(|c| c.id == id).cloned()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        Ok(self.with(|s| s.coupons.iter().find(|c| c.code == code).cloned()))
    }

    async fn list(&self, campaign_id: Option<Uuid>) -> Result<Vec<Coupon>, AppError> {
        Ok(self.with(|s| {
            s.coupons
                .iter()
                .filter(|c| campaign_id.is_none_or(|id| c.campaign_id == id))
                .cloned()
                .collect()
        }))
    }

    async fn mark_redeemed(
        &self,
        id: Uuid,
        redeemed_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self.with(|s| match s.coupons.iter_mut().find(|c| c.id == id) {
            Some(coupon) if !coupon.is_redeemed => {
                coupon.is_redeemed = true;
                coupon.redeemed_at = Some(at);
                coupon.redeemed_by = Some(redeemed_by.to_string());
                true
            }
            _ => false,
        }))
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn create(&self, new: NewAssignment) -> Result<CouponAssignment, AppError> {
        let assignment = CouponAssignment {
            id: Uuid::new_v4(),
            campaign_id: new.campaign_id,
            customer_id: new.customer_id,
            coupon_code: new.coupon_code,
            assigned_at: Utc::now(),
            redeemed_at: None,
            limit_per_customer: new.limit_per_customer,
            usage_count: 0,
        };
        self.with(|s| s.assignments.push(assignment.clone()));
        Ok(assignment)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<CouponAssignment>, AppError> {
        Ok(self.with(|s| s.assignments.iter().find(|a| a.coupon_code == code).cloned()))
    }

    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.with(|s| {
            if let Some(a) = s.assignments.iter_mut().find(|a| a.id == id) {
                a.usage_count += 1;
                a.redeemed_at = Some(at);
            }
        });
        Ok(())
    }

    async fn count_redeemed(&self, campaign_ids: &[Uuid]) -> Result<i64, AppError> {
        Ok(self.with(|s| {
            s.assignments
                .iter()
                .filter(|a| campaign_ids.contains(&a.campaign_id) && a.redeemed_at.is_some())
                .count() as i64
        }))
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn find_by_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<CashbackWallet>, AppError> {
        Ok(self.with(|s| s.wallets.iter().find(|w| w.customer_id == customer_id).cloned()))
    }

    async fn create(&self, customer_id: Uuid) -> Result<CashbackWallet, AppError> {
        let now = Utc::now();
        let wallet = CashbackWallet {
            id: Uuid::new_v4(),
            customer_id,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.with(|s| s.wallets.push(wallet.clone()));
        Ok(wallet)
    }

    async fn apply_delta(
        &self,
        customer_id: Uuid,
        delta: Decimal,
    ) -> Result<CashbackWallet, AppError> {
        self.with(|s| {
            let wallet = s
                .wallets
                .iter_mut()
                .find(|w| w.customer_id == customer_id)
                .ok_or(AppError::CustomerNotFound)?;
            wallet.balance += delta;
            wallet.updated_at = Utc::now();
            Ok(wallet.clone())
        })
    }
}

#[async_trait]
impl TransactionLog for MemoryStore {
    async fn append(&self, new: NewTransaction) -> Result<CashbackTransaction, AppError> {
        let tx = CashbackTransaction {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            campaign_id: new.campaign_id,
            amount: new.amount,
            direction: new.direction,
            expires_at: new.expires_at,
            used_at: new.used_at,
            reference: new.reference,
            created_at: Utc::now(),
        };
        self.with(|s| s.transactions.push(tx.clone()));
        Ok(tx)
    }

    async fn recent_by_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CashbackTransaction>, AppError> {
        Ok(self.with(|s| {
            // Ordem de inserção == ordem cronológica; rev() dá o mais recente primeiro.
            s.transactions
                .iter()
                .rev()
                .filter(|t| t.customer_id == customer_id)
                .take(limit as usize)
                .cloned()
                .collect()
        }))
    }

    async fn sum_valid_credits(
        &self,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        Ok(self.with(|s| {
            s.transactions
                .iter()
                .filter(|t| {
                    t.customer_id == customer_id
                        && t.direction == crate::models::cashback::TxDirection::Credit
                        && !t.is_expired(now)
                })
                .map(|t| t.amount)
                .sum()
        }))
    }

    async fn sum_debits(&self, customer_id: Uuid) -> Result<Decimal, AppError> {
        Ok(self.with(|s| {
            s.transactions
                .iter()
                .filter(|t| {
                    t.customer_id == customer_id
                        && t.direction == crate::models::cashback::TxDirection::Debit
                })
                .map(|t| t.amount)
                .sum()
        }))
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EndCustomer>, AppError> {
        Ok(self.with(|s| s.customers.iter().find(|c| c.id == id).cloned()))
    }
}
