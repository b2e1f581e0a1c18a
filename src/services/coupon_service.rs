// src/services/coupon_service.rs
//
// Registro de cupons e atribuições. O resgate roda inteiro sob o lock do
// código: dois pedidos concorrentes para o mesmo cupom nunca passam os dois
// pela checagem de `is_redeemed`.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{error::AppError, locks::LockRegistry},
    models::{
        campaign::EventType,
        coupon::{Coupon, CouponAssignment},
    },
    services::cashback_service::{CashbackService, DebitInput},
    store::{
        AssignmentStore, CampaignStore, CouponStore, EventLog, NewAssignment, NewCoupon, NewEvent,
    },
};

#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponStore>,
    assignments: Arc<dyn AssignmentStore>,
    campaigns: Arc<dyn CampaignStore>,
    events: Arc<dyn EventLog>,
    cashback: CashbackService,
    locks: LockRegistry<String>,
}

// 12 hex maiúsculos = 48 bits de entropia; colisão é desprezível nessa
// escala e o UNIQUE do banco segura o resto.
fn generate_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..12].to_uppercase()
}

impl CouponService {
    pub fn new(
        coupons: Arc<dyn CouponStore>,
        assignments: Arc<dyn AssignmentStore>,
        campaigns: Arc<dyn CampaignStore>,
        events: Arc<dyn EventLog>,
        cashback: CashbackService,
    ) -> Self {
        Self {
            coupons,
            assignments,
            campaigns,
            events,
            cashback,
            locks: LockRegistry::new(),
        }
    }

    pub async fn list(&self, campaign_id: Option<Uuid>) -> Result<Vec<Coupon>, AppError> {
        self.coupons.list(campaign_id).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, AppError> {
        self.coupons.find_by_id(id).await
    }

    // --- GERAÇÃO ---
    pub async fn generate(
        &self,
        campaign_id: Uuid,
        count: u32,
        discount_value: Option<Decimal>,
    ) -> Result<Vec<Coupon>, AppError> {
        self.campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or(AppError::CampaignNotFound)?;

        let new: Vec<NewCoupon> = (0..count)
            .map(|_| NewCoupon {
                campaign_id,
                code: generate_code(),
                discount_value: discount_value.unwrap_or(Decimal::ZERO),
            })
            .collect();
        let created = self.coupons.create_many(new).await?;

        self.campaigns
            .increment_total_coupons(campaign_id, created.len() as i32)
            .await?;

        tracing::info!("🎟️ {} cupons gerados para a campanha {}", created.len(), campaign_id);
        Ok(created)
    }

    // --- ATRIBUIÇÃO ---
    // Vincula um cupom a um cliente com limite de usos. Sem `code`, um cupom
    // novo do pool é cunhado junto.
    pub async fn assign(
        &self,
        campaign_id: Uuid,
        customer_id: Uuid,
        code: Option<String>,
        limit_per_customer: Option<i32>,
    ) -> Result<CouponAssignment, AppError> {
        self.campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or(AppError::CampaignNotFound)?;

        let code = match code {
            Some(code) => {
                self.coupons
                    .find_by_code(&code)
                    .await?
                    .ok_or(AppError::CouponNotFound)?;
                code
            }
            None => {
                let minted = self
                    .coupons
                    .create_many(vec![NewCoupon {
                        campaign_id,
                        code: generate_code(),
                        discount_value: Decimal::ZERO,
                    }])
                    .await?;
                self.campaigns.increment_total_coupons(campaign_id, 1).await?;
                minted[0].code.clone()
            }
        };

        self.assignments
            .create(NewAssignment {
                campaign_id,
                customer_id,
                coupon_code: code,
                limit_per_customer: limit_per_customer.unwrap_or(1).max(1),
            })
            .await
    }

    // --- RESGATE ---
    //
    // Todas as checagens acontecem antes de qualquer mutação, e o débito
    // financeiro acontece antes de marcar o cupom: se o débito falhar, nem
    // cupom nem atribuição mudam de estado.
    pub async fn redeem(
        &self,
        code: &str,
        redeemed_by: &str,
        customer_id: Option<Uuid>,
    ) -> Result<Coupon, AppError> {
        let lock = self.locks.lock_for(&code.to_string());
        let _guard = lock.lock().await;

        let coupon = self
            .coupons
            .find_by_code(code)
            .await?
            .ok_or(AppError::CouponNotFound)?;

        let now = Utc::now();
        let campaign = self.campaigns.find_by_id(coupon.campaign_id).await?;
        if let Some(campaign) = &campaign {
            if campaign.is_expired(now) {
                return Err(AppError::CampaignExpired);
            }
        }

        // Fluxo atribuído e fluxo de pool coexistem: a atribuição, quando
        // existe, acrescenta dono e limite de usos por cliente.
        let assignment = self.assignments.find_by_code(code).await?;
        if let Some(assignment) = &assignment {
            if let Some(customer_id) = customer_id {
                if assignment.customer_id != customer_id {
                    return Err(AppError::CouponNotAssignedToCustomer);
                }
            }
            if assignment.limit_reached() {
                return Err(AppError::CouponLimitReached);
            }
        }

        if coupon.is_redeemed {
            return Err(AppError::CouponAlreadyRedeemed);
        }

        // Débito antes da mutação de estado: resgatar sem cobrar seria
        // pior do que falhar o resgate.
        if let (Some(campaign), Some(customer_id)) = (&campaign, customer_id) {
            if campaign.kind.includes_cashback() {
                if let Some(amount) = campaign.cashback_value {
                    if amount > Decimal::ZERO {
                        self.cashback
                            .debit(DebitInput {
                                customer_id,
                                campaign_id: Some(campaign.id),
                                amount,
                                reference: Some(format!("Resgate do cupom {code}")),
                            })
                            .await?;

                        self.events
                            .append(NewEvent {
                                campaign_id: campaign.id,
                                customer_id: Some(customer_id),
                                send_id: None,
                                kind: EventType::CashbackDebit,
                                metadata: Some(json!({ "amount": amount, "code": code })),
                            })
                            .await?;
                    }
                }
            }
        }

        if let Some(assignment) = &assignment {
            self.assignments.record_usage(assignment.id, now).await?;
        }

        // Check-and-set no store como última barreira contra corrida.
        let won = self.coupons.mark_redeemed(coupon.id, redeemed_by, now).await?;
        if !won {
            return Err(AppError::CouponAlreadyRedeemed);
        }

        self.campaigns.increment_redeemed(coupon.campaign_id).await?;

        self.events
            .append(NewEvent {
                campaign_id: coupon.campaign_id,
                customer_id: customer_id.or(assignment.as_ref().map(|a| a.customer_id)),
                send_id: None,
                kind: EventType::Redeem,
                metadata: Some(json!({ "code": code, "redeemed_by": redeemed_by })),
            })
            .await?;

        self.coupons
            .find_by_id(coupon.id)
            .await?
            .ok_or(AppError::CouponNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::campaign::{Campaign, CampaignType};
    use crate::services::cashback_service::CreditInput;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, Utc};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn campaign(kind: CampaignType, cashback_value: Option<Decimal>) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Campanha teste".into(),
            description: None,
            kind,
            discount_percent: None,
            cashback_value,
            start_date: None,
            end_date: Some(now + Duration::days(30)),
            active: true,
            total_coupons: 0,
            total_available: None,
            redeemed_coupons: 0,
            limit_per_customer: None,
            message_template: None,
            image_url: None,
            landing_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn setup(campaign: &Campaign) -> (CouponService, CashbackService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.seed_campaign(campaign.clone());
        let cashback = CashbackService::new(store.clone(), store.clone());
        let svc = CouponService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            cashback.clone(),
        );
        (svc, cashback, store)
    }

    #[tokio::test]
    async fn gera_codigos_unicos_e_atualiza_o_contador() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, store) = setup(&camp);

        let coupons = svc.generate(camp.id, 20, Some(dec("15.00"))).await.unwrap();
        assert_eq!(coupons.len(), 20);

        let codes: std::collections::HashSet<_> = coupons.iter().map(|c| c.code.clone()).collect();
        assert_eq!(codes.len(), 20);
        for code in &codes {
            assert_eq!(code.len(), 12);
        }

        let updated = CampaignStore::find_by_id(store.as_ref(), camp.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.total_coupons, 20);
    }

    #[tokio::test]
    async fn segundo_resgate_falha_com_coupon_already_redeemed() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, _) = setup(&camp);

        let coupons = svc.generate(camp.id, 1, None).await.unwrap();
        let code = coupons[0].code.clone();

        let redeemed = svc.redeem(&code, "loja-01", None).await.unwrap();
        assert!(redeemed.is_redeemed);
        assert_eq!(redeemed.redeemed_by.as_deref(), Some("loja-01"));

        let err = svc.redeem(&code, "loja-02", None).await.unwrap_err();
        assert!(matches!(err, AppError::CouponAlreadyRedeemed));
    }

    #[tokio::test]
    async fn resgate_de_campanha_expirada_falha() {
        let mut camp = campaign(CampaignType::Coupon, None);
        camp.end_date = Some(Utc::now() - Duration::days(1));
        let (svc, _, _) = setup(&camp);

        let coupons = svc.generate(camp.id, 1, None).await.unwrap();
        let err = svc.redeem(&coupons[0].code, "loja", None).await.unwrap_err();
        assert!(matches!(err, AppError::CampaignExpired));
    }

    #[tokio::test]
    async fn atribuicao_respeita_dono_e_limite() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, _) = setup(&camp);
        let dono = Uuid::new_v4();
        let outro = Uuid::new_v4();

        let assignment = svc.assign(camp.id, dono, None, Some(1)).await.unwrap();
        let code = assignment.coupon_code.clone();

        let err = svc.redeem(&code, "loja", Some(outro)).await.unwrap_err();
        assert!(matches!(err, AppError::CouponNotAssignedToCustomer));

        svc.redeem(&code, "loja", Some(dono)).await.unwrap();

        // O limite de usos barra antes mesmo do guard de pool.
        let err = svc.redeem(&code, "loja", Some(dono)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::CouponLimitReached | AppError::CouponAlreadyRedeemed
        ));
    }

    #[tokio::test]
    async fn debito_falho_nao_muta_cupom_nem_atribuicao() {
        let camp = campaign(CampaignType::Cashback, Some(dec("10.00")));
        let (svc, _, store) = setup(&camp);
        let customer = Uuid::new_v4();

        let assignment = svc.assign(camp.id, customer, None, None).await.unwrap();
        let code = assignment.coupon_code.clone();

        // Carteira vazia: o débito de 10.00 falha.
        let err = svc.redeem(&code, "loja", Some(customer)).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance));

        let coupon = CouponStore::find_by_code(store.as_ref(), &code)
            .await
            .unwrap()
            .unwrap();
        assert!(!coupon.is_redeemed);
        let assignment = AssignmentStore::find_by_code(store.as_ref(), &code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(assignment.usage_count, 0);
        assert!(assignment.redeemed_at.is_none());
    }

    #[tokio::test]
    async fn resgate_com_cashback_debita_a_carteira() {
        let camp = campaign(CampaignType::Cashback, Some(dec("10.00")));
        let (svc, cashback, _) = setup(&camp);
        let customer = Uuid::new_v4();

        cashback
            .credit(CreditInput {
                customer_id: customer,
                campaign_id: camp.id,
                amount: dec("10.00"),
                expires_at: None,
                reference: None,
            })
            .await
            .unwrap();

        let assignment = svc.assign(camp.id, customer, None, None).await.unwrap();
        svc.redeem(&assignment.coupon_code, "loja", Some(customer))
            .await
            .unwrap();

        assert_eq!(cashback.available_balance(customer).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn resgates_concorrentes_tem_exatamente_um_vencedor() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, _) = setup(&camp);

        let coupons = svc.generate(camp.id, 1, None).await.unwrap();
        let code = coupons[0].code.clone();

        let mut handles = Vec::new();
        for i in 0..2 {
            let svc = svc.clone();
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                svc.redeem(&code, &format!("loja-{i}"), None).await
            }));
        }

        let mut successes = 0;
        let mut already = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::CouponAlreadyRedeemed) => already += 1,
                Err(other) => panic!("erro inesperado: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(already, 1);
    }

    #[tokio::test]
    async fn resgate_registra_evento_redeem() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, store) = setup(&camp);

        let coupons = svc.generate(camp.id, 1, None).await.unwrap();
        svc.redeem(&coupons[0].code, "loja", None).await.unwrap();

        let events = EventLog::list(store.as_ref(), &[camp.id], EventType::Redeem)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        let meta = events[0].metadata.as_ref().unwrap();
        assert_eq!(meta["code"], coupons[0].code);
        assert_eq!(meta["redeemed_by"], "loja");

        let updated = CampaignStore::find_by_id(store.as_ref(), camp.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.redeemed_coupons, 1);
    }
}
