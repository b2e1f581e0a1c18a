// src/services/campaign_service.rs
//
// Despachante de envios. Cada (cliente, canal) é uma unidade de trabalho
// independente: commit por destinatário, sem rollback do lote. O cashback
// da campanha é creditado no envio — a recompensa é por receber a campanha,
// não por interagir com ela.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::campaign::{Campaign, CampaignSend, EventType, SendChannel, SendStatus},
    services::{
        cashback_service::{CashbackService, CreditInput},
        mailer::{build_campaign_email_html, Mailer},
    },
    store::{CampaignStore, CustomerDirectory, EventLog, NewEvent, NewSend, SendStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchChannel {
    Email,
    Whatsapp,
    Both,
}

impl BatchChannel {
    fn expand(self) -> Vec<SendChannel> {
        match self {
            BatchChannel::Email => vec![SendChannel::Email],
            BatchChannel::Whatsapp => vec![SendChannel::Whatsapp],
            BatchChannel::Both => vec![SendChannel::Email, SendChannel::Whatsapp],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendRecord {
    #[serde(flatten)]
    pub send: CampaignSend,
    pub click_url: String,
    pub open_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendBatchResult {
    pub created: usize,
    pub sends: Vec<SendRecord>,
}

#[derive(Clone)]
pub struct CampaignService {
    campaigns: Arc<dyn CampaignStore>,
    sends: Arc<dyn SendStore>,
    events: Arc<dyn EventLog>,
    customers: Arc<dyn CustomerDirectory>,
    cashback: CashbackService,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

// Token opaco de 32 hex: aleatório, sem nenhum id estrutural embutido.
fn mint_tracking_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        sends: Arc<dyn SendStore>,
        events: Arc<dyn EventLog>,
        customers: Arc<dyn CustomerDirectory>,
        cashback: CashbackService,
        mailer: Arc<dyn Mailer>,
        app_url: String,
    ) -> Self {
        Self {
            campaigns,
            sends,
            events,
            customers,
            cashback,
            mailer,
            app_url,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        self.campaigns.find_by_id(id).await
    }

    pub async fn list(&self, company_id: Option<Uuid>) -> Result<Vec<Campaign>, AppError> {
        self.campaigns.list(company_id).await
    }

    pub fn click_url(&self, tracking_id: &str) -> String {
        format!("{}/t/c/{}", self.app_url, tracking_id)
    }

    pub fn open_url(&self, tracking_id: &str) -> String {
        format!("{}/t/o/{}", self.app_url, tracking_id)
    }

    pub async fn send_campaign(
        &self,
        campaign_id: Uuid,
        channel: BatchChannel,
        customer_ids: &[Uuid],
    ) -> Result<SendBatchResult, AppError> {
        let campaign = self
            .campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or(AppError::CampaignNotFound)?;

        if campaign.is_expired(chrono::Utc::now()) {
            return Err(AppError::CampaignExpired);
        }

        let channels = channel.expand();
        let mut records = Vec::new();

        for &customer_id in customer_ids {
            // Política de lote: id que não resolve é pulado, o resto do
            // lote não falha por causa dele.
            let Some(customer) = self.customers.find_by_id(customer_id).await? else {
                tracing::warn!("Cliente {} não encontrado, pulando", customer_id);
                continue;
            };

            for &ch in &channels {
                let record = self
                    .dispatch_one(&campaign, &customer.email, customer_id, ch)
                    .await?;
                records.push(record);
            }
        }

        tracing::info!(
            "📨 Campanha {} despachada: {} envios",
            campaign.name,
            records.len()
        );
        Ok(SendBatchResult {
            created: records.len(),
            sends: records,
        })
    }

    async fn dispatch_one(
        &self,
        campaign: &Campaign,
        customer_email: &Option<String>,
        customer_id: Uuid,
        channel: SendChannel,
    ) -> Result<SendRecord, AppError> {
        let tracking_id = mint_tracking_id();
        let send = self
            .sends
            .create(NewSend {
                campaign_id: campaign.id,
                customer_id,
                channel,
                tracking_id: tracking_id.clone(),
            })
            .await?;

        let click_url = self.click_url(&tracking_id);
        let open_url = self.open_url(&tracking_id);

        // O envio em si financia a recompensa: crédito na carteira, com
        // vencimento na data final da campanha, mais o evento
        // `cashback_credit` que o agregador lê (o metadata carrega o valor).
        if campaign.kind.includes_cashback() {
            if let Some(amount) = campaign.cashback_value {
                if amount > Decimal::ZERO {
                    self.cashback
                        .credit(CreditInput {
                            customer_id,
                            campaign_id: campaign.id,
                            amount,
                            expires_at: campaign.end_date,
                            reference: Some(format!(
                                "Campanha {} - Envio {}",
                                campaign.name, tracking_id
                            )),
                        })
                        .await?;

                    self.events
                        .append(NewEvent {
                            campaign_id: campaign.id,
                            customer_id: Some(customer_id),
                            send_id: Some(send.id),
                            kind: EventType::CashbackCredit,
                            metadata: Some(json!({
                                "amount": amount,
                                "channel": channel.as_str(),
                            })),
                        })
                        .await?;
                }
            }
        }

        let mut status = send.status;
        match channel {
            SendChannel::Email => {
                if let Some(email) = customer_email {
                    let message = campaign
                        .message_template
                        .as_deref()
                        .unwrap_or("Confira nossa campanha!");
                    let html = build_campaign_email_html(
                        message,
                        &click_url,
                        &open_url,
                        campaign.image_url.as_deref(),
                    );
                    let outcome = self.mailer.send(email, &campaign.name, &html).await;
                    status = if outcome.success {
                        SendStatus::Sent
                    } else {
                        tracing::warn!(
                            "Falha de entrega para {}: {:?}",
                            customer_id,
                            outcome.error
                        );
                        SendStatus::Failed
                    };
                    self.sends.set_status(send.id, status).await?;
                }
                // Sem endereço de e-mail o registro permanece `pending`.
            }
            SendChannel::Whatsapp => {
                // Integração de WhatsApp é colaborador externo; marcamos enviado.
                status = SendStatus::Sent;
                self.sends.set_status(send.id, status).await?;
            }
        }

        Ok(SendRecord {
            send: CampaignSend { status, ..send },
            click_url,
            open_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::campaign::CampaignType;
    use crate::models::customer::EndCustomer;
    use crate::services::mailer::DeliveryOutcome;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    // Mailer de teste: falha sob demanda.
    #[derive(Default)]
    struct FakeMailer {
        fail: AtomicBool,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, _to: &str, _subject: &str, _html: &str) -> DeliveryOutcome {
            if self.fail.load(Ordering::SeqCst) {
                DeliveryOutcome::failed("smtp indisponível".into())
            } else {
                DeliveryOutcome::delivered("msg-1".into())
            }
        }
    }

    fn campaign(kind: CampaignType, cashback_value: Option<Decimal>) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Semana do cliente".into(),
            description: None,
            kind,
            discount_percent: None,
            cashback_value,
            start_date: None,
            end_date: Some(now + Duration::days(10)),
            active: true,
            total_coupons: 0,
            total_available: None,
            redeemed_coupons: 0,
            limit_per_customer: None,
            message_template: Some("Olá!".into()),
            image_url: None,
            landing_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(store: &MemoryStore, email: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        store.seed_customer(EndCustomer {
            id,
            company_id: Uuid::new_v4(),
            name: "Cliente".into(),
            email: email.map(str::to_string),
            created_at: Utc::now(),
        });
        id
    }

    fn setup(
        campaign: &Campaign,
        mailer: Arc<FakeMailer>,
    ) -> (CampaignService, CashbackService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.seed_campaign(campaign.clone());
        let cashback = CashbackService::new(store.clone(), store.clone());
        let svc = CampaignService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            cashback.clone(),
            mailer,
            "http://localhost:3000".into(),
        );
        (svc, cashback, store)
    }

    #[tokio::test]
    async fn lote_pula_cliente_inexistente_sem_falhar() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, store) = setup(&camp, Arc::new(FakeMailer::default()));
        let c1 = customer(&store, Some("a@exemplo.com"));
        let c2 = customer(&store, Some("b@exemplo.com"));
        let fantasma = Uuid::new_v4();

        let result = svc
            .send_campaign(camp.id, BatchChannel::Email, &[c1, fantasma, c2])
            .await
            .unwrap();
        assert_eq!(result.created, 2);
        assert_eq!(result.sends.len(), 2);
        for record in &result.sends {
            assert_eq!(record.send.status, SendStatus::Sent);
            assert!(record.click_url.contains(&record.send.tracking_id));
            assert!(record.open_url.contains(&record.send.tracking_id));
        }
    }

    #[tokio::test]
    async fn campanha_expirada_rejeita_o_lote() {
        let mut camp = campaign(CampaignType::Coupon, None);
        camp.end_date = Some(Utc::now() - Duration::days(1));
        let (svc, _, store) = setup(&camp, Arc::new(FakeMailer::default()));
        let c1 = customer(&store, Some("a@exemplo.com"));

        let err = svc
            .send_campaign(camp.id, BatchChannel::Email, &[c1])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CampaignExpired));
    }

    #[tokio::test]
    async fn canal_both_cria_um_envio_por_canal() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, store) = setup(&camp, Arc::new(FakeMailer::default()));
        let c1 = customer(&store, Some("a@exemplo.com"));

        let result = svc
            .send_campaign(camp.id, BatchChannel::Both, &[c1])
            .await
            .unwrap();
        assert_eq!(result.created, 2);
        let channels: Vec<_> = result.sends.iter().map(|r| r.send.channel).collect();
        assert!(channels.contains(&SendChannel::Email));
        assert!(channels.contains(&SendChannel::Whatsapp));

        // Tokens não se repetem entre canais.
        assert_ne!(result.sends[0].send.tracking_id, result.sends[1].send.tracking_id);
    }

    #[tokio::test]
    async fn cashback_e_creditado_no_envio_com_evento_correspondente() {
        let camp = campaign(CampaignType::Cashback, Some(dec("10.00")));
        let (svc, cashback, store) = setup(&camp, Arc::new(FakeMailer::default()));
        let c1 = customer(&store, Some("a@exemplo.com"));

        svc.send_campaign(camp.id, BatchChannel::Email, &[c1])
            .await
            .unwrap();

        // Lançamento no ledger...
        assert_eq!(cashback.available_balance(c1).await.unwrap(), dec("10.00"));
        let info = cashback.wallet_info(c1).await.unwrap();
        assert_eq!(info.transactions.len(), 1);
        assert_eq!(info.transactions[0].expires_at, camp.end_date);

        // ...e o evento que o agregador lê, com o valor no metadata.
        let events = EventLog::list(store.as_ref(), &[camp.id], EventType::CashbackCredit)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metadata.as_ref().unwrap()["amount"], 10.0);
    }

    #[tokio::test]
    async fn falha_de_entrega_marca_failed_e_o_lote_continua() {
        let camp = campaign(CampaignType::Coupon, None);
        let mailer = Arc::new(FakeMailer::default());
        mailer.fail.store(true, Ordering::SeqCst);
        let (svc, _, store) = setup(&camp, mailer);
        let c1 = customer(&store, Some("a@exemplo.com"));
        let c2 = customer(&store, Some("b@exemplo.com"));

        let result = svc
            .send_campaign(camp.id, BatchChannel::Email, &[c1, c2])
            .await
            .unwrap();
        assert_eq!(result.created, 2);
        for record in &result.sends {
            assert_eq!(record.send.status, SendStatus::Failed);
        }
    }

    #[tokio::test]
    async fn token_nao_embute_ids_estruturais() {
        let camp = campaign(CampaignType::Coupon, None);
        let (svc, _, store) = setup(&camp, Arc::new(FakeMailer::default()));
        let c1 = customer(&store, Some("a@exemplo.com"));

        let result = svc
            .send_campaign(camp.id, BatchChannel::Email, &[c1])
            .await
            .unwrap();
        let token = &result.sends[0].send.tracking_id;
        assert_eq!(token.len(), 32);
        assert!(!token.contains(&camp.id.simple().to_string()));
        assert!(!token.contains(&c1.simple().to_string()));
    }
}
