// src/services/tracking_service.rs
//
// Recepção dos hits de pixel e de clique, chaveados só pelo token opaco.
// Política fail-open: o navegador do cliente final nunca vê erro — pixel
// sempre volta, clique sempre redireciona para algum lugar.

use std::sync::Arc;

use serde_json::json;

use crate::{
    common::error::AppError,
    models::campaign::EventType,
    store::{CampaignStore, EventLog, NewEvent, SendStore},
};

#[derive(Clone)]
pub struct TrackingService {
    sends: Arc<dyn SendStore>,
    campaigns: Arc<dyn CampaignStore>,
    events: Arc<dyn EventLog>,
    default_landing_url: String,
}

impl TrackingService {
    pub fn new(
        sends: Arc<dyn SendStore>,
        campaigns: Arc<dyn CampaignStore>,
        events: Arc<dyn EventLog>,
        default_landing_url: String,
    ) -> Self {
        Self {
            sends,
            campaigns,
            events,
            default_landing_url,
        }
    }

    pub fn default_landing_url(&self) -> &str {
        &self.default_landing_url
    }

    /// Registra uma abertura. Cada hit gera um evento novo — aberturas do
    /// mesmo token não são deduplicadas; as taxas contam eventos, não
    /// destinatários únicos. Token desconhecido não é erro.
    pub async fn record_open(&self, tracking_id: &str) -> Result<(), AppError> {
        let Some(send) = self.sends.find_by_tracking_id(tracking_id).await? else {
            tracing::debug!("Pixel com token desconhecido: {}", tracking_id);
            return Ok(());
        };

        self.events
            .append(NewEvent {
                campaign_id: send.campaign_id,
                customer_id: Some(send.customer_id),
                send_id: Some(send.id),
                kind: EventType::Open,
                metadata: Some(json!({ "channel": send.channel.as_str() })),
            })
            .await?;
        Ok(())
    }

    /// Registra um clique e resolve o destino do redirect: landing da
    /// campanha quando houver, senão a URL padrão. Token desconhecido
    /// redireciona para a padrão do mesmo jeito.
    pub async fn record_click(&self, tracking_id: &str) -> Result<String, AppError> {
        let Some(send) = self.sends.find_by_tracking_id(tracking_id).await? else {
            return Ok(self.default_landing_url.clone());
        };

        self.events
            .append(NewEvent {
                campaign_id: send.campaign_id,
                customer_id: Some(send.customer_id),
                send_id: Some(send.id),
                kind: EventType::Click,
                metadata: Some(json!({ "channel": send.channel.as_str() })),
            })
            .await?;

        let campaign = self.campaigns.find_by_id(send.campaign_id).await?;
        Ok(campaign
            .and_then(|c| c.landing_url)
            .unwrap_or_else(|| self.default_landing_url.clone()))
    }
}
