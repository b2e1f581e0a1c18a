// src/services/metrics_service.rs
//
// Agregador: deriva contagens e taxas varrendo envios, eventos e
// atribuições. O retorno financeiro soma o `amount` do metadata dos eventos
// `cashback_credit` — mesmo contrato do despachante (ver CampaignService).

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::campaign::{EventType, SendChannel},
    store::{AssignmentStore, CampaignStore, EventLog, SendStore},
};

#[derive(Debug, Clone, Serialize)]
pub struct CampaignBreakdown {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub sends: i64,
    pub clicks: i64,
    pub redemptions: i64,
    pub financial_return: Decimal,
    pub click_rate: String,
    pub conversion_rate: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignMetrics {
    pub active_campaigns: i64,
    pub total_sends: i64,
    pub total_clicks: i64,
    pub total_redemptions: i64,
    pub financial_return: Decimal,
    pub click_rate: String,
    pub conversion_rate: String,
    pub campaigns: Vec<CampaignBreakdown>,
}

impl CampaignMetrics {
    fn empty() -> Self {
        Self {
            active_campaigns: 0,
            total_sends: 0,
            total_clicks: 0,
            total_redemptions: 0,
            financial_return: Decimal::ZERO,
            click_rate: "0.00%".into(),
            conversion_rate: "0.00%".into(),
            campaigns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeseriesPoint {
    pub date: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelBreakdown {
    pub email: i64,
    pub whatsapp: i64,
}

// Taxa como percentual com duas casas; denominador zero vira "0.00%".
fn format_rate(numerator: i64, denominator: i64) -> String {
    if denominator == 0 {
        return "0.00%".into();
    }
    format!("{:.2}%", (numerator as f64 / denominator as f64) * 100.0)
}

#[derive(Clone)]
pub struct MetricsService {
    campaigns: Arc<dyn CampaignStore>,
    sends: Arc<dyn SendStore>,
    events: Arc<dyn EventLog>,
    assignments: Arc<dyn AssignmentStore>,
}

impl MetricsService {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        sends: Arc<dyn SendStore>,
        events: Arc<dyn EventLog>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> Self {
        Self {
            campaigns,
            sends,
            events,
            assignments,
        }
    }

    /// Visão agregada + detalhamento por campanha. `company_id = None` é a
    /// visão cross-tenant do super admin.
    pub async fn campaign_metrics(
        &self,
        company_id: Option<Uuid>,
    ) -> Result<CampaignMetrics, AppError> {
        let campaigns = self.campaigns.list(company_id).await?;
        if campaigns.is_empty() {
            return Ok(CampaignMetrics::empty());
        }

        let now = Utc::now();
        let ids: Vec<Uuid> = campaigns.iter().map(|c| c.id).collect();
        let active_campaigns = campaigns.iter().filter(|c| c.is_active(now)).count() as i64;

        let total_sends = self.sends.count_sent(&ids).await?;
        let total_clicks = self.events.count(&ids, EventType::Click).await?;
        let total_redemptions = self.assignments.count_redeemed(&ids).await?;
        let financial_return = self.financial_return(&ids).await?;

        let mut breakdown = Vec::with_capacity(campaigns.len());
        for campaign in &campaigns {
            let scoped = [campaign.id];
            let sends = self.sends.count_sent(&scoped).await?;
            let clicks = self.events.count(&scoped, EventType::Click).await?;
            let redemptions = self.assignments.count_redeemed(&scoped).await?;
            breakdown.push(CampaignBreakdown {
                campaign_id: campaign.id,
                campaign_name: campaign.name.clone(),
                sends,
                clicks,
                redemptions,
                financial_return: self.financial_return(&scoped).await?,
                click_rate: format_rate(clicks, sends),
                conversion_rate: format_rate(redemptions, clicks),
                is_active: campaign.is_active(now),
            });
        }

        Ok(CampaignMetrics {
            active_campaigns,
            total_sends,
            total_clicks,
            total_redemptions,
            financial_return,
            click_rate: format_rate(total_clicks, total_sends),
            conversion_rate: format_rate(total_redemptions, total_clicks),
            campaigns: breakdown,
        })
    }

    // Soma o `amount` carregado no metadata dos eventos de crédito. Dupla
    // fonte de verdade conhecida (ledger vs. eventos), ver DESIGN.md.
    async fn financial_return(&self, campaign_ids: &[Uuid]) -> Result<Decimal, AppError> {
        let events = self
            .events
            .list(campaign_ids, EventType::CashbackCredit)
            .await?;
        let mut total = Decimal::ZERO;
        for event in events {
            if let Some(metadata) = event.metadata {
                if let Some(amount) = metadata.get("amount") {
                    if let Ok(amount) = serde_json::from_value::<Decimal>(amount.clone()) {
                        total += amount;
                    }
                }
            }
        }
        Ok(total)
    }

    /// Contagem diária de um tipo de evento nos últimos `days` dias
    /// (1..=90), com baldes zerados para dias sem eventos.
    pub async fn timeseries(
        &self,
        kind: EventType,
        days: i64,
    ) -> Result<Vec<TimeseriesPoint>, AppError> {
        let days = days.clamp(1, 90);
        let now = Utc::now();
        let start = (now - Duration::days(days - 1))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();

        let events = self.events.list_between(kind, start, now).await?;

        let mut points: Vec<TimeseriesPoint> = (0..days)
            .map(|i| TimeseriesPoint {
                date: (start + Duration::days(i)).format("%Y-%m-%d").to_string(),
                value: 0,
            })
            .collect();

        for event in events {
            let key = event.created_at.format("%Y-%m-%d").to_string();
            if let Some(point) = points.iter_mut().find(|p| p.date == key) {
                point.value += 1;
            }
        }
        Ok(points)
    }

    pub async fn channel_breakdown(&self) -> Result<ChannelBreakdown, AppError> {
        let mut breakdown = ChannelBreakdown {
            email: 0,
            whatsapp: 0,
        };
        for (channel, count) in self.sends.count_by_channel().await? {
            match channel {
                SendChannel::Email => breakdown.email = count,
                SendChannel::Whatsapp => breakdown.whatsapp = count,
            }
        }
        Ok(breakdown)
    }
}
