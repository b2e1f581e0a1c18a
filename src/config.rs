// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    services::{
        campaign_service::CampaignService,
        cashback_service::CashbackService,
        coupon_service::CouponService,
        mailer::{LogMailer, Mailer},
        metrics_service::MetricsService,
        tracking_service::TrackingService,
    },
    store::{CustomerDirectory, StoreBundle},
};

// Configuração explícita, lida uma única vez do ambiente e passada na
// construção dos serviços. Nada de estado global de módulo.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub default_landing_url: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL deve ser definida"))?;

        Ok(Self {
            database_url,
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            default_landing_url: env::var("DEFAULT_LANDING_URL")
                .unwrap_or_else(|_| "https://example.com".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub campaign_service: CampaignService,
    pub coupon_service: CouponService,
    pub cashback_service: CashbackService,
    pub tracking_service: TrackingService,
    pub metrics_service: MetricsService,
    pub customers: Arc<dyn CustomerDirectory>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let stores = StoreBundle::postgres(&db_pool);
        Ok(Self::assemble(config, db_pool, stores, Arc::new(LogMailer)))
    }

    // --- Monta o gráfico de dependências ---
    // Separado de `new` para os testes montarem o mesmo estado sobre o
    // store em memória (a pool fica lazy e nunca é tocada).
    pub fn assemble(
        config: Config,
        db_pool: PgPool,
        stores: StoreBundle,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let cashback_service = CashbackService::new(stores.wallets.clone(), stores.ledger.clone());
        let coupon_service = CouponService::new(
            stores.coupons.clone(),
            stores.assignments.clone(),
            stores.campaigns.clone(),
            stores.events.clone(),
            cashback_service.clone(),
        );
        let campaign_service = CampaignService::new(
            stores.campaigns.clone(),
            stores.sends.clone(),
            stores.events.clone(),
            stores.customers.clone(),
            cashback_service.clone(),
            mailer,
            config.app_url.clone(),
        );
        let tracking_service = TrackingService::new(
            stores.sends.clone(),
            stores.campaigns.clone(),
            stores.events.clone(),
            config.default_landing_url.clone(),
        );
        let metrics_service = MetricsService::new(
            stores.campaigns,
            stores.sends,
            stores.events,
            stores.assignments,
        );

        Self {
            db_pool,
            config,
            campaign_service,
            coupon_service,
            cashback_service,
            tracking_service,
            metrics_service,
            customers: stores.customers,
        }
    }
}
