// tests/campaign_flow.rs
//
// Cenário ponta a ponta sobre o router real com o store em memória:
// envio com crédito de cashback, rastreio de abertura/clique e resgate
// com débito — tudo pelo contrato HTTP.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use campanha_core::{
    build_router,
    config::{AppState, Config},
    models::{
        campaign::{Campaign, CampaignType},
        customer::EndCustomer,
    },
    services::mailer::LogMailer,
    store::{memory::MemoryStore, StoreBundle},
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/ignorada".into(),
        app_url: "http://localhost:3000".into(),
        default_landing_url: "https://exemplo.com/padrao".into(),
        bind_addr: "127.0.0.1:0".into(),
    }
}

fn seed_campaign(store: &MemoryStore) -> Campaign {
    let now = Utc::now();
    let campaign = Campaign {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        name: "Cashback de agosto".into(),
        description: None,
        kind: CampaignType::Cashback,
        discount_percent: None,
        cashback_value: Some("10.00".parse().unwrap()),
        start_date: None,
        end_date: Some(now + Duration::days(30)),
        active: true,
        total_coupons: 0,
        total_available: None,
        redeemed_coupons: 0,
        limit_per_customer: None,
        message_template: Some("Você ganhou cashback!".into()),
        image_url: None,
        landing_url: Some("https://loja.exemplo.com/promo".into()),
        created_at: now,
        updated_at: now,
    };
    store.seed_campaign(campaign.clone());
    campaign
}

fn seed_customer(store: &MemoryStore, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    store.seed_customer(EndCustomer {
        id,
        company_id: Uuid::new_v4(),
        name: "Cliente".into(),
        email: Some(email.into()),
        created_at: Utc::now(),
    });
    id
}

fn app(store: Arc<MemoryStore>) -> Router {
    // A pool lazy nunca é tocada: todos os stores são de memória.
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/ignorada")
        .unwrap();
    let state = AppState::assemble(
        test_config(),
        pool,
        StoreBundle::in_memory(store),
        Arc::new(LogMailer),
    );
    build_router(state)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value, Option<String>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, location)
}

async fn post(router: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn fluxo_completo_de_campanha_de_cashback() {
    let store = Arc::new(MemoryStore::new());
    let campaign = seed_campaign(&store);
    let c1 = seed_customer(&store, "c1@exemplo.com");
    let c2 = seed_customer(&store, "c2@exemplo.com");
    let fantasma = Uuid::new_v4();
    let router = app(store);

    // --- Envio: 3 ids, 1 não resolve => created = 2, não erro ---
    let (status, body) = post(
        &router,
        &format!("/api/campaigns/{}/send", campaign.id),
        json!({ "channel": "email", "customer_ids": [c1, fantasma, c2] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], 2);
    let token = body["sends"][0]["tracking_id"].as_str().unwrap().to_string();
    assert!(body["sends"][0]["click_url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/t/c/{token}")));

    // --- O envio creditou 10.00 na carteira do destinatário ---
    let (status, wallet, _) = get(&router, &format!("/api/customers/{c1}/wallet")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet["available_balance"], 10.0);
    assert_eq!(wallet["transactions"].as_array().unwrap().len(), 1);

    // Cliente desconhecido no endpoint de carteira é 404 de verdade.
    let (status, _, _) = get(&router, &format!("/api/customers/{fantasma}/wallet")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // --- Pixel: toda abertura conta, token inválido também responde ---
    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/t/o/{token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/gif"
        );
        assert!(response
            .headers()
            .get(header::CACHE_CONTROL)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("no-store"));
    }
    let (status, _, _) = get(&router, "/t/o/token-que-nao-existe").await;
    assert_eq!(status, StatusCode::OK);

    // --- Clique: redirect para a landing da campanha; desconhecido cai no padrão ---
    let (status, _, location) = get(&router, &format!("/t/c/{token}")).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location.as_deref(), Some("https://loja.exemplo.com/promo"));

    let (status, _, location) = get(&router, "/t/c/token-que-nao-existe").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location.as_deref(), Some("https://exemplo.com/padrao"));

    // --- Resgate de cupom do pool: cobra o cashback de c1 ---
    let (status, coupons) = post(
        &router,
        "/api/coupons/generate",
        json!({ "campaign_id": campaign.id, "count": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = coupons[0]["code"].as_str().unwrap().to_string();

    let (status, coupon) = post(
        &router,
        "/api/coupons/redeem",
        json!({ "code": code, "redeemed_by": "loja-centro", "customer_id": c1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(coupon["is_redeemed"], true);

    // O débito de 10.00 zerou o saldo disponível.
    let (_, wallet, _) = get(&router, &format!("/api/customers/{c1}/wallet")).await;
    assert_eq!(wallet["available_balance"], 0.0);

    // Segundo resgate do mesmo código: 409 com motivo estável.
    let (status, body) = post(
        &router,
        "/api/coupons/redeem",
        json!({ "code": code, "redeemed_by": "loja-norte", "customer_id": c1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "coupon_already_redeemed");

    // --- Resgate atribuído: c2 tem um cupom próprio com limite de uso ---
    let (status, assignment) = post(
        &router,
        "/api/coupons/assign",
        json!({ "campaign_id": campaign.id, "customer_id": c2 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let assigned_code = assignment["coupon_code"].as_str().unwrap().to_string();

    let (status, _) = post(
        &router,
        "/api/coupons/redeem",
        json!({ "code": assigned_code, "redeemed_by": "loja-norte", "customer_id": c2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, wallet, _) = get(&router, &format!("/api/customers/{c2}/wallet")).await;
    assert_eq!(wallet["available_balance"], 0.0);

    // --- Métricas agregadas enxergam tudo isso ---
    let (status, metrics, _) = get(&router, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["active_campaigns"], 1);
    assert_eq!(metrics["total_sends"], 2);
    assert_eq!(metrics["total_clicks"], 1);
    assert_eq!(metrics["total_redemptions"], 1);
    // 2 envios com crédito de 10.00 cada.
    assert_eq!(metrics["financial_return"], 20.0);
    assert_eq!(metrics["click_rate"], "50.00%");
    assert_eq!(metrics["conversion_rate"], "100.00%");

    let (status, series, _) = get(&router, "/api/metrics/timeseries?metric=open&days=7").await;
    assert_eq!(status, StatusCode::OK);
    let series = series.as_array().unwrap();
    assert_eq!(series.len(), 7);
    assert_eq!(series[6]["value"], 3);

    let (status, channels, _) = get(&router, "/api/metrics/channel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(channels["email"], 2);
}

#[tokio::test]
async fn cupom_inexistente_e_payload_invalido() {
    let store = Arc::new(MemoryStore::new());
    seed_campaign(&store);
    let router = app(store);

    let (status, body) = post(
        &router,
        "/api/coupons/redeem",
        json!({ "code": "NAOEXISTE", "redeemed_by": "loja" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "coupon_not_found");

    // Lote sem destinatário é barrado pela validação.
    let (status, body) = post(
        &router,
        &format!("/api/campaigns/{}/send", Uuid::new_v4()),
        json!({ "channel": "email", "customer_ids": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn campanha_expirada_rejeita_envio_pelo_http() {
    let store = Arc::new(MemoryStore::new());
    let mut campaign = seed_campaign(&store);
    campaign.end_date = Some(Utc::now() - Duration::days(1));
    campaign.id = Uuid::new_v4();
    store.seed_campaign(campaign.clone());
    let c1 = seed_customer(&store, "c1@exemplo.com");
    let router = app(store);

    let (status, body) = post(
        &router,
        &format!("/api/campaigns/{}/send", campaign.id),
        json!({ "channel": "email", "customer_ids": [c1] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "campaign_expired");
}
