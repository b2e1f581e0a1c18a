// src/lib.rs

pub mod common;
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::AppState;

// Monta o router completo da aplicação sobre um estado já construído.
pub fn build_router(app_state: AppState) -> Router {
    let campaign_routes = Router::new()
        .route(
            "/",
            get(handlers::campaigns::list_campaigns),
        )
        .route("/{id}", get(handlers::campaigns::get_campaign))
        .route("/{id}/send", post(handlers::campaigns::send_campaign));

    let coupon_routes = Router::new()
        .route("/", get(handlers::coupons::list_coupons))
        .route("/generate", post(handlers::coupons::generate_coupons))
        .route("/redeem", post(handlers::coupons::redeem_coupon))
        .route("/assign", post(handlers::coupons::assign_coupon));

    let metrics_routes = Router::new()
        .route("/", get(handlers::metrics::overview))
        .route("/timeseries", get(handlers::metrics::timeseries))
        .route("/channel", get(handlers::metrics::channel_breakdown));

    // Rotas públicas de rastreio: sem autenticação, chaveadas pelo token.
    let tracking_routes = Router::new()
        .route("/o/{token}", get(handlers::tracking::open_pixel))
        .route("/c/{token}", get(handlers::tracking::click_redirect));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/campaigns", campaign_routes)
        .nest("/api/coupons", coupon_routes)
        .nest("/api/metrics", metrics_routes)
        .route(
            "/api/customers/{id}/wallet",
            get(handlers::cashback::wallet_info),
        )
        .nest("/t", tracking_routes)
        .with_state(app_state)
}
