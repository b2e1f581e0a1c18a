// src/services/mod.rs

pub mod campaign_service;
pub mod cashback_service;
pub mod coupon_service;
pub mod mailer;
pub mod metrics_service;
pub mod tracking_service;
