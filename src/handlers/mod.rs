// src/handlers/mod.rs

pub mod campaigns;
pub mod cashback;
pub mod coupons;
pub mod metrics;
pub mod tracking;
