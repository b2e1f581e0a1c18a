// src/models/mod.rs

pub mod campaign;
pub mod cashback;
pub mod coupon;
pub mod customer;
