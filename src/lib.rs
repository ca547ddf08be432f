//! FlavorApp monetization core
//!
//! Subscription tiers, ad rewards and referral credits for the FlavorApp
//! recipe and meal-planning backend.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
