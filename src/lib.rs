//! Atelier - visitor & subscription analytics for the maison's marketing site
//!
//! This library provides the analytics backbone behind the brand's
//! marketing pages: tracking ingest, IP geolocation enrichment, visitor
//! accumulation, lead notifications and the admin reporting API.
//!
//! # Architecture
//! - `analytics`: event model, per-page-session collector, entry classification
//! - `api`: HTTP services and middleware
//! - `services`: geoip resolution, visitor upsert, notifications, reporting
//! - `storage`: SeaORM backend and per-table write paths
//! - `config`: environment-driven configuration, resolved once at startup
//! - `system`: logging initialization
//! - `utils`: IP extraction, user-agent parsing

pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
