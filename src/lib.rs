//! Invoice Audit Service
//!
//! This library provides the core functionality of the invoice-audit
//! system: an orchestration service that extracts structured billing data
//! from document images through a pool of external vision AI providers and
//! reconciles each reported total against a locally recomputed sum.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
