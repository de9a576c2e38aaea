//! Billing and customer-management API library
//!
//! Core functionality for the cobranca API: customer lookup, debt tracking
//! with derived status/amounts, boleto issuance and installment negotiation,
//! cancellation with debt restoration, JWT authentication and a checksummed
//! cache-aside layer.
//!
//! # Modules
//!
//! - `auth`: JWT issuance/validation and password hashing.
//! - `cache`: cache-aside helpers with integrity-checked entries.
//! - `config`: environment-driven configuration.
//! - `db`: connection pool and schema bootstrap.
//! - `domain`: status derivation, interest accrual, installment rules.
//! - `errors`: error taxonomy and HTTP mapping.
//! - `handlers`: HTTP request handlers and shared state.
//! - `models`: database rows and request/response DTOs.
//! - `services`: use cases (auth, lookups, negotiation, cancellation).
//! - `validation`: CPF and email validation.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod validation;
