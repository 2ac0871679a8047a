//! Scoring, certification and usage-entitlement engine for the ESG self-assessment platform.
//!
//! The crate is organised around four areas:
//!
//! * [`catalog`] – the static pillar → theme → criteria → item question tree.
//! * [`assessment`] – diagnoses, responses, scoring, insights and action plans.
//! * [`billing`] – plans, subscriptions, entitlements and payment reconciliation.
//! * [`consultation`] – consultation scheduling backed by the hour budget.
//!
//! Storage and the payment provider are injected through traits; [`store::memory`] ships
//! in-memory implementations used by the API service and the tests.

pub mod assessment;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod consultation;
pub mod error;
pub mod http;
pub mod report;
pub mod store;
pub mod telemetry;
