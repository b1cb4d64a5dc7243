//! Core of the drug-usage billing dashboard.
//!
//! A [`ComparisonSession`](state::ComparisonSession) holds one shared
//! [`RecordStore`](data::model::RecordStore) and any number of independently
//! filtered tables, each producing per-item totals and a quantity-weighted
//! median unit price.

pub mod config;
pub mod data;
pub mod report;
pub mod state;
