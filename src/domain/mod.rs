//! Core domain types and logic.

pub mod error;
pub mod price;
pub mod indicator;
pub mod signal;
pub mod position;
pub mod backtest;
pub mod portfolio;
pub mod metrics;
pub mod registry;
pub mod comparison;
pub mod config;
pub mod config_validation;
