//! Concrete adapter implementations for ports.

pub mod chart_html;
pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
