//! Core domain types and logic.

pub mod asset;
pub mod price;
pub mod returns;
pub mod weights;
pub mod portfolio;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
