//! Core domain types and logic. Nothing in here performs I/O.

pub mod price_table;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod allocator;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod window;
pub mod sweep;
pub mod config_validation;
pub mod error;
