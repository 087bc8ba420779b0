//! Core domain types and logic.

pub mod ohlcv;
pub mod fundamental;
pub mod market_data;
pub mod calendar;
pub mod indicator;
pub mod strategy;
pub mod scoring;
pub mod ranker;
pub mod universe;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod period_returns;
pub mod config_validation;
pub mod error;
