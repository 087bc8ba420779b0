#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use valmo::domain::error::ValmoError;
use valmo::domain::fundamental::FundamentalSnapshot;
use valmo::domain::indicator::IndicatorKind;
pub use valmo::domain::ohlcv::{PricePoint, PriceSeries};
use valmo::domain::strategy::{RebalanceFrequency, StrategyConfig};
use valmo::ports::data_port::DataPort;

pub struct MockDataPort {
    pub series: HashMap<String, Vec<PricePoint>>,
    pub fundamentals: HashMap<String, Vec<FundamentalSnapshot>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            fundamentals: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_points(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.series.insert(symbol.to_string(), points);
        self
    }

    pub fn with_snapshot(mut self, snapshot: FundamentalSnapshot) -> Self {
        self.fundamentals
            .entry(snapshot.symbol.clone())
            .or_default()
            .push(snapshot);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, ValmoError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ValmoError::Data {
                reason: reason.clone(),
            });
        }
        PriceSeries::new(symbol, self.series.get(symbol).cloned().unwrap_or_default())
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<Vec<FundamentalSnapshot>, ValmoError> {
        Ok(self.fundamentals.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ValmoError> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive calendar days starting 2024-01-01.
pub fn day(n: u32) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(n as i64)
}

/// A bar with open, high, low and close all at `close`.
pub fn flat_point(date: NaiveDate, close: f64) -> PricePoint {
    PricePoint {
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 10_000,
    }
}

pub fn make_point(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> PricePoint {
    PricePoint {
        date,
        open,
        high,
        low,
        close,
        volume: 10_000,
    }
}

/// Flat bars on consecutive days from 2024-01-01, one per close.
pub fn points_from_closes(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat_point(day(i as u32), c))
        .collect()
}

pub fn make_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(symbol, points_from_closes(closes)).unwrap()
}

pub fn make_strategy(
    name: &str,
    symbols: &[&str],
    weights: &[(IndicatorKind, f64)],
    frequency: RebalanceFrequency,
    top_n: usize,
    stop_loss: f64,
    target: f64,
) -> StrategyConfig {
    StrategyConfig::new(
        name,
        symbols.iter().map(|s| s.to_string()),
        weights.iter().copied().collect::<BTreeMap<_, _>>(),
        frequency,
        top_n,
        stop_loss,
        target,
    )
    .unwrap()
}

/// Ranks purely on distance from the trailing high, which needs no warm-up.
pub fn near_high_strategy(symbols: &[&str], frequency: RebalanceFrequency, top_n: usize) -> StrategyConfig {
    make_strategy(
        "near_high",
        symbols,
        &[(IndicatorKind::PctFromHigh, 1.0)],
        frequency,
        top_n,
        0.5,
        1.0,
    )
}

pub fn snapshot(symbol: &str, as_of: NaiveDate, pe: f64, sector_pe: f64) -> FundamentalSnapshot {
    let mut s = FundamentalSnapshot::empty(symbol, as_of);
    s.pe_ratio = Some(pe);
    s.sector.pe_ratio = Some(sector_pe);
    s
}
