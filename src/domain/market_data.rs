//! Frozen market data bundle handed to the ranking and backtesting core.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::domain::fundamental::FundamentalSnapshot;
use crate::domain::ohlcv::PriceSeries;
use crate::ports::data_port::DataPort;

/// Price series by symbol plus date-ordered fundamental snapshots.
///
/// Read-only once built; every lookup takes an `as_of` date and never
/// returns anything dated after it.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: BTreeMap<String, PriceSeries>,
    fundamentals: BTreeMap<String, Vec<FundamentalSnapshot>>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_series(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    /// Add a snapshot, keeping the symbol's list ordered by `as_of_date`.
    /// A snapshot for an existing date replaces the old one.
    pub fn insert_snapshot(&mut self, snapshot: FundamentalSnapshot) {
        let list = self.fundamentals.entry(snapshot.symbol.clone()).or_default();
        match list.binary_search_by_key(&snapshot.as_of_date, |s| s.as_of_date) {
            Ok(i) => list[i] = snapshot,
            Err(i) => list.insert(i, snapshot),
        }
    }

    pub fn series(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn snapshots(&self, symbol: &str) -> &[FundamentalSnapshot] {
        self.fundamentals
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Latest snapshot published on or before `date`.
    pub fn fundamentals_as_of(&self, symbol: &str, date: NaiveDate) -> Option<&FundamentalSnapshot> {
        let list = self.snapshots(symbol);
        let end = list.partition_point(|s| s.as_of_date <= date);
        end.checked_sub(1).map(|i| &list[i])
    }
}

/// Fetch series and fundamentals for `symbols`. A symbol whose prices fail
/// to load is left out with a warning; a failed fundamentals load leaves the
/// symbol price-only.
pub fn load_market_data(port: &dyn DataPort, symbols: &[String]) -> MarketData {
    let mut data = MarketData::new();

    for symbol in symbols {
        match port.fetch_series(symbol) {
            Ok(series) if series.is_empty() => {
                warn!(%symbol, "skipping: no price data found");
                continue;
            }
            Ok(series) => data.insert_series(series),
            Err(e) => {
                warn!(%symbol, error = %e, "skipping: failed to load prices");
                continue;
            }
        }

        match port.fetch_fundamentals(symbol) {
            Ok(snapshots) => snapshots.into_iter().for_each(|s| data.insert_snapshot(s)),
            Err(e) => warn!(%symbol, error = %e, "failed to load fundamentals"),
        }
    }

    info!(
        loaded = data.series_count(),
        requested = symbols.len(),
        "market data loaded"
    );
    data
}
