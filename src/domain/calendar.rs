//! Unified trading calendar and rebalancing schedule.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

use crate::domain::market_data::MarketData;

/// Every date on which at least one of `symbols` traded, inside
/// `[start, end]`, ascending.
pub fn build_unified_timeline<'a>(
    data: &MarketData,
    symbols: impl IntoIterator<Item = &'a String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = symbols
        .into_iter()
        .filter_map(|symbol| data.series(symbol))
        .flat_map(|series| series.points().iter().map(|p| p.date))
        .filter(|date| *date >= start && *date <= end)
        .collect();
    unique_dates.into_iter().collect()
}

/// Calendar dates at indices 0, k, 2k, ... for a `k`-trading-day interval.
pub fn rebalance_dates(calendar: &[NaiveDate], interval: usize) -> HashSet<NaiveDate> {
    calendar.iter().step_by(interval.max(1)).copied().collect()
}
