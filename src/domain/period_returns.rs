//! Trailing returns of a pick list over fixed look-back periods.
//!
//! For each period the average is taken over the symbols with enough
//! history; periods no symbol can cover are left out.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::indicator::momentum::return_pct;
use crate::domain::market_data::MarketData;

/// Period label and length in trading days.
pub const PERIODS: [(&str, usize); 4] = [("1M", 21), ("3M", 63), ("6M", 126), ("1Y", 252)];

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PeriodReturn {
    pub period: &'static str,
    pub days: usize,
    /// Symbols with enough history for this period.
    pub symbols: usize,
    /// Mean trailing return in percent points.
    pub avg_return_pct: f64,
}

pub fn trailing_returns<S: AsRef<str>>(
    data: &MarketData,
    symbols: &[S],
    as_of: NaiveDate,
) -> Vec<PeriodReturn> {
    PERIODS
        .iter()
        .filter_map(|&(period, days)| {
            let returns: Vec<f64> = symbols
                .iter()
                .filter_map(|symbol| {
                    let series = data.series(symbol.as_ref())?;
                    return_pct(series, days, as_of).ok()
                })
                .collect();
            if returns.is_empty() {
                debug!(period, %as_of, "no symbol covers period");
                return None;
            }
            Some(PeriodReturn {
                period,
                days,
                symbols: returns.len(),
                avg_return_pct: returns.iter().sum::<f64>() / returns.len() as f64,
            })
        })
        .collect()
}
