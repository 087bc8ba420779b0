//! Price momentum indicators.
//!
//! RETURN(n)[i]   = ((C[i] - C[i-n]) / C[i-n]) * 100       (percent points)
//! PFH[i]         = (C[i] - max(C[i-251..=i])) / max(...)   (fraction, <= 0)
//! MOM_1M[i]      = RETURN(21)[i]  - 500  * |PFH[i]|
//! MOM_12M[i]     = RETURN(252)[i] - 2000 * |PFH[i]|
//! CMI[i]         = MOM_1M[i] + MOM_12M[i]
//!
//! `i` is the last point dated on or before `as_of`. RETURN(n) needs at
//! least n points before `i`.

use chrono::NaiveDate;

use crate::domain::error::ValmoError;
use crate::domain::ohlcv::PriceSeries;

pub const ONE_MONTH: usize = 21;
pub const TWELVE_MONTHS: usize = 252;
pub const HIGH_WINDOW: usize = 252;

const ONE_MONTH_HIGH_PENALTY: f64 = 500.0;
const TWELVE_MONTH_HIGH_PENALTY: f64 = 2000.0;

/// Index of the `as_of` point, provided at least `preceding` points come before it.
pub(crate) fn require_preceding(
    series: &PriceSeries,
    as_of: NaiveDate,
    preceding: usize,
    indicator: &str,
) -> Result<usize, ValmoError> {
    match series.index_at(as_of) {
        Some(i) if i >= preceding => Ok(i),
        idx => Err(ValmoError::InsufficientData {
            symbol: series.symbol().to_string(),
            indicator: indicator.to_string(),
            have: idx.unwrap_or(0),
            need: preceding,
        }),
    }
}

/// Percent change of the close over `lookback` trading days ending at `as_of`.
pub fn return_pct(series: &PriceSeries, lookback: usize, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let i = require_preceding(series, as_of, lookback, "return_pct")?;
    let points = series.points();
    let base = points[i - lookback].close;
    if base == 0.0 {
        return Ok(0.0);
    }
    Ok(((points[i].close - base) / base) * 100.0)
}

/// Distance of the `as_of` close below the trailing 252-day closing high.
pub fn pct_from_high(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let i = require_preceding(series, as_of, 0, "pct_from_high")?;
    let points = series.points();
    let start = (i + 1).saturating_sub(HIGH_WINDOW);
    let high = points[start..=i]
        .iter()
        .map(|p| p.close)
        .fold(f64::NEG_INFINITY, f64::max);

    if high <= 0.0 {
        return Ok(0.0);
    }
    Ok((points[i].close - high) / high)
}

pub fn momentum_1m(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let ret = return_pct(series, ONE_MONTH, as_of).map_err(|e| rename(e, "momentum_1m"))?;
    let pfh = pct_from_high(series, as_of)?;
    Ok(ret - ONE_MONTH_HIGH_PENALTY * pfh.abs())
}

pub fn momentum_12m(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let ret = return_pct(series, TWELVE_MONTHS, as_of).map_err(|e| rename(e, "momentum_12m"))?;
    let pfh = pct_from_high(series, as_of)?;
    Ok(ret - TWELVE_MONTH_HIGH_PENALTY * pfh.abs())
}

pub fn cumulative_momentum_index(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let m12 = momentum_12m(series, as_of).map_err(|e| rename(e, "cmi"))?;
    let m1 = momentum_1m(series, as_of)?;
    Ok(m1 + m12)
}

pub(crate) fn rename(err: ValmoError, name: &str) -> ValmoError {
    match err {
        ValmoError::InsufficientData {
            symbol, have, need, ..
        } => ValmoError::InsufficientData {
            symbol,
            indicator: name.to_string(),
            have,
            need,
        },
        other => other,
    }
}
