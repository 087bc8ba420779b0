//! Moving-average trend alignment.
//!
//! SMA(n)[i]  = mean(C[i-n+1..=i])
//! TREND[i]   = share of {SMA(50), SMA(200)} that C[i] closes above
//!
//! TREND is 0, 0.5 or 1. It needs 200 points up to `as_of`.

use chrono::NaiveDate;

use crate::domain::error::ValmoError;
use crate::domain::indicator::momentum::{rename, require_preceding};
use crate::domain::ohlcv::PriceSeries;

pub const SHORT_TREND_WINDOW: usize = 50;
pub const LONG_TREND_WINDOW: usize = 200;

/// Simple moving average of the close over `window` points ending at `as_of`.
pub fn sma(series: &PriceSeries, window: usize, as_of: NaiveDate) -> Result<f64, ValmoError> {
    if window == 0 {
        return Err(ValmoError::Data {
            reason: "sma window must be positive".into(),
        });
    }
    let i = require_preceding(series, as_of, window - 1, "sma")?;
    let points = &series.points()[i + 1 - window..=i];
    Ok(points.iter().map(|p| p.close).sum::<f64>() / window as f64)
}

pub fn trend_alignment(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let long = sma(series, LONG_TREND_WINDOW, as_of).map_err(|e| rename(e, "trend"))?;
    let short = sma(series, SHORT_TREND_WINDOW, as_of)?;
    let i = require_preceding(series, as_of, 0, "trend")?;
    let close = series.points()[i].close;

    let above = [short, long].iter().filter(|&&avg| close > avg).count();
    Ok(above as f64 / 2.0)
}
