//! Volume-adjusted momentum.
//!
//! RV[i]  = mean(V[i-4..=i]) / mean(V[i-19..=i])   (1.0 when the 20-day mean is 0)
//! PMI[i] = RETURN(21)[i] * RV[i]
//!
//! A 1-month move on rising participation scores above the raw return, the
//! same move on fading volume scores below it.

use chrono::NaiveDate;

use super::momentum::{self, ONE_MONTH};
use crate::domain::error::ValmoError;
use crate::domain::ohlcv::PriceSeries;

pub const RECENT_VOLUME_WINDOW: usize = 5;
pub const BASE_VOLUME_WINDOW: usize = 20;

pub fn relative_volume(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let i = momentum::require_preceding(series, as_of, BASE_VOLUME_WINDOW - 1, "relative_volume")?;
    let points = series.points();

    let mean = |window: usize| -> f64 {
        points[i + 1 - window..=i]
            .iter()
            .map(|p| p.volume as f64)
            .sum::<f64>()
            / window as f64
    };

    let base = mean(BASE_VOLUME_WINDOW);
    if base == 0.0 {
        return Ok(1.0);
    }
    Ok(mean(RECENT_VOLUME_WINDOW) / base)
}

pub fn price_movement_index(series: &PriceSeries, as_of: NaiveDate) -> Result<f64, ValmoError> {
    let ret = momentum::return_pct(series, ONE_MONTH, as_of).map_err(|e| match e {
        ValmoError::InsufficientData {
            symbol, have, need, ..
        } => ValmoError::InsufficientData {
            symbol,
            indicator: "pmi".to_string(),
            have,
            need,
        },
        other => other,
    })?;
    Ok(ret * relative_volume(series, as_of)?)
}
