//! Composite scoring of a single symbol.
//!
//! COMPOSITE = sum(w_k * N_k) / sum(w_k)   over the available indicators k
//!
//! `N_k` is the normalized sub-indicator in [-1, 1]. Fundamental indicators
//! are unavailable when the symbol has no snapshot as of the scoring date;
//! they are recorded as 0 and their weight drops out of the denominator.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::ValmoError;
use crate::domain::fundamental::FundamentalSnapshot;
use crate::domain::indicator::{self, Category, IndicatorKind};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::strategy::StrategyConfig;

/// A scored symbol with its trade levels. Immutable; ranking produces a
/// new value via [`ScoredPick::ranked`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPick {
    symbol: String,
    strategy_name: String,
    as_of_date: NaiveDate,
    composite_score: f64,
    component_scores: BTreeMap<IndicatorKind, f64>,
    entry_price: f64,
    stop_loss_price: f64,
    target_price: f64,
    rank: usize,
}

impl ScoredPick {
    /// An unranked pick entered at `entry_price` with the strategy's
    /// stop-loss and target levels.
    pub fn new(
        symbol: impl Into<String>,
        config: &StrategyConfig,
        as_of_date: NaiveDate,
        composite_score: f64,
        component_scores: BTreeMap<IndicatorKind, f64>,
        entry_price: f64,
    ) -> Self {
        ScoredPick {
            symbol: symbol.into(),
            strategy_name: config.name().to_string(),
            as_of_date,
            composite_score,
            component_scores,
            entry_price,
            stop_loss_price: entry_price * (1.0 - config.stop_loss_pct()),
            target_price: entry_price * (1.0 + config.target_pct()),
            rank: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    pub fn as_of_date(&self) -> NaiveDate {
        self.as_of_date
    }

    pub fn composite_score(&self) -> f64 {
        self.composite_score
    }

    pub fn component_scores(&self) -> &BTreeMap<IndicatorKind, f64> {
        &self.component_scores
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn stop_loss_price(&self) -> f64 {
        self.stop_loss_price
    }

    pub fn target_price(&self) -> f64 {
        self.target_price
    }

    /// 1-based rank; 0 until the pick has been through the ranker.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn ranked(self, rank: usize) -> Self {
        ScoredPick { rank, ..self }
    }

    pub fn rating(&self) -> Rating {
        Rating::from_score(self.composite_score)
    }
}

/// Coarse recommendation bucket for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rating {
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl Rating {
    pub fn from_score(composite: f64) -> Self {
        if composite >= 0.6 {
            Rating::StrongBuy
        } else if composite >= 0.2 {
            Rating::Buy
        } else if composite >= -0.2 {
            Rating::Hold
        } else {
            Rating::Sell
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rating::StrongBuy => "STRONG_BUY",
            Rating::Buy => "BUY",
            Rating::Hold => "HOLD",
            Rating::Sell => "SELL",
        };
        f.write_str(s)
    }
}

pub fn score(
    symbol: &str,
    series: &PriceSeries,
    snapshot: Option<&FundamentalSnapshot>,
    as_of: NaiveDate,
    config: &StrategyConfig,
) -> Result<ScoredPick, ValmoError> {
    // A symbol that did not trade on `as_of` is not scored from stale bars.
    let entry_price = series
        .point_on(as_of)
        .map(|bar| bar.close)
        .ok_or_else(|| ValmoError::NoBar {
            symbol: symbol.to_string(),
            date: as_of,
        })?;

    let mut component_scores = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut available_weight = 0.0;

    for (&kind, &weight) in config.indicator_weights() {
        if weight == 0.0 {
            continue;
        }
        let normalized = match (kind.category(), snapshot) {
            (Category::Technical, _) => {
                let raw = indicator::compute_technical(kind, series, as_of)?;
                indicator::normalize(kind, raw)
            }
            (Category::Fundamental, Some(snap)) => {
                indicator::normalize(kind, indicator::compute_fundamental(kind, snap))
            }
            (Category::Fundamental, None) => {
                component_scores.insert(kind, 0.0);
                continue;
            }
        };
        component_scores.insert(kind, normalized);
        weighted_sum += weight * normalized;
        available_weight += weight;
    }

    if available_weight <= 0.0 {
        return Err(ValmoError::NoFundamentals {
            symbol: symbol.to_string(),
        });
    }

    Ok(ScoredPick::new(
        symbol,
        config,
        as_of,
        weighted_sum / available_weight,
        component_scores,
        entry_price,
    ))
}
