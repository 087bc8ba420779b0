//! Momentum and value sub-indicators.
//!
//! - [`momentum`]: 1/12-month momentum, CMI and distance from the 52-week high
//! - [`volume`]: relative volume and the Price Movement Index
//! - [`trend`]: close against its 50- and 200-day moving averages
//! - [`value`]: fundamental scores relative to sector averages
//!
//! `IndicatorKind` names every sub-indicator a strategy can weight. Raw
//! technical values are unbounded percent figures; [`normalize`] maps them
//! into [-1, 1] so they can be mixed with the value scores.

pub mod momentum;
pub mod trend;
pub mod value;
pub mod volume;

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::ValmoError;
use crate::domain::fundamental::FundamentalSnapshot;
use crate::domain::ohlcv::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Technical,
    Fundamental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndicatorKind {
    Momentum1m,
    Momentum12m,
    Cmi,
    Pmi,
    PctFromHigh,
    RelativeVolume,
    TrendAlignment,
    PeScore,
    PbScore,
    RoeScore,
    DebtEquityScore,
    EpsGrowthScore,
    FcfScore,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 13] = [
        IndicatorKind::Momentum1m,
        IndicatorKind::Momentum12m,
        IndicatorKind::Cmi,
        IndicatorKind::Pmi,
        IndicatorKind::PctFromHigh,
        IndicatorKind::RelativeVolume,
        IndicatorKind::TrendAlignment,
        IndicatorKind::PeScore,
        IndicatorKind::PbScore,
        IndicatorKind::RoeScore,
        IndicatorKind::DebtEquityScore,
        IndicatorKind::EpsGrowthScore,
        IndicatorKind::FcfScore,
    ];

    pub fn category(self) -> Category {
        match self {
            IndicatorKind::Momentum1m
            | IndicatorKind::Momentum12m
            | IndicatorKind::Cmi
            | IndicatorKind::Pmi
            | IndicatorKind::PctFromHigh
            | IndicatorKind::RelativeVolume
            | IndicatorKind::TrendAlignment => Category::Technical,
            IndicatorKind::PeScore
            | IndicatorKind::PbScore
            | IndicatorKind::RoeScore
            | IndicatorKind::DebtEquityScore
            | IndicatorKind::EpsGrowthScore
            | IndicatorKind::FcfScore => Category::Fundamental,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::Momentum1m => "momentum_1m",
            IndicatorKind::Momentum12m => "momentum_12m",
            IndicatorKind::Cmi => "cmi",
            IndicatorKind::Pmi => "pmi",
            IndicatorKind::PctFromHigh => "pct_from_high",
            IndicatorKind::RelativeVolume => "relative_volume",
            IndicatorKind::TrendAlignment => "trend",
            IndicatorKind::PeScore => "pe",
            IndicatorKind::PbScore => "pb",
            IndicatorKind::RoeScore => "roe",
            IndicatorKind::DebtEquityScore => "debt_equity",
            IndicatorKind::EpsGrowthScore => "eps_growth",
            IndicatorKind::FcfScore => "fcf",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        IndicatorKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| format!("unknown indicator '{}'", s.trim()))
    }
}

/// Raw value of a technical sub-indicator at `as_of`.
pub fn compute_technical(
    kind: IndicatorKind,
    series: &PriceSeries,
    as_of: NaiveDate,
) -> Result<f64, ValmoError> {
    match kind {
        IndicatorKind::Momentum1m => momentum::momentum_1m(series, as_of),
        IndicatorKind::Momentum12m => momentum::momentum_12m(series, as_of),
        IndicatorKind::Cmi => momentum::cumulative_momentum_index(series, as_of),
        IndicatorKind::Pmi => volume::price_movement_index(series, as_of),
        IndicatorKind::PctFromHigh => momentum::pct_from_high(series, as_of),
        IndicatorKind::RelativeVolume => volume::relative_volume(series, as_of),
        IndicatorKind::TrendAlignment => trend::trend_alignment(series, as_of),
        other => Err(ValmoError::Data {
            reason: format!("{other} is not a technical indicator"),
        }),
    }
}

/// Score of a fundamental sub-indicator; already in [-1, 1].
pub fn compute_fundamental(kind: IndicatorKind, snapshot: &FundamentalSnapshot) -> f64 {
    match kind {
        IndicatorKind::PeScore => value::pe_score(snapshot),
        IndicatorKind::PbScore => value::pb_score(snapshot),
        IndicatorKind::RoeScore => value::roe_score(snapshot),
        IndicatorKind::DebtEquityScore => value::debt_equity_score(snapshot),
        IndicatorKind::EpsGrowthScore => value::eps_growth_score(snapshot),
        IndicatorKind::FcfScore => value::fcf_score(snapshot),
        _ => 0.0,
    }
}

/// Map a raw indicator value into [-1, 1].
///
/// Technical values go through `tanh(raw / scale)`; the scale is the size of
/// a move that counts as "strong" for that indicator.
pub fn normalize(kind: IndicatorKind, raw: f64) -> f64 {
    let squash = |scale: f64| (raw / scale).tanh();
    match kind {
        IndicatorKind::Momentum1m => squash(10.0),
        IndicatorKind::Momentum12m => squash(50.0),
        IndicatorKind::Cmi => squash(50.0),
        IndicatorKind::Pmi => squash(10.0),
        IndicatorKind::PctFromHigh => squash(0.1),
        IndicatorKind::RelativeVolume => ((raw - 1.0) / 0.5).tanh(),
        IndicatorKind::TrendAlignment => (2.0 * raw - 1.0).clamp(-1.0, 1.0),
        _ => raw.clamp(-1.0, 1.0),
    }
}
