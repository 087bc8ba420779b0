//! Strategy configuration and the built-in strategy presets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::error::ValmoError;
use super::indicator::{Category, IndicatorKind};

pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RebalanceFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl RebalanceFrequency {
    /// Trading days between rebalancing dates.
    pub fn interval(self) -> usize {
        match self {
            RebalanceFrequency::Daily => 1,
            RebalanceFrequency::Weekly => 5,
            RebalanceFrequency::Biweekly => 10,
            RebalanceFrequency::Monthly => 21,
            RebalanceFrequency::Quarterly => 63,
        }
    }
}

impl fmt::Display for RebalanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RebalanceFrequency::Daily => "daily",
            RebalanceFrequency::Weekly => "weekly",
            RebalanceFrequency::Biweekly => "biweekly",
            RebalanceFrequency::Monthly => "monthly",
            RebalanceFrequency::Quarterly => "quarterly",
        };
        f.write_str(name)
    }
}

impl FromStr for RebalanceFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RebalanceFrequency::Daily),
            "weekly" => Ok(RebalanceFrequency::Weekly),
            "biweekly" => Ok(RebalanceFrequency::Biweekly),
            "monthly" => Ok(RebalanceFrequency::Monthly),
            "quarterly" => Ok(RebalanceFrequency::Quarterly),
            other => Err(format!("unknown rebalancing frequency '{other}'")),
        }
    }
}

/// A validated, immutable strategy definition.
///
/// Only [`StrategyConfig::new`] (and the presets built on it) can produce one,
/// so every instance satisfies: non-empty universe, non-negative weights
/// summing to 1 within [`WEIGHT_TOLERANCE`], `top_n >= 1`,
/// `0 <= stop_loss_pct < 1` and `target_pct >= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    name: String,
    universe: BTreeSet<String>,
    indicator_weights: BTreeMap<IndicatorKind, f64>,
    rebalancing_frequency: RebalanceFrequency,
    top_n: usize,
    stop_loss_pct: f64,
    target_pct: f64,
}

impl StrategyConfig {
    pub fn new(
        name: impl Into<String>,
        universe: impl IntoIterator<Item = String>,
        indicator_weights: BTreeMap<IndicatorKind, f64>,
        rebalancing_frequency: RebalanceFrequency,
        top_n: usize,
        stop_loss_pct: f64,
        target_pct: f64,
    ) -> Result<Self, ValmoError> {
        let name = name.into();
        let invalid = |key: &str, reason: String| ValmoError::ConfigInvalid {
            section: name.clone(),
            key: key.to_string(),
            reason,
        };

        let universe: BTreeSet<String> = universe
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if universe.is_empty() {
            return Err(invalid("universe", "universe must name at least one symbol".into()));
        }

        if indicator_weights.is_empty() {
            return Err(invalid("weights", "at least one indicator weight is required".into()));
        }
        if let Some((kind, w)) = indicator_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(invalid(
                "weights",
                format!("weight for {kind} must be a non-negative number, got {w}"),
            ));
        }
        let sum: f64 = indicator_weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid("weights", format!("weights must sum to 1.0, got {sum}")));
        }

        if top_n == 0 {
            return Err(invalid("top_n", "top_n must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&stop_loss_pct) {
            return Err(invalid(
                "stop_loss",
                format!("stop_loss must be in [0, 1), got {stop_loss_pct}"),
            ));
        }
        if !target_pct.is_finite() || target_pct < 0.0 {
            return Err(invalid(
                "target",
                format!("target must be non-negative, got {target_pct}"),
            ));
        }

        Ok(StrategyConfig {
            name,
            universe,
            indicator_weights,
            rebalancing_frequency,
            top_n,
            stop_loss_pct,
            target_pct,
        })
    }

    /// Momentum leaders: CMI and PMI, rebalanced monthly, 8% stop, 15% target.
    pub fn technical_momentum(universe: impl IntoIterator<Item = String>) -> Result<Self, ValmoError> {
        let weights = BTreeMap::from([(IndicatorKind::Cmi, 0.6), (IndicatorKind::Pmi, 0.4)]);
        Self::new(
            "technical_momentum",
            universe,
            weights,
            RebalanceFrequency::Monthly,
            20,
            0.08,
            0.15,
        )
    }

    /// Cheap, profitable, lightly levered names, rebalanced quarterly.
    pub fn fundamental_value(universe: impl IntoIterator<Item = String>) -> Result<Self, ValmoError> {
        let weights = BTreeMap::from([
            (IndicatorKind::PeScore, 0.20),
            (IndicatorKind::PbScore, 0.15),
            (IndicatorKind::RoeScore, 0.20),
            (IndicatorKind::DebtEquityScore, 0.15),
            (IndicatorKind::EpsGrowthScore, 0.15),
            (IndicatorKind::FcfScore, 0.15),
        ]);
        Self::new(
            "fundamental_value",
            universe,
            weights,
            RebalanceFrequency::Quarterly,
            20,
            0.20,
            0.25,
        )
    }

    /// 60% technical, 40% fundamental.
    pub fn hybrid(universe: impl IntoIterator<Item = String>) -> Result<Self, ValmoError> {
        let weights = BTreeMap::from([
            (IndicatorKind::Cmi, 0.36),
            (IndicatorKind::Pmi, 0.24),
            (IndicatorKind::PeScore, 0.08),
            (IndicatorKind::PbScore, 0.06),
            (IndicatorKind::RoeScore, 0.08),
            (IndicatorKind::DebtEquityScore, 0.06),
            (IndicatorKind::EpsGrowthScore, 0.06),
            (IndicatorKind::FcfScore, 0.06),
        ]);
        Self::new(
            "hybrid",
            universe,
            weights,
            RebalanceFrequency::Monthly,
            20,
            0.12,
            0.20,
        )
    }

    /// The three built-in strategies over a shared universe.
    pub fn presets(universe: &[String]) -> Result<Vec<Self>, ValmoError> {
        Ok(vec![
            Self::technical_momentum(universe.iter().cloned())?,
            Self::fundamental_value(universe.iter().cloned())?,
            Self::hybrid(universe.iter().cloned())?,
        ])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn universe(&self) -> &BTreeSet<String> {
        &self.universe
    }

    pub fn indicator_weights(&self) -> &BTreeMap<IndicatorKind, f64> {
        &self.indicator_weights
    }

    pub fn rebalancing_frequency(&self) -> RebalanceFrequency {
        self.rebalancing_frequency
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn stop_loss_pct(&self) -> f64 {
        self.stop_loss_pct
    }

    pub fn target_pct(&self) -> f64 {
        self.target_pct
    }

    pub fn uses_category(&self, category: Category) -> bool {
        self.indicator_weights
            .iter()
            .any(|(k, w)| k.category() == category && *w > 0.0)
    }
}
