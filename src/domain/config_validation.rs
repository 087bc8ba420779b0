//! Configuration loading and validation.
//!
//! Builds [`BacktestConfig`] and [`StrategyConfig`] values from a
//! [`ConfigPort`]. Strategies are loaded independently so that one broken
//! `[strategy.<name>]` section fails only that strategy.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::ValmoError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::strategy::{RebalanceFrequency, StrategyConfig};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TOP_N: usize = 20;
pub const DEFAULT_STOP_LOSS: f64 = 0.10;
pub const DEFAULT_TARGET: f64 = 0.20;

pub fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, ValmoError> {
    config.require_string("data", "dir").map(PathBuf::from)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, ValmoError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    BacktestConfig::new(start_date, end_date)
}

pub fn parallel_enabled(config: &dyn ConfigPort) -> bool {
    config.get_bool("backtest", "parallel", false)
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, ValmoError> {
    let value = config.require_string("backtest", field)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| ValmoError::ConfigInvalid {
        section: "backtest".to_string(),
        key: field.to_string(),
        reason: format!("invalid {field} format, expected YYYY-MM-DD"),
    })
}

fn parse_universe(config: &dyn ConfigPort, section: &str) -> Result<Vec<String>, ValmoError> {
    let raw = config.require_string(section, "universe")?;
    parse_symbols(&raw).map_err(|e| ValmoError::ConfigInvalid {
        section: section.to_string(),
        key: "universe".to_string(),
        reason: e.to_string(),
    })
}

/// Optional value parsed from its string form; a present but unparseable
/// value is an error rather than a silent default.
fn parse_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, ValmoError>
where
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ValmoError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("'{}': {e}", raw.trim()),
        }),
    }
}

/// Parse `cmi:0.6, pmi:0.4` into an indicator weight map.
pub fn parse_weights(section: &str, input: &str) -> Result<BTreeMap<IndicatorKind, f64>, ValmoError> {
    let invalid = |reason: String| ValmoError::ConfigInvalid {
        section: section.to_string(),
        key: "weights".to_string(),
        reason,
    };

    let mut weights = BTreeMap::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid("empty entry in weight list".into()));
        }
        let (name, value) = token
            .split_once(':')
            .ok_or_else(|| invalid(format!("expected indicator:weight, got '{token}'")))?;
        let kind: IndicatorKind = name.parse().map_err(invalid)?;
        let weight: f64 = value
            .trim()
            .parse()
            .map_err(|e| invalid(format!("invalid weight for {kind}: {e}")))?;
        if weights.insert(kind, weight).is_some() {
            return Err(invalid(format!("{kind} listed twice")));
        }
    }
    Ok(weights)
}

/// Build and validate the strategy defined in `[strategy.<name>]`.
///
/// The strategy's `universe` falls back to `[data] universe`.
pub fn load_strategy(config: &dyn ConfigPort, name: &str) -> Result<StrategyConfig, ValmoError> {
    let section = format!("strategy.{name}");

    let universe = match config.get_string(&section, "universe") {
        Some(s) if !s.trim().is_empty() => parse_universe(config, &section)?,
        _ => parse_universe(config, "data")?,
    };
    let weights = parse_weights(&section, &config.require_string(&section, "weights")?)?;
    let frequency: RebalanceFrequency =
        parse_or(config, &section, "rebalance", RebalanceFrequency::Monthly)?;
    let top_n: usize = parse_or(config, &section, "top_n", DEFAULT_TOP_N)?;
    let stop_loss: f64 = parse_or(config, &section, "stop_loss", DEFAULT_STOP_LOSS)?;
    let target: f64 = parse_or(config, &section, "target", DEFAULT_TARGET)?;

    StrategyConfig::new(name, universe, weights, frequency, top_n, stop_loss, target).map_err(
        |e| match e {
            ValmoError::ConfigInvalid { key, reason, .. } => ValmoError::ConfigInvalid {
                section: section.clone(),
                key,
                reason,
            },
            other => other,
        },
    )
}

/// Names listed in `[strategies] names`, or `None` when the section is
/// absent and the built-in presets apply.
pub fn strategy_names(config: &dyn ConfigPort) -> Option<Vec<String>> {
    let raw = config.get_string("strategies", "names")?;
    Some(
        raw.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Every configured strategy, each loaded independently.
pub fn load_strategies(config: &dyn ConfigPort) -> Vec<Result<StrategyConfig, ValmoError>> {
    match strategy_names(config) {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| load_strategy(config, name))
            .collect(),
        Some(_) => vec![Err(ValmoError::ConfigInvalid {
            section: "strategies".to_string(),
            key: "names".to_string(),
            reason: "no strategy names listed".to_string(),
        })],
        None => match parse_universe(config, "data").and_then(|u| StrategyConfig::presets(&u)) {
            Ok(presets) => presets.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        },
    }
}
