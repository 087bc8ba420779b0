//! Universe scoring.
//!
//! Parses symbol lists from configuration and scores every symbol of a
//! strategy's universe, recording the symbols that could not be scored.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::domain::error::ValmoError;
use crate::domain::market_data::MarketData;
use crate::domain::ranker;
use crate::domain::scoring::{self, ScoredPick};
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    /// Did not trade on the scoring date (suspended or delisted).
    NoBarOn(NaiveDate),
    InsufficientData {
        indicator: String,
        have: usize,
        need: usize,
    },
    NoFundamentals,
    Other(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no price data"),
            SkipReason::NoBarOn(date) => write!(f, "no bar on {date}"),
            SkipReason::InsufficientData {
                indicator,
                have,
                need,
            } => write!(f, "{indicator} needs {need} points, have {have}"),
            SkipReason::NoFundamentals => write!(f, "no fundamentals"),
            SkipReason::Other(reason) => f.write_str(reason),
        }
    }
}

impl From<ValmoError> for SkipReason {
    fn from(err: ValmoError) -> Self {
        match err {
            ValmoError::InsufficientData {
                indicator,
                have,
                need,
                ..
            } => SkipReason::InsufficientData {
                indicator,
                have,
                need,
            },
            ValmoError::NoBar { date, .. } => SkipReason::NoBarOn(date),
            ValmoError::NoFundamentals { .. } => SkipReason::NoFundamentals,
            other => SkipReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

/// Outcome of scoring a universe at one date: unranked picks plus the
/// symbols that dropped out.
#[derive(Debug, Clone, Default)]
pub struct ScoringRun {
    pub scores: Vec<ScoredPick>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Score every universe symbol as of `as_of`. Per-symbol failures never
/// abort the run.
pub fn score_universe(data: &MarketData, config: &StrategyConfig, as_of: NaiveDate) -> ScoringRun {
    let mut run = ScoringRun::default();

    for symbol in config.universe() {
        let Some(series) = data.series(symbol) else {
            debug!(strategy = config.name(), %symbol, %as_of, "skipping: no price data");
            run.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        };

        let snapshot = data.fundamentals_as_of(symbol, as_of);
        match scoring::score(symbol, series, snapshot, as_of, config) {
            Ok(pick) => run.scores.push(pick),
            Err(e) => {
                debug!(strategy = config.name(), %symbol, %as_of, error = %e, "skipping symbol");
                run.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: e.into(),
                });
            }
        }
    }

    run
}

/// Ranked picks for `config` as of `as_of`.
pub fn select(
    data: &MarketData,
    config: &StrategyConfig,
    as_of: NaiveDate,
) -> Result<Vec<ScoredPick>, ValmoError> {
    let run = score_universe(data, config, as_of);
    debug!(
        strategy = config.name(),
        %as_of,
        scored = run.scores.len(),
        skipped = run.skipped.len(),
        "scored universe"
    );
    ranker::rank(run.scores, config)
}
