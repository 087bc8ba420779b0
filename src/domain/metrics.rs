//! Performance metrics and statistics.
//!
//! TOTAL  = prod(1 + r_i / top_n) - 1          over closed trades, by exit date
//! CAGR   = (1 + TOTAL)^(1 / years) - 1        years = calendar days / 365.25
//! SHARPE = mean(R) / stdev(R) * sqrt(252)     R = daily portfolio returns
//! MDD    = min(E[t] / max(E[..=t]) - 1)       <= 0

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use super::portfolio::{EquityPoint, INITIAL_EQUITY};
use super::position::{BacktestTrade, ExitReason};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;
const MIN_STDDEV: f64 = 1e-12;

/// Annualized Sharpe ratio; undefined for flat or too-short return series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SharpeRatio {
    Defined(f64),
    Undefined,
}

impl SharpeRatio {
    pub fn value(self) -> Option<f64> {
        match self {
            SharpeRatio::Defined(v) => Some(v),
            SharpeRatio::Undefined => None,
        }
    }
}

impl fmt::Display for SharpeRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharpeRatio::Defined(v) => write!(f, "{v:.2}"),
            SharpeRatio::Undefined => f.write_str("undefined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe_ratio: SharpeRatio,
    pub max_drawdown: f64,
    pub win_rate: f64,
}

impl Metrics {
    pub fn compute(
        trades: &[BacktestTrade],
        daily_returns: &[f64],
        equity_curve: &[EquityPoint],
        top_n: usize,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let total_return = compute_total_return(trades, top_n);
        Metrics {
            total_return,
            cagr: compute_cagr(total_return, start_date, end_date),
            sharpe_ratio: compute_sharpe(daily_returns),
            max_drawdown: compute_drawdown(equity_curve),
            win_rate: compute_win_rate(trades),
        }
    }
}

/// Closed trades in exit order: exit date, then symbol.
pub fn in_exit_order(trades: &[BacktestTrade]) -> Vec<&BacktestTrade> {
    let mut ordered: Vec<&BacktestTrade> = trades.iter().collect();
    ordered.sort_by(|a, b| {
        a.exit_date
            .cmp(&b.exit_date)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ordered
}

pub fn compute_total_return(trades: &[BacktestTrade], top_n: usize) -> f64 {
    let slots = top_n.max(1) as f64;
    in_exit_order(trades)
        .iter()
        .fold(1.0, |acc, t| acc * (1.0 + t.return_pct / slots))
        - 1.0
}

pub fn compute_cagr(total_return: f64, start_date: NaiveDate, end_date: NaiveDate) -> f64 {
    let years = (end_date - start_date).num_days() as f64 / DAYS_PER_YEAR;
    if years <= 0.0 || !total_return.is_finite() {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(1.0 / years) - 1.0
}

pub fn compute_sharpe(daily_returns: &[f64]) -> SharpeRatio {
    if daily_returns.len() < 2 {
        return SharpeRatio::Undefined;
    }

    let n = daily_returns.len() as f64;
    let mean: f64 = daily_returns.iter().sum::<f64>() / n;
    let variance: f64 = daily_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if !stddev.is_finite() || stddev <= MIN_STDDEV {
        return SharpeRatio::Undefined;
    }
    SharpeRatio::Defined(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Largest peak-to-trough decline, as a non-positive fraction.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = INITIAL_EQUITY;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.min(point.equity / peak - 1.0);
        }
    }

    max_dd
}

pub fn compute_win_rate(trades: &[BacktestTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_win()).count() as f64 / trades.len() as f64
}

/// Descriptive statistics over a set of closed trades.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeStats {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub avg_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
    pub avg_holding_days: f64,
    pub exits: BTreeMap<ExitReason, usize>,
}

impl TradeStats {
    pub fn compute(trades: &[BacktestTrade]) -> Self {
        if trades.is_empty() {
            return TradeStats::default();
        }

        let mut stats = TradeStats {
            total: trades.len(),
            best_return: f64::NEG_INFINITY,
            worst_return: f64::INFINITY,
            ..TradeStats::default()
        };
        let mut return_sum = 0.0;
        let mut holding_sum = 0i64;

        for trade in trades {
            if trade.return_pct > 0.0 {
                stats.wins += 1;
            } else if trade.return_pct < 0.0 {
                stats.losses += 1;
            }
            return_sum += trade.return_pct;
            holding_sum += trade.holding_days();
            stats.best_return = stats.best_return.max(trade.return_pct);
            stats.worst_return = stats.worst_return.min(trade.return_pct);
            *stats.exits.entry(trade.exit_reason).or_insert(0) += 1;
        }

        let n = trades.len() as f64;
        stats.avg_return = return_sum / n;
        stats.avg_holding_days = holding_sum as f64 / n;
        stats
    }

    pub fn exits_by(&self, reason: ExitReason) -> usize {
        self.exits.get(&reason).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub avg_return: f64,
}

impl SymbolSummary {
    /// One summary per traded symbol, ordered by symbol.
    pub fn compute_per_symbol(trades: &[BacktestTrade]) -> Vec<SymbolSummary> {
        let mut grouped: BTreeMap<&str, Vec<&BacktestTrade>> = BTreeMap::new();
        for trade in trades {
            grouped.entry(trade.symbol.as_str()).or_default().push(trade);
        }

        grouped
            .into_iter()
            .map(|(symbol, trades)| {
                let n = trades.len();
                let wins = trades.iter().filter(|t| t.is_win()).count();
                SymbolSummary {
                    symbol: symbol.to_string(),
                    trades: n,
                    wins,
                    win_rate: wins as f64 / n as f64,
                    avg_return: trades.iter().map(|t| t.return_pct).sum::<f64>() / n as f64,
                }
            })
            .collect()
    }
}
