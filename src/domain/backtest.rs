//! Backtest engine and event loop.
//!
//! Each calendar day is processed in order:
//! 1. intraday stop-loss / target exits for positions opened before today
//! 2. on rebalancing dates, exit unselected holdings at the close and enter
//!    new picks at the close (no entries on the final day)
//! 3. on the final day, exit everything still held
//!
//! After the loop, the picks as of the last day are summarised by their
//! trailing 1M/3M/6M/1Y returns.
//!
//! Decisions on day D only see prices and fundamentals dated on or before D.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::calendar::{build_unified_timeline, rebalance_dates};
use super::error::ValmoError;
use super::market_data::MarketData;
use super::metrics::{Metrics, SharpeRatio, TradeStats, in_exit_order};
use super::period_returns::{trailing_returns, PeriodReturn};
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{BacktestTrade, ExitReason, Position};
use super::strategy::StrategyConfig;
use super::universe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestConfig {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, ValmoError> {
        if start_date >= end_date {
            return Err(ValmoError::ConfigInvalid {
                section: "backtest".into(),
                key: "end_date".into(),
                reason: format!("end_date {end_date} must be after start_date {start_date}"),
            });
        }
        Ok(BacktestConfig {
            start_date,
            end_date,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe_ratio: SharpeRatio,
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Closed trades ordered by exit date, then symbol.
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Trailing returns of the picks selected on the last calendar day.
    pub period_returns: Vec<PeriodReturn>,
}

impl BacktestResult {
    pub fn trade_stats(&self) -> TradeStats {
        TradeStats::compute(&self.trades)
    }
}

pub fn run_backtest(
    data: &MarketData,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, ValmoError> {
    run_backtest_with_cancel(data, strategy, config, &AtomicBool::new(false))
}

/// Like [`run_backtest`], but stops with `Cancelled` once `cancel` is
/// raised. The flag is checked at every rebalancing date.
pub fn run_backtest_with_cancel(
    data: &MarketData,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
    cancel: &AtomicBool,
) -> Result<BacktestResult, ValmoError> {
    let calendar = build_unified_timeline(
        data,
        strategy.universe(),
        config.start_date(),
        config.end_date(),
    );
    let Some(last_index) = calendar.len().checked_sub(1) else {
        return Err(ValmoError::EmptyUniverse {
            strategy: strategy.name().to_string(),
        });
    };
    let rebalance_on = rebalance_dates(&calendar, strategy.rebalancing_frequency().interval());

    info!(
        strategy = strategy.name(),
        days = calendar.len(),
        rebalances = rebalance_on.len(),
        "starting backtest"
    );

    let mut portfolio = Portfolio::new(strategy.top_n());

    for (i, &date) in calendar.iter().enumerate() {
        let is_rebalance = rebalance_on.contains(&date);
        let is_final = i == last_index;

        if is_rebalance && cancel.load(Ordering::Relaxed) {
            info!(strategy = strategy.name(), %date, "backtest cancelled");
            return Err(ValmoError::Cancelled {
                strategy: strategy.name().to_string(),
            });
        }

        check_intraday_exits(&mut portfolio, data, date);
        mark_to_close(&mut portfolio, data, date);

        if is_rebalance {
            rebalance(&mut portfolio, data, strategy, date, is_final)?;
        }

        if is_final {
            close_all(&mut portfolio, data, date, ExitReason::EndOfPeriod);
        }

        portfolio.record_day(date);
    }

    let metrics = Metrics::compute(
        &portfolio.closed_trades,
        &portfolio.daily_returns,
        &portfolio.equity_curve,
        strategy.top_n(),
        config.start_date(),
        config.end_date(),
    );
    let last_date = calendar[last_index];
    let final_picks: Vec<String> = universe::select(data, strategy, last_date)
        .unwrap_or_default()
        .iter()
        .map(|p| p.symbol().to_string())
        .collect();
    let period_returns = trailing_returns(data, &final_picks, last_date);

    let trades: Vec<BacktestTrade> = in_exit_order(&portfolio.closed_trades)
        .into_iter()
        .cloned()
        .collect();

    info!(
        strategy = strategy.name(),
        trades = trades.len(),
        total_return = metrics.total_return,
        "backtest finished"
    );

    Ok(BacktestResult {
        strategy_name: strategy.name().to_string(),
        start_date: config.start_date(),
        end_date: config.end_date(),
        total_return: metrics.total_return,
        cagr: metrics.cagr,
        sharpe_ratio: metrics.sharpe_ratio,
        max_drawdown: metrics.max_drawdown,
        win_rate: metrics.win_rate,
        trades,
        equity_curve: portfolio.equity_curve,
        period_returns,
    })
}

/// Backtest every strategy independently; results keep the input order.
pub fn run_all(
    data: &MarketData,
    strategies: &[StrategyConfig],
    config: &BacktestConfig,
    parallel: bool,
) -> Vec<Result<BacktestResult, ValmoError>> {
    if parallel {
        strategies
            .par_iter()
            .map(|strategy| run_backtest(data, strategy, config))
            .collect()
    } else {
        strategies
            .iter()
            .map(|strategy| run_backtest(data, strategy, config))
            .collect()
    }
}

fn check_intraday_exits(portfolio: &mut Portfolio, data: &MarketData, date: NaiveDate) {
    let exits: Vec<(String, ExitReason, f64)> = portfolio
        .positions
        .values()
        .filter(|pos| pos.entry_date < date)
        .filter_map(|pos| {
            let bar = data.series(&pos.symbol)?.point_on(date)?;
            let (reason, price) = pos.intraday_exit(bar)?;
            Some((pos.symbol.clone(), reason, price))
        })
        .collect();

    for (symbol, reason, price) in exits {
        if let Some(trade) = portfolio.close(&symbol, date, price, reason) {
            debug!(%symbol, %date, reason = %trade.exit_reason, price, "intraday exit");
        }
    }
}

fn mark_to_close(portfolio: &mut Portfolio, data: &MarketData, date: NaiveDate) {
    let marks: Vec<(String, f64)> = portfolio
        .positions
        .keys()
        .filter_map(|symbol| {
            let bar = data.series(symbol)?.point_on(date)?;
            Some((symbol.clone(), bar.close))
        })
        .collect();

    for (symbol, close) in marks {
        portfolio.mark(&symbol, close);
    }
}

/// Last close on or before `date`, falling back to the position's mark.
fn exit_price(portfolio: &Portfolio, data: &MarketData, symbol: &str, date: NaiveDate) -> Option<f64> {
    data.series(symbol)
        .and_then(|s| s.close_at(date))
        .or_else(|| portfolio.get_position(symbol).map(|p| p.last_price))
}

fn close_all(portfolio: &mut Portfolio, data: &MarketData, date: NaiveDate, reason: ExitReason) {
    let held: Vec<String> = portfolio.positions.keys().cloned().collect();
    for symbol in held {
        if let Some(price) = exit_price(portfolio, data, &symbol, date) {
            portfolio.close(&symbol, date, price, reason);
        }
    }
}

fn rebalance(
    portfolio: &mut Portfolio,
    data: &MarketData,
    strategy: &StrategyConfig,
    date: NaiveDate,
    is_final: bool,
) -> Result<(), ValmoError> {
    let picks = match universe::select(data, strategy, date) {
        Ok(picks) => picks,
        Err(ValmoError::EmptyUniverse { .. }) => Vec::new(),
        Err(e) => return Err(e),
    };
    let selected: BTreeSet<&str> = picks.iter().map(|p| p.symbol()).collect();

    let dropped: Vec<String> = portfolio
        .positions
        .keys()
        .filter(|symbol| !selected.contains(symbol.as_str()))
        .cloned()
        .collect();
    for symbol in &dropped {
        if let Some(price) = exit_price(portfolio, data, symbol, date) {
            portfolio.close(symbol, date, price, ExitReason::Rebalance);
        }
    }

    let mut entered = 0usize;
    if !is_final {
        for pick in &picks {
            if portfolio.has_position(pick.symbol()) {
                continue;
            }
            let traded_today = data
                .series(pick.symbol())
                .and_then(|s| s.point_on(date))
                .is_some();
            if traded_today && portfolio.open(Position::open(pick, date, pick.entry_price())) {
                entered += 1;
            }
        }
    }

    debug!(
        strategy = strategy.name(),
        %date,
        selected = picks.len(),
        exited = dropped.len(),
        entered,
        "rebalanced"
    );
    Ok(())
}
