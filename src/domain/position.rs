//! Open positions and closed backtest trades.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::ohlcv::PricePoint;
use crate::domain::scoring::ScoredPick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitReason {
    StopLoss,
    Target,
    Rebalance,
    EndOfPeriod,
}

impl ExitReason {
    pub const ALL: [ExitReason; 4] = [
        ExitReason::StopLoss,
        ExitReason::Target,
        ExitReason::Rebalance,
        ExitReason::EndOfPeriod,
    ];
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Target => "target",
            ExitReason::Rebalance => "rebalance",
            ExitReason::EndOfPeriod => "end_of_period",
        };
        f.write_str(name)
    }
}

/// A long position held by a backtest.
///
/// `last_price` is the most recent close the position was marked at; the
/// equity curve measures daily returns against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub target_price: f64,
    pub last_price: f64,
}

impl Position {
    pub fn open(pick: &ScoredPick, entry_date: NaiveDate, entry_price: f64) -> Self {
        Position {
            symbol: pick.symbol().to_string(),
            entry_date,
            entry_price,
            stop_loss_price: pick.stop_loss_price(),
            target_price: pick.target_price(),
            last_price: entry_price,
        }
    }

    pub fn should_stop_loss(&self, low: f64) -> bool {
        low <= self.stop_loss_price
    }

    pub fn should_take_profit(&self, high: f64) -> bool {
        high >= self.target_price
    }

    /// Intraday exit against today's bar. The stop is checked first, so a
    /// bar touching both levels exits at the stop.
    pub fn intraday_exit(&self, bar: &PricePoint) -> Option<(ExitReason, f64)> {
        if self.should_stop_loss(bar.low) {
            Some((ExitReason::StopLoss, self.stop_loss_price))
        } else if self.should_take_profit(bar.high) {
            Some((ExitReason::Target, self.target_price))
        } else {
            None
        }
    }

    pub fn close(self, exit_date: NaiveDate, exit_price: f64, exit_reason: ExitReason) -> BacktestTrade {
        let return_pct = if self.entry_price == 0.0 {
            0.0
        } else {
            exit_price / self.entry_price - 1.0
        };
        BacktestTrade {
            symbol: self.symbol,
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date,
            exit_price,
            exit_reason,
            return_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BacktestTrade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Fractional return, `exit / entry - 1`.
    pub return_pct: f64,
}

impl BacktestTrade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }
}
