//! Portfolio state and equity tracking.
//!
//! Every position occupies an equal slot of 1/top_n of equity. The daily
//! portfolio return is
//!
//!   R[t] = sum(slot * (P[t] / P[t-1] - 1))   over positions held into day t
//!
//! where P[t] is the exit price on the day a position closes, and the
//! equity curve compounds it: E[t] = E[t-1] * (1 + R[t]), E[0] = 1.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::position::{BacktestTrade, ExitReason, Position};

pub const INITIAL_EQUITY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub slot: f64,
    pub equity: f64,
    pub positions: BTreeMap<String, Position>,
    pub closed_trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub daily_returns: Vec<f64>,
    day_return: f64,
}

impl Portfolio {
    pub fn new(top_n: usize) -> Self {
        Portfolio {
            slot: 1.0 / top_n.max(1) as f64,
            equity: INITIAL_EQUITY,
            positions: BTreeMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            daily_returns: Vec::new(),
            day_return: 0.0,
        }
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Open `position` unless its symbol is already held. Returns whether
    /// it was opened.
    pub fn open(&mut self, position: Position) -> bool {
        if self.has_position(&position.symbol) {
            return false;
        }
        self.positions.insert(position.symbol.clone(), position);
        true
    }

    /// Move a held position's mark to `price`, accruing today's return.
    pub fn mark(&mut self, symbol: &str, price: f64) {
        if let Some(pos) = self.positions.get_mut(symbol) {
            if pos.last_price != 0.0 {
                self.day_return += self.slot * (price / pos.last_price - 1.0);
            }
            pos.last_price = price;
        }
    }

    /// Close the position in `symbol` at `price`, recording the trade.
    pub fn close(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        price: f64,
        reason: ExitReason,
    ) -> Option<&BacktestTrade> {
        self.mark(symbol, price);
        let position = self.positions.remove(symbol)?;
        self.closed_trades.push(position.close(date, price, reason));
        self.closed_trades.last()
    }

    /// Compound the return accrued today into equity and append to the curve.
    pub fn record_day(&mut self, date: NaiveDate) {
        self.equity *= 1.0 + self.day_return;
        self.daily_returns.push(self.day_return);
        self.equity_curve.push(EquityPoint {
            date,
            equity: self.equity,
        });
        self.day_return = 0.0;
    }
}
