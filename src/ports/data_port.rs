//! Data access port trait.
//!
//! Implementations serve already-fetched history; the core never talks to a
//! market-data provider directly.

use crate::domain::error::ValmoError;
use crate::domain::fundamental::FundamentalSnapshot;
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Full daily price history of `symbol`, oldest first.
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, ValmoError>;

    /// Every fundamental snapshot known for `symbol`, in any order. An empty
    /// list is not an error.
    fn fetch_fundamentals(&self, symbol: &str) -> Result<Vec<FundamentalSnapshot>, ValmoError>;

    fn list_symbols(&self) -> Result<Vec<String>, ValmoError>;
}
