//! Fundamental snapshots and the sector averages they are judged against.

use chrono::NaiveDate;

/// Precomputed peer-group averages for the snapshot fields.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorAverages {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub eps_growth_3y: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

/// One reporting period's fundamentals for a symbol.
///
/// `None` means unknown. A zero is a reported zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FundamentalSnapshot {
    pub symbol: String,
    pub as_of_date: NaiveDate,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub eps_growth_3y: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub sector: SectorAverages,
}

impl FundamentalSnapshot {
    /// A snapshot with every field unknown.
    pub fn empty(symbol: impl Into<String>, as_of_date: NaiveDate) -> Self {
        FundamentalSnapshot {
            symbol: symbol.into(),
            as_of_date,
            pe_ratio: None,
            pb_ratio: None,
            roe: None,
            debt_to_equity: None,
            eps_growth_3y: None,
            free_cash_flow: None,
            sector: SectorAverages::default(),
        }
    }
}
