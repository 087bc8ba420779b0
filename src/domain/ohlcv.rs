//! Daily price points and per-symbol price series.

use chrono::NaiveDate;

use super::error::ValmoError;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Ordered daily history of one symbol.
///
/// Dates are strictly increasing. Calendar gaps (weekends, holidays,
/// suspensions) are allowed; each indicator enforces its own minimum length.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, ValmoError> {
        let symbol = symbol.into();
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            let reason = if w[1].date == w[0].date {
                format!("duplicate date {}", w[1].date)
            } else {
                format!("date {} follows {}", w[1].date, w[0].date)
            };
            return Err(ValmoError::InvalidSeries { symbol, reason });
        }
        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Index of the last point dated on or before `as_of`.
    pub fn index_at(&self, as_of: NaiveDate) -> Option<usize> {
        self.points
            .partition_point(|p| p.date <= as_of)
            .checked_sub(1)
    }

    /// The point dated exactly `date`, if the symbol traded that day.
    pub fn point_on(&self, date: NaiveDate) -> Option<&PricePoint> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| &self.points[i])
    }

    /// Most recent close on or before `as_of`.
    pub fn close_at(&self, as_of: NaiveDate) -> Option<f64> {
        self.index_at(as_of).map(|i| self.points[i].close)
    }

    /// Points dated on or before `as_of`; everything a decision at `as_of` may see.
    pub fn history_to(&self, as_of: NaiveDate) -> &[PricePoint] {
        let end = self.points.partition_point(|p| p.date <= as_of);
        &self.points[..end]
    }
}
