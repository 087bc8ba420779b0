//! Value sub-indicators.
//!
//! Each score compares one snapshot field against its sector average using
//! the bounded spread
//!
//!   SPREAD(v, p) = (v - p) / (|v| + |p|)      in [-1, 1]
//!
//! Higher-is-better fields (ROE, EPS growth, FCF) score SPREAD; lower-is-better
//! fields (P/E, P/B, D/E) score -SPREAD. Loss-making multiples (P/E or P/B
//! <= 0) and negative equity (D/E < 0) score -1. Unknown inputs score 0.

use crate::domain::fundamental::FundamentalSnapshot;

fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn bounded_spread(value: f64, peer: f64) -> f64 {
    let denom = value.abs() + peer.abs();
    if denom == 0.0 {
        return 0.0;
    }
    ((value - peer) / denom).clamp(-1.0, 1.0)
}

fn higher_is_better(value: Option<f64>, peer: Option<f64>) -> f64 {
    match (known(value), known(peer)) {
        (Some(v), Some(p)) => bounded_spread(v, p),
        _ => 0.0,
    }
}

fn cheaper_is_better(value: Option<f64>, peer: Option<f64>, floor_at_or_below_zero: bool) -> f64 {
    match (known(value), known(peer)) {
        (Some(v), _) if floor_at_or_below_zero && v <= 0.0 => -1.0,
        (Some(v), _) if v < 0.0 => -1.0,
        (Some(v), Some(p)) => -bounded_spread(v, p),
        _ => 0.0,
    }
}

pub fn pe_score(snapshot: &FundamentalSnapshot) -> f64 {
    cheaper_is_better(snapshot.pe_ratio, snapshot.sector.pe_ratio, true)
}

pub fn pb_score(snapshot: &FundamentalSnapshot) -> f64 {
    cheaper_is_better(snapshot.pb_ratio, snapshot.sector.pb_ratio, true)
}

pub fn roe_score(snapshot: &FundamentalSnapshot) -> f64 {
    higher_is_better(snapshot.roe, snapshot.sector.roe)
}

pub fn debt_equity_score(snapshot: &FundamentalSnapshot) -> f64 {
    cheaper_is_better(snapshot.debt_to_equity, snapshot.sector.debt_to_equity, false)
}

pub fn eps_growth_score(snapshot: &FundamentalSnapshot) -> f64 {
    higher_is_better(snapshot.eps_growth_3y, snapshot.sector.eps_growth_3y)
}

pub fn fcf_score(snapshot: &FundamentalSnapshot) -> f64 {
    higher_is_better(snapshot.free_cash_flow, snapshot.sector.free_cash_flow)
}
