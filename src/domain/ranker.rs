//! Ordering and top-N selection of scored picks.

use std::cmp::Ordering;

use crate::domain::error::ValmoError;
use crate::domain::scoring::ScoredPick;
use crate::domain::strategy::StrategyConfig;

fn by_score_then_symbol(a: &ScoredPick, b: &ScoredPick) -> Ordering {
    b.composite_score()
        .total_cmp(&a.composite_score())
        .then_with(|| a.symbol().cmp(b.symbol()))
}

/// Keep the best `top_n` picks of `pool`, ranked from 1.
///
/// Picks outside the strategy's universe or with a non-finite score are
/// dropped first. Ties on score break on symbol, ascending.
pub fn rank(pool: Vec<ScoredPick>, config: &StrategyConfig) -> Result<Vec<ScoredPick>, ValmoError> {
    let mut eligible: Vec<ScoredPick> = pool
        .into_iter()
        .filter(|p| config.universe().contains(p.symbol()))
        .filter(|p| p.composite_score().is_finite())
        .collect();

    if eligible.is_empty() {
        return Err(ValmoError::EmptyUniverse {
            strategy: config.name().to_string(),
        });
    }

    eligible.sort_by(by_score_then_symbol);
    eligible.truncate(config.top_n());

    Ok(eligible
        .into_iter()
        .enumerate()
        .map(|(i, pick)| pick.ranked(i + 1))
        .collect())
}
