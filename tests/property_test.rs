//! Property tests for indicators, ranking, strategy validation and metrics.

mod common;

use chrono::NaiveDate;
use common::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use valmo::domain::indicator::momentum::pct_from_high;
use valmo::domain::indicator::{normalize, IndicatorKind};
use valmo::domain::metrics::compute_win_rate;
use valmo::domain::position::{BacktestTrade, ExitReason};
use valmo::domain::ranker::rank;
use valmo::domain::scoring::ScoredPick;
use valmo::domain::strategy::{RebalanceFrequency, StrategyConfig};

fn close_prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1_000.0, 1..300)
}

fn trade(return_pct: f64) -> BacktestTrade {
    BacktestTrade {
        symbol: "AAA".into(),
        entry_date: day(0),
        entry_price: 100.0,
        exit_date: day(1),
        exit_price: 100.0 * (1.0 + return_pct),
        exit_reason: ExitReason::Rebalance,
        return_pct,
    }
}

proptest! {
    #[test]
    fn pct_from_high_is_never_positive(closes in close_prices()) {
        let series = make_series("AAA", &closes);
        let last = day(closes.len() as u32 - 1);
        let pfh = pct_from_high(&series, last).unwrap();
        prop_assert!(pfh <= 0.0);
        prop_assert!(pfh > -1.0);
    }

    #[test]
    fn pct_from_high_is_zero_at_new_high(mut closes in close_prices(), bump in 0.0f64..50.0) {
        let high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        closes.push(high + bump);
        let series = make_series("AAA", &closes);
        let pfh = pct_from_high(&series, day(closes.len() as u32 - 1)).unwrap();
        prop_assert_eq!(pfh, 0.0);
    }

    #[test]
    fn normalized_scores_are_bounded(raw in -1.0e6f64..1.0e6) {
        for kind in IndicatorKind::ALL {
            let n = normalize(kind, raw);
            prop_assert!((-1.0..=1.0).contains(&n), "{kind} gave {n}");
        }
    }

    #[test]
    fn ranking_is_bounded_ordered_and_tie_broken(
        scores in prop::collection::vec(-4i32..4, 1..40),
        top_n in 1usize..15,
    ) {
        let symbols: Vec<String> = (0..scores.len()).map(|i| format!("S{i:02}")).collect();
        let config = StrategyConfig::new(
            "prop",
            symbols.clone(),
            BTreeMap::from([(IndicatorKind::Cmi, 1.0)]),
            RebalanceFrequency::Monthly,
            top_n,
            0.1,
            0.2,
        )
        .unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let pool: Vec<ScoredPick> = symbols
            .iter()
            .zip(&scores)
            .map(|(s, &score)| {
                ScoredPick::new(s.as_str(), &config, as_of, score as f64 / 4.0, BTreeMap::new(), 10.0)
            })
            .collect();

        let ranked = rank(pool, &config).unwrap();

        prop_assert_eq!(ranked.len(), top_n.min(scores.len()));
        for (i, pick) in ranked.iter().enumerate() {
            prop_assert_eq!(pick.rank(), i + 1);
        }
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.composite_score() >= b.composite_score());
            if a.composite_score() == b.composite_score() {
                prop_assert!(a.symbol() < b.symbol());
            }
        }
    }

    #[test]
    fn win_rate_is_a_fraction(returns in prop::collection::vec(-0.9f64..2.0, 0..50)) {
        let trades: Vec<BacktestTrade> = returns.iter().map(|&r| trade(r)).collect();
        let rate = compute_win_rate(&trades);
        prop_assert!((0.0..=1.0).contains(&rate));
        let wins = returns.iter().filter(|&&r| r > 0.0).count();
        if !returns.is_empty() {
            prop_assert!((rate - wins as f64 / returns.len() as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn weights_must_sum_to_one(a in 0.0f64..1.0, off in prop_oneof![Just(0.0), -0.5f64..0.5]) {
        let b = 1.0 - a + off;
        let weights = BTreeMap::from([(IndicatorKind::Cmi, a), (IndicatorKind::Pmi, b)]);
        let result = StrategyConfig::new(
            "weights",
            vec!["AAA".to_string()],
            weights,
            RebalanceFrequency::Monthly,
            5,
            0.1,
            0.2,
        );
        prop_assert_eq!(result.is_ok(), b >= 0.0 && (a + b - 1.0).abs() <= 1e-6);
    }
}
