//! Integration tests for the ranking and backtest pipeline.
//!
//! Tests cover:
//! - Market data loading through a mock data port (failures skipped)
//! - Universe scoring and selection, including point-in-time fundamentals
//! - Rebalance exits, intraday stop/target exits and end-of-period exits
//! - Equity curve and metrics on known trade sequences
//! - Determinism, cancellation and multi-strategy runs

mod common;

use approx::assert_relative_eq;
use common::*;
use std::sync::atomic::AtomicBool;
use valmo::domain::backtest::{run_all, run_backtest, run_backtest_with_cancel, BacktestConfig};
use valmo::domain::error::ValmoError;
use valmo::domain::indicator::momentum::momentum_1m;
use valmo::domain::indicator::IndicatorKind;
use valmo::domain::market_data::{load_market_data, MarketData};
use valmo::domain::metrics::SharpeRatio;
use valmo::domain::position::ExitReason;
use valmo::domain::strategy::RebalanceFrequency;
use valmo::domain::universe::{score_universe, select, SkipReason};

fn load(port: &MockDataPort, symbols: &[&str]) -> MarketData {
    let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
    load_market_data(port, &symbols)
}

fn backtest_config(last_day: u32) -> BacktestConfig {
    BacktestConfig::new(day(0), day(last_day)).unwrap()
}

mod data_loading {
    use super::*;

    #[test]
    fn failed_symbols_are_skipped() {
        let port = MockDataPort::new()
            .with_points("AAA", points_from_closes(&[10.0, 11.0]))
            .with_points("CCC", Vec::new())
            .with_error("BBB", "connection reset");

        let data = load(&port, &["AAA", "BBB", "CCC"]);

        assert_eq!(data.series_count(), 1);
        assert!(data.series("AAA").is_some());
        assert!(data.series("BBB").is_none());
        assert!(data.series("CCC").is_none());
    }

    #[test]
    fn fundamentals_loaded_alongside_prices() {
        let port = MockDataPort::new()
            .with_points("AAA", points_from_closes(&[10.0, 11.0]))
            .with_snapshot(snapshot("AAA", day(5), 12.0, 20.0))
            .with_snapshot(snapshot("AAA", day(0), 10.0, 20.0));

        let data = load(&port, &["AAA"]);

        assert_eq!(data.snapshots("AAA").len(), 2);
        assert_eq!(data.snapshots("AAA")[0].as_of_date, day(0));
        assert_eq!(
            data.fundamentals_as_of("AAA", day(3)).and_then(|s| s.pe_ratio),
            Some(10.0)
        );
    }
}

mod selection {
    use super::*;

    #[test]
    fn one_month_rally_has_positive_momentum() {
        let closes: Vec<f64> = (0..=21).map(|i| 100.0 * (1.0 + 0.1 * i as f64 / 21.0)).collect();
        let series = make_series("RALLY", &closes);

        let m1 = momentum_1m(&series, day(21)).unwrap();
        assert!(m1 > 0.0);
        assert_relative_eq!(m1, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn short_history_is_skipped_not_fatal() {
        let port = MockDataPort::new()
            .with_points("LONG", points_from_closes(&vec![100.0; 30]))
            .with_points("SHORT", (25..30).map(|i| flat_point(day(i), 100.0)).collect());
        let data = load(&port, &["LONG", "SHORT"]);
        let strategy = make_strategy(
            "pmi",
            &["LONG", "SHORT", "GONE"],
            &[(IndicatorKind::Pmi, 1.0)],
            RebalanceFrequency::Monthly,
            5,
            0.1,
            0.2,
        );

        let run = score_universe(&data, &strategy, day(29));

        assert_eq!(run.scores.len(), 1);
        assert_eq!(run.scores[0].symbol(), "LONG");
        assert_eq!(run.skipped.len(), 2);
        assert!(run
            .skipped
            .iter()
            .any(|s| s.symbol == "GONE" && s.reason == SkipReason::NoData));
        assert!(run
            .skipped
            .iter()
            .any(|s| s.symbol == "SHORT" && matches!(s.reason, SkipReason::InsufficientData { .. })));
    }

    #[test]
    fn delisted_symbol_is_not_ranked_from_its_last_bar() {
        // DEAD stopped trading at its high on day 4; LIVE keeps trading flat.
        let port = MockDataPort::new()
            .with_points("DEAD", points_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0]))
            .with_points("LIVE", points_from_closes(&[20.0; 31]));
        let data = load(&port, &["DEAD", "LIVE"]);
        let strategy = near_high_strategy(&["DEAD", "LIVE"], RebalanceFrequency::Daily, 1);

        let run = score_universe(&data, &strategy, day(10));
        assert_eq!(run.scores.len(), 1);
        assert_eq!(run.scores[0].symbol(), "LIVE");
        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].symbol, "DEAD");
        assert_eq!(run.skipped[0].reason, SkipReason::NoBarOn(day(10)));

        let config = BacktestConfig::new(day(10), day(30)).unwrap();
        let result = run_backtest(&data, &strategy, &config).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].symbol, "LIVE");
        assert_eq!(result.trades[0].entry_date, day(10));
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfPeriod);

        assert_eq!(result.period_returns.len(), 1);
        assert_eq!(result.period_returns[0].period, "1M");
        assert_eq!(result.period_returns[0].symbols, 1);
        assert_relative_eq!(result.period_returns[0].avg_return_pct, 0.0);
    }

    #[test]
    fn value_ranking_uses_point_in_time_fundamentals() {
        let port = MockDataPort::new()
            .with_points("CHEAP", points_from_closes(&[50.0; 10]))
            .with_points("DEAR", points_from_closes(&[50.0; 10]))
            .with_points("NOFUND", points_from_closes(&[50.0; 10]))
            .with_snapshot(snapshot("CHEAP", day(0), 10.0, 20.0))
            .with_snapshot(snapshot("DEAR", day(0), 30.0, 20.0))
            // Published later; must not be visible at day 3.
            .with_snapshot(snapshot("DEAR", day(6), 5.0, 20.0));
        let data = load(&port, &["CHEAP", "DEAR", "NOFUND"]);
        let strategy = make_strategy(
            "value",
            &["CHEAP", "DEAR", "NOFUND"],
            &[(IndicatorKind::PeScore, 1.0)],
            RebalanceFrequency::Quarterly,
            10,
            0.2,
            0.25,
        );

        let picks = select(&data, &strategy, day(3)).unwrap();

        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].symbol(), "CHEAP");
        assert_eq!(picks[0].rank(), 1);
        assert_relative_eq!(picks[0].composite_score(), 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(picks[1].symbol(), "DEAR");
        assert_relative_eq!(picks[1].composite_score(), -0.2, epsilon = 1e-12);

        let later = select(&data, &strategy, day(7)).unwrap();
        assert_eq!(later[0].symbol(), "DEAR");
    }

    #[test]
    fn pick_levels_follow_strategy() {
        let port = MockDataPort::new().with_points("AAA", points_from_closes(&[100.0, 120.0]));
        let data = load(&port, &["AAA"]);
        let strategy = make_strategy(
            "levels",
            &["AAA"],
            &[(IndicatorKind::PctFromHigh, 1.0)],
            RebalanceFrequency::Daily,
            1,
            0.08,
            0.15,
        );

        let picks = select(&data, &strategy, day(1)).unwrap();
        assert_relative_eq!(picks[0].entry_price(), 120.0);
        assert_relative_eq!(picks[0].stop_loss_price(), 110.4, epsilon = 1e-9);
        assert_relative_eq!(picks[0].target_price(), 138.0, epsilon = 1e-9);
    }

    #[test]
    fn nothing_scoreable_is_empty_universe() {
        let port = MockDataPort::new().with_points("AAA", points_from_closes(&[10.0; 3]));
        let data = load(&port, &["AAA"]);
        let strategy = make_strategy(
            "value",
            &["AAA"],
            &[(IndicatorKind::PeScore, 1.0)],
            RebalanceFrequency::Monthly,
            5,
            0.1,
            0.2,
        );

        let err = select(&data, &strategy, day(2)).unwrap_err();
        assert!(matches!(err, ValmoError::EmptyUniverse { .. }));
    }
}

mod backtest_pipeline {
    use super::*;

    fn rotation_data() -> MarketData {
        let port = MockDataPort::new()
            .with_points("AAA", points_from_closes(&[10.0, 11.0, 12.0, 11.0, 11.0, 11.0]))
            .with_points("BBB", points_from_closes(&[10.0, 9.0, 8.0, 10.0, 10.0, 10.0]));
        load(&port, &["AAA", "BBB"])
    }

    #[test]
    fn dropped_holding_exits_once_at_next_rebalance() {
        let data = rotation_data();
        let strategy = near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Daily, 1);

        let result = run_backtest(&data, &strategy, &backtest_config(5)).unwrap();

        assert_eq!(result.trades.len(), 2);
        let rebalance_exits: Vec<_> = result
            .trades
            .iter()
            .filter(|t| t.exit_reason == ExitReason::Rebalance)
            .collect();
        assert_eq!(rebalance_exits.len(), 1);

        let first = rebalance_exits[0];
        assert_eq!(first.symbol, "AAA");
        assert_eq!(first.entry_date, day(0));
        assert_eq!(first.exit_date, day(3));
        assert_relative_eq!(first.exit_price, 11.0);

        let last = &result.trades[1];
        assert_eq!(last.symbol, "BBB");
        assert_eq!(last.entry_date, day(3));
        assert_eq!(last.exit_date, day(5));
        assert_eq!(last.exit_reason, ExitReason::EndOfPeriod);
    }

    #[test]
    fn weekly_holding_waits_for_next_rebalance_to_exit() {
        let port = MockDataPort::new()
            .with_points(
                "AAA",
                points_from_closes(&[10.0, 11.0, 12.0, 11.0, 11.0, 11.0, 11.0, 11.0, 11.0, 11.0, 11.0]),
            )
            .with_points(
                "BBB",
                points_from_closes(&[10.0, 9.0, 8.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0]),
            );
        let data = load(&port, &["AAA", "BBB"]);
        let strategy = near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Weekly, 1);

        let result = run_backtest(&data, &strategy, &backtest_config(10)).unwrap();

        // AAA falls off its high on day 3 but is only rotated out on day 5.
        assert_eq!(result.trades.len(), 2);
        let first = &result.trades[0];
        assert_eq!(first.symbol, "AAA");
        assert_eq!(first.entry_date, day(0));
        assert_eq!(first.exit_date, day(5));
        assert_eq!(first.exit_reason, ExitReason::Rebalance);
        assert_relative_eq!(first.exit_price, 11.0);

        let second = &result.trades[1];
        assert_eq!(second.symbol, "BBB");
        assert_eq!(second.entry_date, day(5));
        assert_eq!(second.exit_date, day(10));
        assert_eq!(second.exit_reason, ExitReason::EndOfPeriod);

        let rebalance_exits = result
            .trades
            .iter()
            .filter(|t| t.exit_reason == ExitReason::Rebalance)
            .count();
        assert_eq!(rebalance_exits, 1);
        assert_relative_eq!(result.total_return, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn rotation_metrics() {
        let data = rotation_data();
        let strategy = near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Daily, 1);

        let result = run_backtest(&data, &strategy, &backtest_config(5)).unwrap();

        assert_relative_eq!(result.total_return, 0.1, epsilon = 1e-12);
        assert_relative_eq!(result.win_rate, 0.5);
        assert_relative_eq!(result.max_drawdown, 1.1 / 1.2 - 1.0, epsilon = 1e-12);

        let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        let expected = [1.0, 1.1, 1.2, 1.1, 1.1, 1.1];
        assert_eq!(equity.len(), expected.len());
        for (got, want) in equity.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn same_day_stop_and_target_exits_at_stop() {
        let mut points = points_from_closes(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        points[1] = make_point(day(1), 100.0, 115.0, 85.0, 100.0);
        let port = MockDataPort::new().with_points("XXX", points);
        let data = load(&port, &["XXX"]);
        let strategy = make_strategy(
            "tight",
            &["XXX"],
            &[(IndicatorKind::PctFromHigh, 1.0)],
            RebalanceFrequency::Monthly,
            1,
            0.1,
            0.1,
        );

        let result = run_backtest(&data, &strategy, &backtest_config(4)).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_date, day(1));
        assert_relative_eq!(trade.exit_price, 90.0, epsilon = 1e-9);
        assert_relative_eq!(trade.return_pct, -0.1, epsilon = 1e-9);
        assert_relative_eq!(result.win_rate, 0.0);
    }

    #[test]
    fn target_hit_exits_at_target_price() {
        let mut points = points_from_closes(&[100.0, 100.0, 100.0]);
        points[1] = make_point(day(1), 100.0, 125.0, 99.0, 120.0);
        let port = MockDataPort::new().with_points("XXX", points);
        let data = load(&port, &["XXX"]);
        let strategy = make_strategy(
            "target",
            &["XXX"],
            &[(IndicatorKind::PctFromHigh, 1.0)],
            RebalanceFrequency::Monthly,
            1,
            0.1,
            0.2,
        );

        let result = run_backtest(&data, &strategy, &backtest_config(2)).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::Target);
        assert_relative_eq!(result.trades[0].exit_price, 120.0, epsilon = 1e-9);
        assert_relative_eq!(result.total_return, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn held_pick_is_never_duplicated() {
        let port = MockDataPort::new()
            .with_points("AAA", points_from_closes(&[50.0; 8]))
            .with_points("BBB", points_from_closes(&[50.0; 8]))
            .with_points("CCC", points_from_closes(&[50.0; 8]));
        let data = load(&port, &["AAA", "BBB", "CCC"]);
        let strategy = near_high_strategy(&["AAA", "BBB", "CCC"], RebalanceFrequency::Daily, 2);

        let result = run_backtest(&data, &strategy, &backtest_config(7)).unwrap();

        let symbols: Vec<&str> = result.trades.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
        assert!(result
            .trades
            .iter()
            .all(|t| t.exit_reason == ExitReason::EndOfPeriod && t.entry_date == day(0)));
    }

    #[test]
    fn constant_prices_have_no_drawdown() {
        let port = MockDataPort::new().with_points("AAA", points_from_closes(&[25.0; 10]));
        let data = load(&port, &["AAA"]);
        let strategy = near_high_strategy(&["AAA"], RebalanceFrequency::Weekly, 1);

        let result = run_backtest(&data, &strategy, &backtest_config(9)).unwrap();

        assert_eq!(result.max_drawdown, 0.0);
        assert_relative_eq!(result.total_return, 0.0);
        assert_eq!(result.sharpe_ratio, SharpeRatio::Undefined);
        assert!(result.equity_curve.iter().all(|p| (p.equity - 1.0).abs() < 1e-12));
    }

    #[test]
    fn no_entries_on_final_day() {
        let port = MockDataPort::new().with_points("AAA", points_from_closes(&[25.0]));
        let data = load(&port, &["AAA"]);
        let strategy = near_high_strategy(&["AAA"], RebalanceFrequency::Daily, 1);

        let result = run_backtest(&data, &strategy, &BacktestConfig::new(day(0), day(3)).unwrap())
            .unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 1);
    }

    #[test]
    fn empty_calendar_is_error() {
        let port = MockDataPort::new().with_points("AAA", points_from_closes(&[25.0; 3]));
        let data = load(&port, &["AAA"]);
        let strategy = near_high_strategy(&["AAA"], RebalanceFrequency::Daily, 1);
        let config = BacktestConfig::new(date(2030, 1, 1), date(2030, 6, 1)).unwrap();

        let err = run_backtest(&data, &strategy, &config).unwrap_err();
        assert!(matches!(err, ValmoError::EmptyUniverse { .. }));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let data = rotation_data();
        let strategy = near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Daily, 1);
        let config = backtest_config(5);

        let first = run_backtest(&data, &strategy, &config).unwrap();
        let second = run_backtest(&data, &strategy, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn raised_cancel_flag_stops_run() {
        let data = rotation_data();
        let strategy = near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Daily, 1);

        let err = run_backtest_with_cancel(&data, &strategy, &backtest_config(5), &AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, ValmoError::Cancelled { ref strategy } if strategy == "near_high"));
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let data = rotation_data();
        let strategies = vec![
            near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Daily, 1),
            near_high_strategy(&["AAA", "BBB"], RebalanceFrequency::Weekly, 2),
            make_strategy(
                "pmi",
                &["AAA", "BBB"],
                &[(IndicatorKind::Pmi, 1.0)],
                RebalanceFrequency::Daily,
                1,
                0.1,
                0.2,
            ),
        ];
        let config = backtest_config(5);

        let sequential = run_all(&data, &strategies, &config, false);
        let parallel = run_all(&data, &strategies, &config, true);

        assert_eq!(sequential.len(), 3);
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.as_ref().ok(), p.as_ref().ok());
        }
        // Not enough history for PMI: the run completes without trades.
        let pmi = sequential[2].as_ref().unwrap();
        assert!(pmi.trades.is_empty());
    }
}
