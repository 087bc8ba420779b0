//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestResult, run_all};
use crate::domain::config_validation::{
    data_dir, load_backtest_config, load_strategies, parallel_enabled,
};
use crate::domain::error::ValmoError;
use crate::domain::market_data::{MarketData, load_market_data};
use crate::domain::metrics::SymbolSummary;
use crate::domain::position::ExitReason;
use crate::domain::scoring::ScoredPick;
use crate::domain::strategy::StrategyConfig;
use crate::domain::ranker::rank;
use crate::domain::universe::score_universe;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "valmo", about = "Value and momentum equity ranking and backtesting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current top-N picks of every strategy as CSV
    Rank {
        #[arg(short, long)]
        config: PathBuf,
        /// Ranking date (YYYY-MM-DD); defaults to the latest loaded date
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Replay strategies over the configured date range
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Validate a configuration file and list its strategies
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Rank {
            config,
            as_of,
            strategy,
        } => run_rank(&config, as_of, strategy.as_deref()),
        Command::Backtest { config, strategy } => run_backtest(&config, strategy.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

fn fail(err: &ValmoError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Strategies that loaded cleanly, plus the first load failure (if any).
/// Failures are reported as they are found.
fn resolve_strategies(
    adapter: &FileConfigAdapter,
    only: Option<&str>,
) -> Result<(Vec<StrategyConfig>, Option<ValmoError>), ExitCode> {
    let mut strategies = Vec::new();
    let mut first_failure = None;

    for loaded in load_strategies(adapter) {
        match loaded {
            Ok(s) => strategies.push(s),
            Err(e) => {
                error!(error = %e, "strategy rejected");
                eprintln!("error: {e}");
                first_failure.get_or_insert(e);
            }
        }
    }

    if let Some(name) = only {
        let wanted = name.trim().to_lowercase();
        strategies.retain(|s| s.name() == wanted);
        if strategies.is_empty() {
            let err = ValmoError::ConfigInvalid {
                section: "strategies".into(),
                key: "names".into(),
                reason: format!("no valid strategy named '{name}'"),
            };
            return Err(fail(&err));
        }
        first_failure = None;
    }

    if strategies.is_empty() {
        return Err(match &first_failure {
            Some(e) => ExitCode::from(e),
            None => ExitCode::from(2),
        });
    }
    Ok((strategies, first_failure))
}

fn load_data(adapter: &FileConfigAdapter, strategies: &[StrategyConfig]) -> Result<MarketData, ExitCode> {
    let dir = data_dir(adapter).map_err(|e| fail(&e))?;
    let symbols: Vec<String> = strategies
        .iter()
        .flat_map(|s| s.universe().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    info!(dir = %dir.display(), symbols = symbols.len(), "loading market data");
    let port = CsvAdapter::new(dir);
    Ok(load_market_data(&port, &symbols))
}

fn latest_date(data: &MarketData) -> Option<NaiveDate> {
    data.symbols()
        .filter_map(|s| data.series(s).and_then(|series| series.last_date()))
        .max()
}

fn format_components(pick: &ScoredPick) -> String {
    pick.component_scores()
        .iter()
        .map(|(kind, score)| format!("{kind}={score:.4}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Write picks as CSV rows, header first.
pub fn write_picks<W: Write>(out: W, picks: &[ScoredPick]) -> Result<(), ValmoError> {
    let mut wtr = csv::Writer::from_writer(out);
    let to_io = |e: csv::Error| ValmoError::Io(std::io::Error::other(e));

    wtr.write_record([
        "strategy", "rank", "symbol", "as_of", "score", "rating", "entry", "stop", "target",
        "components",
    ])
    .map_err(to_io)?;
    for pick in picks {
        wtr.write_record([
            pick.strategy_name().to_string(),
            pick.rank().to_string(),
            pick.symbol().to_string(),
            pick.as_of_date().to_string(),
            format!("{:.6}", pick.composite_score()),
            pick.rating().to_string(),
            format!("{:.2}", pick.entry_price()),
            format!("{:.2}", pick.stop_loss_price()),
            format!("{:.2}", pick.target_price()),
            format_components(pick),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_rank(config_path: &PathBuf, as_of: Option<NaiveDate>, only: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (strategies, mut first_failure) = match resolve_strategies(&adapter, only) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let data = match load_data(&adapter, &strategies) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let Some(as_of) = as_of.or_else(|| latest_date(&data)) else {
        return fail(&ValmoError::Data {
            reason: "no price data loaded".into(),
        });
    };

    let mut picks = Vec::new();
    for strategy in &strategies {
        let run = score_universe(&data, strategy, as_of);
        for skipped in &run.skipped {
            info!(strategy = strategy.name(), symbol = %skipped.symbol, reason = %skipped.reason, "not ranked");
        }
        let scored = run.scores.len();
        match rank(run.scores, strategy) {
            Ok(selected) => {
                eprintln!(
                    "{}: {} picks from {} scored ({} skipped) as of {}",
                    strategy.name(),
                    selected.len(),
                    scored,
                    run.skipped.len(),
                    as_of
                );
                picks.extend(selected);
            }
            Err(e) => {
                eprintln!("error: {e}");
                first_failure.get_or_insert(e);
            }
        }
    }

    if let Err(e) = write_picks(std::io::stdout().lock(), &picks) {
        return fail(&e);
    }

    match first_failure {
        Some(e) => ExitCode::from(&e),
        None => ExitCode::SUCCESS,
    }
}

pub fn print_summary(result: &BacktestResult) {
    let stats = result.trade_stats();
    eprintln!("\n=== {} ({} to {}) ===", result.strategy_name, result.start_date, result.end_date);
    eprintln!("  Total return:   {:>8.2}%", result.total_return * 100.0);
    eprintln!("  CAGR:           {:>8.2}%", result.cagr * 100.0);
    eprintln!("  Sharpe ratio:   {:>8}", result.sharpe_ratio.to_string());
    eprintln!("  Max drawdown:   {:>8.2}%", result.max_drawdown * 100.0);
    eprintln!("  Win rate:       {:>8.2}%", result.win_rate * 100.0);
    eprintln!(
        "  Trades:         {:>8} ({} won, {} lost, avg {:.2}%, avg hold {:.1} days)",
        stats.total,
        stats.wins,
        stats.losses,
        stats.avg_return * 100.0,
        stats.avg_holding_days
    );
    let exits: Vec<String> = ExitReason::ALL
        .iter()
        .map(|r| format!("{r}={}", stats.exits_by(*r)))
        .collect();
    eprintln!("  Exits:          {}", exits.join(", "));

    let per_symbol = SymbolSummary::compute_per_symbol(&result.trades);
    if !per_symbol.is_empty() {
        eprintln!("  {:<12} {:>6} {:>8} {:>9}", "symbol", "trades", "win%", "avg%");
        for s in &per_symbol {
            eprintln!(
                "  {:<12} {:>6} {:>8.1} {:>9.2}",
                s.symbol,
                s.trades,
                s.win_rate * 100.0,
                s.avg_return * 100.0
            );
        }
    }

    if !result.period_returns.is_empty() {
        let periods: Vec<String> = result
            .period_returns
            .iter()
            .map(|r| format!("{} {:+.2}% (n={})", r.period, r.avg_return_pct, r.symbols))
            .collect();
        eprintln!("  Final picks:    {}", periods.join(", "));
    }
}

fn run_backtest(config_path: &PathBuf, only: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let (strategies, mut first_failure) = match resolve_strategies(&adapter, only) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let data = match load_data(&adapter, &strategies) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let results = run_all(&data, &strategies, &bt_config, parallel_enabled(&adapter));
    for (strategy, result) in strategies.iter().zip(results) {
        match result {
            Ok(r) => print_summary(&r),
            Err(e) => {
                eprintln!("error: {}: {e}", strategy.name());
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        Some(e) => ExitCode::from(&e),
        None => ExitCode::SUCCESS,
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = data_dir(&adapter) {
        return fail(&e);
    }
    if let Err(e) = load_backtest_config(&adapter) {
        return fail(&e);
    }

    let mut first_failure = None;
    for loaded in load_strategies(&adapter) {
        match loaded {
            Ok(s) => {
                let weights: Vec<String> = s
                    .indicator_weights()
                    .iter()
                    .map(|(k, w)| format!("{k}:{w}"))
                    .collect();
                eprintln!(
                    "  {}: {} symbols, {} rebalance, top {}, stop {:.0}%, target {:.0}%, weights {}",
                    s.name(),
                    s.universe().len(),
                    s.rebalancing_frequency(),
                    s.top_n(),
                    s.stop_loss_pct() * 100.0,
                    s.target_pct() * 100.0,
                    weights.join(", ")
                );
            }
            Err(e) => {
                eprintln!("  error: {e}");
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        Some(e) => ExitCode::from(&e),
        None => {
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
    }
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let dir = match data_dir(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    match CsvAdapter::new(dir).list_symbols() {
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
