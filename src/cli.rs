//! CLI definition and dispatch.
//!
//! Each subcommand runs in numbered stages: load the INI file, build and
//! validate configs, load prices, evaluate, print, write CSV. Any failure
//! prints `error: ...` to stderr and maps to the error's exit code.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, simulate};
use crate::domain::config_validation::{validate_backtest, validate_strategy};
use crate::domain::error::RotatorError;
use crate::domain::metrics::PerformanceStats;
use crate::domain::price_table::PriceTable;
use crate::domain::signal::compute_signals;
use crate::domain::strategy::StrategyConfig;
use crate::domain::sweep::{ParamGrid, run_sweep};
use crate::domain::window::{WindowResult, rolling_evaluate};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "rotator", about = "Single-asset sector rotation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the strategy over non-overlapping rolling windows
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overriding [data] path
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        window_years: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one simulation over the whole price history
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate the [backtest] and [strategy] sections of a config file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Grid-search the [sweep] parameter lists
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of ranked candidates to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            window_years,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, data.as_deref(), window_years)
            } else {
                run_backtest(&config, data.as_deref(), window_years, output.as_deref())
            }
        }
        Command::Simulate {
            config,
            data,
            output,
        } => run_simulate(&config, data.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Sweep {
            config,
            data,
            output,
            top,
        } => run_sweep_command(&config, data.as_deref(), output.as_deref(), top),
    }
}

fn fail(err: RotatorError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Reads a scalar key, falling back to `default` only when the key is absent.
fn scalar<T: FromStr>(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, RotatorError> {
    match adapter.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| RotatorError::invalid(section, key, format!("cannot parse '{raw}'"))),
    }
}

fn usize_value(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, RotatorError> {
    let value = scalar::<i64>(adapter, section, key, default as i64)?;
    usize::try_from(value)
        .map_err(|_| RotatorError::invalid(section, key, format!("{key} must be non-negative")))
}

fn bool_value(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, RotatorError> {
    match adapter.get_string(section, key) {
        None => Ok(default),
        Some(raw) => FileConfigAdapter::parse_bool(&raw).ok_or_else(|| {
            RotatorError::invalid(section, key, format!("cannot parse '{raw}' as a boolean"))
        }),
    }
}

fn parse_list<T: FromStr>(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Vec<T>, RotatorError> {
    adapter
        .get_list(section, key)
        .unwrap_or_default()
        .iter()
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                RotatorError::invalid(section, key, format!("cannot parse '{raw}'"))
            })
        })
        .collect()
}

fn parse_date(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, RotatorError> {
    adapter
        .get_string(section, key)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                RotatorError::invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
            })
        })
        .transpose()
}

pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, RotatorError> {
    let defaults = StrategyConfig::default();

    let ma_windows = match adapter.get_list("strategy", "ma_windows") {
        None => defaults.ma_windows,
        Some(_) => {
            let values: Vec<usize> = parse_list(adapter, "strategy", "ma_windows")?;
            <[usize; 3]>::try_from(values.as_slice()).map_err(|_| {
                RotatorError::invalid(
                    "strategy",
                    "ma_windows",
                    format!("expected 3 values, got {}", values.len()),
                )
            })?
        }
    };

    Ok(StrategyConfig {
        base_threshold: scalar(adapter, "strategy", "base_threshold", defaults.base_threshold)?,
        signal_window: usize_value(adapter, "strategy", "signal_window", defaults.signal_window)?,
        vol_window: usize_value(adapter, "strategy", "vol_window", defaults.vol_window)?,
        ma_windows,
        trailing_stop: scalar(adapter, "strategy", "trailing_stop", defaults.trailing_stop)?,
        max_drawdown_stop: scalar(
            adapter,
            "strategy",
            "max_drawdown_stop",
            defaults.max_drawdown_stop,
        )?,
        vix_high_threshold: scalar(
            adapter,
            "strategy",
            "vix_high_threshold",
            defaults.vix_high_threshold,
        )?,
        vix_extreme_threshold: scalar(
            adapter,
            "strategy",
            "vix_extreme_threshold",
            defaults.vix_extreme_threshold,
        )?,
        enforce_stops: bool_value(adapter, "strategy", "enforce_stops", defaults.enforce_stops)?,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, RotatorError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        start_date: parse_date(adapter, "data", "start_date")?,
        end_date: parse_date(adapter, "data", "end_date")?,
        initial_capital: scalar(adapter, "backtest", "initial_capital", defaults.initial_capital)?,
        window_years: usize_value(adapter, "backtest", "window_years", defaults.window_years)?,
        risk_free_rate: scalar(adapter, "backtest", "risk_free_rate", defaults.risk_free_rate)?,
        parallel: bool_value(adapter, "backtest", "parallel", defaults.parallel)?,
    })
}

pub fn build_param_grid(adapter: &dyn ConfigPort) -> Result<ParamGrid, RotatorError> {
    Ok(ParamGrid {
        base_thresholds: parse_list(adapter, "sweep", "base_threshold")?,
        signal_windows: parse_list(adapter, "sweep", "signal_window")?,
        trailing_stops: parse_list(adapter, "sweep", "trailing_stop")?,
        max_drawdown_stops: parse_list(adapter, "sweep", "max_drawdown_stop")?,
        vix_high_thresholds: parse_list(adapter, "sweep", "vix_high_threshold")?,
        vix_extreme_thresholds: parse_list(adapter, "sweep", "vix_extreme_threshold")?,
    })
}

pub fn build_data_adapter(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<CsvPriceAdapter, RotatorError> {
    let path = match data_override {
        Some(p) => p.to_path_buf(),
        None => adapter
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| RotatorError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };
    let benchmark = adapter
        .get_string("data", "benchmark")
        .unwrap_or_else(|| "SPY".to_string());
    let volatility_index = adapter
        .get_string("data", "volatility_index")
        .unwrap_or_else(|| "VIX".to_string());
    Ok(CsvPriceAdapter::new(path, &benchmark, &volatility_index))
}

/// Stages shared by every data-consuming command: build and validate both
/// configs, then resolve the price source.
fn prepare(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
    window_years: Option<usize>,
) -> Result<(StrategyConfig, BacktestConfig, CsvPriceAdapter), RotatorError> {
    let strategy = build_strategy_config(adapter)?;
    validate_strategy(&strategy)?;

    let mut backtest = build_backtest_config(adapter)?;
    if let Some(years) = window_years {
        backtest.window_years = years;
    }
    validate_backtest(&backtest)?;

    let data = build_data_adapter(adapter, data_override)?;
    Ok((strategy, backtest, data))
}

fn load_prices(
    data: &dyn PriceDataPort,
    backtest: &BacktestConfig,
) -> Result<PriceTable, RotatorError> {
    let prices = data.fetch_prices(backtest.start_date, backtest.end_date)?;
    eprintln!(
        "Loaded {} days x {} instruments ({} to {})",
        prices.len(),
        prices.instruments().len(),
        prices.first_date().map(|d| d.to_string()).unwrap_or_default(),
        prices.last_date().map(|d| d.to_string()).unwrap_or_default(),
    );
    Ok(prices)
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    window_years: Option<usize>,
    output_path: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build and validate configs
    let (strategy, backtest, data) = match prepare(&adapter, data_override, window_years) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 3: Load prices
    let prices = match load_prices(&data, &backtest) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 4: Evaluate windows
    eprintln!(
        "Running {}-year windows (signal window {}, threshold {})",
        backtest.window_years, strategy.signal_window, strategy.base_threshold
    );
    let results = match rolling_evaluate(&prices, &strategy, &backtest) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 5: Print console summary to stderr
    if results.is_empty() {
        eprintln!(
            "\nNot enough data for a single {}-year window ({} days)",
            backtest.window_years,
            prices.len()
        );
    } else {
        print_window_table(&results, prices.benchmark());
    }

    // Stage 6: Write CSV
    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("windows.csv"));
    match CsvReportAdapter::new().write_windows(&results, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("\nResults written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn print_window_table(results: &[WindowResult], benchmark: &str) {
    eprintln!("\n=== Rolling Windows ===");
    eprintln!(
        "{:<10}  {:<10}  {:>8} {:>8} {:>7} {:>7}  | {:>8} {:>8} {:>7} {:>7}  | {:>8}",
        "Start", "End", "Return", "Vol", "Sharpe", "MaxDD", benchmark, "Vol", "Sharpe", "MaxDD", "Turnover"
    );
    for w in results {
        eprintln!(
            "{:<10}  {:<10}  {}  | {}  | {:>8.2}",
            w.start_date,
            w.end_date,
            format_stats(&w.strategy),
            format_stats(&w.benchmark),
            w.average_turnover,
        );
    }

    let n = results.len() as f64;
    let mean = |f: fn(&WindowResult) -> f64| results.iter().map(f).sum::<f64>() / n;
    eprintln!("\n=== Averages ({} windows) ===", results.len());
    eprintln!(
        "Strategy:  return {:.2}%, Sharpe {:.2}, max drawdown -{:.1}%",
        mean(|w| w.strategy.annual_return) * 100.0,
        mean(|w| w.strategy.sharpe),
        mean(|w| w.strategy.max_drawdown) * 100.0,
    );
    eprintln!(
        "{:<9}  return {:.2}%, Sharpe {:.2}, max drawdown -{:.1}%",
        format!("{benchmark}:"),
        mean(|w| w.benchmark.annual_return) * 100.0,
        mean(|w| w.benchmark.sharpe),
        mean(|w| w.benchmark.max_drawdown) * 100.0,
    );
}

fn format_stats(s: &PerformanceStats) -> String {
    format!(
        "{:>7.2}% {:>7.2}% {:>7.2} {:>6.1}%",
        s.annual_return * 100.0,
        s.volatility * 100.0,
        s.sharpe,
        s.max_drawdown * 100.0
    )
}

pub fn run_dry_run(
    config_path: &Path,
    data_override: Option<&Path>,
    window_years: Option<usize>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (strategy, backtest, data) = match prepare(&adapter, data_override, window_years) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    eprintln!("\nStrategy:");
    eprintln!("  base_threshold:   {}", strategy.base_threshold);
    eprintln!("  signal_window:    {}", strategy.signal_window);
    eprintln!(
        "  stops:            trailing {:.0}%, max drawdown {:.0}% ({})",
        strategy.trailing_stop * 100.0,
        strategy.max_drawdown_stop * 100.0,
        if strategy.enforce_stops { "enforced" } else { "reported only" }
    );
    eprintln!(
        "  volatility gates: high > {}, extreme > {}",
        strategy.vix_high_threshold, strategy.vix_extreme_threshold
    );

    eprintln!("\nBacktest:");
    eprintln!("  initial_capital:  {:.2}", backtest.initial_capital);
    eprintln!("  window_years:     {}", backtest.window_years);
    eprintln!("  risk_free_rate:   {}", backtest.risk_free_rate);

    eprintln!("\nData:");
    match data.list_instruments() {
        Ok(names) => eprintln!("  instruments: {}", names.join(", ")),
        Err(e) => return fail(e),
    }
    match data.get_data_range() {
        Ok(Some((first, last, rows))) => {
            eprintln!("  range: {first} to {last} ({rows} usable rows)");
        }
        Ok(None) => eprintln!("  range: no usable rows"),
        Err(e) => return fail(e),
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_simulate(
    config_path: &Path,
    data_override: Option<&Path>,
    output_path: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build and validate configs
    let (strategy, backtest, data) = match prepare(&adapter, data_override, None) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 3: Load prices
    let prices = match load_prices(&data, &backtest) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 4: Simulate the full history
    let signals = compute_signals(&prices, strategy.signal_window);
    let sim = match simulate(&prices, &signals, &strategy, backtest.initial_capital) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    // Stage 5: Print console summary to stderr
    let values = sim.history.values();
    let returns = sim.history.returns();
    let stats = PerformanceStats::compute(&values, &returns, backtest.risk_free_rate);
    let final_value = sim.history.last_value().unwrap_or(backtest.initial_capital);
    eprintln!("\n=== Full-History Simulation ===");
    eprintln!("Final Value:      {:.2}", final_value);
    eprintln!(
        "Total Return:     {:.2}%",
        (final_value / backtest.initial_capital - 1.0) * 100.0
    );
    eprintln!("Annualized:       {:.2}%", stats.annual_return * 100.0);
    eprintln!("Volatility:       {:.2}%", stats.volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", stats.sharpe);
    eprintln!("Max Drawdown:     -{:.1}%", stats.max_drawdown * 100.0);
    eprintln!("Position Changes: {}", sim.position_changes);

    // Stage 6: Write CSV
    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("history.csv"));
    match CsvReportAdapter::new().write_history(&sim, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("\nHistory written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = build_strategy_config(&adapter)
        .and_then(|s| validate_strategy(&s))
        .and_then(|_| build_backtest_config(&adapter))
        .and_then(|b| validate_backtest(&b));
    if let Err(e) = checked {
        return fail(e);
    }

    match build_param_grid(&adapter) {
        Ok(grid) if grid != ParamGrid::default() => {
            eprintln!("Sweep grid: {} combinations", grid.size());
        }
        Ok(_) => {}
        Err(e) => return fail(e),
    }

    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}

fn run_sweep_command(
    config_path: &Path,
    data_override: Option<&Path>,
    output_path: Option<&Path>,
    top: usize,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build and validate configs and grid
    let (strategy, backtest, data) = match prepare(&adapter, data_override, None) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let grid = match build_param_grid(&adapter) {
        Ok(g) => g,
        Err(e) => return fail(e),
    };

    // Stage 3: Load prices
    let prices = match load_prices(&data, &backtest) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 4: Evaluate every candidate
    eprintln!("Sweeping {} combinations", grid.size());
    let entries = match run_sweep(&prices, &grid, &strategy, &backtest) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };

    // Stage 5: Print ranking
    eprintln!("\n=== Top {} of {} ===", top.min(entries.len()), entries.len());
    eprintln!(
        "{:>4}  {:>9} {:>6} {:>8} {:>8} {:>6} {:>6}  {:>8}",
        "Rank", "Threshold", "Window", "Trailing", "MaxDD", "VixHi", "VixEx", "Sharpe"
    );
    for (i, e) in entries.iter().take(top).enumerate() {
        let c = &e.config;
        eprintln!(
            "{:>4}  {:>9.3} {:>6} {:>8.3} {:>8.3} {:>6.1} {:>6.1}  {:>8.3}",
            i + 1,
            c.base_threshold,
            c.signal_window,
            c.trailing_stop,
            c.max_drawdown_stop,
            c.vix_high_threshold,
            c.vix_extreme_threshold,
            e.average_sharpe
        );
    }

    // Stage 6: Write CSV
    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("sweep.csv"));
    match CsvReportAdapter::new().write_sweep(&entries, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("\nRanking written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
