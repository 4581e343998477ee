//! Rolling, non-overlapping window evaluation.
//!
//! The table is cut into consecutive windows of `window_years * 252` rows;
//! a trailing partial window is discarded. Each window recomputes signals
//! on its own rows and simulates from fresh capital, so windows share no
//! state and can be evaluated in any order.

use std::ops::Range;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::info;

use super::backtest::{BacktestConfig, simulate};
use super::config_validation::{validate_backtest, validate_strategy};
use super::error::RotatorError;
use super::metrics::{PerformanceStats, TRADING_DAYS_PER_YEAR, average_turnover, daily_returns};
use super::price_table::PriceTable;
use super::signal::compute_signals;
use super::strategy::StrategyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub strategy: PerformanceStats,
    pub benchmark: PerformanceStats,
    pub average_turnover: f64,
}

/// Row ranges of each full window, in chronological order.
pub fn window_bounds(total_days: usize, window_years: usize) -> Vec<Range<usize>> {
    let Some(window_days) = window_years.checked_mul(TRADING_DAYS_PER_YEAR as usize) else {
        return Vec::new();
    };
    if window_days == 0 {
        return Vec::new();
    }
    (0..total_days / window_days)
        .map(|k| k * window_days..(k + 1) * window_days)
        .collect()
}

pub fn rolling_evaluate(
    prices: &PriceTable,
    strategy: &StrategyConfig,
    backtest: &BacktestConfig,
) -> Result<Vec<WindowResult>, RotatorError> {
    validate_strategy(strategy)?;
    validate_backtest(backtest)?;

    let bounds = window_bounds(prices.len(), backtest.window_years);
    if bounds.is_empty() {
        info!(
            days = prices.len(),
            window_years = backtest.window_years,
            "not enough data for a single window"
        );
        return Ok(Vec::new());
    }

    let results = if backtest.parallel {
        bounds
            .par_iter()
            .map(|range| evaluate_window(&prices.slice(range.clone()), strategy, backtest))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        bounds
            .iter()
            .map(|range| evaluate_window(&prices.slice(range.clone()), strategy, backtest))
            .collect::<Result<Vec<_>, _>>()?
    };

    for (i, w) in results.iter().enumerate() {
        info!(
            window = i + 1,
            start = %w.start_date,
            end = %w.end_date,
            strategy_return = w.strategy.annual_return,
            strategy_sharpe = w.strategy.sharpe,
            benchmark_return = w.benchmark.annual_return,
            "window evaluated"
        );
    }

    Ok(results)
}

/// Simulate one window from fresh capital and compute its statistics.
pub fn evaluate_window(
    window: &PriceTable,
    strategy: &StrategyConfig,
    backtest: &BacktestConfig,
) -> Result<WindowResult, RotatorError> {
    let (Some(start_date), Some(end_date)) = (window.first_date(), window.last_date()) else {
        return Err(RotatorError::prices("cannot evaluate an empty window"));
    };

    let signals = compute_signals(window, strategy.signal_window);
    let sim = simulate(window, &signals, strategy, backtest.initial_capital)?;

    let values = sim.history.values();
    let returns = sim.history.returns();
    let strategy_stats = PerformanceStats::compute(&values, &returns, backtest.risk_free_rate);

    let bench = window.benchmark_closes();
    let bench_returns = daily_returns(&bench);
    let benchmark_stats = PerformanceStats::compute(&bench, &bench_returns, backtest.risk_free_rate);

    Ok(WindowResult {
        start_date,
        end_date,
        days: window.len(),
        strategy: strategy_stats,
        benchmark: benchmark_stats,
        average_turnover: average_turnover(&values),
    })
}
