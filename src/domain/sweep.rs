//! Grid search over strategy parameters.
//!
//! Every combination in a [`ParamGrid`] is expanded into a
//! [`StrategyConfig`], invalid combinations are skipped, and each survivor
//! is scored by its average strategy Sharpe ratio across rolling windows.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, info};

use super::backtest::BacktestConfig;
use super::config_validation::{validate_backtest, validate_strategy};
use super::error::RotatorError;
use super::price_table::PriceTable;
use super::strategy::StrategyConfig;
use super::window::{WindowResult, rolling_evaluate};

/// Candidate values per parameter. An empty list keeps the base value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    pub base_thresholds: Vec<f64>,
    pub signal_windows: Vec<usize>,
    pub trailing_stops: Vec<f64>,
    pub max_drawdown_stops: Vec<f64>,
    pub vix_high_thresholds: Vec<f64>,
    pub vix_extreme_thresholds: Vec<f64>,
}

fn or_base<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

impl ParamGrid {
    /// Number of raw combinations, before invalid ones are dropped.
    pub fn size(&self) -> usize {
        [
            self.base_thresholds.len(),
            self.signal_windows.len(),
            self.trailing_stops.len(),
            self.max_drawdown_stops.len(),
            self.vix_high_thresholds.len(),
            self.vix_extreme_thresholds.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }

    pub fn generate_configs(&self, base: &StrategyConfig) -> Vec<StrategyConfig> {
        let mut configs = Vec::new();

        for &base_threshold in &or_base(&self.base_thresholds, base.base_threshold) {
            for &signal_window in &or_base(&self.signal_windows, base.signal_window) {
                for &trailing_stop in &or_base(&self.trailing_stops, base.trailing_stop) {
                    for &max_drawdown_stop in
                        &or_base(&self.max_drawdown_stops, base.max_drawdown_stop)
                    {
                        for &vix_high_threshold in
                            &or_base(&self.vix_high_thresholds, base.vix_high_threshold)
                        {
                            for &vix_extreme_threshold in
                                &or_base(&self.vix_extreme_thresholds, base.vix_extreme_threshold)
                            {
                                let config = StrategyConfig {
                                    base_threshold,
                                    signal_window,
                                    trailing_stop,
                                    max_drawdown_stop,
                                    vix_high_threshold,
                                    vix_extreme_threshold,
                                    ..base.clone()
                                };
                                if let Err(e) = validate_strategy(&config) {
                                    debug!(error = %e, "skipping invalid combination");
                                    continue;
                                }
                                configs.push(config);
                            }
                        }
                    }
                }
            }
        }

        configs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub config: StrategyConfig,
    pub average_sharpe: f64,
    pub windows: Vec<WindowResult>,
}

/// Mean strategy Sharpe over windows; 0.0 when there are none or the mean is not finite.
pub fn average_sharpe(windows: &[WindowResult]) -> f64 {
    if windows.is_empty() {
        return 0.0;
    }
    let mean = windows.iter().map(|w| w.strategy.sharpe).sum::<f64>() / windows.len() as f64;
    if mean.is_finite() { mean } else { 0.0 }
}

/// Evaluate every valid grid combination, best average Sharpe first.
/// Equal scores keep grid order.
pub fn run_sweep(
    prices: &PriceTable,
    grid: &ParamGrid,
    base: &StrategyConfig,
    backtest: &BacktestConfig,
) -> Result<Vec<SweepEntry>, RotatorError> {
    validate_backtest(backtest)?;
    let configs = grid.generate_configs(base);
    info!(
        candidates = configs.len(),
        combinations = grid.size(),
        "starting parameter sweep"
    );

    let evaluate = |config: &StrategyConfig| -> Result<SweepEntry, RotatorError> {
        let windows = rolling_evaluate(prices, config, backtest)?;
        Ok(SweepEntry {
            config: config.clone(),
            average_sharpe: average_sharpe(&windows),
            windows,
        })
    };

    let mut entries = if backtest.parallel {
        configs
            .par_iter()
            .map(evaluate)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        configs.iter().map(evaluate).collect::<Result<Vec<_>, _>>()?
    };

    entries.sort_by(|a, b| {
        b.average_sharpe
            .partial_cmp(&a.average_sharpe)
            .unwrap_or(Ordering::Equal)
    });

    if let Some(best) = entries.first() {
        info!(
            average_sharpe = best.average_sharpe,
            base_threshold = best.config.base_threshold,
            signal_window = best.config.signal_window,
            "sweep complete"
        );
    }

    Ok(entries)
}
