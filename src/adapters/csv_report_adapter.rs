//! CSV report adapter.
//!
//! Writes the per-window table, the day-by-day simulation history and the
//! sweep ranking as plain CSV for downstream dashboards.

use crate::domain::backtest::Simulation;
use crate::domain::error::RotatorError;
use crate::domain::sweep::SweepEntry;
use crate::domain::window::WindowResult;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct WindowRow {
    start_date: String,
    end_date: String,
    days: usize,
    strategy_return: f64,
    strategy_volatility: f64,
    strategy_sharpe: f64,
    strategy_max_drawdown: f64,
    benchmark_return: f64,
    benchmark_volatility: f64,
    benchmark_sharpe: f64,
    benchmark_max_drawdown: f64,
    average_turnover: f64,
}

impl From<&WindowResult> for WindowRow {
    fn from(w: &WindowResult) -> Self {
        WindowRow {
            start_date: fmt_date(w.start_date),
            end_date: fmt_date(w.end_date),
            days: w.days,
            strategy_return: w.strategy.annual_return,
            strategy_volatility: w.strategy.volatility,
            strategy_sharpe: w.strategy.sharpe,
            strategy_max_drawdown: w.strategy.max_drawdown,
            benchmark_return: w.benchmark.annual_return,
            benchmark_volatility: w.benchmark.volatility,
            benchmark_sharpe: w.benchmark.sharpe,
            benchmark_max_drawdown: w.benchmark.max_drawdown,
            average_turnover: w.average_turnover,
        }
    }
}

#[derive(Serialize)]
struct SweepRow {
    rank: usize,
    base_threshold: f64,
    signal_window: usize,
    trailing_stop: f64,
    max_drawdown_stop: f64,
    vix_high_threshold: f64,
    vix_extreme_threshold: f64,
    average_sharpe: f64,
    windows: usize,
}

const WINDOW_HEADER: [&str; 12] = [
    "start_date",
    "end_date",
    "days",
    "strategy_return",
    "strategy_volatility",
    "strategy_sharpe",
    "strategy_max_drawdown",
    "benchmark_return",
    "benchmark_volatility",
    "benchmark_sharpe",
    "benchmark_max_drawdown",
    "average_turnover",
];

const SWEEP_HEADER: [&str; 9] = [
    "rank",
    "base_threshold",
    "signal_window",
    "trailing_stop",
    "max_drawdown_stop",
    "vix_high_threshold",
    "vix_extreme_threshold",
    "average_sharpe",
    "windows",
];

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn report_err(path: &str, e: impl std::fmt::Display) -> RotatorError {
    RotatorError::Report {
        reason: format!("failed to write {}: {}", path, e),
    }
}

fn open_writer(output_path: &str) -> Result<csv::Writer<File>, RotatorError> {
    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| report_err(output_path, e))?;
        }
    }
    // Headers are written explicitly so an empty result still has one.
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)
        .map_err(|e| report_err(output_path, e))
}

impl ReportPort for CsvReportAdapter {
    fn write_windows(
        &self,
        results: &[WindowResult],
        output_path: &str,
    ) -> Result<(), RotatorError> {
        let mut wtr = open_writer(output_path)?;
        wtr.write_record(WINDOW_HEADER)
            .map_err(|e| report_err(output_path, e))?;
        for w in results {
            wtr.serialize(WindowRow::from(w))
                .map_err(|e| report_err(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_err(output_path, e))
    }

    fn write_history(
        &self,
        simulation: &Simulation,
        output_path: &str,
    ) -> Result<(), RotatorError> {
        let mut wtr = open_writer(output_path)?;

        let mut header = vec!["date".to_string(), "value".to_string(), "daily_return".to_string()];
        header.extend(simulation.positions.instruments.iter().cloned());
        wtr.write_record(&header)
            .map_err(|e| report_err(output_path, e))?;

        for (point, record) in simulation
            .history
            .points
            .iter()
            .zip(&simulation.positions.records)
        {
            let mut fields = vec![
                fmt_date(point.date),
                point.value.to_string(),
                point.daily_return.to_string(),
            ];
            fields.extend(record.shares.iter().map(u64::to_string));
            wtr.write_record(&fields)
                .map_err(|e| report_err(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_err(output_path, e))
    }

    fn write_sweep(&self, entries: &[SweepEntry], output_path: &str) -> Result<(), RotatorError> {
        let mut wtr = open_writer(output_path)?;
        wtr.write_record(SWEEP_HEADER)
            .map_err(|e| report_err(output_path, e))?;
        for (i, e) in entries.iter().enumerate() {
            let row = SweepRow {
                rank: i + 1,
                base_threshold: e.config.base_threshold,
                signal_window: e.config.signal_window,
                trailing_stop: e.config.trailing_stop,
                max_drawdown_stop: e.config.max_drawdown_stop,
                vix_high_threshold: e.config.vix_high_threshold,
                vix_extreme_threshold: e.config.vix_extreme_threshold,
                average_sharpe: e.average_sharpe,
                windows: e.windows.len(),
            };
            wtr.serialize(row).map_err(|e| report_err(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_err(output_path, e))
    }
}
