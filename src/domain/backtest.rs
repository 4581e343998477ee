//! Backtest parameters and the day-by-day portfolio simulator.
//!
//! Each trading day is either warm-up (fewer than `min_history` days seen:
//! value is cash, nothing trades) or active:
//!
//! 1. mark the holding to today's close and total the portfolio
//! 2. record value and `value[t] / value[t-1] - 1` (0 on the first active day)
//! 3. record today's share counts
//! 4. ask the allocator for a target
//! 5. replace the holding with `trunc(total * weight / close)` shares of the
//!    target (or nothing), and set cash to whatever is left
//!
//! Valuation and trading both use the same day's close.

use chrono::NaiveDate;
use tracing::debug;

use super::allocator::{Target, select_target};
use super::error::RotatorError;
use super::portfolio::{PortfolioHistory, PositionHistory};
use super::position::{Holding, PositionState};
use super::price_table::{PriceRow, PriceTable};
use super::signal::SignalTable;
use super::strategy::StrategyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub window_years: usize,
    pub risk_free_rate: f64,
    /// Evaluate independent windows on the rayon pool.
    pub parallel: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: None,
            end_date: None,
            initial_capital: 100_000.0,
            window_years: 5,
            risk_free_rate: 0.02,
            parallel: true,
        }
    }
}

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub history: PortfolioHistory,
    pub positions: PositionHistory,
    /// Days on which the held instrument changed (entries, exits and switches).
    pub position_changes: usize,
}

pub fn simulate(
    prices: &PriceTable,
    signals: &SignalTable,
    config: &StrategyConfig,
    initial_capital: f64,
) -> Result<Simulation, RotatorError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(RotatorError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if signals.len() != prices.len() {
        return Err(RotatorError::prices(format!(
            "signal table has {} rows, price table has {}",
            signals.len(),
            prices.len()
        )));
    }

    let min_history = config.min_history();
    let width = prices.instruments().len();
    let mut state = PositionState::new(initial_capital);
    let mut history = PortfolioHistory::with_capacity(prices.len());
    let mut positions = PositionHistory::new(prices.instruments().to_vec());
    let mut position_changes = 0usize;

    for (i, row) in prices.rows().iter().enumerate() {
        if i < min_history {
            history.record(row.date, state.cash, 0.0);
            positions.record(row.date, vec![0; width]);
            continue;
        }

        state.mark(row);
        let total_value = state.total_value(row);

        let daily_return = if i == min_history {
            0.0
        } else {
            let prev = history.points[i - 1].value;
            if prev > 0.0 { total_value / prev - 1.0 } else { 0.0 }
        };
        history.record(row.date, total_value, daily_return);
        positions.record(row.date, share_snapshot(&state, width));

        let allocation = select_target(prices, signals, i, &state, config);
        if let Some(stop) = &allocation.stop {
            debug!(
                date = %row.date,
                instrument = %stop.instrument,
                kind = ?stop.kind,
                drawdown = stop.drawdown,
                enforced = config.enforce_stops,
                "stop breached"
            );
        }

        let before = state.holding.as_ref().map(|h| h.column);
        rebalance(&mut state, allocation.target.as_ref(), row, total_value);
        let after = state.holding.as_ref().map(|h| h.column);

        if before != after {
            position_changes += 1;
            debug!(
                date = %row.date,
                from = ?before.map(|c| prices.instruments()[c].as_str()),
                to = ?after.map(|c| prices.instruments()[c].as_str()),
                regime = ?allocation.regime,
                value = total_value,
                "position change"
            );
        }
    }

    Ok(Simulation {
        history,
        positions,
        position_changes,
    })
}

fn share_snapshot(state: &PositionState, width: usize) -> Vec<u64> {
    (0..width).map(|col| state.shares_of(col)).collect()
}

/// Replace the holding with the target and recompute cash. A continuing
/// holding in the same instrument keeps its entry and peak prices rather
/// than re-basing them to today's close, so the drawdown and trailing
/// stops measure from the original entry. A new instrument starts both
/// at today's close.
fn rebalance(state: &mut PositionState, target: Option<&Target>, row: &PriceRow, total_value: f64) {
    let next = target.and_then(|t| {
        let price = row.closes[t.column];
        let shares = (total_value * t.weight / price) as u64;
        if shares == 0 {
            return None;
        }
        let (entry_price, peak_price) = match &state.holding {
            Some(h) if h.column == t.column => (h.entry_price, h.peak_price),
            _ => (price, price),
        };
        Some(Holding {
            column: t.column,
            instrument: t.instrument.clone(),
            shares,
            entry_price,
            peak_price,
        })
    });

    state.holding = next;
    state.cash = total_value - state.holdings_value(row);
}
