//! Risk-gated target selection.
//!
//! Rules, in priority order, for day `d`:
//! 1. Volatility index above `vix_extreme_threshold`: no position.
//! 2. Above `vix_high_threshold`: size multiplier 0.5, otherwise 1.0.
//! 3. A held instrument breaching its max-drawdown or trailing stop is
//!    dropped from today's candidates (when `enforce_stops` is set).
//! 4. The candidate with the highest signal is targeted if that signal
//!    exceeds `base_threshold`; ties go to the earliest instrument in
//!    canonical (price-table column) order.

use super::position::{PositionState, StopKind};
use super::price_table::PriceTable;
use super::signal::SignalTable;
use super::strategy::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityRegime {
    Normal,
    High,
    Extreme,
}

impl VolatilityRegime {
    pub fn classify(level: f64, config: &StrategyConfig) -> Self {
        if level > config.vix_extreme_threshold {
            VolatilityRegime::Extreme
        } else if level > config.vix_high_threshold {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Normal
        }
    }

    pub fn size_multiplier(self) -> f64 {
        match self {
            VolatilityRegime::Normal => 1.0,
            VolatilityRegime::High => 0.5,
            VolatilityRegime::Extreme => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub column: usize,
    pub instrument: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopTrigger {
    pub instrument: String,
    pub kind: StopKind,
    /// Signed move from entry at the time of the check.
    pub drawdown: f64,
}

/// Outcome of one allocation decision. `target == None` means "hold cash".
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub target: Option<Target>,
    pub regime: VolatilityRegime,
    pub stop: Option<StopTrigger>,
}

impl Allocation {
    pub fn weight_of(&self, column: usize) -> f64 {
        match &self.target {
            Some(t) if t.column == column => t.weight,
            _ => 0.0,
        }
    }
}

/// Decide tomorrow's single-position target from day `day`'s signals.
pub fn select_target(
    prices: &PriceTable,
    signals: &SignalTable,
    day: usize,
    state: &PositionState,
    config: &StrategyConfig,
) -> Allocation {
    let row = prices.row(day);
    let regime = VolatilityRegime::classify(row.volatility, config);

    if regime == VolatilityRegime::Extreme {
        return Allocation {
            target: None,
            regime,
            stop: None,
        };
    }

    let stop = state.holding.as_ref().and_then(|h| {
        let price = row.closes[h.column];
        h.stop_breach(price, config.max_drawdown_stop, config.trailing_stop)
            .map(|kind| StopTrigger {
                instrument: h.instrument.clone(),
                kind,
                drawdown: h.drawdown_from_entry(price),
            })
    });

    let excluded = match (&stop, &state.holding) {
        (Some(_), Some(h)) if config.enforce_stops => Some(h.column),
        _ => None,
    };

    let point = signals.point(day);
    let mut best: Option<(usize, f64)> = None;
    if point.valid {
        for (pos, (&column, &score)) in signals.columns().iter().zip(&point.scores).enumerate() {
            if Some(column) == excluded || !score.is_finite() {
                continue;
            }
            // strict comparison keeps the first of equal maxima
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((pos, score));
            }
        }
    }

    let target = best
        .filter(|&(_, score)| score > config.base_threshold)
        .map(|(pos, _)| Target {
            column: signals.columns()[pos],
            instrument: signals.instruments()[pos].clone(),
            weight: regime.size_multiplier(),
        });

    Allocation {
        target,
        regime,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Holding;
    use crate::domain::price_table::PriceRow;
    use crate::domain::signal::compute_signals;
    use chrono::NaiveDate;

    // Two-day table; lookback 2 makes day 1 valid with
    // energy = (c1 - (c0 + c1) / 2) / ((c0 + c1) / 2).
    fn setup(xlk: [f64; 2], xle: [f64; 2], vix: f64) -> (PriceTable, SignalTable) {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = (0..2)
            .map(|i| PriceRow {
                date: start + chrono::Duration::days(i as i64),
                closes: vec![100.0, xlk[i], xle[i]],
                volatility: vix,
            })
            .collect();
        let table = PriceTable::new(
            vec!["SPY".into(), "XLK".into(), "XLE".into()],
            "SPY",
            "VIX",
            rows,
        )
        .unwrap();
        let signals = compute_signals(&table, 2);
        (table, signals)
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            base_threshold: 0.05,
            signal_window: 2,
            ..StrategyConfig::default()
        }
    }

    fn holding_xlk(entry: f64, peak: f64) -> PositionState {
        PositionState {
            cash: 0.0,
            holding: Some(Holding {
                column: 1,
                instrument: "XLK".into(),
                shares: 10,
                entry_price: entry,
                peak_price: peak,
            }),
        }
    }

    #[test]
    fn picks_strongest_signal_above_threshold() {
        // XLK energy = 20/100 = 0.2, XLE = 10/100 = 0.1
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &PositionState::new(1.0), &config());
        let target = alloc.target.as_ref().unwrap();
        assert_eq!(target.instrument, "XLK");
        assert_eq!(target.column, 1);
        assert_eq!(target.weight, 1.0);
        assert_eq!(alloc.regime, VolatilityRegime::Normal);
        assert_eq!(alloc.weight_of(1), 1.0);
        assert_eq!(alloc.weight_of(2), 0.0);
    }

    #[test]
    fn nothing_above_threshold_means_cash() {
        let (table, signals) = setup([100.0, 101.0], [100.0, 99.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &PositionState::new(1.0), &config());
        assert!(alloc.target.is_none());
    }

    #[test]
    fn signal_equal_to_threshold_is_not_enough() {
        // energy = 5/100 = 0.05 exactly
        let (table, signals) = setup([95.0, 105.0], [100.0, 100.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &PositionState::new(1.0), &config());
        assert!(alloc.target.is_none());
    }

    #[test]
    fn warmup_day_never_selects() {
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 15.0);
        let alloc = select_target(&table, &signals, 0, &PositionState::new(1.0), &config());
        assert!(alloc.target.is_none());
    }

    #[test]
    fn high_volatility_halves_weight() {
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 30.0);
        let alloc = select_target(&table, &signals, 1, &PositionState::new(1.0), &config());
        assert_eq!(alloc.regime, VolatilityRegime::High);
        assert_eq!(alloc.target.unwrap().weight, 0.5);
    }

    #[test]
    fn extreme_volatility_forces_cash_even_when_holding() {
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 55.0);
        let alloc = select_target(&table, &signals, 1, &holding_xlk(100.0, 120.0), &config());
        assert_eq!(alloc.regime, VolatilityRegime::Extreme);
        assert!(alloc.target.is_none());
    }

    #[test]
    fn threshold_boundaries_are_exclusive() {
        let c = config();
        assert_eq!(VolatilityRegime::classify(25.0, &c), VolatilityRegime::Normal);
        assert_eq!(VolatilityRegime::classify(25.01, &c), VolatilityRegime::High);
        assert_eq!(VolatilityRegime::classify(50.0, &c), VolatilityRegime::High);
        assert_eq!(VolatilityRegime::classify(50.01, &c), VolatilityRegime::Extreme);
    }

    #[test]
    fn tie_goes_to_first_instrument_in_column_order() {
        let (table, signals) = setup([80.0, 120.0], [80.0, 120.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &PositionState::new(1.0), &config());
        assert_eq!(alloc.target.unwrap().instrument, "XLK");
    }

    #[test]
    fn max_drawdown_breach_switches_to_next_candidate() {
        // Holding XLK entered at 160; today's 120 is 25% under entry.
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &holding_xlk(160.0, 160.0), &config());
        let stop = alloc.stop.clone().unwrap();
        assert_eq!(stop.kind, StopKind::MaxDrawdown);
        assert_eq!(stop.instrument, "XLK");
        assert!((stop.drawdown - (-0.25)).abs() < 1e-12);
        assert_eq!(alloc.target.unwrap().instrument, "XLE");
    }

    #[test]
    fn trailing_breach_with_no_alternative_goes_to_cash() {
        // XLE flat; XLK peaked at 130, now 120 (-7.7%).
        let (table, signals) = setup([80.0, 120.0], [100.0, 100.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &holding_xlk(110.0, 130.0), &config());
        assert_eq!(alloc.stop.as_ref().unwrap().kind, StopKind::Trailing);
        assert!(alloc.target.is_none());
    }

    #[test]
    fn unenforced_stop_is_reported_but_ignored() {
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 15.0);
        let c = StrategyConfig {
            enforce_stops: false,
            ..config()
        };
        let alloc = select_target(&table, &signals, 1, &holding_xlk(160.0, 160.0), &c);
        assert!(alloc.stop.is_some());
        assert_eq!(alloc.target.unwrap().instrument, "XLK");
    }

    #[test]
    fn healthy_holding_reports_no_stop() {
        let (table, signals) = setup([80.0, 120.0], [90.0, 110.0], 15.0);
        let alloc = select_target(&table, &signals, 1, &holding_xlk(100.0, 121.0), &config());
        assert!(alloc.stop.is_none());
        assert_eq!(alloc.target.unwrap().instrument, "XLK");
    }
}
