//! Configuration validation.
//!
//! Every field is checked before any simulation runs. The first failure is
//! reported as `ConfigInvalid` with the INI section and key it came from.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::RotatorError;
use crate::domain::strategy::StrategyConfig;

pub fn validate_strategy(config: &StrategyConfig) -> Result<(), RotatorError> {
    validate_base_threshold(config)?;
    validate_windows(config)?;
    validate_ma_windows(config)?;
    validate_stops(config)?;
    validate_vix_thresholds(config)?;
    Ok(())
}

pub fn validate_backtest(config: &BacktestConfig) -> Result<(), RotatorError> {
    validate_initial_capital(config)?;
    validate_window_years(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

fn validate_base_threshold(config: &StrategyConfig) -> Result<(), RotatorError> {
    if !config.base_threshold.is_finite() || config.base_threshold <= 0.0 {
        return Err(RotatorError::invalid(
            "strategy",
            "base_threshold",
            "base_threshold must be positive",
        ));
    }
    Ok(())
}

fn validate_windows(config: &StrategyConfig) -> Result<(), RotatorError> {
    if config.signal_window < 2 {
        return Err(RotatorError::invalid(
            "strategy",
            "signal_window",
            "signal_window must be at least 2",
        ));
    }
    if config.vol_window < 2 {
        return Err(RotatorError::invalid(
            "strategy",
            "vol_window",
            "vol_window must be at least 2",
        ));
    }
    Ok(())
}

fn validate_ma_windows(config: &StrategyConfig) -> Result<(), RotatorError> {
    let [short, mid, long] = config.ma_windows;
    if short == 0 {
        return Err(RotatorError::invalid(
            "strategy",
            "ma_windows",
            "ma_windows must all be at least 1",
        ));
    }
    if !(short < mid && mid < long) {
        return Err(RotatorError::invalid(
            "strategy",
            "ma_windows",
            format!("ma_windows must be strictly ascending, got {short},{mid},{long}"),
        ));
    }
    Ok(())
}

fn fraction(section: &str, key: &str, value: f64) -> Result<(), RotatorError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(RotatorError::invalid(
            section,
            key,
            format!("{key} must be between 0 and 1 (exclusive)"),
        ));
    }
    Ok(())
}

fn validate_stops(config: &StrategyConfig) -> Result<(), RotatorError> {
    fraction("strategy", "trailing_stop", config.trailing_stop)?;
    fraction("strategy", "max_drawdown_stop", config.max_drawdown_stop)
}

fn validate_vix_thresholds(config: &StrategyConfig) -> Result<(), RotatorError> {
    if !config.vix_high_threshold.is_finite() || config.vix_high_threshold <= 0.0 {
        return Err(RotatorError::invalid(
            "strategy",
            "vix_high_threshold",
            "vix_high_threshold must be positive",
        ));
    }
    if !config.vix_extreme_threshold.is_finite()
        || config.vix_extreme_threshold <= config.vix_high_threshold
    {
        return Err(RotatorError::invalid(
            "strategy",
            "vix_extreme_threshold",
            "vix_extreme_threshold must be greater than vix_high_threshold",
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &BacktestConfig) -> Result<(), RotatorError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(RotatorError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

/// Upper bound on the window length in years.
pub const MAX_WINDOW_YEARS: usize = 100;

fn validate_window_years(config: &BacktestConfig) -> Result<(), RotatorError> {
    if config.window_years == 0 || config.window_years > MAX_WINDOW_YEARS {
        return Err(RotatorError::invalid(
            "backtest",
            "window_years",
            format!("window_years must be between 1 and {MAX_WINDOW_YEARS}"),
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &BacktestConfig) -> Result<(), RotatorError> {
    let rf = config.risk_free_rate;
    if !(0.0..1.0).contains(&rf) {
        return Err(RotatorError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &BacktestConfig) -> Result<(), RotatorError> {
    match (config.start_date, config.end_date) {
        (Some(start), Some(end)) if start >= end => Err(RotatorError::invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn assert_invalid(result: Result<(), RotatorError>, expected_key: &str) {
        match result {
            Err(RotatorError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_strategy(&StrategyConfig::default()).is_ok());
        assert!(validate_backtest(&BacktestConfig::default()).is_ok());
    }

    #[test]
    fn base_threshold_must_be_positive() {
        for bad in [0.0, -0.1, f64::NAN] {
            let c = StrategyConfig {
                base_threshold: bad,
                ..StrategyConfig::default()
            };
            assert_invalid(validate_strategy(&c), "base_threshold");
        }
    }

    #[test]
    fn signal_window_lower_bound() {
        let c = StrategyConfig {
            signal_window: 1,
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "signal_window");
        let c = StrategyConfig {
            signal_window: 2,
            ..StrategyConfig::default()
        };
        assert!(validate_strategy(&c).is_ok());
    }

    #[test]
    fn vol_window_lower_bound() {
        let c = StrategyConfig {
            vol_window: 0,
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "vol_window");
    }

    #[test]
    fn ma_windows_must_ascend() {
        let c = StrategyConfig {
            ma_windows: [40, 10, 140],
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "ma_windows");
        let c = StrategyConfig {
            ma_windows: [10, 10, 140],
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "ma_windows");
        let c = StrategyConfig {
            ma_windows: [0, 10, 140],
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "ma_windows");
    }

    #[test]
    fn stops_are_open_unit_fractions() {
        let c = StrategyConfig {
            trailing_stop: 0.0,
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "trailing_stop");
        let c = StrategyConfig {
            max_drawdown_stop: 1.0,
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "max_drawdown_stop");
    }

    #[test]
    fn extreme_threshold_above_high() {
        let c = StrategyConfig {
            vix_high_threshold: 50.0,
            vix_extreme_threshold: 50.0,
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "vix_extreme_threshold");
        let c = StrategyConfig {
            vix_high_threshold: -1.0,
            ..StrategyConfig::default()
        };
        assert_invalid(validate_strategy(&c), "vix_high_threshold");
    }

    #[test]
    fn backtest_capital_and_years() {
        let c = BacktestConfig {
            initial_capital: 0.0,
            ..BacktestConfig::default()
        };
        assert_invalid(validate_backtest(&c), "initial_capital");
        let c = BacktestConfig {
            window_years: 0,
            ..BacktestConfig::default()
        };
        assert_invalid(validate_backtest(&c), "window_years");
    }

    #[test]
    fn window_years_upper_bound() {
        let c = BacktestConfig {
            window_years: MAX_WINDOW_YEARS,
            ..BacktestConfig::default()
        };
        assert!(validate_backtest(&c).is_ok());
        for bad in [MAX_WINDOW_YEARS + 1, 100_000_000_000_000_000, usize::MAX] {
            let c = BacktestConfig {
                window_years: bad,
                ..BacktestConfig::default()
            };
            assert_invalid(validate_backtest(&c), "window_years");
        }
    }

    #[test]
    fn risk_free_rate_range() {
        for bad in [-0.01, 1.0, f64::NAN] {
            let c = BacktestConfig {
                risk_free_rate: bad,
                ..BacktestConfig::default()
            };
            assert_invalid(validate_backtest(&c), "risk_free_rate");
        }
        let c = BacktestConfig {
            risk_free_rate: 0.0,
            ..BacktestConfig::default()
        };
        assert!(validate_backtest(&c).is_ok());
    }

    #[test]
    fn start_must_precede_end() {
        let d = |y| NaiveDate::from_ymd_opt(y, 1, 1);
        let c = BacktestConfig {
            start_date: d(2020),
            end_date: d(2010),
            ..BacktestConfig::default()
        };
        assert_invalid(validate_backtest(&c), "start_date");
        let c = BacktestConfig {
            start_date: d(2010),
            end_date: None,
            ..BacktestConfig::default()
        };
        assert!(validate_backtest(&c).is_ok());
    }
}
