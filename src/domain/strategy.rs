//! Strategy parameter set.
//!
//! A `StrategyConfig` is built once (from an INI file, a sweep grid, or
//! code) and then passed by reference into every core operation. Nothing
//! in the engine mutates it.

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Minimum MA energy an instrument needs before it can be selected.
    pub base_threshold: f64,
    /// Moving-average lookback for the momentum signal; also the warm-up length.
    pub signal_window: usize,
    pub vol_window: usize,
    /// Trend windows, strictly ascending.
    pub ma_windows: [usize; 3],
    /// Exit when the close retraces this fraction from the peak since entry.
    pub trailing_stop: f64,
    /// Exit when the close is this fraction below the entry price.
    pub max_drawdown_stop: f64,
    /// Above this volatility-index level position size is halved.
    pub vix_high_threshold: f64,
    /// Above this volatility-index level everything goes to cash.
    pub vix_extreme_threshold: f64,
    /// When false, stop breaches are reported but do not change the target.
    pub enforce_stops: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            base_threshold: 0.1,
            signal_window: 120,
            vol_window: 30,
            ma_windows: [10, 40, 140],
            trailing_stop: 0.05,
            max_drawdown_stop: 0.20,
            vix_high_threshold: 25.0,
            vix_extreme_threshold: 50.0,
            enforce_stops: true,
        }
    }
}

impl StrategyConfig {
    /// Number of leading days the simulator spends in warm-up.
    pub fn min_history(&self) -> usize {
        self.signal_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_parameters() {
        let c = StrategyConfig::default();
        assert_eq!(c.base_threshold, 0.1);
        assert_eq!(c.signal_window, 120);
        assert_eq!(c.vol_window, 30);
        assert_eq!(c.ma_windows, [10, 40, 140]);
        assert_eq!(c.trailing_stop, 0.05);
        assert_eq!(c.max_drawdown_stop, 0.20);
        assert_eq!(c.vix_high_threshold, 25.0);
        assert_eq!(c.vix_extreme_threshold, 50.0);
        assert!(c.enforce_stops);
    }

    #[test]
    fn min_history_follows_signal_window() {
        let c = StrategyConfig {
            signal_window: 20,
            ..StrategyConfig::default()
        };
        assert_eq!(c.min_history(), 20);
    }
}
