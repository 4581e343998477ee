//! Performance statistics over daily value and return series.
//!
//! All functions are pure and annualize with 252 trading days per year.
//! Degenerate inputs (too few observations, zero volatility) yield 0.0
//! rather than an error.

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// The four statistics reported for one series within a window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceStats {
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

impl PerformanceStats {
    /// `values` drive return and drawdown; `returns` drive volatility and Sharpe.
    pub fn compute(values: &[f64], returns: &[f64], risk_free_rate: f64) -> Self {
        PerformanceStats {
            annual_return: annualized_return(values),
            volatility: annualized_volatility(returns),
            sharpe: sharpe_ratio(returns, risk_free_rate),
            max_drawdown: max_drawdown(values),
        }
    }
}

/// Day-over-day fractional change; the first element is 0.0.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(values.windows(2).map(|w| pct_change(w[0], w[1])));
    out
}

fn pct_change(prev: f64, curr: f64) -> f64 {
    if prev > 0.0 { curr / prev - 1.0 } else { 0.0 }
}

/// `(last / first)^(252 / n) - 1`, or 0.0 with fewer than two values.
pub fn annualized_return(values: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    if values.len() < 2 || first <= 0.0 {
        return 0.0;
    }
    let years = values.len() as f64 / TRADING_DAYS_PER_YEAR;
    let growth = last / first;
    let annual = growth.powf(1.0 / years) - 1.0;
    if annual.is_finite() { annual } else { 0.0 }
}

/// Sample standard deviation (n - 1) of daily returns, scaled by sqrt(252).
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_std(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// `(mean * 252 - rf) / annualized volatility`, 0.0 when volatility is zero.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let vol = annualized_volatility(returns);
    if vol == 0.0 {
        return 0.0;
    }
    let annual_mean = mean(returns) * TRADING_DAYS_PER_YEAR;
    (annual_mean - risk_free_rate) / vol
}

/// Largest peak-to-trough decline relative to the running maximum, in [0, 1].
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (peak - v) / peak;
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Mean absolute day-over-day change in value, times 252.
pub fn average_turnover(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values
        .windows(2)
        .map(|w| pct_change(w[0], w[1]).abs())
        .sum();
    total / (values.len() - 1) as f64 * TRADING_DAYS_PER_YEAR
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (xs.len() - 1) as f64).sqrt()
}
