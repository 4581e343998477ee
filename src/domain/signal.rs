//! Momentum signal generation.
//!
//! MA energy(n)[t] = (C[t] - SMA(n)[t]) / SMA(n)[t]
//! Warmup: the first n-1 days have no signal (scored 0.0, `valid == false`).
//! The benchmark column is never scored.

use chrono::NaiveDate;

use super::price_table::PriceTable;

/// Scores for one date, aligned with `SignalTable::instruments`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalTable {
    pub lookback: usize,
    instruments: Vec<String>,
    columns: Vec<usize>,
    points: Vec<SignalPoint>,
}

impl SignalTable {
    /// Names of the scored instruments, in canonical order.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Price-table column for each scored instrument.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> &SignalPoint {
        &self.points[index]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Score series for one instrument by name.
    pub fn series(&self, instrument: &str) -> Option<Vec<f64>> {
        let pos = self.instruments.iter().position(|n| n == instrument)?;
        Some(self.points.iter().map(|p| p.scores[pos]).collect())
    }
}

/// Trailing simple moving average; `None` until `window` values exist.
///
/// Each average is taken as an offset from the window's last value, so a
/// flat window averages to exactly that value.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &anchor)| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let offset: f64 = values[i + 1 - window..=i]
                .iter()
                .map(|v| v - anchor)
                .sum::<f64>()
                / window as f64;
            Some(anchor + offset)
        })
        .collect()
}

/// Fractional deviation of each close from its own trailing average.
pub fn ma_energy(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    moving_average(closes, window)
        .into_iter()
        .zip(closes)
        .map(|(ma, &close)| match ma {
            Some(ma) if ma != 0.0 => Some((close - ma) / ma),
            Some(_) => Some(0.0),
            None => None,
        })
        .collect()
}

pub fn compute_signals(prices: &PriceTable, lookback: usize) -> SignalTable {
    let columns = prices.tradable_columns();
    let instruments: Vec<String> = columns
        .iter()
        .map(|&col| prices.instruments()[col].clone())
        .collect();

    let energies: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|&col| ma_energy(&prices.closes(col), lookback))
        .collect();

    let points = prices
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let valid = lookback > 0 && i + 1 >= lookback;
            let scores = energies.iter().map(|e| e[i].unwrap_or(0.0)).collect();
            SignalPoint {
                date: row.date,
                valid,
                scores,
            }
        })
        .collect();

    SignalTable {
        lookback,
        instruments,
        columns,
        points,
    }
}
