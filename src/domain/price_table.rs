//! Date-indexed table of daily closes for the tradable universe plus a
//! volatility index.
//!
//! The table is built once per run by a data adapter and is read-only to
//! the rest of the domain. Construction validates the invariants the
//! simulator relies on: strictly increasing dates, one positive close per
//! instrument per row, and a finite volatility-index level.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::ops::Range;

use super::error::RotatorError;

/// One trading day: closes in table column order plus the volatility index.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub closes: Vec<f64>,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    instruments: Vec<String>,
    benchmark: usize,
    volatility_index: String,
    rows: Vec<PriceRow>,
}

impl PriceTable {
    /// Build a validated table. `instruments` fixes the canonical column
    /// order; `benchmark` must be one of them.
    pub fn new(
        instruments: Vec<String>,
        benchmark: &str,
        volatility_index: &str,
        rows: Vec<PriceRow>,
    ) -> Result<Self, RotatorError> {
        if instruments.is_empty() {
            return Err(RotatorError::prices("no instruments"));
        }

        let mut seen = HashSet::new();
        for name in &instruments {
            if !seen.insert(name.as_str()) {
                return Err(RotatorError::prices(format!("duplicate instrument {name}")));
            }
        }
        if seen.contains(volatility_index) {
            return Err(RotatorError::prices(format!(
                "volatility index {volatility_index} is also listed as an instrument"
            )));
        }

        let benchmark_idx = instruments
            .iter()
            .position(|name| name == benchmark)
            .ok_or_else(|| {
                RotatorError::prices(format!("benchmark {benchmark} is not an instrument"))
            })?;

        for (i, row) in rows.iter().enumerate() {
            if row.closes.len() != instruments.len() {
                return Err(RotatorError::prices(format!(
                    "row {} ({}) has {} closes, expected {}",
                    i,
                    row.date,
                    row.closes.len(),
                    instruments.len()
                )));
            }
            if let Some(col) = row.closes.iter().position(|c| !c.is_finite() || *c <= 0.0) {
                return Err(RotatorError::prices(format!(
                    "non-positive close for {} on {}",
                    instruments[col], row.date
                )));
            }
            if !row.volatility.is_finite() || row.volatility < 0.0 {
                return Err(RotatorError::prices(format!(
                    "invalid {} level on {}",
                    volatility_index, row.date
                )));
            }
            if i > 0 && rows[i - 1].date >= row.date {
                return Err(RotatorError::prices(format!(
                    "dates not strictly increasing at {}",
                    row.date
                )));
            }
        }

        Ok(PriceTable {
            instruments,
            benchmark: benchmark_idx,
            volatility_index: volatility_index.to_string(),
            rows,
        })
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn benchmark_column(&self) -> usize {
        self.benchmark
    }

    pub fn benchmark(&self) -> &str {
        &self.instruments[self.benchmark]
    }

    pub fn volatility_index(&self) -> &str {
        &self.volatility_index
    }

    pub fn column(&self, instrument: &str) -> Option<usize> {
        self.instruments.iter().position(|name| name == instrument)
    }

    /// Columns eligible for momentum scoring: every instrument except the benchmark.
    pub fn tradable_columns(&self) -> Vec<usize> {
        (0..self.instruments.len())
            .filter(|&col| col != self.benchmark)
            .collect()
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &PriceRow {
        &self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Close series for one column across the whole table.
    pub fn closes(&self, column: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r.closes[column]).collect()
    }

    pub fn benchmark_closes(&self) -> Vec<f64> {
        self.closes(self.benchmark)
    }

    pub fn volatility_levels(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.volatility).collect()
    }

    /// Copy of a contiguous range of rows. Slicing an already validated
    /// table cannot break its invariants, so no re-validation happens.
    pub fn slice(&self, range: Range<usize>) -> PriceTable {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        PriceTable {
            instruments: self.instruments.clone(),
            benchmark: self.benchmark,
            volatility_index: self.volatility_index.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }
}
