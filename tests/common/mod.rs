#![allow(dead_code)]

use chrono::NaiveDate;
use rotator::domain::error::RotatorError;
use rotator::domain::price_table::{PriceRow, PriceTable};
use rotator::domain::strategy::StrategyConfig;
use rotator::ports::data_port::PriceDataPort;

/// Serves a fixed table, or a fixed error.
pub struct MockPriceDataPort {
    pub table: Option<PriceTable>,
    pub error: Option<String>,
}

impl MockPriceDataPort {
    pub fn new(table: PriceTable) -> Self {
        Self {
            table: Some(table),
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            table: None,
            error: Some(reason.to_string()),
        }
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_prices(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceTable, RotatorError> {
        if let Some(reason) = &self.error {
            return Err(RotatorError::Data {
                reason: reason.clone(),
            });
        }
        let table = self.table.as_ref().ok_or_else(|| RotatorError::NoData {
            source_name: "mock".into(),
        })?;
        let first = table
            .rows()
            .iter()
            .position(|r| start_date.is_none_or(|s| r.date >= s))
            .unwrap_or(table.len());
        let last = table
            .rows()
            .iter()
            .rposition(|r| end_date.is_none_or(|e| r.date <= e))
            .map(|i| i + 1)
            .unwrap_or(0);
        Ok(table.slice(first..last.max(first)))
    }

    fn list_instruments(&self) -> Result<Vec<String>, RotatorError> {
        Ok(self
            .table
            .as_ref()
            .map(|t| t.instruments().to_vec())
            .unwrap_or_default())
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError> {
        Ok(self.table.as_ref().and_then(|t| {
            Some((t.first_date()?, t.last_date()?, t.len()))
        }))
    }
}

pub fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 3).unwrap() + chrono::Duration::days(i as i64)
}

/// Columns SPY (benchmark), A, B plus a VIX level per day.
pub fn make_table(
    days: usize,
    a: impl Fn(usize) -> f64,
    b: impl Fn(usize) -> f64,
    vix: impl Fn(usize) -> f64,
) -> PriceTable {
    let rows = (0..days)
        .map(|i| PriceRow {
            date: day(i),
            closes: vec![100.0 + (i % 7) as f64 * 0.5, a(i), b(i)],
            volatility: vix(i),
        })
        .collect();
    PriceTable::new(
        vec!["SPY".into(), "A".into(), "B".into()],
        "SPY",
        "VIX",
        rows,
    )
    .unwrap()
}

/// A rises 1% per day, B is flat, volatility is calm.
pub fn rising_table(days: usize) -> PriceTable {
    make_table(days, |i| 50.0 * 1.01_f64.powi(i as i32), |_| 40.0, |_| 15.0)
}

/// Deterministic oscillating prices for multi-window runs.
pub fn wavy_table(days: usize) -> PriceTable {
    make_table(
        days,
        |i| 60.0 + (i as f64 * 0.045).sin() * 12.0 + i as f64 * 0.01,
        |i| 45.0 + (i as f64 * 0.07 + 1.0).cos() * 8.0,
        |i| 20.0 + (i as f64 * 0.02).sin() * 18.0,
    )
}

pub fn flat_table(days: usize) -> PriceTable {
    make_table(days, |_| 50.0, |_| 40.0, |_| 15.0)
}

pub fn test_strategy() -> StrategyConfig {
    StrategyConfig {
        base_threshold: 0.05,
        signal_window: 20,
        ..StrategyConfig::default()
    }
}

/// Write a wide price CSV for `table` (with its VIX column) and return its contents.
pub fn table_to_csv(table: &PriceTable) -> String {
    let mut out = format!("date,{},{}\n", table.instruments().join(","), table.volatility_index());
    for row in table.rows() {
        let closes: Vec<String> = row.closes.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!("{},{},{}\n", row.date, closes.join(","), row.volatility));
    }
    out
}
