//! Wide CSV price file adapter.
//!
//! Expected layout: a `date` column (YYYY-MM-DD) followed by one close
//! column per instrument and one column for the volatility index:
//!
//! ```text
//! date,SPY,XLK,XLE,VIX
//! 2020-01-02,324.87,92.35,60.45,12.47
//! ```
//!
//! Rows with a missing or unparseable field are dropped, mirroring a
//! drop-NA pass over the merged download.

use crate::domain::error::RotatorError;
use crate::domain::price_table::{PriceRow, PriceTable};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct CsvPriceAdapter {
    path: PathBuf,
    benchmark: String,
    volatility_index: String,
}

struct Layout {
    instruments: Vec<String>,
    /// CSV field index for each instrument, aligned with `instruments`.
    instrument_fields: Vec<usize>,
    volatility_field: usize,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf, benchmark: &str, volatility_index: &str) -> Self {
        Self {
            path,
            benchmark: benchmark.to_string(),
            volatility_index: volatility_index.to_string(),
        }
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    fn reader(&self) -> Result<csv::Reader<std::io::Cursor<String>>, RotatorError> {
        let content = fs::read_to_string(&self.path).map_err(|e| RotatorError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        Ok(csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(std::io::Cursor::new(content)))
    }

    fn layout(&self, headers: &csv::StringRecord) -> Result<Layout, RotatorError> {
        let mut instruments = Vec::new();
        let mut instrument_fields = Vec::new();
        let mut volatility_field = None;

        for (i, name) in headers.iter().enumerate().skip(1) {
            if name == self.volatility_index {
                volatility_field = Some(i);
            } else {
                instruments.push(name.to_string());
                instrument_fields.push(i);
            }
        }

        let volatility_field = volatility_field.ok_or_else(|| RotatorError::Data {
            reason: format!(
                "volatility index column '{}' not found in {}",
                self.volatility_index,
                self.source_name()
            ),
        })?;

        Ok(Layout {
            instruments,
            instrument_fields,
            volatility_field,
        })
    }

    fn parse_row(record: &csv::StringRecord, layout: &Layout) -> Option<PriceRow> {
        let field = |i: usize| -> Option<f64> {
            record
                .get(i)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        let date = NaiveDate::parse_from_str(record.get(0)?, "%Y-%m-%d").ok()?;
        let closes = layout
            .instrument_fields
            .iter()
            .map(|&i| field(i))
            .collect::<Option<Vec<f64>>>()?;
        let volatility = field(layout.volatility_field)?;

        Some(PriceRow {
            date,
            closes,
            volatility,
        })
    }

    fn load_rows(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(Layout, Vec<PriceRow>), RotatorError> {
        let mut rdr = self.reader()?;
        let headers = rdr
            .headers()
            .map_err(|e| RotatorError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();
        let layout = self.layout(&headers)?;

        let mut rows = Vec::new();
        let mut dropped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| RotatorError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let Some(row) = Self::parse_row(&record, &layout) else {
                dropped += 1;
                continue;
            };

            if start_date.is_some_and(|s| row.date < s) || end_date.is_some_and(|e| row.date > e) {
                continue;
            }
            rows.push(row);
        }

        if dropped > 0 {
            warn!(
                source = %self.source_name(),
                dropped,
                "dropped rows with missing or unparseable fields"
            );
        }

        rows.sort_by_key(|r| r.date);
        let before = rows.len();
        rows.dedup_by_key(|r| r.date);
        if rows.len() < before {
            warn!(
                source = %self.source_name(),
                duplicates = before - rows.len(),
                "dropped duplicate dates"
            );
        }

        Ok((layout, rows))
    }
}

impl PriceDataPort for CsvPriceAdapter {
    fn fetch_prices(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceTable, RotatorError> {
        let (layout, rows) = self.load_rows(start_date, end_date)?;
        if rows.is_empty() {
            return Err(RotatorError::NoData {
                source_name: self.source_name(),
            });
        }
        debug!(rows = rows.len(), instruments = layout.instruments.len(), "loaded prices");
        PriceTable::new(layout.instruments, &self.benchmark, &self.volatility_index, rows)
    }

    fn list_instruments(&self) -> Result<Vec<String>, RotatorError> {
        let mut rdr = self.reader()?;
        let headers = rdr.headers().map_err(|e| RotatorError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        Ok(self.layout(headers)?.instruments)
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError> {
        let (_, rows) = self.load_rows(None, None)?;
        Ok(match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, rows.len())),
            _ => None,
        })
    }
}
