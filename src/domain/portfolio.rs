//! Portfolio value and position history produced by a simulation run.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub daily_return: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioHistory {
    pub points: Vec<PortfolioPoint>,
}

impl PortfolioHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        PortfolioHistory {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, date: NaiveDate, value: f64, daily_return: f64) {
        self.points.push(PortfolioPoint {
            date,
            value,
            daily_return,
        });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.daily_return).collect()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

/// Share counts per instrument for one date, in price-table column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub date: NaiveDate,
    pub shares: Vec<u64>,
}

impl PositionRecord {
    pub fn held_count(&self) -> usize {
        self.shares.iter().filter(|&&s| s > 0).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionHistory {
    pub instruments: Vec<String>,
    pub records: Vec<PositionRecord>,
}

impl PositionHistory {
    pub fn new(instruments: Vec<String>) -> Self {
        PositionHistory {
            instruments,
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, date: NaiveDate, shares: Vec<u64>) {
        self.records.push(PositionRecord { date, shares });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn shares(&self, index: usize, instrument: &str) -> Option<u64> {
        let col = self.instruments.iter().position(|n| n == instrument)?;
        self.records.get(index).map(|r| r.shares[col])
    }
}
