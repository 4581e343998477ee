//! Single-position holding state and stop-rule checks.

use super::price_table::PriceRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// Close fell more than `max_drawdown_stop` below the entry price.
    MaxDrawdown,
    /// Close retraced more than `trailing_stop` from the peak since entry.
    Trailing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    /// Price-table column of the held instrument.
    pub column: usize,
    pub instrument: String,
    pub shares: u64,
    pub entry_price: f64,
    /// Highest close seen since entry.
    pub peak_price: f64,
}

impl Holding {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares as f64 * (price - self.entry_price)
    }

    /// Signed move from entry: negative when under water.
    pub fn drawdown_from_entry(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price
    }

    /// Signed move from the running peak (never positive once the peak includes `price`).
    pub fn retracement_from_peak(&self, price: f64) -> f64 {
        let peak = self.peak_price.max(price);
        (price - peak) / peak
    }

    /// The max-drawdown stop is checked first; only one kind is reported.
    pub fn stop_breach(
        &self,
        price: f64,
        max_drawdown_stop: f64,
        trailing_stop: f64,
    ) -> Option<StopKind> {
        if self.drawdown_from_entry(price) < -max_drawdown_stop {
            Some(StopKind::MaxDrawdown)
        } else if self.retracement_from_peak(price) < -trailing_stop {
            Some(StopKind::Trailing)
        } else {
            None
        }
    }
}

/// Cash plus at most one holding. Owned by one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionState {
    pub cash: f64,
    pub holding: Option<Holding>,
}

impl PositionState {
    pub fn new(initial_capital: f64) -> Self {
        PositionState {
            cash: initial_capital,
            holding: None,
        }
    }

    pub fn shares_of(&self, column: usize) -> u64 {
        match &self.holding {
            Some(h) if h.column == column => h.shares,
            _ => 0,
        }
    }

    pub fn holdings_value(&self, row: &PriceRow) -> f64 {
        self.holding
            .as_ref()
            .map(|h| h.market_value(row.closes[h.column]))
            .unwrap_or(0.0)
    }

    /// Cash plus holdings marked at the row's closes.
    pub fn total_value(&self, row: &PriceRow) -> f64 {
        self.cash + self.holdings_value(row)
    }

    /// Advance the peak close of the current holding.
    pub fn mark(&mut self, row: &PriceRow) {
        if let Some(h) = self.holding.as_mut() {
            let price = row.closes[h.column];
            if price > h.peak_price {
                h.peak_price = price;
            }
        }
    }
}
