//! Price data access port trait.

use crate::domain::error::RotatorError;
use crate::domain::price_table::PriceTable;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Load a validated table restricted to the optional inclusive date range.
    fn fetch_prices(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceTable, RotatorError>;

    /// Tradable instrument names (benchmark included, volatility index excluded).
    fn list_instruments(&self) -> Result<Vec<String>, RotatorError>;

    /// First date, last date and row count of the usable data, if any.
    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotatorError>;
}
