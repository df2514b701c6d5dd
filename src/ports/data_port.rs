//! Data access port trait.

use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::turbulence::PriceObservation;
use chrono::NaiveDate;

/// Inclusive date bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

pub trait DataPort {
    /// One instrument's date-ascending frame within `range`.
    fn fetch_frame(&self, code: &str, range: DateRange) -> Result<Frame, SignalError>;

    fn list_symbols(&self) -> Result<Vec<String>, SignalError>;

    /// First date, last date and row count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalError>;

    /// Long-format prices for the turbulence index. For each code the first of
    /// `columns` present in its frame is used; codes without any of them fail with
    /// `MissingColumn`.
    fn fetch_prices(
        &self,
        codes: &[String],
        columns: &[String],
        range: DateRange,
    ) -> Result<Vec<PriceObservation>, SignalError> {
        let mut observations = Vec::new();
        for code in codes {
            let frame = self.fetch_frame(code, range)?;
            let column = columns
                .iter()
                .find(|c| frame.has_column(c))
                .ok_or_else(|| {
                    SignalError::missing_column(columns.first().map_or("", String::as_str))
                })?;
            let prices = frame.column(column)?;
            observations.extend(frame.dates().iter().zip(prices).map(|(date, price)| {
                PriceObservation {
                    date: *date,
                    instrument: code.clone(),
                    price: *price,
                }
            }));
        }
        Ok(observations)
    }
}
