//! Date-indexed table of named numeric columns.
//!
//! A [`Frame`] holds one instrument's time series. Cells are `Option<f64>`:
//! `None` is the "no value yet" sentinel used both for missing input data and for
//! rows where a windowed indicator lacks history. Indicator functions never mutate
//! a frame in place; they clone it and append their derived columns.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub type Column = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    dates: Vec<NaiveDate>,
    columns: Vec<(String, Column)>,
}

impl Frame {
    /// Create an empty-column frame over `dates`, which must be strictly increasing.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, SignalError> {
        if let Some(row) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SignalError::UnorderedDates { row: row + 1 });
        }
        Ok(Self {
            dates,
            columns: Vec::new(),
        })
    }

    /// Build a frame with `open`, `high`, `low`, `close`, `adj_close` and `volume`
    /// columns. Non-finite values become `None`.
    pub fn from_bars(bars: &[OhlcvBar]) -> Result<Self, SignalError> {
        let mut frame = Frame::new(bars.iter().map(|b| b.date).collect())?;
        let fields: [(&str, fn(&OhlcvBar) -> f64); 6] = [
            ("open", |b| b.open),
            ("high", |b| b.high),
            ("low", |b| b.low),
            ("close", |b| b.close),
            ("adj_close", |b| b.adj_close),
            ("volume", |b| b.volume),
        ];
        for (name, get) in fields {
            let values = bars.iter().map(|b| finite(get(b))).collect();
            frame.insert_column(name, values)?;
        }
        Ok(frame)
    }

    /// Builder form of [`Frame::insert_column`].
    pub fn with_column(mut self, name: &str, values: Column) -> Result<Self, SignalError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Append a column, or overwrite an existing column of the same name in place.
    pub fn insert_column(&mut self, name: &str, values: Column) -> Result<(), SignalError> {
        if values.len() != self.dates.len() {
            return Err(SignalError::LengthMismatch {
                column: name.to_string(),
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name.to_string(), values)),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>], SignalError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| SignalError::missing_column(name))
    }

    /// Fail with the first absent column in `names`.
    pub fn require(&self, names: &[&str]) -> Result<(), SignalError> {
        match names.iter().find(|n| !self.has_column(n)) {
            Some(missing) => Err(SignalError::missing_column(missing)),
            None => Ok(()),
        }
    }

    /// Value of `name` at `row`; `Ok(None)` for an undefined cell.
    pub fn value(&self, name: &str, row: usize) -> Result<Option<f64>, SignalError> {
        let values = self.column(name)?;
        values
            .get(row)
            .copied()
            .ok_or(SignalError::InsufficientHistory {
                requested: row as isize,
                rows: values.len(),
            })
    }
}

pub(crate) fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
