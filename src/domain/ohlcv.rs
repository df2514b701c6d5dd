//! OHLCV bar representation.

use chrono::NaiveDate;

/// One daily bar for one instrument. Missing pre-history values are carried as NaN
/// and become the `None` sentinel once the bars are turned into a [`Frame`].
///
/// [`Frame`]: crate::domain::frame::Frame
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|), or high - low
    /// without a previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        true_range(self.high, self.low, prev_close)
    }
}

/// Wilder's true range for a single bar.
pub fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    let hl = high - low;
    match prev_close {
        Some(pc) => {
            let hc = (high - pc).abs();
            let lc = (low - pc).abs();
            hl.max(hc).max(lc)
        }
        None => hl,
    }
}
