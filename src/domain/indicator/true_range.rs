//! True range and Average True Range.
//!
//! TR[0] = high - low; TR[i] = max(high - low, |high - C[i-1]|, |low - C[i-1]|).
//! ATR(n) is the rolling mean of TR over n bars, so its first (n-1) rows are `None`.

use crate::domain::error::SignalError;
use crate::domain::frame::{Column, Frame};
use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::indicator::{DerivedColumn, PriceColumns, Window};
use crate::domain::ohlcv;
use std::fmt;
use std::str::FromStr;

/// How a bar's range is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrueRangeMethod {
    /// Three-term Wilder true range, gap-aware through the previous close.
    #[default]
    Standard,
    /// |high - low| only; ignores overnight gaps.
    HighLow,
}

impl FromStr for TrueRangeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(TrueRangeMethod::Standard),
            "high_low" | "highlow" => Ok(TrueRangeMethod::HighLow),
            other => Err(format!(
                "unknown true range method '{other}' (expected standard or high_low)"
            )),
        }
    }
}

impl fmt::Display for TrueRangeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrueRangeMethod::Standard => write!(f, "standard"),
            TrueRangeMethod::HighLow => write!(f, "high_low"),
        }
    }
}

/// Validated column views a true range computation reads.
#[derive(Debug, Clone, Copy)]
pub struct RangeInputs<'a> {
    pub high: &'a [Option<f64>],
    pub low: &'a [Option<f64>],
    /// Present only for [`TrueRangeMethod::Standard`].
    pub close: Option<&'a [Option<f64>]>,
}

impl<'a> RangeInputs<'a> {
    pub fn resolve(
        frame: &'a Frame,
        columns: &PriceColumns,
        method: TrueRangeMethod,
    ) -> Result<Self, SignalError> {
        match method {
            TrueRangeMethod::Standard => {
                frame.require(&[
                    columns.high.as_str(),
                    columns.low.as_str(),
                    columns.close.as_str(),
                ])?
            }
            TrueRangeMethod::HighLow => {
                frame.require(&[columns.high.as_str(), columns.low.as_str()])?
            }
        }
        Ok(Self {
            high: frame.column(&columns.high)?,
            low: frame.column(&columns.low)?,
            close: match method {
                TrueRangeMethod::Standard => Some(frame.column(&columns.close)?),
                TrueRangeMethod::HighLow => None,
            },
        })
    }

    pub fn true_range(&self) -> Column {
        (0..self.high.len())
            .map(|i| {
                let (high, low) = (self.high[i]?, self.low[i]?);
                match self.close {
                    Some(close) => {
                        let prev_close = if i == 0 { None } else { close[i - 1] };
                        Some(ohlcv::true_range(high, low, prev_close))
                    }
                    None => Some((high - low).abs()),
                }
            })
            .collect()
    }
}

/// Append `true_range`.
pub fn true_range(
    frame: &Frame,
    columns: &PriceColumns,
    method: TrueRangeMethod,
) -> Result<Frame, SignalError> {
    let tr = RangeInputs::resolve(frame, columns, method)?.true_range();
    let mut out = frame.clone();
    out.insert_column(&DerivedColumn::TrueRange.name(), tr)?;
    Ok(out)
}

/// Append `true_range` and its rolling mean `ATR`.
pub fn avg_true_range(
    frame: &Frame,
    columns: &PriceColumns,
    method: TrueRangeMethod,
    window: Window,
) -> Result<Frame, SignalError> {
    let tr = RangeInputs::resolve(frame, columns, method)?.true_range();
    let atr = rolling_mean(&tr, window);
    let mut out = frame.clone();
    out.insert_column(&DerivedColumn::TrueRange.name(), tr)?;
    out.insert_column(&DerivedColumn::Atr.name(), atr)?;
    Ok(out)
}
