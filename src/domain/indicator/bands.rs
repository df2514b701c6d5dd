//! Volatility envelopes around a simple moving average.
//!
//! Bollinger Bands: SMA(n) ± 2 × sample STDDEV(n).
//! Keltner Channel: SMA(n) ± 1.5 × ATR(n).
//!
//! Warmup: first (n-1) rows of every band column are `None`.

use crate::domain::error::SignalError;
use crate::domain::frame::{Column, Frame};
use crate::domain::indicator::rolling::{rolling_mean, rolling_sample_stddev};
use crate::domain::indicator::true_range::{RangeInputs, TrueRangeMethod};
use crate::domain::indicator::{DerivedColumn, PriceColumns, Window};

pub const BOLLINGER_STDDEV_MULT: f64 = 2.0;
pub const KELTNER_ATR_MULT: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerColumns {
    pub sma: Column,
    pub stddev: Column,
    pub lower: Column,
    pub upper: Column,
}

impl BollingerColumns {
    pub fn compute(values: &[Option<f64>], window: Window) -> Self {
        let sma = rolling_mean(values, window);
        let stddev = rolling_sample_stddev(values, window);
        let lower = offset(&sma, &stddev, -BOLLINGER_STDDEV_MULT);
        let upper = offset(&sma, &stddev, BOLLINGER_STDDEV_MULT);
        Self {
            sma,
            stddev,
            lower,
            upper,
        }
    }

    fn append_to(self, frame: &mut Frame, window: Window) -> Result<(), SignalError> {
        frame.insert_column(&DerivedColumn::Sma(window).name(), self.sma)?;
        frame.insert_column(&DerivedColumn::Stddev(window).name(), self.stddev)?;
        frame.insert_column(&DerivedColumn::LowerBand.name(), self.lower)?;
        frame.insert_column(&DerivedColumn::UpperBand.name(), self.upper)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeltnerColumns {
    pub sma: Column,
    pub true_range: Column,
    pub atr: Column,
    pub lower: Column,
    pub upper: Column,
}

impl KeltnerColumns {
    pub fn compute(metric: &[Option<f64>], range: &RangeInputs<'_>, window: Window) -> Self {
        let sma = rolling_mean(metric, window);
        let true_range = range.true_range();
        let atr = rolling_mean(&true_range, window);
        let lower = offset(&sma, &atr, -KELTNER_ATR_MULT);
        let upper = offset(&sma, &atr, KELTNER_ATR_MULT);
        Self {
            sma,
            true_range,
            atr,
            lower,
            upper,
        }
    }

    fn append_to(self, frame: &mut Frame, window: Window) -> Result<(), SignalError> {
        frame.insert_column(&DerivedColumn::Sma(window).name(), self.sma)?;
        frame.insert_column(&DerivedColumn::TrueRange.name(), self.true_range)?;
        frame.insert_column(&DerivedColumn::Atr.name(), self.atr)?;
        frame.insert_column(&DerivedColumn::LowerKeltner.name(), self.lower)?;
        frame.insert_column(&DerivedColumn::UpperKeltner.name(), self.upper)?;
        Ok(())
    }
}

/// center + mult × width, cell-wise.
fn offset(center: &[Option<f64>], width: &[Option<f64>], mult: f64) -> Column {
    center
        .iter()
        .zip(width)
        .map(|(c, w)| Some((*c)? + mult * (*w)?))
        .collect()
}

/// Append `{n}sma`, `{n}stddev`, `lower_band` and `upper_band`.
pub fn bollinger_bands(frame: &Frame, metric: &str, window: Window) -> Result<Frame, SignalError> {
    let bands = BollingerColumns::compute(frame.column(metric)?, window);
    let mut out = frame.clone();
    bands.append_to(&mut out, window)?;
    Ok(out)
}

/// Append `{n}sma`, `true_range`, `ATR`, `lower_keltner` and `upper_keltner`.
pub fn keltner_channel(
    frame: &Frame,
    columns: &PriceColumns,
    method: TrueRangeMethod,
    window: Window,
) -> Result<Frame, SignalError> {
    let metric = frame.column(&columns.metric)?;
    let range = RangeInputs::resolve(frame, columns, method)?;
    let channel = KeltnerColumns::compute(metric, &range, window);
    let mut out = frame.clone();
    channel.append_to(&mut out, window)?;
    Ok(out)
}

/// Append both Bollinger and Keltner columns. Every input column is validated
/// before anything is computed.
pub fn volatility_bands(
    frame: &Frame,
    columns: &PriceColumns,
    method: TrueRangeMethod,
    window: Window,
) -> Result<Frame, SignalError> {
    let metric = frame.column(&columns.metric)?;
    let range = RangeInputs::resolve(frame, columns, method)?;
    let bands = BollingerColumns::compute(metric, window);
    let channel = KeltnerColumns::compute(metric, &range, window);
    let mut out = frame.clone();
    bands.append_to(&mut out, window)?;
    channel.append_to(&mut out, window)?;
    Ok(out)
}
