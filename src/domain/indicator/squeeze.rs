//! Squeeze detection: the Bollinger Band sitting strictly inside the Keltner Channel.

use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::bands::volatility_bands;
use crate::domain::indicator::true_range::TrueRangeMethod;
use crate::domain::indicator::{DerivedColumn, PriceColumns, Window};

/// Third row from the end.
pub const DEFAULT_LOOK_BACK: isize = -3;

/// Validated band columns of a frame produced by
/// [`volatility_bands`](crate::domain::indicator::bands::volatility_bands).
#[derive(Debug, Clone, Copy)]
pub struct BandColumns<'a> {
    pub lower_band: &'a [Option<f64>],
    pub upper_band: &'a [Option<f64>],
    pub lower_keltner: &'a [Option<f64>],
    pub upper_keltner: &'a [Option<f64>],
}

impl<'a> BandColumns<'a> {
    pub fn from_frame(frame: &'a Frame) -> Result<Self, SignalError> {
        Ok(Self {
            lower_band: frame.column(&DerivedColumn::LowerBand.name())?,
            upper_band: frame.column(&DerivedColumn::UpperBand.name())?,
            lower_keltner: frame.column(&DerivedColumn::LowerKeltner.name())?,
            upper_keltner: frame.column(&DerivedColumn::UpperKeltner.name())?,
        })
    }

    /// `None` when any band is still undefined at `row`.
    pub fn squeeze_at(&self, row: usize) -> Option<bool> {
        let lower_band = self.lower_band.get(row).copied().flatten()?;
        let upper_band = self.upper_band.get(row).copied().flatten()?;
        let lower_keltner = self.lower_keltner.get(row).copied().flatten()?;
        let upper_keltner = self.upper_keltner.get(row).copied().flatten()?;
        Some(lower_band > lower_keltner && upper_band < upper_keltner)
    }

    pub fn len(&self) -> usize {
        self.lower_band.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower_band.is_empty()
    }
}

/// Translate a positional offset into a row index: negative counts back from the
/// end (`-1` is the last row), non-negative is an absolute row.
pub fn resolve_offset(rows: usize, look_back: isize) -> Result<usize, SignalError> {
    let index = if look_back < 0 {
        rows.checked_sub(look_back.unsigned_abs())
    } else {
        let index = look_back as usize;
        (index < rows).then_some(index)
    };
    index.ok_or(SignalError::InsufficientHistory {
        requested: look_back,
        rows,
    })
}

/// Whether the frame is in a squeeze at `look_back`. Undefined bands at that row
/// read as "not in a squeeze".
pub fn is_in_squeeze(frame: &Frame, look_back: isize) -> Result<bool, SignalError> {
    let bands = BandColumns::from_frame(frame)?;
    let row = resolve_offset(bands.len(), look_back)?;
    Ok(bands.squeeze_at(row).unwrap_or(false))
}

/// Compute Bollinger and Keltner bands with one window, then test for a squeeze.
pub fn detect_squeeze(
    frame: &Frame,
    columns: &PriceColumns,
    method: TrueRangeMethod,
    window: Window,
    look_back: isize,
) -> Result<bool, SignalError> {
    let banded = volatility_bands(frame, columns, method, window)?;
    is_in_squeeze(&banded, look_back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn band_frame(rows: &[(Option<f64>, Option<f64>, Option<f64>, Option<f64>)]) -> Frame {
        let dates = (0..rows.len())
            .map(|i| NaiveDate::from_ymd_opt(2021, 4, (i + 1) as u32).unwrap())
            .collect();
        Frame::new(dates)
            .unwrap()
            .with_column("lower_band", rows.iter().map(|r| r.0).collect())
            .unwrap()
            .with_column("upper_band", rows.iter().map(|r| r.1).collect())
            .unwrap()
            .with_column("lower_keltner", rows.iter().map(|r| r.2).collect())
            .unwrap()
            .with_column("upper_keltner", rows.iter().map(|r| r.3).collect())
            .unwrap()
    }

    const INSIDE: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) =
        (Some(99.0), Some(101.0), Some(98.0), Some(102.0));
    const OUTSIDE: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) =
        (Some(95.0), Some(105.0), Some(98.0), Some(102.0));

    #[test]
    fn resolve_negative_offsets() {
        assert_eq!(resolve_offset(5, -1).unwrap(), 4);
        assert_eq!(resolve_offset(5, -3).unwrap(), 2);
        assert_eq!(resolve_offset(5, -5).unwrap(), 0);
        assert!(matches!(
            resolve_offset(2, -3),
            Err(SignalError::InsufficientHistory { requested: -3, rows: 2 })
        ));
    }

    #[test]
    fn resolve_absolute_offsets() {
        assert_eq!(resolve_offset(5, 0).unwrap(), 0);
        assert!(resolve_offset(5, 5).is_err());
        assert!(resolve_offset(0, 0).is_err());
    }

    #[test]
    fn squeeze_at_look_back_row() {
        let frame = band_frame(&[OUTSIDE, OUTSIDE, INSIDE, OUTSIDE, OUTSIDE]);
        assert!(is_in_squeeze(&frame, -3).unwrap());
        assert!(!is_in_squeeze(&frame, -1).unwrap());
        assert!(is_in_squeeze(&frame, 2).unwrap());
    }

    #[test]
    fn touching_bands_are_not_a_squeeze() {
        let frame = band_frame(&[(Some(98.0), Some(101.0), Some(98.0), Some(102.0))]);
        assert!(!is_in_squeeze(&frame, -1).unwrap());
    }

    #[test]
    fn undefined_bands_are_not_a_squeeze() {
        let frame = band_frame(&[(None, None, None, None), INSIDE]);
        assert!(!is_in_squeeze(&frame, -2).unwrap());
        assert!(is_in_squeeze(&frame, -1).unwrap());
    }

    #[test]
    fn too_short_for_look_back() {
        let frame = band_frame(&[INSIDE, INSIDE]);
        assert!(matches!(
            is_in_squeeze(&frame, DEFAULT_LOOK_BACK),
            Err(SignalError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn requires_band_columns() {
        let frame = Frame::new(vec![NaiveDate::from_ymd_opt(2021, 4, 1).unwrap()])
            .unwrap()
            .with_column("close", vec![Some(1.0)])
            .unwrap();
        assert!(matches!(
            is_in_squeeze(&frame, -1),
            Err(SignalError::MissingColumn { column }) if column == "lower_band"
        ));
    }

    #[test]
    fn detect_squeeze_on_flat_then_quiet_series() {
        // A calm series: tiny close-to-close moves inside wide intraday ranges puts
        // the Bollinger Band inside the Keltner Channel.
        let n = 30;
        let dates = (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2021, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect();
        let closes: Vec<Option<f64>> = (0..n)
            .map(|i| Some(100.0 + if i % 2 == 0 { 0.1 } else { -0.1 }))
            .collect();
        let frame = Frame::new(dates)
            .unwrap()
            .with_column("close", closes.clone())
            .unwrap()
            .with_column("high", closes.iter().map(|c| c.map(|v| v + 2.0)).collect())
            .unwrap()
            .with_column("low", closes.iter().map(|c| c.map(|v| v - 2.0)).collect())
            .unwrap();
        let squeezed = detect_squeeze(
            &frame,
            &PriceColumns::default(),
            TrueRangeMethod::Standard,
            Window::default(),
            DEFAULT_LOOK_BACK,
        )
        .unwrap();
        assert!(squeezed);
    }
}
