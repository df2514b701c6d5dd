//! Per-instrument indicator pipeline and its typed settings.

use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::bands::volatility_bands;
use crate::domain::indicator::rolling::ema;
use crate::domain::indicator::squeeze::{resolve_offset, BandColumns, DEFAULT_LOOK_BACK};
use crate::domain::indicator::true_range::TrueRangeMethod;
use crate::domain::indicator::turbulence::TURBULENCE_WARMUP;
use crate::domain::indicator::{DerivedColumn, PriceColumns, Window};

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub window: Window,
    pub columns: PriceColumns,
    pub true_range: TrueRangeMethod,
    pub look_back: isize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            window: Window::default(),
            columns: PriceColumns::default(),
            true_range: TrueRangeMethod::default(),
            look_back: DEFAULT_LOOK_BACK,
        }
    }
}

impl IndicatorConfig {
    /// Every column [`derive_signals`] appends, in order.
    pub fn derived_columns(&self) -> Vec<DerivedColumn> {
        vec![
            DerivedColumn::Sma(self.window),
            DerivedColumn::Stddev(self.window),
            DerivedColumn::LowerBand,
            DerivedColumn::UpperBand,
            DerivedColumn::TrueRange,
            DerivedColumn::Atr,
            DerivedColumn::LowerKeltner,
            DerivedColumn::UpperKeltner,
            DerivedColumn::Ema(self.window),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurbulenceConfig {
    /// Candidate price columns; the first one a frame carries is used.
    pub price_columns: Vec<String>,
    pub warmup: usize,
}

impl Default for TurbulenceConfig {
    fn default() -> Self {
        Self {
            price_columns: vec!["adj_close".into(), "close".into()],
            warmup: TURBULENCE_WARMUP,
        }
    }
}

/// Append Bollinger, Keltner and EMA columns for one instrument.
pub fn derive_signals(frame: &Frame, config: &IndicatorConfig) -> Result<Frame, SignalError> {
    let banded = volatility_bands(frame, &config.columns, config.true_range, config.window)?;
    ema(&banded, &config.columns.metric, config.window)
}

/// Outcome of the squeeze check for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SqueezeReport {
    pub code: String,
    pub date: chrono::NaiveDate,
    pub in_squeeze: bool,
}

/// Run the full pipeline for `code` and evaluate the squeeze at the configured
/// look-back.
pub fn squeeze_report(
    code: &str,
    frame: &Frame,
    config: &IndicatorConfig,
) -> Result<SqueezeReport, SignalError> {
    let derived = derive_signals(frame, config)?;
    let bands = BandColumns::from_frame(&derived)?;
    let row = resolve_offset(bands.len(), config.look_back)?;
    Ok(SqueezeReport {
        code: code.to_string(),
        date: derived.dates()[row],
        in_squeeze: bands.squeeze_at(row).unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::squeeze::is_in_squeeze;
    use chrono::NaiveDate;

    fn frame(n: usize) -> Frame {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let dates = (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let closes: Vec<Option<f64>> = (0..n).map(|i| Some(100.0 + (i as f64).sin())).collect();
        Frame::new(dates)
            .unwrap()
            .with_column("close", closes.clone())
            .unwrap()
            .with_column("high", closes.iter().map(|c| c.map(|v| v + 1.0)).collect())
            .unwrap()
            .with_column("low", closes.iter().map(|c| c.map(|v| v - 1.0)).collect())
            .unwrap()
    }

    #[test]
    fn derive_signals_appends_every_configured_column() {
        let config = IndicatorConfig::default();
        let out = derive_signals(&frame(25), &config).unwrap();
        for column in config.derived_columns() {
            assert!(out.has_column(&column.name()), "{column}");
        }
    }

    #[test]
    fn squeeze_report_dates_the_look_back_row() {
        let config = IndicatorConfig::default();
        let f = frame(25);
        let report = squeeze_report("GME", &f, &config).unwrap();
        assert_eq!(report.code, "GME");
        assert_eq!(report.date, f.dates()[22]);
    }

    #[test]
    fn squeeze_report_agrees_with_predicate() {
        let f = frame(40);
        for look_back in [-1, -3, -10, 25] {
            let config = IndicatorConfig {
                look_back,
                ..IndicatorConfig::default()
            };
            let derived = derive_signals(&f, &config).unwrap();
            let report = squeeze_report("GME", &f, &config).unwrap();
            assert_eq!(report.in_squeeze, is_in_squeeze(&derived, look_back).unwrap());
        }
    }

    #[test]
    fn squeeze_report_on_short_frame() {
        let err = squeeze_report("GME", &frame(2), &IndicatorConfig::default()).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientHistory { .. }));
    }
}
