//! Technical indicator implementations.
//!
//! Each indicator reads named columns from a [`Frame`] and returns a copy of the
//! frame with its derived columns appended:
//! - [`rolling`]: SMA, EMA and rolling sample standard deviation
//! - [`true_range`]: per-bar true range and ATR
//! - [`bands`]: Bollinger Bands and Keltner Channel
//! - [`squeeze`]: Bollinger-inside-Keltner predicate
//! - [`turbulence`]: cross-sectional turbulence index over many instruments
//!
//! [`Frame`]: crate::domain::frame::Frame

pub mod bands;
pub mod rolling;
pub mod squeeze;
pub mod true_range;
pub mod turbulence;

use crate::domain::error::SignalError;
use std::fmt;

/// Number of trailing observations a rolling indicator covers. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window(usize);

impl Window {
    pub const DEFAULT: usize = 20;

    pub fn new(size: usize) -> Result<Self, SignalError> {
        if size == 0 {
            return Err(SignalError::InvalidWindow { window: size });
        }
        Ok(Self(size))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Rows at the head of a series that cannot hold a value yet.
    pub fn warmup(self) -> usize {
        self.0 - 1
    }
}

impl Default for Window {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a derived column. `Display` yields the column name appended to a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DerivedColumn {
    Sma(Window),
    Ema(Window),
    Stddev(Window),
    TrueRange,
    Atr,
    LowerBand,
    UpperBand,
    LowerKeltner,
    UpperKeltner,
    Ratio {
        numerator: String,
        denominator: String,
    },
}

impl DerivedColumn {
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DerivedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedColumn::Sma(window) => write!(f, "{}sma", window),
            DerivedColumn::Ema(window) => write!(f, "{}ema", window),
            DerivedColumn::Stddev(window) => write!(f, "{}stddev", window),
            DerivedColumn::TrueRange => write!(f, "true_range"),
            DerivedColumn::Atr => write!(f, "ATR"),
            DerivedColumn::LowerBand => write!(f, "lower_band"),
            DerivedColumn::UpperBand => write!(f, "upper_band"),
            DerivedColumn::LowerKeltner => write!(f, "lower_keltner"),
            DerivedColumn::UpperKeltner => write!(f, "upper_keltner"),
            DerivedColumn::Ratio {
                numerator,
                denominator,
            } => write!(f, "{}_perc_{}", numerator, denominator),
        }
    }
}

/// Names of the price columns a range or band computation reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceColumns {
    /// Column the moving average and standard deviation run over.
    pub metric: String,
    pub high: String,
    pub low: String,
    pub close: String,
}

impl Default for PriceColumns {
    fn default() -> Self {
        Self {
            metric: "close".into(),
            high: "high".into(),
            low: "low".into(),
            close: "close".into(),
        }
    }
}
