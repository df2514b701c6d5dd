//! Ratio helpers for ad-hoc feature engineering.
//!
//! Unlike the indicators, a zero denominator is not an error and not undefined: the
//! ratio is 0, so sparse financial ratios stay usable downstream.

use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::DerivedColumn;

pub fn divide_kernel(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Append `{numerator}_perc_{denominator}`. Missing operands give `None`.
pub fn divide(
    frame: &Frame,
    numerator_col: &str,
    denominator_col: &str,
) -> Result<Frame, SignalError> {
    frame.require(&[numerator_col, denominator_col])?;
    let numerators = frame.column(numerator_col)?;
    let denominators = frame.column(denominator_col)?;

    let values = numerators
        .iter()
        .zip(denominators)
        .map(|(n, d)| Some(divide_kernel((*n)?, (*d)?)))
        .collect();

    let name = DerivedColumn::Ratio {
        numerator: numerator_col.to_string(),
        denominator: denominator_col.to_string(),
    }
    .name();
    let mut out = frame.clone();
    out.insert_column(&name, values)?;
    Ok(out)
}
