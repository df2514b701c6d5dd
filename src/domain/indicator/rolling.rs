//! Rolling statistics: simple moving average, exponential moving average and
//! rolling sample standard deviation.
//!
//! SMA(n)[i]    = mean(x[i-n+1..=i])
//! STDDEV(n)[i] = sqrt(sum((x[j] - SMA(n)[i])^2) / (n - 1))
//! EMA(n): α = 2/(n+1), seeded with SMA(n), then EMA[i] = x[i]·α + EMA[i-1]·(1-α).
//!
//! Warmup: first (n-1) rows are `None`. A missing input anywhere in the trailing
//! window makes the row `None`; for the EMA a gap restarts the seeding.

use crate::domain::error::SignalError;
use crate::domain::frame::{Column, Frame};
use crate::domain::indicator::{DerivedColumn, Window};

pub fn rolling_mean(values: &[Option<f64>], window: Window) -> Column {
    let n = window.get();
    (0..values.len())
        .map(|i| {
            if i < window.warmup() {
                return None;
            }
            let sum = values[i + 1 - n..=i]
                .iter()
                .copied()
                .sum::<Option<f64>>()?;
            Some(sum / n as f64)
        })
        .collect()
}

pub fn rolling_sample_stddev(values: &[Option<f64>], window: Window) -> Column {
    let n = window.get();
    (0..values.len())
        .map(|i| {
            if n < 2 || i < window.warmup() {
                return None;
            }
            let slice = values[i + 1 - n..=i]
                .iter()
                .copied()
                .collect::<Option<Vec<f64>>>()?;
            let mean = slice.iter().sum::<f64>() / n as f64;
            let variance = slice
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (n - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

pub fn exponential_mean(values: &[Option<f64>], window: Window) -> Column {
    let n = window.get();
    let k = 2.0 / (n as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema: Option<f64> = None;
    let mut seed_sum = 0.0;
    let mut seed_count = 0;

    for value in values {
        match (*value, ema) {
            (None, _) => {
                ema = None;
                seed_sum = 0.0;
                seed_count = 0;
                out.push(None);
            }
            (Some(x), Some(prev)) => {
                let next = x * k + prev * (1.0 - k);
                ema = Some(next);
                out.push(ema);
            }
            (Some(x), None) => {
                seed_sum += x;
                seed_count += 1;
                if seed_count == n {
                    ema = Some(seed_sum / n as f64);
                }
                out.push(ema);
            }
        }
    }

    out
}

/// Append `{window}sma` computed over `column`.
pub fn sma(frame: &Frame, column: &str, window: Window) -> Result<Frame, SignalError> {
    append_rolling(frame, column, DerivedColumn::Sma(window), |v| {
        rolling_mean(v, window)
    })
}

/// Append `{window}ema` computed over `column`.
pub fn ema(frame: &Frame, column: &str, window: Window) -> Result<Frame, SignalError> {
    append_rolling(frame, column, DerivedColumn::Ema(window), |v| {
        exponential_mean(v, window)
    })
}

/// Append `{window}stddev` computed over `column`.
pub fn rolling_stddev(frame: &Frame, column: &str, window: Window) -> Result<Frame, SignalError> {
    append_rolling(frame, column, DerivedColumn::Stddev(window), |v| {
        rolling_sample_stddev(v, window)
    })
}

fn append_rolling(
    frame: &Frame,
    column: &str,
    derived: DerivedColumn,
    kernel: impl FnOnce(&[Option<f64>]) -> Column,
) -> Result<Frame, SignalError> {
    let values = kernel(frame.column(column)?);
    let mut out = frame.clone();
    out.insert_column(&derived.name(), values)?;
    Ok(out)
}
