//! Configuration validation.
//!
//! Validates every config field a command reads before any data is loaded.

use crate::domain::error::SignalError;
use crate::domain::indicator::true_range::TrueRangeMethod;
use crate::ports::config_port::ConfigPort;

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    validate_window(config)?;
    validate_true_range(config)?;
    validate_column_names(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    validate_source(config)?;
    validate_dates(config)?;
    Ok(())
}

/// Codes are only required by commands that walk the configured universe.
pub fn validate_codes(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let codes = config.get_list("data", "codes");
    let code = config.get_string("data", "code");

    match (codes.is_empty(), code) {
        (false, _) => Ok(()),
        (true, Some(c)) if !c.trim().is_empty() => Ok(()),
        _ => Err(SignalError::ConfigMissing {
            section: "data".to_string(),
            key: "codes".to_string(),
        }),
    }
}

pub fn validate_turbulence_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let warmup = config.get_int("turbulence", "warmup", 252);
    if warmup < 1 {
        return Err(SignalError::ConfigInvalid {
            section: "turbulence".to_string(),
            key: "warmup".to_string(),
            reason: "warmup must be at least 1".to_string(),
        });
    }
    if let Some(column) = config.get_string("turbulence", "price_column") {
        if column.trim().is_empty() {
            return Err(SignalError::ConfigInvalid {
                section: "turbulence".to_string(),
                key: "price_column".to_string(),
                reason: "price_column must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let value = config.get_int("indicators", "window", 20);
    if value < 1 {
        return Err(SignalError::ConfigInvalid {
            section: "indicators".to_string(),
            key: "window".to_string(),
            reason: "window must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_true_range(config: &dyn ConfigPort) -> Result<(), SignalError> {
    match config.get_string("indicators", "true_range") {
        None => Ok(()),
        Some(s) => s
            .parse::<TrueRangeMethod>()
            .map(|_| ())
            .map_err(|reason| SignalError::ConfigInvalid {
                section: "indicators".to_string(),
                key: "true_range".to_string(),
                reason,
            }),
    }
}

fn validate_column_names(config: &dyn ConfigPort) -> Result<(), SignalError> {
    for key in ["price_column", "high_column", "low_column", "close_column"] {
        if let Some(s) = config.get_string("indicators", key) {
            if s.trim().is_empty() {
                return Err(SignalError::ConfigInvalid {
                    section: "indicators".to_string(),
                    key: key.to_string(),
                    reason: format!("{} must not be empty", key),
                });
            }
        }
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => match config.get_string("data", "csv_dir") {
            Some(s) if !s.trim().is_empty() => Ok(()),
            _ => Err(SignalError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            }),
        },
        "sqlite" => match config.get_string("sqlite", "path") {
            Some(s) if !s.trim().is_empty() => Ok(()),
            _ => Err(SignalError::ConfigMissing {
                section: "sqlite".to_string(),
                key: "path".to_string(),
            }),
        },
        other => Err(SignalError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown source '{}', expected csv or sqlite", other),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let start = config.get_date("data", "start_date")?;
    let end = config.get_date("data", "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(SignalError::ConfigInvalid {
                section: "data".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must not be after end_date".to_string(),
            });
        }
    }
    Ok(())
}
