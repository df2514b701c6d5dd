//! Domain error types.

/// Top-level error type for volsignal.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("insufficient history: requested row {requested} of a {rows}-row series")]
    InsufficientHistory { requested: isize, rows: usize },

    #[error("covariance matrix is singular on {date} ({instruments} instruments)")]
    SingularMatrix {
        date: chrono::NaiveDate,
        instruments: usize,
    },

    #[error("invalid window {window}: must be at least 1")]
    InvalidWindow { window: usize },

    #[error("dates are not strictly increasing at row {row}")]
    UnorderedDates { row: usize },

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate observation for {instrument} on {date}")]
    DuplicateObservation {
        instrument: String,
        date: chrono::NaiveDate,
    },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalError {
    pub fn missing_column(column: &str) -> Self {
        SignalError::MissingColumn {
            column: column.to_string(),
        }
    }
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::Database { .. }
            | SignalError::DatabaseQuery { .. }
            | SignalError::DataSource { .. }
            | SignalError::Broker { .. } => 3,
            SignalError::MissingColumn { .. }
            | SignalError::InvalidWindow { .. }
            | SignalError::UnorderedDates { .. }
            | SignalError::LengthMismatch { .. }
            | SignalError::DuplicateObservation { .. } => 4,
            SignalError::NoData { .. } | SignalError::InsufficientHistory { .. } => 5,
            SignalError::SingularMatrix { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_message() {
        let err = SignalError::missing_column("close");
        assert_eq!(err.to_string(), "missing column 'close'");
    }

    #[test]
    fn insufficient_history_message() {
        let err = SignalError::InsufficientHistory {
            requested: -5,
            rows: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history: requested row -5 of a 3-row series"
        );
    }

    fn exit_code_of(err: &SignalError) -> String {
        format!("{:?}", std::process::ExitCode::from(err))
    }

    #[test]
    fn exit_codes_by_family() {
        use std::process::ExitCode;

        let singular = SignalError::SingularMatrix {
            date: chrono::NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(),
            instruments: 2,
        };
        assert_eq!(exit_code_of(&singular), format!("{:?}", ExitCode::from(6)));
        assert_eq!(
            exit_code_of(&SignalError::missing_column("x")),
            format!("{:?}", ExitCode::from(4))
        );
        assert_eq!(
            exit_code_of(&SignalError::NoData { code: "GME".into() }),
            format!("{:?}", ExitCode::from(5))
        );
    }
}
