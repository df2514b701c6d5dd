//! Output port for derived series.

use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::turbulence::TurbulenceRecord;

pub trait SinkPort {
    /// Persist the named `columns` of `frame` for `code`. An empty slice stores
    /// every column.
    fn store_frame(&self, code: &str, frame: &Frame, columns: &[String])
    -> Result<(), SignalError>;

    fn store_turbulence(&self, records: &[TurbulenceRecord]) -> Result<(), SignalError>;
}

/// Columns of `frame` a sink should write for the `columns` selection.
pub fn selected_columns<'a>(
    frame: &'a Frame,
    columns: &'a [String],
) -> Result<Vec<(&'a str, &'a [Option<f64>])>, SignalError> {
    if columns.is_empty() {
        return frame
            .column_names()
            .map(|name| frame.column(name).map(|values| (name, values)))
            .collect();
    }
    columns
        .iter()
        .map(|name| frame.column(name).map(|values| (name.as_str(), values)))
        .collect()
}
