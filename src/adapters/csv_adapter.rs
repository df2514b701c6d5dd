//! CSV file data adapter and sink.
//!
//! Each instrument lives in `{CODE}.csv` under one directory. The file is read by
//! header: a `date` column is required and every other column becomes a numeric
//! frame column under its snake_case name (`Adj Close` becomes `adj_close`).
//! Text identifier columns such as `stock_ticker` are skipped.

use crate::domain::error::SignalError;
use crate::domain::frame::{Column, Frame};
use crate::domain::indicator::turbulence::TurbulenceRecord;
use crate::ports::data_port::{DataPort, DateRange};
use crate::ports::sink_port::{selected_columns, SinkPort};
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

/// `Adj Close` -> `adj_close`.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Per-row instrument labels written alongside the prices; never numeric.
const IDENTIFIER_COLUMNS: [&str; 4] = ["stock_ticker", "ticker", "symbol", "code"];

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn parse_cell(value: &str) -> Result<Option<f64>, String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("null")
    {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|e| format!("invalid value '{}': {}", value, e))
}

/// Parse one instrument's CSV into a date-ascending frame limited to `range`.
pub fn read_frame<R: io::Read>(reader: R, range: DateRange) -> Result<Frame, SignalError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| SignalError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let date_idx = headers
        .iter()
        .position(|h| h == "date")
        .ok_or_else(|| SignalError::missing_column("date"))?;
    let value_columns: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, header)| {
            if *idx == date_idx {
                return false;
            }
            let identifier = IDENTIFIER_COLUMNS.contains(&header.as_str());
            if identifier {
                tracing::debug!(column = %header, "skipping identifier column");
            }
            !identifier
        })
        .collect();

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| SignalError::DataSource {
            reason: format!("CSV parse error: {}", e),
        })?;

        let date_str = record.get(date_idx).unwrap_or_default();
        let date = parse_date(date_str).ok_or_else(|| SignalError::DataSource {
            reason: format!("invalid date '{}', expected YYYY-MM-DD", date_str),
        })?;
        if !range.contains(date) {
            continue;
        }

        let mut values = Vec::with_capacity(value_columns.len());
        for &(idx, header) in &value_columns {
            let cell = parse_cell(record.get(idx).unwrap_or_default()).map_err(|reason| {
                SignalError::DataSource {
                    reason: format!("{} on {}: {}", header, date, reason),
                }
            })?;
            values.push(cell);
        }
        rows.push((date, values));
    }

    rows.sort_by_key(|(date, _)| *date);

    let mut frame = Frame::new(rows.iter().map(|(d, _)| *d).collect())?;
    for (col, &(_, header)) in value_columns.iter().enumerate() {
        let values: Column = rows.iter().map(|(_, v)| v[col]).collect();
        frame.insert_column(header, values)?;
    }
    Ok(frame)
}

/// Write `date` plus the selected columns. Undefined cells are left empty.
pub fn write_frame<W: io::Write>(
    writer: W,
    frame: &Frame,
    columns: &[String],
) -> Result<(), SignalError> {
    let selected = selected_columns(frame, columns)?;
    let mut wtr = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| SignalError::DataSource {
        reason: format!("CSV write error: {}", e),
    };

    let mut header = vec!["date"];
    header.extend(selected.iter().map(|(name, _)| *name));
    wtr.write_record(&header).map_err(csv_err)?;

    for (row, date) in frame.dates().iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(
            selected
                .iter()
                .map(|(_, values)| values[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_turbulence<W: io::Write>(
    writer: W,
    records: &[TurbulenceRecord],
) -> Result<(), SignalError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record).map_err(|e| SignalError::DataSource {
            reason: format!("CSV write error: {}", e),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

impl DataPort for CsvAdapter {
    fn fetch_frame(&self, code: &str, range: DateRange) -> Result<Frame, SignalError> {
        let path = self.csv_path(code);
        let file = fs::File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SignalError::NoData {
                code: code.to_string(),
            },
            _ => SignalError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;
        read_frame(file, range)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SignalError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SignalError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalError> {
        let frame = match self.fetch_frame(code, DateRange::default()) {
            Ok(frame) => frame,
            Err(SignalError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (frame.dates().first(), frame.dates().last()) {
            (Some(first), Some(last)) => Some((*first, *last, frame.len())),
            _ => None,
        })
    }
}

/// Writes derived frames to `{CODE}_signals.csv` and turbulence to
/// `turbulence.csv` inside one directory.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn frame_path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{}_signals.csv", code))
    }

    pub fn turbulence_path(&self) -> PathBuf {
        self.dir.join("turbulence.csv")
    }

    fn create(path: &Path) -> Result<fs::File, SignalError> {
        fs::File::create(path).map_err(SignalError::from)
    }
}

impl SinkPort for CsvSink {
    fn store_frame(
        &self,
        code: &str,
        frame: &Frame,
        columns: &[String],
    ) -> Result<(), SignalError> {
        let path = self.frame_path(code);
        write_frame(Self::create(&path)?, frame, columns)?;
        tracing::debug!(code, path = %path.display(), "stored signal frame");
        Ok(())
    }

    fn store_turbulence(&self, records: &[TurbulenceRecord]) -> Result<(), SignalError> {
        let path = self.turbulence_path();
        write_turbulence(Self::create(&path)?, records)?;
        tracing::debug!(rows = records.len(), path = %path.display(), "stored turbulence");
        Ok(())
    }
}
