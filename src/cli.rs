//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{write_frame, write_turbulence, CsvAdapter, CsvSink};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{
    derive_signals, squeeze_report, IndicatorConfig, SqueezeReport, TurbulenceConfig,
};
use crate::domain::config_validation::{
    validate_codes, validate_data_config, validate_indicator_config, validate_turbulence_config,
};
use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::squeeze::DEFAULT_LOOK_BACK;
use crate::domain::indicator::turbulence::{
    turbulence_index_with_warmup, PriceMatrix, TurbulenceRecord,
};
use crate::domain::indicator::{DerivedColumn, PriceColumns, Window};
use crate::domain::ratio::divide;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, DateRange};
use crate::ports::sink_port::SinkPort;

#[derive(Parser, Debug)]
#[command(name = "volsignal", about = "Volatility bands, squeeze and turbulence signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute moving averages, true range and volatility bands for one code
    Bands {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also persist the derived columns to the configured sink
        #[arg(long)]
        store: bool,
    },
    /// Report whether each configured code is in a squeeze
    Squeeze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        look_back: Option<isize>,
    },
    /// Compute the turbulence index across the configured codes
    Turbulence {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        store: bool,
    },
    /// Append a ratio column to one code's prices
    Ratio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long)]
        numerator: String,
        #[arg(long)]
        denominator: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List codes available in the data source
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for code(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Bands {
            config,
            code,
            output,
            store,
        } => run_bands(&config, &code, output.as_deref(), store),
        Command::Squeeze {
            config,
            code,
            look_back,
        } => run_squeeze(&config, code.as_deref(), look_back),
        Command::Turbulence {
            config,
            output,
            store,
        } => run_turbulence(&config, output.as_deref(), store),
        Command::Ratio {
            config,
            code,
            numerator,
            denominator,
            output,
        } => run_ratio(&config, &code, &numerator, &denominator, output.as_deref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SignalError> {
    tracing::info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub source: SourceKind,
    pub csv_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub range: DateRange,
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, SignalError> {
    validate_data_config(config)?;
    let source = match config
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("sqlite") => SourceKind::Sqlite,
        _ => SourceKind::Csv,
    };
    let path = |key: &str| {
        config
            .get_string("data", key)
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
    };
    Ok(DataConfig {
        source,
        csv_dir: path("csv_dir"),
        output_dir: path("output_dir"),
        range: DateRange::new(
            config.get_date("data", "start_date")?,
            config.get_date("data", "end_date")?,
        ),
    })
}

pub fn build_indicator_config(config: &dyn ConfigPort) -> Result<IndicatorConfig, SignalError> {
    validate_indicator_config(config)?;
    let defaults = PriceColumns::default();
    let column = |key: &str, default: String| {
        config
            .get_string("indicators", key)
            .map(|s| s.trim().to_string())
            .unwrap_or(default)
    };

    let window =
        Window::new(config.get_int("indicators", "window", Window::DEFAULT as i64) as usize)?;
    let true_range = match config.get_string("indicators", "true_range") {
        Some(s) => s.parse().map_err(|reason| SignalError::ConfigInvalid {
            section: "indicators".to_string(),
            key: "true_range".to_string(),
            reason,
        })?,
        None => Default::default(),
    };

    Ok(IndicatorConfig {
        window,
        columns: PriceColumns {
            metric: column("price_column", defaults.metric),
            high: column("high_column", defaults.high),
            low: column("low_column", defaults.low),
            close: column("close_column", defaults.close),
        },
        true_range,
        look_back: config.get_int("indicators", "look_back", DEFAULT_LOOK_BACK as i64) as isize,
    })
}

pub fn build_turbulence_config(config: &dyn ConfigPort) -> Result<TurbulenceConfig, SignalError> {
    validate_turbulence_config(config)?;
    let defaults = TurbulenceConfig::default();
    let price_columns = match config.get_string("turbulence", "price_column") {
        Some(column) => {
            let column = column.trim().to_string();
            let mut columns = vec![column.clone()];
            if column == "adj_close" {
                columns.push("close".to_string());
            }
            columns
        }
        None => defaults.price_columns,
    };
    Ok(TurbulenceConfig {
        price_columns,
        warmup: config.get_int("turbulence", "warmup", defaults.warmup as i64) as usize,
    })
}

pub fn open_data_source(
    config: &dyn ConfigPort,
    data: &DataConfig,
) -> Result<Box<dyn DataPort>, SignalError> {
    match data.source {
        SourceKind::Csv => {
            let dir = data.csv_dir.clone().ok_or_else(|| SignalError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            })?;
            tracing::info!("Reading CSV prices from {}", dir.display());
            Ok(Box::new(CsvAdapter::new(dir)))
        }
        #[cfg(feature = "sqlite")]
        SourceKind::Sqlite => {
            let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "sqlite"))]
        SourceKind::Sqlite => {
            let _ = config;
            Err(SignalError::ConfigInvalid {
                section: "data".to_string(),
                key: "source".to_string(),
                reason: "sqlite feature is required for source = sqlite".to_string(),
            })
        }
    }
}

/// Derived series go back where the prices came from: the SQLite database, or
/// CSV files in `output_dir` (default `csv_dir`).
pub fn open_sink(
    config: &dyn ConfigPort,
    data: &DataConfig,
) -> Result<Box<dyn SinkPort>, SignalError> {
    match data.source {
        SourceKind::Csv => {
            let dir = data
                .output_dir
                .clone()
                .or_else(|| data.csv_dir.clone())
                .ok_or_else(|| SignalError::ConfigMissing {
                    section: "data".to_string(),
                    key: "output_dir".to_string(),
                })?;
            fs::create_dir_all(&dir)?;
            Ok(Box::new(CsvSink::new(dir)))
        }
        #[cfg(feature = "sqlite")]
        SourceKind::Sqlite => {
            let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "sqlite"))]
        SourceKind::Sqlite => {
            let _ = config;
            Err(SignalError::ConfigInvalid {
                section: "data".to_string(),
                key: "source".to_string(),
                reason: "sqlite feature is required for source = sqlite".to_string(),
            })
        }
    }
}

pub fn resolve_codes(code_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    if let Some(c) = code_override {
        return vec![c.trim().to_uppercase()];
    }

    let codes = config.get_list("data", "codes");
    if !codes.is_empty() {
        return codes.iter().map(|c| c.to_uppercase()).collect();
    }

    if let Some(code) = config.get_string("data", "code") {
        let code = code.trim().to_uppercase();
        if !code.is_empty() {
            return vec![code];
        }
    }

    vec![]
}

fn fetch_nonempty(
    source: &dyn DataPort,
    code: &str,
    range: DateRange,
) -> Result<Frame, SignalError> {
    let frame = source.fetch_frame(code, range)?;
    if frame.is_empty() {
        return Err(SignalError::NoData {
            code: code.to_string(),
        });
    }
    tracing::info!("Loaded {} rows for {}", frame.len(), code);
    Ok(frame)
}

/// Squeeze report per code, in `codes` order. Each code fails independently.
pub fn run_squeeze_pipeline(
    source: &dyn DataPort,
    codes: &[String],
    range: DateRange,
    indicators: &IndicatorConfig,
) -> Vec<Result<SqueezeReport, SignalError>> {
    codes
        .iter()
        .map(|code| {
            fetch_nonempty(source, code, range)
                .and_then(|frame| squeeze_report(code, &frame, indicators))
        })
        .collect()
}

/// Pivot the universe's prices and score every date. Any code failing to load
/// fails the whole index.
pub fn run_turbulence_pipeline(
    source: &dyn DataPort,
    codes: &[String],
    range: DateRange,
    turbulence: &TurbulenceConfig,
) -> Result<Vec<TurbulenceRecord>, SignalError> {
    let observations = source.fetch_prices(codes, &turbulence.price_columns, range)?;
    let matrix = PriceMatrix::pivot(&observations)?;
    if matrix.is_empty() {
        return Err(SignalError::NoData {
            code: codes.join(","),
        });
    }
    tracing::info!(
        "Computing turbulence over {} dates x {} instruments",
        matrix.len(),
        matrix.instruments().len()
    );
    turbulence_index_with_warmup(&matrix, turbulence.warmup)
}

fn emit_frame(output: Option<&Path>, frame: &Frame, columns: &[String]) -> Result<(), SignalError> {
    match output {
        Some(path) => {
            write_frame(fs::File::create(path)?, frame, columns)?;
            tracing::info!("Wrote {} rows to {}", frame.len(), path.display());
            Ok(())
        }
        None => write_frame(io::stdout().lock(), frame, columns),
    }
}

fn run_bands(
    config_path: &Path,
    code: &str,
    output: Option<&Path>,
    store: bool,
) -> Result<ExitCode, SignalError> {
    let config = load_config(config_path)?;
    let data = build_data_config(&config)?;
    let indicators = build_indicator_config(&config)?;
    let source = open_data_source(&config, &data)?;

    let code = code.trim().to_uppercase();
    let frame = fetch_nonempty(source.as_ref(), &code, data.range)?;
    tracing::info!(
        "Computing bands for {} (window {}, true range {})",
        code,
        indicators.window,
        indicators.true_range
    );
    let derived = derive_signals(&frame, &indicators)?;

    emit_frame(output, &derived, &[])?;

    if store {
        let columns: Vec<String> = indicators
            .derived_columns()
            .iter()
            .map(DerivedColumn::name)
            .collect();
        open_sink(&config, &data)?.store_frame(&code, &derived, &columns)?;
        tracing::info!("Stored {} derived columns for {}", columns.len(), code);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_squeeze(
    config_path: &Path,
    code: Option<&str>,
    look_back: Option<isize>,
) -> Result<ExitCode, SignalError> {
    let config = load_config(config_path)?;
    if code.is_none() {
        validate_codes(&config)?;
    }
    let data = build_data_config(&config)?;
    let mut indicators = build_indicator_config(&config)?;
    if let Some(look_back) = look_back {
        indicators.look_back = look_back;
    }
    let source = open_data_source(&config, &data)?;

    let codes = resolve_codes(code, &config);
    let mut last_error = None;
    let mut reported = 0usize;
    for (code, report) in codes
        .iter()
        .zip(run_squeeze_pipeline(source.as_ref(), &codes, data.range, &indicators))
    {
        match report {
            Ok(report) => {
                println!("{}\t{}", report.code, report.in_squeeze);
                reported += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", code, e);
                last_error = Some(e);
            }
        }
    }

    tracing::info!("{} of {} codes evaluated", reported, codes.len());
    match last_error {
        Some(e) if reported == 0 => Err(e),
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn run_turbulence(
    config_path: &Path,
    output: Option<&Path>,
    store: bool,
) -> Result<ExitCode, SignalError> {
    let config = load_config(config_path)?;
    validate_codes(&config)?;
    let data = build_data_config(&config)?;
    let turbulence = build_turbulence_config(&config)?;
    let source = open_data_source(&config, &data)?;

    let codes = resolve_codes(None, &config);
    let records = run_turbulence_pipeline(source.as_ref(), &codes, data.range, &turbulence)?;

    match output {
        Some(path) => {
            write_turbulence(fs::File::create(path)?, &records)?;
            tracing::info!("Wrote {} rows to {}", records.len(), path.display());
        }
        None => write_turbulence(io::stdout().lock(), &records)?,
    }

    if store {
        open_sink(&config, &data)?.store_turbulence(&records)?;
        tracing::info!("Stored {} turbulence rows", records.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_ratio(
    config_path: &Path,
    code: &str,
    numerator: &str,
    denominator: &str,
    output: Option<&Path>,
) -> Result<ExitCode, SignalError> {
    let config = load_config(config_path)?;
    let data = build_data_config(&config)?;
    let source = open_data_source(&config, &data)?;

    let code = code.trim().to_uppercase();
    let frame = fetch_nonempty(source.as_ref(), &code, data.range)?;
    let with_ratio = divide(&frame, numerator, denominator)?;

    let ratio = DerivedColumn::Ratio {
        numerator: numerator.to_string(),
        denominator: denominator.to_string(),
    };
    let columns = [numerator.to_string(), denominator.to_string(), ratio.name()];
    emit_frame(output, &with_ratio, &columns)?;
    Ok(ExitCode::SUCCESS)
}

fn run_list_symbols(config_path: &Path) -> Result<ExitCode, SignalError> {
    let config = load_config(config_path)?;
    let data = build_data_config(&config)?;
    let source = open_data_source(&config, &data)?;

    let symbols = source.list_symbols()?;
    if symbols.is_empty() {
        tracing::warn!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        tracing::info!("{} symbols found", symbols.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_info(config_path: &Path, code: Option<&str>) -> Result<ExitCode, SignalError> {
    let config = load_config(config_path)?;
    let data = build_data_config(&config)?;
    let source = open_data_source(&config, &data)?;

    let mut codes = resolve_codes(code, &config);
    if codes.is_empty() {
        codes = source.list_symbols()?;
    }

    for c in &codes {
        match source.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", c, count, min_date, max_date);
            }
            Ok(None) => {
                tracing::warn!("{}: no data found", c);
            }
            Err(e) => {
                tracing::warn!("error querying {}: {}", c, e);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
