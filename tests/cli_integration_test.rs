//! CLI integration tests: config builders, code resolution, the squeeze and
//! turbulence pipelines over `MockDataPort`, and whole commands run against CSV
//! fixtures on disk.

mod common;

use clap::Parser;
use common::*;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use volsignal::adapters::csv_adapter::CsvAdapter;
use volsignal::adapters::file_config_adapter::FileConfigAdapter;
use volsignal::cli::{self, Cli};
use volsignal::domain::analysis::{IndicatorConfig, TurbulenceConfig};
use volsignal::domain::indicator::true_range::TrueRangeMethod;
use volsignal::ports::data_port::{DataPort, DateRange};

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_code_of(code: ExitCode) -> String {
    format!("{:?}", code)
}

fn run_cli(args: &[&str]) -> String {
    let mut argv = vec!["volsignal"];
    argv.extend_from_slice(args);
    exit_code_of(cli::run(Cli::try_parse_from(argv).unwrap()))
}

const VALID_INI: &str = r#"
[data]
source = csv
csv_dir = /prices
start_date = 2020-01-01
end_date = 2020-12-31
codes = gme,amc,bb

[indicators]
window = 10
price_column = close
true_range = high_low
look_back = -2

[turbulence]
price_column = close
warmup = 30
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_configs_from_full_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();

        let data = cli::build_data_config(&adapter).unwrap();
        assert_eq!(data.source, cli::SourceKind::Csv);
        assert_eq!(data.range.start, Some(day(0)));

        let indicators = cli::build_indicator_config(&adapter).unwrap();
        assert_eq!(indicators.window.get(), 10);
        assert_eq!(indicators.true_range, TrueRangeMethod::HighLow);
        assert_eq!(indicators.look_back, -2);

        let turbulence = cli::build_turbulence_config(&adapter).unwrap();
        assert_eq!(turbulence.price_columns, vec!["close"]);
        assert_eq!(turbulence.warmup, 30);
    }

    #[test]
    fn build_indicator_config_rejects_bad_method() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\ntrue_range = garman\n").unwrap();
        let err = cli::build_indicator_config(&adapter).unwrap_err();
        assert!(matches!(err, SignalError::ConfigInvalid { key, .. } if key == "true_range"));
    }

    #[test]
    fn build_data_config_rejects_bad_dates() {
        let ini = "[data]\ncsv_dir = /p\nend_date = 31-12-2020\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_data_config(&adapter).unwrap_err();
        assert!(matches!(err, SignalError::ConfigInvalid { key, .. } if key == "end_date"));
    }
}

mod code_resolution {
    use super::*;

    #[test]
    fn resolve_codes_from_config_codes() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(cli::resolve_codes(None, &adapter), vec!["GME", "AMC", "BB"]);
    }

    #[test]
    fn resolve_codes_override_takes_precedence() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(cli::resolve_codes(Some(" tsla "), &adapter), vec!["TSLA"]);
    }

    #[test]
    fn resolve_codes_none_available() {
        let adapter = FileConfigAdapter::from_string("[data]\n").unwrap();
        assert!(cli::resolve_codes(None, &adapter).is_empty());
    }
}

mod pipeline_mock {
    use super::*;

    fn port() -> MockDataPort {
        let calm = generate_bars("CALM", 40, 2.0, |i| {
            100.0 + if i % 2 == 0 { 0.05 } else { -0.05 }
        });
        let trend = generate_bars("TREND", 40, 0.1, |i| 100.0 + 2.0 * i as f64);
        MockDataPort::new()
            .with_bars("CALM", calm)
            .with_bars("TREND", trend)
            .with_bars("SHORT", generate_bars("SHORT", 2, 1.0, |i| i as f64 + 1.0))
            .with_error("BROKEN", "disk on fire")
    }

    #[test]
    fn squeeze_pipeline_reports_each_code_independently() {
        let codes: Vec<String> = ["CALM", "TREND", "SHORT", "BROKEN", "MISSING"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let reports = cli::run_squeeze_pipeline(
            &port(),
            &codes,
            DateRange::default(),
            &IndicatorConfig::default(),
        );

        assert_eq!(reports.len(), 5);
        assert!(reports[0].as_ref().unwrap().in_squeeze);
        assert!(!reports[1].as_ref().unwrap().in_squeeze);
        assert!(matches!(reports[2], Err(SignalError::InsufficientHistory { .. })));
        assert!(matches!(reports[3], Err(SignalError::DataSource { .. })));
        assert!(matches!(&reports[4], Err(SignalError::NoData { code }) if code == "MISSING"));
    }

    #[test]
    fn squeeze_pipeline_respects_date_range() {
        let codes = vec!["CALM".to_string()];
        let range = DateRange::new(None, Some(day(29)));
        let reports =
            cli::run_squeeze_pipeline(&port(), &codes, range, &IndicatorConfig::default());
        assert_eq!(reports[0].as_ref().unwrap().date, day(27));
    }

    #[test]
    fn turbulence_pipeline_over_mock_universe() {
        let port = ["AMC", "BB", "GME"]
            .iter()
            .zip([3u64, 5, 8])
            .fold(MockDataPort::new(), |port, (code, seed)| {
                let closes = random_walk(seed, 60, 50.0);
                port.with_bars(code, generate_bars(code, 60, 0.5, |i| closes[i]))
            });
        let codes: Vec<String> = ["AMC", "BB", "GME"].iter().map(|c| c.to_string()).collect();
        let config = TurbulenceConfig {
            warmup: 20,
            ..TurbulenceConfig::default()
        };

        let records =
            cli::run_turbulence_pipeline(&port, &codes, DateRange::default(), &config).unwrap();
        assert_eq!(records.len(), 60);
        assert!(records[..22].iter().all(|r| r.turbulence == 0.0));
        assert!(records.iter().all(|r| r.turbulence >= 0.0));
    }

    #[test]
    fn turbulence_pipeline_fails_on_any_broken_code() {
        let codes = vec!["CALM".to_string(), "BROKEN".to_string()];
        let err = cli::run_turbulence_pipeline(
            &port(),
            &codes,
            DateRange::default(),
            &TurbulenceConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SignalError::DataSource { .. }));
    }

    #[test]
    fn turbulence_pipeline_empty_universe_is_no_data() {
        let err = cli::run_turbulence_pipeline(
            &MockDataPort::new(),
            &["GHOST".to_string()],
            DateRange::default(),
            &TurbulenceConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SignalError::NoData { .. }));
    }
}

mod end_to_end {
    use super::*;

    fn fixture(dir: &Path) -> tempfile::NamedTempFile {
        for (code, seed) in [("AMC", 2u64), ("GME", 9)] {
            let closes = random_walk(seed, 60, 40.0);
            write_csv(dir, code, &generate_bars(code, 60, 1.0, |i| closes[i]));
        }
        write_temp_ini(&format!(
            "[data]\nsource = csv\ncsv_dir = {}\ncodes = AMC,GME\n\n[turbulence]\nwarmup = 20\n",
            dir.display()
        ))
    }

    #[test]
    fn bands_writes_output_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());
        let out = dir.path().join("out").with_extension("tmp");

        let code = run_cli(&[
            "bands",
            "-c",
            ini.path().to_str().unwrap(),
            "--code",
            "gme",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert_eq!(code, exit_code_of(ExitCode::SUCCESS));

        let written = std::fs::read_to_string(&out).unwrap();
        let header = written.lines().next().unwrap();
        assert!(header.starts_with("date,open,high,low,close,adj_close,volume,20sma"));
        assert!(header.ends_with("upper_keltner,20ema"));
        assert_eq!(written.lines().count(), 61);
    }

    #[test]
    fn bands_store_writes_signal_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());

        let config = ini.path().to_str().unwrap();
        let code = run_cli(&["bands", "-c", config, "--code", "AMC", "--store"]);
        assert_eq!(code, exit_code_of(ExitCode::SUCCESS));

        let stored = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_frame("AMC_signals", DateRange::default())
            .unwrap();
        assert!(stored.has_column("atr"));
        assert!(!stored.has_column("close"));
        assert_eq!(stored.len(), 60);
    }

    #[test]
    fn bands_unknown_code_exits_no_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());
        let code = run_cli(&["bands", "-c", ini.path().to_str().unwrap(), "--code", "XYZ"]);
        assert_eq!(code, exit_code_of(ExitCode::from(5)));
    }

    #[test]
    fn squeeze_skips_bad_codes() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());
        let code = run_cli(&["squeeze", "-c", ini.path().to_str().unwrap(), "--look-back", "-1"]);
        assert_eq!(code, exit_code_of(ExitCode::SUCCESS));

        let code = run_cli(&["squeeze", "-c", ini.path().to_str().unwrap(), "--code", "XYZ"]);
        assert_eq!(code, exit_code_of(ExitCode::from(5)));
    }

    #[test]
    fn turbulence_writes_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());
        let out = dir.path().join("turb.out");

        let code = run_cli(&[
            "turbulence",
            "-c",
            ini.path().to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--store",
        ]);
        assert_eq!(code, exit_code_of(ExitCode::SUCCESS));

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().next(), Some("date,turbulence"));
        assert_eq!(written.lines().count(), 61);
        assert!(dir.path().join("turbulence.csv").exists());
    }

    #[test]
    fn ratio_writes_selected_columns() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());
        let out = dir.path().join("ratio.out");

        let code = run_cli(&[
            "ratio",
            "-c",
            ini.path().to_str().unwrap(),
            "--code",
            "GME",
            "--numerator",
            "high",
            "--denominator",
            "low",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert_eq!(code, exit_code_of(ExitCode::SUCCESS));
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().next(), Some("date,high,low,high_perc_low"));

        let code = run_cli(&[
            "ratio",
            "-c",
            ini.path().to_str().unwrap(),
            "--code",
            "GME",
            "--numerator",
            "high",
            "--denominator",
            "bogus",
        ]);
        assert_eq!(code, exit_code_of(ExitCode::from(4)));
    }

    #[test]
    fn missing_config_exits_with_config_error() {
        let code = run_cli(&["list-symbols", "-c", "/nonexistent/volsignal.ini"]);
        assert_eq!(code, exit_code_of(ExitCode::from(2)));
    }

    #[test]
    fn list_symbols_and_info_succeed() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = fixture(dir.path());
        assert_eq!(
            run_cli(&["list-symbols", "-c", ini.path().to_str().unwrap()]),
            exit_code_of(ExitCode::SUCCESS)
        );
        assert_eq!(
            run_cli(&["info", "-c", ini.path().to_str().unwrap(), "--code", "GME"]),
            exit_code_of(ExitCode::SUCCESS)
        );
    }
}
