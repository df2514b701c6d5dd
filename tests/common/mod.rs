#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
pub use volsignal::domain::error::SignalError;
pub use volsignal::domain::frame::Frame;
pub use volsignal::domain::ohlcv::OhlcvBar;
use volsignal::ports::data_port::{DataPort, DateRange};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_frame(&self, code: &str, range: DateRange) -> Result<Frame, SignalError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(SignalError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars: Vec<OhlcvBar> = self
            .data
            .get(code)
            .map(|bars| bars.iter().filter(|b| range.contains(b.date)).cloned().collect())
            .unwrap_or_default();
        Frame::from_bars(&bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(SignalError::DataSource {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn day(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

pub fn make_bar(code: &str, date: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        adj_close: close,
        volume: 1_000.0,
    }
}

/// Closes follow `f(i)`; intraday range is ±`spread` around the close.
pub fn generate_bars(
    code: &str,
    count: usize,
    spread: f64,
    f: impl Fn(usize) -> f64,
) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let close = f(i);
            OhlcvBar {
                high: close + spread,
                low: close - spread,
                ..make_bar(code, day(i), close)
            }
        })
        .collect()
}

/// Deterministic LCG random walk floored at 1.0.
pub fn random_walk(seed: u64, count: usize, start: f64) -> Vec<f64> {
    let mut state = seed;
    let mut price = start;
    (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let step = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            price = (price + step).max(1.0);
            price
        })
        .collect()
}

pub fn frame_from_closes(closes: &[f64], spread: f64) -> Frame {
    Frame::from_bars(&generate_bars("TEST", closes.len(), spread, |i| closes[i])).unwrap()
}

pub fn write_csv(dir: &std::path::Path, code: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.adj_close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", code)), content).unwrap();
}
