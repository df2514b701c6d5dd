//! SQLite data adapter and sink.
//!
//! Prices are read from `share_prices_daily`. Derived columns are stored in long
//! form in `derived_daily`, one row per (ticker, date, column name), and the
//! turbulence index in `turbulence_daily`.

use crate::domain::error::SignalError;
use crate::domain::frame::Frame;
use crate::domain::indicator::turbulence::TurbulenceRecord;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, DateRange};
use crate::ports::sink_port::{selected_columns, SinkPort};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn pool_err(e: r2d2::Error) -> SignalError {
    SignalError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> SignalError {
    SignalError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, SignalError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| SignalError::Database {
        reason: format!("invalid stored date '{}': {}", value, e),
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| SignalError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SignalError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, SignalError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), SignalError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS share_prices_daily (
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL,
                    high REAL,
                    low REAL,
                    close REAL,
                    adj_close REAL,
                    volume REAL,
                    PRIMARY KEY (ticker, date)
                );
                CREATE TABLE IF NOT EXISTS derived_daily (
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    name TEXT NOT NULL,
                    value REAL,
                    PRIMARY KEY (ticker, date, name)
                );
                CREATE TABLE IF NOT EXISTS turbulence_daily (
                    date TEXT PRIMARY KEY,
                    turbulence REAL NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_share_prices_date ON share_prices_daily(date);",
            )
            .map_err(query_err)
    }

    pub fn insert_bars(&self, bars: &[OhlcvBar]) -> Result<(), SignalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            let cell = |v: f64| v.is_finite().then_some(v);
            tx.execute(
                "INSERT OR REPLACE INTO share_prices_daily
                     (ticker, date, open, high, low, close, adj_close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    bar.code,
                    bar.date.format(DATE_FORMAT).to_string(),
                    cell(bar.open),
                    cell(bar.high),
                    cell(bar.low),
                    cell(bar.close),
                    cell(bar.adj_close),
                    cell(bar.volume)
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    /// Stored values of one derived column, date ascending.
    pub fn fetch_derived(
        &self,
        code: &str,
        name: &str,
    ) -> Result<Vec<(NaiveDate, Option<f64>)>, SignalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, value FROM derived_daily
                 WHERE ticker = ?1 AND name = ?2 ORDER BY date ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![code, name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
            })
            .map_err(query_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (date, value) = row.map_err(query_err)?;
            out.push((parse_date(&date)?, value));
        }
        Ok(out)
    }

    pub fn fetch_turbulence(&self) -> Result<Vec<TurbulenceRecord>, SignalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT date, turbulence FROM turbulence_daily ORDER BY date ASC")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))
            .map_err(query_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (date, turbulence) = row.map_err(query_err)?;
            out.push(TurbulenceRecord {
                date: parse_date(&date)?,
                turbulence,
            });
        }
        Ok(out)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_frame(&self, code: &str, range: DateRange) -> Result<Frame, SignalError> {
        let conn = self.conn()?;
        let start = range.start.map(|d| d.format(DATE_FORMAT).to_string());
        let end = range.end.map(|d| d.format(DATE_FORMAT).to_string());

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, adj_close, volume
                 FROM share_prices_daily
                 WHERE ticker = ?1
                   AND (?2 IS NULL OR date >= ?2)
                   AND (?3 IS NULL OR date <= ?3)
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![code, start, end], |row| {
                let price = |idx: usize| -> rusqlite::Result<f64> {
                    Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or(f64::NAN))
                };
                Ok((
                    row.get::<_, String>(0)?,
                    [price(1)?, price(2)?, price(3)?, price(4)?, price(5)?, price(6)?],
                ))
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, [open, high, low, close, adj_close, volume]) = row.map_err(query_err)?;
            bars.push(OhlcvBar {
                code: code.to_string(),
                date: parse_date(&date)?,
                open,
                high,
                low,
                close,
                adj_close,
                volume,
            });
        }

        Frame::from_bars(&bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT ticker FROM share_prices_daily ORDER BY ticker")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(query_err)?);
        }
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM share_prices_daily WHERE ticker = ?1",
                params![code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl SinkPort for SqliteAdapter {
    fn store_frame(
        &self,
        code: &str,
        frame: &Frame,
        columns: &[String],
    ) -> Result<(), SignalError> {
        let selected = selected_columns(frame, columns)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO derived_daily (ticker, date, name, value)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_err)?;
            for (name, values) in &selected {
                for (date, value) in frame.dates().iter().zip(values.iter()) {
                    stmt.execute(params![
                        code,
                        date.format(DATE_FORMAT).to_string(),
                        name,
                        value
                    ])
                    .map_err(query_err)?;
                }
            }
        }
        tx.commit().map_err(query_err)?;
        tracing::debug!(code, columns = selected.len(), rows = frame.len(), "stored signal frame");
        Ok(())
    }

    fn store_turbulence(&self, records: &[TurbulenceRecord]) -> Result<(), SignalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for record in records {
            tx.execute(
                "INSERT OR REPLACE INTO turbulence_daily (date, turbulence) VALUES (?1, ?2)",
                params![record.date.format(DATE_FORMAT).to_string(), record.turbulence],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        tracing::debug!(rows = records.len(), "stored turbulence");
        Ok(())
    }
}
