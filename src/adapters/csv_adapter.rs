//! CSV file data adapter.
//!
//! Layout of the data directory:
//! - `<SYMBOL>.csv`: `date,open,high,low,close,volume`, one row per session
//! - `fundamentals.csv`: one row per symbol and reporting date, columns
//!   `symbol,as_of_date,pe_ratio,pb_ratio,roe,debt_to_equity,eps_growth_3y,
//!   free_cash_flow` followed by the same six fields prefixed `sector_`.
//!   Empty cells are unknown values.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::ValmoError;
use crate::domain::fundamental::{FundamentalSnapshot, SectorAverages};
use crate::domain::ohlcv::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;

pub const FUNDAMENTALS_FILE: &str = "fundamentals.csv";

const FUNDAMENTAL_FIELDS: [&str; 6] = [
    "pe_ratio",
    "pb_ratio",
    "roe",
    "debt_to_equity",
    "eps_growth_3y",
    "free_cash_flow",
];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn fundamentals_path(&self) -> PathBuf {
        self.base_path.join(FUNDAMENTALS_FILE)
    }
}

fn data_err(path: &Path, reason: impl std::fmt::Display) -> ValmoError {
    ValmoError::Data {
        reason: format!("{}: {}", path.display(), reason),
    }
}

fn parse_date(path: &Path, value: &str) -> Result<NaiveDate, ValmoError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| data_err(path, format!("invalid date '{value}': {e}")))
}

fn parse_f64(path: &Path, record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, ValmoError> {
    record
        .get(idx)
        .ok_or_else(|| data_err(path, format!("missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| data_err(path, format!("invalid {name} value: {e}")))
}

/// Empty cell → unknown.
fn parse_optional(path: &Path, cell: Option<&str>, name: &str) -> Result<Option<f64>, ValmoError> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e| data_err(path, format!("invalid {name} value '{v}': {e}"))),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, ValmoError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_err(&path, format!("failed to read: {e}")))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_err(&path, format!("CSV parse error: {e}")))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| data_err(&path, "missing date column"))?;
            let date = parse_date(&path, date_str)?;

            let volume: i64 = record
                .get(5)
                .ok_or_else(|| data_err(&path, "missing volume column"))?
                .trim()
                .parse()
                .map_err(|e| data_err(&path, format!("invalid volume value: {e}")))?;

            points.push(PricePoint {
                date,
                open: parse_f64(&path, &record, 1, "open")?,
                high: parse_f64(&path, &record, 2, "high")?,
                low: parse_f64(&path, &record, 3, "low")?,
                close: parse_f64(&path, &record, 4, "close")?,
                volume,
            });
        }

        points.sort_by_key(|p| p.date);
        PriceSeries::new(symbol, points)
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<Vec<FundamentalSnapshot>, ValmoError> {
        let path = self.fundamentals_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_path(&path)
            .map_err(|e| data_err(&path, format!("failed to read: {e}")))?;
        let headers = rdr
            .headers()
            .map_err(|e| data_err(&path, format!("CSV header error: {e}")))?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let symbol_col = column("symbol").ok_or_else(|| data_err(&path, "missing symbol column"))?;
        let date_col =
            column("as_of_date").ok_or_else(|| data_err(&path, "missing as_of_date column"))?;
        let own_cols: Vec<Option<usize>> = FUNDAMENTAL_FIELDS.iter().map(|f| column(*f)).collect();
        let sector_cols: Vec<Option<usize>> = FUNDAMENTAL_FIELDS
            .iter()
            .map(|f| column(format!("sector_{f}").as_str()))
            .collect();

        let mut snapshots = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_err(&path, format!("CSV parse error: {e}")))?;
            let row_symbol = record.get(symbol_col).unwrap_or("").trim();
            if !row_symbol.eq_ignore_ascii_case(symbol) {
                continue;
            }

            let date_str = record
                .get(date_col)
                .ok_or_else(|| data_err(&path, "missing as_of_date value"))?;
            let as_of_date = parse_date(&path, date_str)?;

            let mut own = [None; 6];
            let mut sector = [None; 6];
            for (i, field) in FUNDAMENTAL_FIELDS.iter().enumerate() {
                own[i] = parse_optional(&path, own_cols[i].and_then(|c| record.get(c)), field)?;
                sector[i] =
                    parse_optional(&path, sector_cols[i].and_then(|c| record.get(c)), field)?;
            }

            snapshots.push(FundamentalSnapshot {
                symbol: symbol.to_string(),
                as_of_date,
                pe_ratio: own[0],
                pb_ratio: own[1],
                roe: own[2],
                debt_to_equity: own[3],
                eps_growth_3y: own[4],
                free_cash_flow: own[5],
                sector: SectorAverages {
                    pe_ratio: sector[0],
                    pb_ratio: sector[1],
                    roe: sector[2],
                    debt_to_equity: sector[3],
                    eps_growth_3y: sector[4],
                    free_cash_flow: sector[5],
                },
            });
        }

        snapshots.sort_by_key(|s| s.as_of_date);
        Ok(snapshots)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ValmoError> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| data_err(&self.base_path, format!("failed to read directory: {e}")))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| data_err(&self.base_path, format!("directory entry error: {e}")))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if name_str == FUNDAMENTALS_FILE {
                continue;
            }
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
