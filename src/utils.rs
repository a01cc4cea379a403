// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::AssetHolding;
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use csv::ReaderBuilder;
use rusqlite::types::ValueRef;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Calendar day used for snapshot keys: the local wall-clock date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local wall-clock time truncated to whole seconds.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Trimmed value of a string argument; errors when it was not given.
pub fn required_arg<'a>(m: &'a clap::ArgMatches, id: &str) -> Result<&'a str> {
    m.get_one::<String>(id)
        .map(|s| s.trim())
        .ok_or_else(|| anyhow!("Missing required argument --{}", id))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

fn decimal_from_text(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Read a money/quantity column. Accepts TEXT (current layout) as well as
/// INTEGER and REAL cells carried over from the legacy layout.
pub fn decimal_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    optional_decimal_at(row, idx)?.ok_or(rusqlite::Error::InvalidColumnType(
        idx,
        "decimal".to_string(),
        rusqlite::types::Type::Null,
    ))
}

pub fn optional_decimal_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(i) => Ok(Some(Decimal::from(i))),
        ValueRef::Real(f) => Decimal::try_from(f).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Real, Box::new(e))
        }),
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            decimal_from_text(s).map(Some).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    format!("invalid decimal '{}'", s).into(),
                )
            })
        }
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Blob,
        )),
    }
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Load holdings from a portfolio-source export. `format` is `csv` or `json`;
/// when absent it is inferred from the file extension.
pub fn load_holdings(path: &Path, format: Option<&str>) -> Result<Vec<AssetHolding>> {
    let fmt = match format {
        Some(f) => f.trim().to_lowercase(),
        None => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "csv".to_string()),
    };
    let mut holdings: Vec<AssetHolding> = match fmt.as_str() {
        "csv" => {
            let mut rdr = ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_path(path)
                .with_context(|| format!("Open CSV {}", path.display()))?;
            let mut out = Vec::new();
            for (line, rec) in rdr.deserialize::<AssetHolding>().enumerate() {
                let holding = rec.with_context(|| {
                    format!("Invalid holding on row {} of {}", line + 1, path.display())
                })?;
                out.push(holding);
            }
            out
        }
        "json" => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid holdings JSON in {}", path.display()))?
        }
        other => return Err(anyhow!("Unknown format: {} (use csv|json)", other)),
    };
    for h in holdings.iter_mut() {
        h.symbol = h.symbol.trim().to_string();
        if h.symbol.is_empty() {
            return Err(anyhow!("Holding with empty symbol in {}", path.display()));
        }
    }
    Ok(holdings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn decimal_reader_accepts_legacy_cell_types() {
        let conn = Connection::open_in_memory().unwrap();
        let (a, b, c, d) = conn
            .query_row("SELECT '12.50', 7, 1000.25, NULL", [], |r| {
                Ok((
                    decimal_at(r, 0)?,
                    decimal_at(r, 1)?,
                    decimal_at(r, 2)?,
                    optional_decimal_at(r, 3)?,
                ))
            })
            .unwrap();
        assert_eq!(a, Decimal::new(1250, 2));
        assert_eq!(b, Decimal::from(7));
        assert_eq!(c, Decimal::new(100025, 2));
        assert_eq!(d, None);
    }

    #[test]
    fn decimal_reader_rejects_garbage_text() {
        let conn = Connection::open_in_memory().unwrap();
        let res = conn.query_row("SELECT 'n/a'", [], |r| decimal_at(r, 0));
        assert!(res.is_err());
    }

    #[test]
    fn load_holdings_reads_csv_with_optional_columns() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(
            file,
            "symbol,description,quantity,last_price,total_value,daily_variation_pct\n\
             SPY.BA,S&P 500 ETF CEDEAR,10,52250.0,522500.0,0.5\n \
             GGAL.BA ,,100,8125,812500,"
        )
        .unwrap();
        file.flush().unwrap();

        let holdings = load_holdings(file.path(), None).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol, "SPY.BA");
        assert_eq!(holdings[0].total_value, Decimal::from(522500));
        assert_eq!(holdings[1].symbol, "GGAL.BA");
        assert_eq!(holdings[1].description, None);
        assert_eq!(holdings[1].daily_variation_pct, None);
    }

    #[test]
    fn load_holdings_rejects_unknown_format() {
        let file = NamedTempFile::new().unwrap();
        let err = load_holdings(file.path(), Some("xml")).unwrap_err();
        assert!(err.to_string().contains("Unknown format"));
    }
}
