// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Daily portfolio and per-asset valuation snapshots.
//!
//! One portfolio row per (date, tenant) and one asset row per
//! (date, symbol, tenant). Saving the same day again overwrites the values;
//! the last write of the day wins.

use crate::error::StorageError;
use crate::models::{AssetHolding, AssetSnapshot, PortfolioSnapshot, TenantId};
use crate::utils::{decimal_at, optional_decimal_at, today};
use chrono::{Days, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::{debug, info};

const PORTFOLIO_COLUMNS: &[&str] = &["date", "total_value", "invested_amount"];
const ASSET_COLUMNS: &[&str] = &["date", "symbol", "quantity", "price", "total_value"];

/// Unparseable stored values become `Corrupt`; everything else stays a
/// database error.
pub(crate) fn read_error(
    table: &'static str,
    columns: &'static [&'static str],
) -> impl Fn(rusqlite::Error) -> StorageError {
    move |err| match err {
        rusqlite::Error::FromSqlConversionFailure(idx, _, cause) => StorageError::Corrupt {
            table,
            column: columns.get(idx).copied().unwrap_or("?"),
            reason: cause.to_string(),
        },
        other => StorageError::Database(other),
    }
}

/// Upsert today's portfolio snapshot and one asset snapshot per holding.
///
/// All rows of one call are written in a single transaction. Returns the
/// number of distinct asset rows written; a symbol listed twice keeps its
/// last entry.
pub fn save_daily_snapshot(
    conn: &mut Connection,
    total_value: Decimal,
    assets: &[AssetHolding],
    invested_amount: Option<Decimal>,
    tenant: &TenantId,
) -> Result<usize, StorageError> {
    save_snapshot_on(conn, today(), total_value, assets, invested_amount, tenant)
}

/// [`save_daily_snapshot`] for an explicit calendar day.
pub fn save_snapshot_on(
    conn: &mut Connection,
    date: NaiveDate,
    total_value: Decimal,
    assets: &[AssetHolding],
    invested_amount: Option<Decimal>,
    tenant: &TenantId,
) -> Result<usize, StorageError> {
    let date_s = date.to_string();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO portfolio_snapshots(date, tenant_id, total_value, invested_amount)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(date, tenant_id) DO UPDATE SET
             total_value=excluded.total_value,
             invested_amount=excluded.invested_amount",
        params![
            &date_s,
            tenant.as_str(),
            total_value.to_string(),
            invested_amount.map(|d| d.to_string())
        ],
    )?;

    let mut upsert = tx.prepare_cached(
        "INSERT INTO asset_snapshots(date, tenant_id, symbol, quantity, price, total_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(date, symbol, tenant_id) DO UPDATE SET
             quantity=excluded.quantity,
             price=excluded.price,
             total_value=excluded.total_value",
    )?;
    let mut written = BTreeSet::new();
    for asset in assets {
        upsert.execute(params![
            &date_s,
            tenant.as_str(),
            asset.symbol,
            asset.quantity.to_string(),
            asset.last_price.to_string(),
            asset.total_value.to_string(),
        ])?;
        debug!(tenant = %tenant, symbol = %asset.symbol, "asset snapshot staged");
        written.insert(asset.symbol.as_str());
    }
    drop(upsert);
    tx.commit()?;

    info!(
        tenant = %tenant,
        date = %date_s,
        total = %total_value,
        assets = written.len(),
        "daily snapshot saved"
    );
    Ok(written.len())
}

/// First day of a `days`-long lookback ending at `today`. `None` when the
/// lookback reaches past the earliest representable date, i.e. no lower bound.
fn window_start(today: NaiveDate, days: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(days)))
}

/// Portfolio snapshots from the last `days` days, oldest first.
pub fn get_history(
    conn: &Connection,
    days: u32,
    tenant: &TenantId,
) -> Result<Vec<PortfolioSnapshot>, StorageError> {
    get_history_as_of(conn, today(), days, tenant)
}

pub fn get_history_as_of(
    conn: &Connection,
    today: NaiveDate,
    days: u32,
    tenant: &TenantId,
) -> Result<Vec<PortfolioSnapshot>, StorageError> {
    let start = window_start(today, days);
    let mut stmt = conn.prepare_cached(
        "SELECT date, total_value, invested_amount FROM portfolio_snapshots
         WHERE tenant_id=?1 AND (?2 IS NULL OR date>=?2)
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![tenant.as_str(), start.map(|d| d.to_string())], |r| {
        Ok(PortfolioSnapshot {
            date: r.get(0)?,
            tenant_id: tenant.clone(),
            total_value: decimal_at(r, 1)?,
            invested_amount: optional_decimal_at(r, 2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(read_error("portfolio_snapshots", PORTFOLIO_COLUMNS))?);
    }
    Ok(out)
}

/// Asset snapshots of one symbol from the last `days` days, oldest first.
pub fn get_asset_history(
    conn: &Connection,
    days: u32,
    symbol: &str,
    tenant: &TenantId,
) -> Result<Vec<AssetSnapshot>, StorageError> {
    get_asset_history_as_of(conn, today(), days, symbol, tenant)
}

pub fn get_asset_history_as_of(
    conn: &Connection,
    today: NaiveDate,
    days: u32,
    symbol: &str,
    tenant: &TenantId,
) -> Result<Vec<AssetSnapshot>, StorageError> {
    let start = window_start(today, days);
    let mut stmt = conn.prepare_cached(
        "SELECT date, symbol, quantity, price, total_value FROM asset_snapshots
         WHERE tenant_id=?1 AND symbol=?2 AND (?3 IS NULL OR date>=?3)
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![tenant.as_str(), symbol, start.map(|d| d.to_string())], |r| {
        Ok(AssetSnapshot {
            date: r.get(0)?,
            tenant_id: tenant.clone(),
            symbol: r.get(1)?,
            quantity: decimal_at(r, 2)?,
            price: decimal_at(r, 3)?,
            total_value: decimal_at(r, 4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(read_error("asset_snapshots", ASSET_COLUMNS))?);
    }
    Ok(out)
}

/// Total value of the latest asset snapshot dated on or before `target`.
pub fn asset_value_on_or_before(
    conn: &Connection,
    tenant: &TenantId,
    symbol: &str,
    target: NaiveDate,
) -> Result<Option<Decimal>, StorageError> {
    let mut stmt = conn.prepare_cached(
        "SELECT total_value FROM asset_snapshots
         WHERE tenant_id=?1 AND symbol=?2 AND date<=?3
         ORDER BY date DESC LIMIT 1",
    )?;
    let v = stmt
        .query_row(params![tenant.as_str(), symbol, target.to_string()], |r| {
            decimal_at(r, 0)
        })
        .optional()
        .map_err(read_error("asset_snapshots", &["total_value"]))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::str::FromStr;

    fn tenant(s: &str) -> TenantId {
        TenantId::new(s).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn holding(symbol: &str, qty: &str, price: &str) -> AssetHolding {
        let quantity = dec(qty);
        let last_price = dec(price);
        AssetHolding {
            symbol: symbol.to_string(),
            description: None,
            quantity,
            last_price,
            total_value: quantity * last_price,
            daily_variation_pct: None,
        }
    }

    #[test]
    fn same_day_save_overwrites() {
        let mut conn = db::open_in_memory().unwrap();
        let t = tenant("alice");
        let d = day("2024-03-01");
        let first = [holding("ABC", "1", "100")];
        save_snapshot_on(&mut conn, d, dec("100"), &first, Some(dec("90")), &t).unwrap();
        let second = [holding("ABC", "1", "120")];
        save_snapshot_on(&mut conn, d, dec("120"), &second, None, &t).unwrap();

        let hist = get_history_as_of(&conn, d, 1, &t).unwrap();
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].total_value, dec("120"));
        assert_eq!(hist[0].invested_amount, None);

        let assets = get_asset_history_as_of(&conn, d, 1, "ABC", &t).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].price, dec("120"));
    }

    #[test]
    fn failed_asset_row_rolls_back_whole_snapshot() {
        let mut conn = db::open_in_memory().unwrap();
        let t = tenant("alice");
        let d = day("2024-03-01");
        let bad = [holding("ABC", "1", "10"), holding("", "1", "10")];

        let err = save_snapshot_on(&mut conn, d, dec("20"), &bad, None, &t).unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));

        let portfolios: i64 = conn
            .query_row("SELECT COUNT(*) FROM portfolio_snapshots", [], |r| r.get(0))
            .unwrap();
        let assets: i64 = conn
            .query_row("SELECT COUNT(*) FROM asset_snapshots", [], |r| r.get(0))
            .unwrap();
        assert_eq!((portfolios, assets), (0, 0));
    }

    #[test]
    fn history_is_windowed_ordered_and_tenant_scoped() {
        let mut conn = db::open_in_memory().unwrap();
        let a = tenant("a");
        let b = tenant("b");
        for (d, v) in [("2024-01-20", "3"), ("2024-01-01", "1"), ("2024-01-10", "2")] {
            save_snapshot_on(&mut conn, day(d), dec(v), &[], None, &a).unwrap();
        }
        save_snapshot_on(&mut conn, day("2024-01-15"), dec("99"), &[], None, &b).unwrap();

        let hist = get_history_as_of(&conn, day("2024-01-20"), 10, &a).unwrap();
        let dates: Vec<String> = hist.iter().map(|s| s.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-10", "2024-01-20"]);
        assert!(hist.iter().all(|s| s.tenant_id == a));

        let other = get_history_as_of(&conn, day("2024-01-20"), 30, &tenant("c")).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn floor_lookup_picks_latest_on_or_before() {
        let mut conn = db::open_in_memory().unwrap();
        let t = tenant("t");
        for (d, price) in [("2024-01-01", "10"), ("2024-01-05", "15")] {
            let assets = [holding("X", "1", price)];
            save_snapshot_on(&mut conn, day(d), dec(price), &assets, None, &t).unwrap();
        }

        let v = |d: &str| asset_value_on_or_before(&conn, &t, "X", day(d)).unwrap();
        assert_eq!(v("2023-12-31"), None);
        assert_eq!(v("2024-01-04"), Some(dec("10")));
        assert_eq!(v("2024-01-05"), Some(dec("15")));
        assert_eq!(
            asset_value_on_or_before(&conn, &tenant("other"), "X", day("2024-01-05")).unwrap(),
            None
        );
    }

    #[test]
    fn unparseable_stored_value_is_reported_as_corrupt() {
        let conn = db::open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO portfolio_snapshots(date, tenant_id, total_value)
             VALUES ('2024-03-01','t','n/a')",
            [],
        )
        .unwrap();
        let err = get_history_as_of(&conn, day("2024-03-02"), 5, &tenant("t")).unwrap_err();
        match err {
            StorageError::Corrupt { table, column, reason } => {
                assert_eq!(table, "portfolio_snapshots");
                assert_eq!(column, "total_value");
                assert!(reason.contains("n/a"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn longest_lookback_returns_all_history() {
        let mut conn = db::open_in_memory().unwrap();
        let t = tenant("t");
        for (d, v) in [("1990-06-01", "1"), ("2024-01-01", "2")] {
            save_snapshot_on(&mut conn, day(d), dec(v), &[holding("X", "1", v)], None, &t).unwrap();
        }
        let d = day("2024-01-02");

        let hist = get_history_as_of(&conn, d, u32::MAX, &t).unwrap();
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].date, day("1990-06-01"));

        let assets = get_asset_history_as_of(&conn, d, u32::MAX, "X", &t).unwrap();
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn duplicate_symbol_counts_once_and_last_entry_wins() {
        let mut conn = db::open_in_memory().unwrap();
        let t = tenant("t");
        let d = day("2024-03-01");
        let assets = [
            holding("ABC", "1", "10"),
            holding("XYZ", "2", "5"),
            holding("ABC", "1", "12"),
        ];

        let written = save_snapshot_on(&mut conn, d, dec("22"), &assets, None, &t).unwrap();
        assert_eq!(written, 2);

        let abc = get_asset_history_as_of(&conn, d, 0, "ABC", &t).unwrap();
        assert_eq!(abc.len(), 1);
        assert_eq!(abc[0].price, dec("12"));
    }
}
