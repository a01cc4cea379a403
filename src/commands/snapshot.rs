// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::tenant_from;
use crate::store;
use crate::utils::{
    fmt_money, load_holdings, maybe_print_json, parse_decimal, pretty_table, required_arg, today,
};
use crate::models::AssetHolding;
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::warn;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("save", sub)) => save(conn, sub)?,
        Some(("history", sub)) => history(conn, sub)?,
        Some(("asset-history", sub)) => asset_history(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn save(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let path = required_arg(sub, "file")?;
    let format = sub.get_one::<String>("format").map(|s| s.as_str());
    let holdings = load_holdings(Path::new(path), format)?;

    let total = match sub.get_one::<String>("total") {
        Some(raw) => parse_decimal(raw.trim())?,
        None if holdings.is_empty() => {
            warn!(path, "portfolio export has no holdings");
            println!("No holdings found in {}; nothing saved.", path);
            return Ok(());
        }
        None => holdings_total(&holdings)
            .with_context(|| format!("Cannot total the holdings in {}", path))?,
    };
    let invested = match sub.get_one::<String>("invested") {
        Some(raw) => Some(parse_decimal(raw.trim())?),
        None => None,
    };

    let written = store::save_daily_snapshot(conn, total, &holdings, invested, &tenant)
        .with_context(|| format!("Failed to save snapshot for '{}'", tenant))?;
    println!(
        "Saved snapshot for {} on {}: total {} across {} holdings",
        tenant,
        today(),
        fmt_money(&total),
        written
    );
    Ok(())
}

fn holdings_total(holdings: &[AssetHolding]) -> Result<Decimal> {
    holdings
        .iter()
        .try_fold(Decimal::ZERO, |acc, h| acc.checked_add(h.total_value))
        .ok_or_else(|| anyhow!("sum of holding values overflows"))
}

fn history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let days = *sub.get_one::<u32>("days").unwrap_or(&30);
    let rows = store::get_history(conn, days, &tenant)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        return Ok(());
    }
    if rows.is_empty() {
        println!("No snapshots for {} in the last {} days", tenant, days);
        return Ok(());
    }

    let mut prev: Option<Decimal> = None;
    let mut data = Vec::with_capacity(rows.len());
    for s in &rows {
        let change = prev
            .map(|p| fmt_money(&(s.total_value - p)))
            .unwrap_or_default();
        data.push(vec![
            s.date.to_string(),
            fmt_money(&s.total_value),
            s.invested_amount.map(|d| fmt_money(&d)).unwrap_or_default(),
            change,
        ]);
        prev = Some(s.total_value);
    }
    println!(
        "{}",
        pretty_table(&["Date", "Total", "Invested", "Change"], data)
    );
    Ok(())
}

fn asset_history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let symbol = required_arg(sub, "symbol")?;
    let days = *sub.get_one::<u32>("days").unwrap_or(&30);
    let rows = store::get_asset_history(conn, days, symbol, &tenant)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        return Ok(());
    }
    let data = rows
        .into_iter()
        .map(|s| {
            vec![
                s.date.to_string(),
                format!("{:.4}", s.quantity),
                fmt_money(&s.price),
                fmt_money(&s.total_value),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Qty", "Price", "Value"], data)
    );
    Ok(())
}
