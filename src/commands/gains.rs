// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::tenant_from;
use crate::gains;
use crate::models::GainWindow;
use crate::utils::{
    fmt_money, load_holdings, maybe_print_json, parse_decimal, pretty_table, required_arg,
};
use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("portfolio", sub)) => portfolio(conn, sub)?,
        Some(("assets", sub)) => assets(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn portfolio(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let current = parse_decimal(required_arg(sub, "value")?)?;
    let result = gains::calculate_gains(conn, current, &tenant)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &result)? {
        return Ok(());
    }
    if result.is_empty() {
        println!("Not enough history for {} to compute gains yet", tenant);
        return Ok(());
    }
    let data = result
        .iter()
        .map(|(window, g)| {
            vec![
                window.to_string(),
                fmt_money(&g.absolute),
                format!("{:.2}%", g.percent.round_dp(2)),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Window", "Gain", "Gain %"], data));
    Ok(())
}

fn assets(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let path = required_arg(sub, "file")?;
    let format = sub.get_one::<String>("format").map(|s| s.as_str());
    let holdings = load_holdings(Path::new(path), format)?;
    let enriched = gains::calculate_asset_gains(conn, &holdings, &tenant)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &enriched)? {
        return Ok(());
    }
    let data = enriched
        .iter()
        .map(|a| {
            let mut row = vec![a.holding.symbol.clone(), fmt_money(&a.holding.total_value)];
            row.extend(GainWindow::ALL.iter().map(|w| fmt_money(&a.gain(*w))));
            row
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Symbol", "Value", "Daily", "Weekly", "Monthly"], data)
    );
    Ok(())
}
