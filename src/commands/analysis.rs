// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analysis;
use crate::config::tenant_from;
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table, required_arg};
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

const PREVIEW_CHARS: usize = 60;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let model = required_arg(sub, "model")?;
    let investment = parse_decimal(required_arg(sub, "investment")?)?;
    let portfolio_value = parse_decimal(required_arg(sub, "portfolio-value")?)?;
    let text = match (sub.get_one::<String>("text"), sub.get_one::<String>("file")) {
        (Some(t), _) => t.clone(),
        (None, Some(path)) => std::fs::read_to_string(path.trim())
            .with_context(|| format!("Read analysis text from {}", path.trim()))?,
        (None, None) => return Err(anyhow!("Pass the response with --text or --file")),
    };

    let rec = analysis::append_analysis(conn, model, investment, portfolio_value, &text, &tenant)?;
    println!("Recorded analysis #{} for {} ({})", rec.id, tenant, rec.model);
    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = tenant_from(sub)?;
    let limit = *sub.get_one::<u32>("limit").unwrap_or(&10);
    let rows = analysis::get_recent_analyses(conn, limit, &tenant)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        return Ok(());
    }
    let data = rows
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                r.model.clone(),
                fmt_money(&r.investment_amount),
                fmt_money(&r.portfolio_value),
                preview(&r.response_text),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Id", "When", "Model", "Investment", "Portfolio", "Response"],
            data
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("Hold.\n\nRebalance  later."), "Hold. Rebalance later.");
        let long = "x".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
        assert!(p.ends_with('…'));
    }
}
