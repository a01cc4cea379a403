// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::migrate::{LATEST_VERSION, schema_version};
use crate::models::TenantId;
use crate::utils::{decimal_at, fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let tenant = match m.get_one::<String>("tenant") {
        Some(raw) => Some(TenantId::new(raw.as_str())?),
        None => None,
    };
    let issues = find_issues(conn, tenant.as_ref())?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &issues)? {
        return Ok(());
    }
    if issues.is_empty() {
        println!("✅ doctor: no issues found (schema version {})", schema_version(conn)?);
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Schema version check plus snapshot drift: asset rows that do not add up
/// to the portfolio total of the same day, and asset rows without any
/// portfolio row. Scoped to `tenant` when given.
pub fn find_issues(conn: &Connection, tenant: Option<&TenantId>) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();

    let version = schema_version(conn)?;
    if version != LATEST_VERSION {
        issues.push(Issue {
            kind: "schema_version",
            detail: format!("found {}, expected {}", version, LATEST_VERSION),
        });
    }

    let scope = tenant.map(|t| t.as_str().to_string());

    // (tenant, date) -> sum of asset totals
    let mut asset_sums: BTreeMap<(String, String), Decimal> = BTreeMap::new();
    let mut stmt = conn.prepare(
        "SELECT tenant_id, date, total_value FROM asset_snapshots
         WHERE ?1 IS NULL OR tenant_id=?1",
    )?;
    let mut cur = stmt.query(params![scope])?;
    while let Some(r) = cur.next()? {
        let t: String = r.get(0)?;
        let d: String = r.get(1)?;
        let v = decimal_at(r, 2)?;
        *asset_sums.entry((t, d)).or_insert(Decimal::ZERO) += v;
    }

    let mut stmt = conn.prepare(
        "SELECT tenant_id, date, total_value FROM portfolio_snapshots
         WHERE ?1 IS NULL OR tenant_id=?1",
    )?;
    let mut cur = stmt.query(params![scope])?;
    while let Some(r) = cur.next()? {
        let t: String = r.get(0)?;
        let d: String = r.get(1)?;
        let total = decimal_at(r, 2)?;
        if let Some(sum) = asset_sums.remove(&(t.clone(), d.clone())) {
            if sum != total {
                issues.push(Issue {
                    kind: "asset_sum_mismatch",
                    detail: format!(
                        "{} {}: portfolio {} vs assets {}",
                        t,
                        d,
                        fmt_money(&total),
                        fmt_money(&sum)
                    ),
                });
            }
        }
    }

    for ((t, d), sum) in asset_sums {
        issues.push(Issue {
            kind: "orphan_asset_rows",
            detail: format!("{} {}: assets {} without portfolio snapshot", t, d, fmt_money(&sum)),
        });
    }

    Ok(issues)
}
