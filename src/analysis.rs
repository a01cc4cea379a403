// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Append-only log of AI advisory responses, per tenant.

use crate::error::StorageError;
use crate::models::{AnalysisRecord, TenantId};
use crate::store::read_error;
use crate::utils::{decimal_at, now_timestamp};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use tracing::info;

const ANALYSIS_COLUMNS: &[&str] = &[
    "id",
    "timestamp",
    "model",
    "investment_amount",
    "portfolio_value",
    "response",
];

pub fn append_analysis(
    conn: &Connection,
    model: &str,
    investment_amount: Decimal,
    portfolio_value: Decimal,
    response_text: &str,
    tenant: &TenantId,
) -> Result<AnalysisRecord, StorageError> {
    let timestamp = now_timestamp();
    conn.execute(
        "INSERT INTO ai_analyses(timestamp, tenant_id, model, investment_amount, portfolio_value, response)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            tenant.as_str(),
            model,
            investment_amount.to_string(),
            portfolio_value.to_string(),
            response_text,
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(tenant = %tenant, id, model, "analysis recorded");
    Ok(AnalysisRecord {
        id,
        timestamp,
        tenant_id: tenant.clone(),
        model: model.to_string(),
        investment_amount,
        portfolio_value,
        response_text: response_text.to_string(),
    })
}

/// Up to `limit` analyses for `tenant`, most recent first.
pub fn get_recent_analyses(
    conn: &Connection,
    limit: u32,
    tenant: &TenantId,
) -> Result<Vec<AnalysisRecord>, StorageError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, timestamp, model, investment_amount, portfolio_value, response
         FROM ai_analyses WHERE tenant_id=?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![tenant.as_str(), limit], |r| {
        Ok(AnalysisRecord {
            id: r.get(0)?,
            timestamp: r.get(1)?,
            tenant_id: tenant.clone(),
            model: r.get(2)?,
            investment_amount: decimal_at(r, 3)?,
            portfolio_value: decimal_at(r, 4)?,
            response_text: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(read_error("ai_analyses", ANALYSIS_COLUMNS))?);
    }
    Ok(out)
}
