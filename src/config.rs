// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::models::TenantId;
use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

pub const DB_ENV: &str = "INVER_DB";
pub const TENANT_ENV: &str = "INVER_TENANT";

/// Runtime settings resolved from global CLI flags, the environment and
/// platform defaults, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl Settings {
    pub fn from_matches(m: &clap::ArgMatches) -> Result<Self> {
        let db_path = match m.get_one::<String>("db").map(|s| s.trim()) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => db::default_db_path()?,
        };
        let verbose = m.get_count("verbose");
        Ok(Settings {
            db_path,
            log_filter: log_filter(verbose, std::env::var("RUST_LOG").ok()),
        })
    }
}

fn log_filter(verbose: u8, rust_log: Option<String>) -> String {
    match verbose {
        0 => rust_log
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "warn".to_string()),
        1 => "warn,inver=info".to_string(),
        _ => "info,inver=debug".to_string(),
    }
}

/// The tenant every data command is scoped to. There is no default.
pub fn tenant_from(m: &clap::ArgMatches) -> Result<TenantId> {
    let raw = m.get_one::<String>("tenant").ok_or_else(|| {
        anyhow!(
            "No tenant given: pass --tenant <ID> or set {}",
            TENANT_ENV
        )
    })?;
    TenantId::new(raw.as_str()).with_context(|| format!("Invalid tenant '{}'", raw))
}
