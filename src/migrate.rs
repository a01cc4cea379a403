// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Versioned schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in its
//! own transaction together with its version bump, so a failed step leaves
//! the database exactly at the previous version. Failures are fatal to store
//! startup.
//!
//! Version 1 upgrades the original single-tenant layout (no `tenant_id`
//! column) by moving each table aside, recreating it with tenant-scoped keys
//! and copying every row under [`LEGACY_TENANT`].

use crate::error::MigrationError;
use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use tracing::{error, info};

/// Tenant assigned to rows written before the store was multi-tenant.
pub const LEGACY_TENANT: &str = "admin";

pub const LATEST_VERSION: u32 = 2;

struct Migration {
    version: u32,
    name: &'static str,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "multi_tenant_layout",
        apply: multi_tenant_layout,
    },
    Migration {
        version: 2,
        name: "floor_lookup_indexes",
        apply: floor_lookup_indexes,
    },
];

struct TenantTable {
    name: &'static str,
    create: &'static str,
    /// `{tenant}` is replaced by the SQL expression producing the tenant id.
    copy: &'static str,
}

const PORTFOLIO_TABLE: TenantTable = TenantTable {
    name: "portfolio_snapshots",
    create: r#"
    CREATE TABLE IF NOT EXISTS portfolio_snapshots(
        date TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        total_value TEXT NOT NULL,
        invested_amount TEXT,
        PRIMARY KEY(date, tenant_id)
    );
    "#,
    copy: "INSERT INTO portfolio_snapshots(date, tenant_id, total_value, invested_amount)
           SELECT date, {tenant}, CAST(COALESCE(total_value, 0) AS TEXT), CAST(invested_amount AS TEXT)
           FROM portfolio_snapshots_legacy",
};

const ASSET_TABLE: TenantTable = TenantTable {
    name: "asset_snapshots",
    create: r#"
    CREATE TABLE IF NOT EXISTS asset_snapshots(
        date TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        symbol TEXT NOT NULL CHECK(symbol <> ''),
        quantity TEXT NOT NULL,
        price TEXT NOT NULL,
        total_value TEXT NOT NULL,
        PRIMARY KEY(date, symbol, tenant_id)
    );
    "#,
    copy: "INSERT INTO asset_snapshots(date, tenant_id, symbol, quantity, price, total_value)
           SELECT date, {tenant}, symbol,
                  CAST(COALESCE(quantity, 0) AS TEXT),
                  CAST(COALESCE(price, 0) AS TEXT),
                  CAST(COALESCE(total_value, 0) AS TEXT)
           FROM asset_snapshots_legacy",
};

const ANALYSES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ai_analyses(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        model TEXT NOT NULL,
        investment_amount TEXT NOT NULL,
        portfolio_value TEXT NOT NULL,
        response TEXT NOT NULL
    );
"#;

pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |r| r.get(0))
}

/// Apply every pending migration in order and return the resulting version.
pub fn run_migrations(conn: &mut Connection) -> Result<u32, MigrationError> {
    let current = schema_version(conn)?;
    if current > LATEST_VERSION {
        error!(
            found = current,
            supported = LATEST_VERSION,
            "database schema is newer than this build"
        );
        return Err(MigrationError::UnsupportedVersion {
            found: current,
            supported: LATEST_VERSION,
        });
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(version = step.version, name = step.name, "applying schema migration");
        apply_step(conn, step).map_err(|source| {
            error!(
                version = step.version,
                name = step.name,
                error = %source,
                "schema migration failed, rolled back"
            );
            MigrationError::Step {
                version: step.version,
                name: step.name,
                source,
            }
        })?;
    }

    Ok(schema_version(conn)?)
}

fn apply_step(conn: &mut Connection, step: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    (step.apply)(&tx)?;
    tx.pragma_update(None, "user_version", step.version)?;
    tx.commit()
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        params![table],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

pub(crate) fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name=?2",
        params![table, column],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

/// Tenant expression for rows copied out of a legacy table. Tables written by
/// the intermediate per-user layout keep their `user_id`.
fn legacy_tenant_expr(conn: &Connection, table: &str) -> rusqlite::Result<&'static str> {
    if has_column(conn, table, "user_id")? {
        Ok("COALESCE(NULLIF(TRIM(user_id), ''), ?1)")
    } else {
        Ok("?1")
    }
}

fn upgrade_table(tx: &Transaction<'_>, table: &TenantTable) -> rusqlite::Result<()> {
    if !table_exists(tx, table.name)? || has_column(tx, table.name, "tenant_id")? {
        return Ok(());
    }
    let aside = format!("{}_legacy", table.name);
    info!(table = table.name, "upgrading single-tenant table");

    tx.execute_batch(&format!("ALTER TABLE {} RENAME TO {};", table.name, aside))?;
    tx.execute_batch(table.create)?;
    let copy = table.copy.replace("{tenant}", legacy_tenant_expr(tx, &aside)?);
    let copied = tx.execute(&copy, params![LEGACY_TENANT])?;
    tx.execute_batch(&format!("DROP TABLE {};", aside))?;

    info!(table = table.name, rows = copied, "copied legacy rows");
    Ok(())
}

fn multi_tenant_layout(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    upgrade_table(tx, &PORTFOLIO_TABLE)?;
    upgrade_table(tx, &ASSET_TABLE)?;

    tx.execute_batch(PORTFOLIO_TABLE.create)?;
    tx.execute_batch(ASSET_TABLE.create)?;
    tx.execute_batch(ANALYSES_TABLE)?;

    if !has_column(tx, "ai_analyses", "tenant_id")? {
        info!(table = "ai_analyses", "adding tenant column");
        tx.execute_batch(&format!(
            "ALTER TABLE ai_analyses ADD COLUMN tenant_id TEXT NOT NULL DEFAULT '{}';",
            LEGACY_TENANT
        ))?;
        if has_column(tx, "ai_analyses", "user_id")? {
            tx.execute(
                "UPDATE ai_analyses SET tenant_id = COALESCE(NULLIF(TRIM(user_id), ''), ?1)",
                params![LEGACY_TENANT],
            )?;
        }
    }
    Ok(())
}

fn floor_lookup_indexes(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
    CREATE INDEX IF NOT EXISTS idx_portfolio_snapshots_tenant_date
        ON portfolio_snapshots(tenant_id, date);
    CREATE INDEX IF NOT EXISTS idx_asset_snapshots_tenant_symbol_date
        ON asset_snapshots(tenant_id, symbol, date);
    CREATE INDEX IF NOT EXISTS idx_ai_analyses_tenant_id
        ON ai_analyses(tenant_id, id);
    "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_SCHEMA: &str = r#"
        CREATE TABLE portfolio_snapshots(date TEXT PRIMARY KEY, total_value REAL, invested_amount REAL);
        CREATE TABLE asset_snapshots(date TEXT, symbol TEXT, quantity REAL, price REAL, total_value REAL, PRIMARY KEY(date, symbol));
    "#;

    fn legacy_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_SCHEMA).unwrap();
        for (d, v) in [("2024-01-01", 1000.0), ("2024-01-02", 1010.5), ("2024-01-03", 990.25)] {
            conn.execute(
                "INSERT INTO portfolio_snapshots(date, total_value, invested_amount) VALUES (?1, ?2, 900.0)",
                params![d, v],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO asset_snapshots VALUES ('2024-01-03','SPY.BA',10,52250.0,522500.0)",
            [],
        )
        .unwrap();
        conn
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn fresh_database_gets_latest_layout() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&mut conn).unwrap(), LATEST_VERSION);
        for table in ["portfolio_snapshots", "asset_snapshots", "ai_analyses"] {
            assert!(has_column(&conn, table, "tenant_id").unwrap(), "{table}");
        }
    }

    #[test]
    fn legacy_rows_are_tagged_with_legacy_tenant() {
        let mut conn = legacy_conn();
        run_migrations(&mut conn).unwrap();

        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM portfolio_snapshots WHERE tenant_id='admin'"),
            3
        );
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM asset_snapshots WHERE tenant_id='admin'"),
            1
        );
        assert!(!table_exists(&conn, "portfolio_snapshots_legacy").unwrap());
        assert!(!table_exists(&conn, "asset_snapshots_legacy").unwrap());

        let total: String = conn
            .query_row(
                "SELECT total_value FROM portfolio_snapshots WHERE date='2024-01-02'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(total.parse::<rust_decimal::Decimal>().unwrap().to_string(), "1010.5");
    }

    #[test]
    fn rerunning_is_a_no_op() {
        let mut conn = legacy_conn();
        run_migrations(&mut conn).unwrap();
        assert_eq!(run_migrations(&mut conn).unwrap(), LATEST_VERSION);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM portfolio_snapshots"), 3);

        // Even with the marker lost, detection sees the tenant column and skips the copy.
        conn.pragma_update(None, "user_version", 0).unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM portfolio_snapshots"), 3);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM asset_snapshots"), 1);
    }

    #[test]
    fn per_user_layout_keeps_user_ids() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE portfolio_snapshots(date TEXT, user_id TEXT, total_value REAL, invested_amount REAL, PRIMARY KEY(date, user_id));
            INSERT INTO portfolio_snapshots VALUES ('2024-02-01','carol',50.0,NULL);
            INSERT INTO portfolio_snapshots VALUES ('2024-02-01',NULL,70.0,NULL);
            CREATE TABLE ai_analyses(id INTEGER PRIMARY KEY AUTOINCREMENT, timestamp TEXT, model TEXT, investment_amount REAL, portfolio_value REAL, response TEXT, user_id TEXT);
            INSERT INTO ai_analyses(timestamp, model, investment_amount, portfolio_value, response, user_id)
                VALUES ('2024-02-01 10:00:00','m',1.0,2.0,'hold','carol');
            "#,
        )
        .unwrap();
        run_migrations(&mut conn).unwrap();

        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM portfolio_snapshots WHERE tenant_id='carol'"),
            1
        );
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM portfolio_snapshots WHERE tenant_id='admin'"),
            1
        );
        let tenant: String = conn
            .query_row("SELECT tenant_id FROM ai_analyses", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tenant, "carol");
    }

    #[test]
    fn failed_step_rolls_back_and_is_fatal() {
        let mut conn = legacy_conn();
        // A NULL symbol cannot satisfy the new NOT NULL key column.
        conn.execute(
            "INSERT INTO asset_snapshots VALUES ('2024-01-04',NULL,1,1.0,1.0)",
            [],
        )
        .unwrap();

        let err = run_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, MigrationError::Step { version: 1, .. }));

        assert_eq!(schema_version(&conn).unwrap(), 0);
        assert!(!has_column(&conn, "portfolio_snapshots", "tenant_id").unwrap());
        assert!(!table_exists(&conn, "portfolio_snapshots_legacy").unwrap());
        assert!(!table_exists(&conn, "ai_analyses").unwrap());
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM portfolio_snapshots"), 3);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
        let err = run_migrations(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UnsupportedVersion { found: 99, supported: LATEST_VERSION }
        ));
    }
}
