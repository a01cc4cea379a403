// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for the snapshot store.
//!
//! Library operations return these typed errors; the CLI wraps them in
//! `anyhow` with context.

use thiserror::Error;

/// Failure reading or writing the snapshot database.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unreadable value in {table}.{column}: {reason}")]
    Corrupt {
        table: &'static str,
        column: &'static str,
        reason: String,
    },
}

/// Fatal failure while bringing the schema up to date. Store startup halts.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("schema migration {version} ({name}) failed: {source}")]
    Step {
        version: u32,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("could not read schema version: {0}")]
    Probe(#[from] rusqlite::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TenantIdError {
    #[error("tenant id must not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_wraps_sqlite_message() {
        let err = StorageError::from(rusqlite::Error::InvalidQuery);
        assert!(err.to_string().starts_with("database error"));
    }

    #[test]
    fn migration_step_error_names_the_step() {
        let err = MigrationError::Step {
            version: 1,
            name: "multi_tenant_layout",
            source: rusqlite::Error::InvalidQuery,
        };
        let msg = err.to_string();
        assert!(msg.contains("migration 1"));
        assert!(msg.contains("multi_tenant_layout"));
    }

    #[test]
    fn corrupt_value_is_readable() {
        let err = StorageError::Corrupt {
            table: "portfolio_snapshots",
            column: "total_value",
            reason: "invalid decimal 'abc'".into(),
        };
        assert_eq!(
            err.to_string(),
            "unreadable value in portfolio_snapshots.total_value: invalid decimal 'abc'"
        );
    }
}
