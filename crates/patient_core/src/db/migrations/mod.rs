//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically and revert them for resets.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Version checks and writes happen inside one `IMMEDIATE` transaction, so
//!   concurrent starters against the same file serialize on the write lock
//!   and the loser observes the winner's version as a no-op.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    up: &'static str,
    down: &'static str,
    /// Tables created by `up`; their presence in an unversioned database is a
    /// schema conflict.
    creates_tables: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up: include_str!("0001_patients.sql"),
    down: include_str!("0001_patients.down.sql"),
    creates_tables: &["patients"],
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this binary.
/// - `IncompatibleSchema` when an unversioned database already has a table
///   that a pending migration would create.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current_version = schema_version(&tx)?;

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        if current_version == 0 {
            for table in migration.creates_tables {
                if table_exists(&tx, table)? {
                    return Err(DbError::IncompatibleSchema {
                        table: (*table).to_string(),
                    });
                }
            }
        }

        tx.execute_batch(migration.up)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok direction=up from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Reverts every applied migration, newest first, back to version 0.
///
/// Intended for development resets and test teardown; data is dropped.
pub fn revert_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current_version = schema_version(&tx)?;

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    for migration in MIGRATIONS.iter().rev() {
        if migration.version > current_version {
            continue;
        }

        tx.execute_batch(migration.down)?;
        tx.execute_batch(&format!(
            "PRAGMA user_version = {};",
            migration.version - 1
        ))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok direction=down from_version={} to_version=0",
        current_version
    );
    Ok(())
}

/// Reads `PRAGMA user_version` from a connection.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
