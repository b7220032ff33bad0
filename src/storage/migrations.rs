//! Schema migrations for the SQLite backend.
//!
//! Migrations are applied in order inside one transaction and the applied
//! version is mirrored to `PRAGMA user_version`. To add one, append to
//! `MIGRATIONS` with the next version number; never edit a released entry.

use super::BackendError;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    up: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up: r#"
        CREATE TABLE IF NOT EXISTS entries (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );
    "#,
}];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

pub fn current_version(conn: &Connection) -> Result<u32, BackendError> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies every migration newer than the database. A database written by a
/// newer binary is refused rather than guessed at.
pub fn apply_migrations(conn: &mut Connection) -> Result<(), BackendError> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(BackendError::UnsupportedSchema {
            found: current,
            supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.up).map_err(|e| {
            BackendError::Storage(format!(
                "Failed to apply migration {}: {}",
                migration.version, e
            ))
        })?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    log::debug!(
        "event=sqlite_migrate status=ok from={} to={}",
        current,
        latest
    );
    Ok(())
}
