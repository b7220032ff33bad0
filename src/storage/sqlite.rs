use super::migrations::apply_migrations;
use super::{BackendError, KeyValueStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    quota_bytes: Option<u64>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| BackendError::Storage(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, BackendError> {
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            quota_bytes: None,
        })
    }

    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    fn get_connection(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn
            .lock()
            .map_err(|e| BackendError::Storage(format!("Failed to lock connection: {}", e)))
    }

    fn check_quota(&self, conn: &Connection, key: &str, value: &str) -> Result<(), BackendError> {
        let Some(limit) = self.quota_bytes else {
            return Ok(());
        };

        let others: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM entries WHERE key <> ?1",
            params![key],
            |row| row.get(0),
        )?;
        let needed = others.max(0) as u64 + (key.len() + value.len()) as u64;
        if needed > limit {
            return Err(BackendError::QuotaExceeded { needed, limit });
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let conn = self.get_connection()?;
        let value = conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let conn = self.get_connection()?;
        self.check_quota(&conn, key, value)?;
        conn.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        let conn = self.get_connection()?;
        conn.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        let conn = self.get_connection()?;
        conn.execute("DELETE FROM entries", [])?;
        Ok(())
    }
}
