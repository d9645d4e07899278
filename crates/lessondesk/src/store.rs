//! Persisted credentials: the token pair and the logged-in user object.

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS credentials (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";
const CACHED_USER: &str = "user";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cached user is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential store lock poisoned")]
    Poisoned,
}

pub struct CredentialStore {
    db: Mutex<Connection>,
}

impl CredentialStore {
    /// Opens (or creates) the store at `path` and initializes the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let db = self.conn()?;
        let value = db
            .query_row(
                "SELECT value FROM credentials WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(db: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
        db.execute(
            "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value),
        )?;
        Ok(())
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(REFRESH_TOKEN)
    }

    /// Stores a new access token, and the refresh token if one was issued.
    pub fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), StoreError> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        Self::set(&tx, ACCESS_TOKEN, access)?;
        if let Some(refresh) = refresh {
            Self::set(&tx, REFRESH_TOKEN, refresh)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn cached_user(&self) -> Result<Option<Value>, StoreError> {
        match self.get(CACHED_USER)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_cached_user(&self, user: &Value) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user)?;
        let db = self.conn()?;
        Self::set(&db, CACHED_USER, &raw)
    }

    /// Removes tokens and the cached user.
    pub fn clear(&self) -> Result<(), StoreError> {
        let db = self.conn()?;
        db.execute("DELETE FROM credentials", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokens_roundtrip_and_keep_refresh() {
        let store = CredentialStore::in_memory().unwrap();
        assert_eq!(store.access_token().unwrap(), None);

        store.set_tokens("a1", Some("r1")).unwrap();
        store.set_tokens("a2", None).unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r1"));
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = CredentialStore::in_memory().unwrap();
        store.set_tokens("a1", Some("r1")).unwrap();
        store.set_cached_user(&json!({"id": "u1", "role": "admin"})).unwrap();
        assert_eq!(store.cached_user().unwrap().unwrap()["role"], "admin");

        store.clear().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
        assert_eq!(store.cached_user().unwrap(), None);
    }
}
