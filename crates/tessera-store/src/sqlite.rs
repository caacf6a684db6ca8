//! SQLite implementation of the group cache.
//!
//! This is the persistent local cache. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use tessera_core::SessionId;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{CachedChain, GroupCache};

/// SQLite-backed group cache.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteGroupCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGroupCache {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn lock_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}

fn encode_chain(cached: &CachedChain) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(cached, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_chain(bytes: &[u8]) -> Result<CachedChain> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[async_trait]
impl GroupCache for SqliteGroupCache {
    async fn load(&self, session_id: &SessionId) -> Result<Option<CachedChain>> {
        let conn = self.conn.clone();
        let session_id = *session_id;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;

            let row: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT chain FROM group_cache WHERE session_id = ?1",
                    params![session_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            row.map(|bytes| decode_chain(&bytes)).transpose()
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("task join error: {}", e)))?
    }

    async fn save(&self, session_id: &SessionId, cached: &CachedChain) -> Result<()> {
        let conn = self.conn.clone();
        let session_id = *session_id;
        let initiator = cached.initiator.to_string();
        let chain = encode_chain(cached)?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;

            conn.execute(
                "INSERT INTO group_cache (session_id, initiator, chain, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO UPDATE SET
                     initiator = excluded.initiator,
                     chain = excluded.chain,
                     updated_at = excluded.updated_at",
                params![
                    session_id.as_bytes().as_slice(),
                    initiator,
                    chain,
                    now_millis()
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("task join error: {}", e)))?
    }

    async fn evict(&self, session_id: &SessionId) -> Result<()> {
        let conn = self.conn.clone();
        let session_id = *session_id;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            conn.execute(
                "DELETE FROM group_cache WHERE session_id = ?1",
                params![session_id.as_bytes().as_slice()],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("task join error: {}", e)))?
    }

    async fn reset(&self) -> Result<()> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            conn.execute("DELETE FROM group_cache", [])?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("task join error: {}", e)))?
    }
}
