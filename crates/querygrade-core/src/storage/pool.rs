use crate::errors::QueryError;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_size: usize,
    pub min_idle: usize,
    pub acquire_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: 1,
            acquire_timeout_ms: 10_000,
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub max_size: usize,
    pub idle: usize,
    pub in_use: usize,
}

struct Shared {
    path: PathBuf,
    settings: PoolSettings,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

/// Bounded set of read-only sessions on one SQLite database file.
///
/// At most `max_size` sessions are checked out at once; further callers wait
/// up to `acquire_timeout` and then fail with [`QueryError::PoolExhausted`].
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<Shared>,
}

/// Opens a session the datastore itself refuses to write through.
pub fn open_session(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )?;
    conn.execute_batch("PRAGMA query_only = ON")?;
    Ok(conn)
}

impl ConnectionPool {
    /// Opens `min_idle` sessions eagerly so a bad path fails at startup.
    pub fn open(path: &Path, settings: PoolSettings) -> anyhow::Result<Self> {
        anyhow::ensure!(settings.max_size > 0, "pool max_size must be at least 1");

        let mut idle = Vec::with_capacity(settings.max_size);
        for _ in 0..settings.min_idle.min(settings.max_size) {
            let conn = open_session(path).map_err(|e| {
                anyhow::anyhow!("failed to open database {}: {}", path.display(), e)
            })?;
            idle.push(conn);
        }

        tracing::debug!(
            event = "pool_open",
            path = %path.display(),
            max_size = settings.max_size,
            min_idle = idle.len()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                path: path.to_path_buf(),
                settings,
                idle: Mutex::new(idle),
                permits: Arc::new(Semaphore::new(settings.max_size)),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn settings(&self) -> PoolSettings {
        self.shared.settings
    }

    pub async fn acquire(&self) -> Result<PooledConnection, QueryError> {
        let wait = self.shared.settings.acquire_timeout();
        let permit = match tokio::time::timeout(wait, self.shared.permits.clone().acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(QueryError::Internal("connection pool is closed".into())),
            Err(_) => {
                tracing::warn!(
                    event = "pool_exhausted",
                    waited_ms = wait.as_millis() as u64,
                    max_size = self.shared.settings.max_size
                );
                return Err(QueryError::PoolExhausted { waited: wait });
            }
        };

        let reused = self
            .shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let conn = match reused {
            Some(conn) => conn,
            None => open_session(&self.shared.path)
                .map_err(|e| QueryError::Internal(format!("failed to open session: {e}")))?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            shared: self.shared.clone(),
            _permit: permit,
        })
    }

    pub fn status(&self) -> PoolStatus {
        let max_size = self.shared.settings.max_size;
        let idle = self
            .shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        PoolStatus {
            max_size,
            idle,
            in_use: max_size - self.shared.permits.available_permits(),
        }
    }
}

/// A checked-out session. Dropping it hands the session back to the pool,
/// on success, error and timeout paths alike.
pub struct PooledConnection {
    conn: Option<Connection>,
    shared: Arc<Shared>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("pooled connection is present until dropped")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else { return };
        // a session left inside a transaction is not reused
        if conn.is_autocommit() {
            self.shared
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(conn);
        }
    }
}
