use crate::errors::QueryError;
use crate::model::{Row, RowSequence, Value};
use crate::storage::pool::ConnectionPool;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, InterruptHandle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// VM steps between two deadline checks of the session-side timeout.
const PROGRESS_STEPS: i32 = 1_000;

/// Runs one already-bounded, read-only statement and materializes its rows.
///
/// Implementations trust their caller to have sanitized `sql`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<RowSequence, QueryError>;
}

pub struct SqliteExecutor {
    pool: ConnectionPool,
}

impl SqliteExecutor {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<RowSequence, QueryError> {
        let conn = self.pool.acquire().await?;
        let cancel = Cancel::new(conn.get_interrupt_handle());
        let armed = cancel.clone();
        let sql = sql.to_string();

        // The session is moved into the task and goes back to the pool only
        // after the cancel handle is disarmed, however the statement ends.
        let task = tokio::task::spawn_blocking(move || {
            let deadline = Instant::now() + timeout;
            let result = run_bounded(&conn, &sql, deadline, timeout);
            armed.disarm();
            drop(conn);
            result
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(QueryError::Internal(format!(
                "execution task failed: {join}"
            ))),
            Err(_) => {
                let interrupted = cancel.fire();
                tracing::warn!(
                    event = "statement_timeout",
                    side = "client",
                    interrupted,
                    timeout_ms = timeout.as_millis() as u64
                );
                Err(timeout_error(timeout))
            }
        }
    }
}

/// Interrupt handle scoped to one statement.
///
/// Firing and disarming share a lock, so an interrupt can never reach a
/// session that has already been handed to another request.
struct Cancel(Mutex<Option<InterruptHandle>>);

impl Cancel {
    fn new(handle: InterruptHandle) -> Arc<Self> {
        Arc::new(Self(Mutex::new(Some(handle))))
    }

    fn disarm(&self) {
        self.slot().take();
    }

    /// Returns whether the statement was still running and got interrupted.
    fn fire(&self) -> bool {
        match self.slot().as_ref() {
            Some(handle) => {
                handle.interrupt();
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<InterruptHandle>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn timeout_error(timeout: Duration) -> QueryError {
    QueryError::Execution {
        message: format!(
            "canceling statement due to statement timeout ({}ms)",
            timeout.as_millis()
        ),
    }
}

/// Installs the session-side deadline, runs the statement, and removes the
/// deadline again before the session can be reused.
fn run_bounded(
    conn: &Connection,
    sql: &str,
    deadline: Instant,
    timeout: Duration,
) -> Result<RowSequence, QueryError> {
    conn.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));
    let result = collect_rows(conn, sql);
    conn.progress_handler(0, None::<fn() -> bool>);

    result.map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::OperationInterrupted => {
            tracing::warn!(
                event = "statement_timeout",
                side = "session",
                timeout_ms = timeout.as_millis() as u64
            );
            timeout_error(timeout)
        }
        other => QueryError::Execution {
            message: other.to_string(),
        },
    })
}

/// Column labels come from the statement metadata, in position order and with
/// the datastore's own casing.
fn collect_rows(conn: &Connection, sql: &str) -> rusqlite::Result<RowSequence> {
    let mut stmt = conn.prepare(sql)?;
    let labels: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let mut row = Row::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            row.insert(label.as_str(), cell(r.get_ref(i)?));
        }
        out.push(row);
    }
    Ok(out)
}

fn cell(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        // invalid UTF-8 stays as raw bytes so distinct values never collapse
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => Value::Text(s.to_owned()),
            Err(_) => Value::Blob(t.to_vec()),
        },
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}
