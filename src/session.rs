//! A session over one borrowed connection.
//!
//! Every operation that touches the native handle runs on a blocking worker
//! thread; callers only ever await. A native failure during
//! prepare/bind/execute/materialization permanently invalidates the session,
//! and an invalidated session's connection is freed instead of returning to
//! the pool's free set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task;
use tracing::warn;

use crate::binder;
use crate::cursor::ResultCursor;
use crate::error::{Error, Result};
use crate::locator::{Locator, RawConnection};
use crate::pool::PoolShared;
use crate::statement::{ColumnInfo, PreparedStatement, StatementMeta};
use crate::value::Value;

/// Run a blocking native call on a worker thread.
pub(crate) async fn blocking<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(f).await {
        Ok(value) => value,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => panic!("runtime shut down while a native call was queued"),
    }
}

#[derive(Debug)]
struct SessionInner {
    /// The borrowed handle. `None` only transiently during drop.
    conn: Mutex<Option<RawConnection>>,
    /// Cleared permanently on the first native protocol failure.
    valid: AtomicBool,
    pool: Arc<PoolShared>,
    /// Held for the whole loan; releasing it frees a capacity slot.
    _permit: OwnedSemaphorePermit,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let Some(conn) = self.conn.get_mut().take() else {
            return;
        };
        if !self.valid.load(Ordering::Acquire) {
            warn!(id = conn.id(), "discarding poisoned connection");
            Locator::free(conn);
        } else {
            self.pool.release(conn);
        }
    }
}

/// A session wrapping one borrowed connection.
///
/// Cloning is cheap and shares the same connection; prepared statements and
/// cursors hold such clones, so the connection stays on loan until the last
/// of them is dropped. At most one operation may be in flight per session.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(
        conn: RawConnection,
        pool: Arc<PoolShared>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                conn: Mutex::new(Some(conn)),
                valid: AtomicBool::new(true),
                pool,
                _permit: permit,
            }),
        }
    }

    /// Whether the session's connection is still eligible to be pooled.
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Run `f` against the borrowed handle.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&RawConnection) -> Result<T>) -> Result<T> {
        let guard = self.inner.conn.lock();
        let conn = guard.as_ref().ok_or(Error::ConnectionClosed)?;
        f(conn)
    }

    #[cfg(test)]
    pub(crate) fn connection_id(&self) -> Option<u64> {
        self.inner.conn.lock().as_ref().map(|c| c.id())
    }

    /// Mark the session invalid if `err` was a native protocol failure,
    /// then hand the error back for propagation.
    pub(crate) fn fail(&self, err: Error) -> Error {
        if err.poisons_session() && self.inner.valid.swap(false, Ordering::AcqRel) {
            warn!(error = %err, "session invalidated");
        }
        err
    }

    /// Compile a statement, returning its parameter slots and column
    /// metadata.
    pub async fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let sql: Arc<str> = Arc::from(sql);
        let session = self.clone();
        let task_sql = Arc::clone(&sql);

        let meta = blocking(move || {
            session.with_conn(|conn| {
                let stmt = conn
                    .handle()
                    .prepare_cached(task_sql.as_ref())
                    .map_err(|e| Error::PrepareFailed {
                        message: e.to_string(),
                    })?;
                let columns = stmt
                    .columns()
                    .iter()
                    .map(|c| ColumnInfo {
                        name: c.name().to_string(),
                        decl_type: c.decl_type().map(str::to_string),
                    })
                    .collect();
                Ok(StatementMeta {
                    param_count: stmt.parameter_count(),
                    columns,
                })
            })
        })
        .await
        .map_err(|e| self.fail(e))?;

        Ok(PreparedStatement::new(self.clone(), sql, meta))
    }

    /// Prepare, bind the arguments in order (1-based), and query, as one
    /// chained pipeline.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultCursor> {
        let mut stmt = self.prepare(sql).await?;
        binder::bind_all(&mut stmt, params)?;
        stmt.query().await
    }

    /// Prepare, bind, and execute; returns the number of rows affected.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut stmt = self.prepare(sql).await?;
        binder::bind_all(&mut stmt, params)?;
        stmt.execute().await
    }

    /// Open a transaction on this session's connection.
    pub async fn begin(&self) -> Result<()> {
        self.execute("BEGIN", &[]).await.map(drop)
    }

    pub async fn commit(&self) -> Result<()> {
        self.execute("COMMIT", &[]).await.map(drop)
    }

    pub async fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK", &[]).await.map(drop)
    }

    /// The last auto-generated row id on this connection.
    pub fn last_insert_id(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.handle().last_insert_rowid()))
    }
}
