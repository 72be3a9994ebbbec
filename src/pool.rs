//! Capacity-bounded asynchronous connection pool.
//!
//! Borrowed handles come back to the idle set when the owning session is
//! dropped; poisoned handles are discarded instead. Waiters queue FIFO on a
//! fair semaphore, so capacity is the only point where independent sessions
//! serialize against each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::cursor::ResultCursor;
use crate::error::{Error, Result};
use crate::locator::{Endpoint, Locator, RawConnection};
use crate::session::{blocking, Session};
use crate::value::Value;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connection target.
    pub endpoint: Endpoint,
    /// Maximum number of connections, free plus on loan.
    pub capacity: usize,
    /// Connections opened eagerly at pool creation.
    pub min_idle: usize,
}

impl PoolConfig {
    pub fn new(endpoint: impl Into<Endpoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            capacity: 4,
            min_idle: 1,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }
}

/// Internal pool state, shared with every session borrowed from the pool.
#[derive(Debug)]
pub(crate) struct PoolShared {
    config: PoolConfig,
    /// Free handles, all valid.
    idle: Mutex<Vec<RawConnection>>,
    /// Bounds free + on-loan handles; fair, so waiters are served FIFO.
    semaphore: Arc<Semaphore>,
    closed: AtomicBool,
}

impl PoolShared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Return a healthy handle to the free set. Called from session drop,
    /// possibly on a worker thread.
    pub(crate) fn release(&self, conn: RawConnection) {
        let mut idle = self.idle.lock();
        if self.is_closed() {
            drop(idle);
            Locator::free(conn);
        } else {
            debug!(id = conn.id(), "connection returned to pool");
            idle.push(conn);
        }
    }
}

/// A connection pool.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<PoolShared>,
}

impl Pool {
    /// Create a new pool, eagerly opening `min_idle` connections.
    pub async fn connect(config: PoolConfig) -> Result<Self> {
        let shared = Arc::new(PoolShared {
            semaphore: Arc::new(Semaphore::new(config.capacity)),
            idle: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            config,
        });

        let pool = Self { shared };

        let warm = pool.shared.config.min_idle.min(pool.shared.config.capacity);
        for _ in 0..warm {
            let conn = pool.open_connection().await?;
            pool.shared.idle.lock().push(conn);
        }

        Ok(pool)
    }

    /// Borrow a connection, waiting for capacity if the pool is exhausted.
    ///
    /// The connection returns to the pool when the last owner of the
    /// session (including statements and cursors derived from it) is
    /// dropped, unless the session was invalidated in the meantime.
    pub async fn acquire(&self) -> Result<Session> {
        let permit = Arc::clone(&self.shared.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let conn = {
            let mut idle = self.shared.idle.lock();
            idle.pop()
        };

        // A failed open drops the permit, so it never consumes a slot.
        let conn = match conn {
            Some(c) => c,
            None => self.open_connection().await?,
        };

        Ok(Session::new(conn, Arc::clone(&self.shared), permit))
    }

    /// Borrow a session for one query round trip.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultCursor> {
        let session = self.acquire().await?;
        session.query(sql, params).await
    }

    /// Borrow a session for one statement execution; returns rows affected.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let session = self.acquire().await?;
        session.execute(sql, params).await
    }

    /// Stop accepting new acquisitions and free all idle handles.
    ///
    /// Handles currently on loan are freed when their owning session is
    /// dropped. Pending and future `acquire()` calls fail with
    /// [`Error::PoolClosed`].
    pub async fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.semaphore.close();

        let conns = {
            let mut idle = self.shared.idle.lock();
            std::mem::take(&mut *idle)
        };

        if !conns.is_empty() {
            blocking(move || {
                for conn in conns {
                    Locator::free(conn);
                }
            })
            .await;
        }
    }

    /// Number of free handles.
    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().len()
    }

    /// Number of handles currently on loan.
    pub fn in_use(&self) -> usize {
        self.shared
            .config
            .capacity
            .saturating_sub(self.shared.semaphore.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    async fn open_connection(&self) -> Result<RawConnection> {
        let endpoint = self.shared.config.endpoint.clone();
        blocking(move || Locator::connect(&endpoint)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config() {
        let config = PoolConfig::new(Endpoint::memory()).capacity(8).min_idle(2);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.min_idle, 2);
    }

    #[tokio::test]
    async fn test_pool_basic() {
        // Private :memory: endpoints get one database per connection, so a
        // single-connection pool keeps every operation on the same database.
        let pool = Pool::connect(PoolConfig::new(Endpoint::memory()).capacity(1))
            .await
            .unwrap();

        pool.execute(
            "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)",
            &[],
        )
        .await
        .unwrap();

        pool.execute("INSERT INTO test (name) VALUES (?)", &["hello".into()])
            .await
            .unwrap();

        let mut cursor = pool.query("SELECT name FROM test", &[]).await.unwrap();
        assert!(cursor.fetch());
        assert_eq!(cursor.field(0).unwrap().as_str(), Some("hello"));
        assert!(!cursor.fetch());
        drop(cursor);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_open_does_not_consume_slot() {
        let config = PoolConfig::new(Endpoint::file("/nonexistent-dir/db.sqlite3"))
            .capacity(1)
            .min_idle(0);
        let pool = Pool::connect(config).await.unwrap();

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, Error::ConnectFailed { .. }));
        assert_eq!(pool.in_use(), 0);
    }
}
