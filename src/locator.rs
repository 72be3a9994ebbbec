//! Connection locator: creates and destroys raw native handles.

use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

/// The connection target descriptor used to key pooled connections.
///
/// For SQLite this is a database path, `:memory:`, or a URI such as
/// `file:name?mode=memory&cache=shared`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
}

impl Endpoint {
    /// A private in-memory database (one per connection).
    pub fn memory() -> Self {
        Self {
            path: ":memory:".to_string(),
        }
    }

    /// A file-backed database, or a `file:` URI.
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn is_memory(&self) -> bool {
        self.path == ":memory:" || self.path.contains("mode=memory")
    }
}

impl From<&str> for Endpoint {
    fn from(path: &str) -> Self {
        Endpoint::file(path)
    }
}

/// A raw native connection handle, exclusively owned by the pool when free
/// and by exactly one session when borrowed.
#[derive(Debug)]
pub(crate) struct RawConnection {
    id: u64,
    conn: Connection,
}

impl RawConnection {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn handle(&self) -> &Connection {
        &self.conn
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Creates and destroys raw connections for the pool.
pub(crate) struct Locator;

impl Locator {
    /// Open a new raw connection to the endpoint. Blocking.
    pub(crate) fn connect(endpoint: &Endpoint) -> Result<RawConnection> {
        let is_memory = endpoint.is_memory();
        let conn = if endpoint.path() == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(endpoint.path())
        }
        .map_err(|e| Error::ConnectFailed {
            message: e.to_string(),
        })?;

        // Performance pragmas for file-based databases
        if !is_memory {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA busy_timeout=5000;
                 PRAGMA cache_size=-64000;",
            )
            .map_err(|e| Error::ConnectFailed {
                message: e.to_string(),
            })?;
        }

        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(id, endpoint = endpoint.path(), "connection established");
        Ok(RawConnection { id, conn })
    }

    /// Destroy a raw connection. Blocking.
    pub(crate) fn free(conn: RawConnection) {
        debug!(id = conn.id, "connection closed");
        drop(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_memory_detection() {
        assert!(Endpoint::memory().is_memory());
        assert!(Endpoint::file("file:x?mode=memory&cache=shared").is_memory());
        assert!(!Endpoint::file("/tmp/db.sqlite3").is_memory());
    }

    #[test]
    fn test_connect_memory() {
        let conn = Locator::connect(&Endpoint::memory()).unwrap();
        assert!(conn.id() > 0);
        Locator::free(conn);
    }

    #[test]
    fn test_connect_failure() {
        let err = Locator::connect(&Endpoint::file("/nonexistent-dir/db.sqlite3")).unwrap_err();
        assert!(matches!(err, Error::ConnectFailed { .. }));
    }
}
