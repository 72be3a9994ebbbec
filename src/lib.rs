//! querykit: an asynchronous session layer over a pooled SQLite client.
//!
//! A capacity-bounded [`Pool`] lends connections out as [`Session`]s;
//! sessions compile [`PreparedStatement`]s, bind positional [`Value`]
//! parameters, and execute on worker threads, producing fully materialized
//! [`ResultCursor`]s. A session that observes a native protocol failure is
//! poisoned: its connection is destroyed on release instead of returning to
//! the pool.
//!
//! ```no_run
//! use querykit::{Endpoint, Pool, PoolConfig};
//!
//! # async fn demo() -> querykit::Result<()> {
//! let pool = Pool::connect(PoolConfig::new(Endpoint::file("app.sqlite3"))).await?;
//! let session = pool.acquire().await?;
//! let mut cursor = session
//!     .query("SELECT value FROM test WHERE id = ?", &[1i64.into()])
//!     .await?;
//! while cursor.fetch() {
//!     println!("{:?}", cursor.field(0)?.as_str());
//! }
//! # Ok(())
//! # }
//! ```

mod binder;
mod cursor;
mod error;
mod locator;
mod pool;
mod session;
mod statement;
mod value;


pub use binder::bind_all;
pub use cursor::ResultCursor;
pub use error::{Error, Result};
pub use locator::Endpoint;
pub use pool::{Pool, PoolConfig};
pub use session::Session;
pub use statement::{ColumnInfo, PreparedStatement};
pub use value::{FieldValue, Value, ValueType};
