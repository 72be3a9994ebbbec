//! Error types for querykit.
//!
//! Index and arity checks fail synchronously, before any native call.
//! Every other variant is produced inside an asynchronous stage and carries
//! the native diagnostic text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The locator could not establish a connection.
    #[error("connect failed: {message}")]
    ConnectFailed { message: String },

    /// Statement compilation was rejected.
    #[error("prepare failed: {message}")]
    PrepareFailed { message: String },

    /// The native parameter binding step failed, or the supplied argument
    /// list does not match the statement's placeholder count.
    #[error("bind failed: {message}")]
    BindFailed { message: String },

    /// Statement execution failed; includes the native diagnostic text.
    #[error("execute failed: {message}")]
    ExecuteFailed { message: String },

    /// Row materialization failed.
    #[error("fetch failed: {message}")]
    FetchFailed { message: String },

    /// Bind index out of range. Raised at the call site; no slot is altered.
    #[error("parameter index {index} out of range 1..={param_count}")]
    InvalidParamIndex { index: usize, param_count: usize },

    /// Field index out of range for the current result set.
    #[error("field index {index} out of range ({column_count} columns)")]
    InvalidFieldIndex { index: usize, column_count: usize },

    /// `field()` called before a successful `fetch()` or after end of set.
    #[error("cursor is not positioned on a row")]
    NoCurrentRow,

    /// Acquisition attempted after the pool was shut down.
    #[error("connection pool is shut down")]
    PoolClosed,

    /// The session's connection has already been released.
    #[error("connection already released")]
    ConnectionClosed,
}

impl Error {
    /// Whether this failure happened mid-protocol on the native handle and
    /// therefore disqualifies the connection from being pooled again.
    pub(crate) fn poisons_session(&self) -> bool {
        matches!(
            self,
            Error::PrepareFailed { .. }
                | Error::BindFailed { .. }
                | Error::ExecuteFailed { .. }
                | Error::FetchFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
