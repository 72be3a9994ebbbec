//! Prepared statements: fixed parameter slots plus column metadata.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::cursor::{ResultCursor, Row};
use crate::error::{Error, Result};
use crate::session::{blocking, Session};
use crate::value::{Value, ValueType};

/// Metadata for one result column, captured at prepare time.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type from the schema, if any.
    pub decl_type: Option<String>,
}

pub(crate) struct StatementMeta {
    pub(crate) param_count: usize,
    pub(crate) columns: Vec<ColumnInfo>,
}

/// A compiled statement with its parameter slots.
///
/// The slot count is fixed at creation from the placeholder count the
/// native client reports; binds are positional, 1-based, and range-checked
/// synchronously. The statement is re-executable: each `query()`/`execute()`
/// discards prior result state and binds every slot afresh.
pub struct PreparedStatement {
    session: Session,
    sql: Arc<str>,
    param_count: usize,
    columns: Arc<Vec<ColumnInfo>>,
    /// Slot `k` holds the value for placeholder `k + 1`; unbound slots
    /// stay NULL.
    params: Vec<Value>,
}

impl PreparedStatement {
    pub(crate) fn new(session: Session, sql: Arc<str>, meta: StatementMeta) -> Self {
        Self {
            session,
            sql,
            param_count: meta.param_count,
            columns: Arc::new(meta.columns),
            params: vec![Value::Null; meta.param_count],
        }
    }

    /// Number of parameter placeholders.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Number of result columns, zero for statements that yield no rows.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Result column metadata.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// The session this statement belongs to.
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }

    fn slot(&self, index: usize) -> Result<usize> {
        if index == 0 || index > self.param_count {
            return Err(Error::InvalidParamIndex {
                index,
                param_count: self.param_count,
            });
        }
        Ok(index - 1)
    }

    /// Bind a value to placeholder `index` (1-based).
    ///
    /// Fails synchronously with [`Error::InvalidParamIndex`] when the index
    /// is out of range; no slot is altered on failure.
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let slot = self.slot(index)?;
        self.params[slot] = value.into();
        Ok(())
    }

    /// Bind a value after converting it to an explicit storage class.
    pub fn bind_with_type(
        &mut self,
        index: usize,
        value: impl Into<Value>,
        ty: ValueType,
    ) -> Result<()> {
        let slot = self.slot(index)?;
        let coerced = value.into().coerce(ty)?;
        self.params[slot] = coerced;
        Ok(())
    }

    /// Execute and fully materialize the result set into a cursor.
    ///
    /// Runs on a worker thread: binds every slot into the native statement,
    /// executes, and stores all rows client-side so the pooled connection is
    /// never held open by a half-read result. A native failure invalidates
    /// the session.
    pub async fn query(&mut self) -> Result<ResultCursor> {
        let session = self.session.clone();
        let sql = Arc::clone(&self.sql);
        let params = self.params.clone();

        let rows = blocking(move || {
            session.with_conn(|conn| {
                let mut stmt = conn
                    .handle()
                    .prepare_cached(sql.as_ref())
                    .map_err(|e| Error::ExecuteFailed {
                        message: e.to_string(),
                    })?;

                for (i, param) in params.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, param)
                        .map_err(|e| Error::BindFailed {
                            message: e.to_string(),
                        })?;
                }

                let column_count = stmt.column_count();
                let mut out: Vec<Row> = Vec::new();
                let mut rows = stmt.raw_query();
                loop {
                    match rows.next() {
                        Ok(Some(row)) => {
                            let mut values: Row = SmallVec::with_capacity(column_count);
                            for i in 0..column_count {
                                let cell =
                                    row.get_ref(i).map_err(|e| Error::FetchFailed {
                                        message: e.to_string(),
                                    })?;
                                values.push(Value::from_value_ref(cell));
                            }
                            out.push(values);
                        }
                        Ok(None) => break,
                        // The first step is where the statement actually
                        // executes; later steps are row materialization.
                        Err(e) if out.is_empty() => {
                            return Err(Error::ExecuteFailed {
                                message: e.to_string(),
                            })
                        }
                        Err(e) => {
                            return Err(Error::FetchFailed {
                                message: e.to_string(),
                            })
                        }
                    }
                }
                Ok(out)
            })
        })
        .await
        .map_err(|e| self.session.fail(e))?;

        Ok(ResultCursor::new(
            self.session.clone(),
            Arc::clone(&self.columns),
            rows,
        ))
    }

    /// Execute without producing a cursor; returns rows affected.
    pub async fn execute(&mut self) -> Result<u64> {
        let session = self.session.clone();
        let sql = Arc::clone(&self.sql);
        let params = self.params.clone();

        blocking(move || {
            session.with_conn(|conn| {
                let mut stmt = conn
                    .handle()
                    .prepare_cached(sql.as_ref())
                    .map_err(|e| Error::ExecuteFailed {
                        message: e.to_string(),
                    })?;

                for (i, param) in params.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, param)
                        .map_err(|e| Error::BindFailed {
                            message: e.to_string(),
                        })?;
                }

                let changed = stmt.raw_execute().map_err(|e| Error::ExecuteFailed {
                    message: e.to_string(),
                })?;
                Ok(changed as u64)
            })
        })
        .await
        .map_err(|e| self.session.fail(e))
    }
}
