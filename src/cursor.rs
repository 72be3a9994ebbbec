//! Result cursor over a fully materialized result set.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::statement::ColumnInfo;
use crate::value::{FieldValue, Value};

/// One materialized row. Inline storage for rows with <=16 columns avoids
/// heap allocation for typical tables.
pub(crate) type Row = SmallVec<[Value; 16]>;

/// A cursor over the output of one executed statement.
///
/// The whole result set is stored client-side at construction, so fetching
/// never touches the native connection again. The cursor starts positioned
/// before the first row; once `fetch()` returns `false` it keeps returning
/// `false`.
pub struct ResultCursor {
    session: Session,
    columns: Arc<Vec<ColumnInfo>>,
    rows: Vec<Row>,
    /// Index of the current row, `None` before the first fetch and after
    /// end of set.
    position: Option<usize>,
    done: bool,
}

impl ResultCursor {
    pub(crate) fn new(session: Session, columns: Arc<Vec<ColumnInfo>>, rows: Vec<Row>) -> Self {
        Self {
            session,
            columns,
            rows,
            position: None,
            done: false,
        }
    }

    /// The session whose connection produced this result, usable to chain
    /// further statements once fetching is finished.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Advance to the next row. Returns `false` at end of set, terminally.
    pub fn fetch(&mut self) -> bool {
        if self.done {
            return false;
        }
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = None;
            self.done = true;
            false
        }
    }

    /// Typed view over column `index` (0-based) of the current row.
    ///
    /// Valid only between a `fetch()` that returned `true` and the next
    /// `fetch()` call.
    pub fn field(&self, index: usize) -> Result<FieldValue<'_>> {
        if index >= self.columns.len() {
            return Err(Error::InvalidFieldIndex {
                index,
                column_count: self.columns.len(),
            });
        }
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or(Error::NoCurrentRow)?;
        Ok(FieldValue::new(&row[index]))
    }
}
