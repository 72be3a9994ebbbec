//! Ordered argument binding: list element `k` goes to placeholder `k + 1`.

use crate::error::{Error, Result};
use crate::statement::PreparedStatement;
use crate::value::Value;

/// Bind an ordered argument list to a statement's parameter slots.
///
/// The list length must equal the statement's placeholder count; a shorter
/// list would silently execute with stale or NULL parameters, so the
/// mismatch is a hard synchronous error instead.
pub fn bind_all(stmt: &mut PreparedStatement, args: &[Value]) -> Result<()> {
    if args.len() != stmt.param_count() {
        return Err(Error::BindFailed {
            message: format!(
                "statement takes {} parameters, {} supplied",
                stmt.param_count(),
                args.len()
            ),
        });
    }
    for (k, value) in args.iter().enumerate() {
        stmt.bind(k + 1, value.clone())?;
    }
    Ok(())
}
