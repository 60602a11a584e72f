use super::{Field, LoadRow};
use crate::error::SeedResult;
use rusqlite::{params_from_iter, Transaction};

/// Bundled SQLite's SQLITE_MAX_VARIABLE_NUMBER.
const MAX_BIND_PARAMS: usize = 32_766;

/// Multi-row INSERTs, each statement as wide as the bind limit allows.
pub(super) fn insert_rows<R: LoadRow>(tx: &Transaction<'_>, rows: &[R]) -> SeedResult<()> {
    let rows_per_statement = (MAX_BIND_PARAMS / R::TABLE.width()).max(1);
    for group in rows.chunks(rows_per_statement) {
        let sql = R::TABLE.insert_sql(group.len());
        let mut stmt = tx.prepare_cached(&sql)?;
        let values: Vec<Field<'_>> = group.iter().flat_map(|r| r.fields()).collect();
        stmt.execute(params_from_iter(values.iter()))?;
    }
    Ok(())
}
