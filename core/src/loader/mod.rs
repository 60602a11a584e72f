//! Bulk loading of generated rows.
//!
//! RULE: one BulkLoader, two interchangeable strategies. Callers never
//! branch on the strategy themselves.
//!
//! Both strategies:
//!   - load a stage's rows in chunks, sequentially, one transaction and one
//!     pooled connection per chunk, committing per chunk;
//!   - write enums and flags as their integer codes;
//!   - bind columns in TableSpec order, which must equal the schema order.

pub mod copy;
mod insert;

use crate::{
    error::{SeedError, SeedResult},
    store::Store,
};
use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Text form of every persisted datetime. Microsecond precision, fixed width.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> SeedResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| anyhow::anyhow!("bad timestamp '{text}': {e}").into())
}

// ── Row description ──────────────────────────────────────────────

/// Storage class of a column, used to type copy-buffer text before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    /// Free text and timestamps.
    Text,
}

/// Target table and its insert columns, in declared schema order.
/// The `id` primary key is assigned by the store and never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    /// One per column, same order.
    pub kinds: &'static [ColumnKind],
}

impl TableSpec {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// `INSERT INTO t (c1, ..) VALUES (?, ..), (?, ..)` for `rows` rows.
    pub fn insert_sql(&self, rows: usize) -> String {
        let placeholders = format!("({})", vec!["?"; self.width()].join(", "));
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.name,
            self.columns.join(", "),
            vec![placeholders.as_str(); rows].join(", ")
        )
    }
}

/// One field value on its way to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<'a> {
    Int(i64),
    Real(f64),
    Text(&'a str),
    Timestamp(NaiveDateTime),
    Null,
}

impl ToSql for Field<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Field::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Field::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            Field::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Field::Timestamp(ts) => ToSqlOutput::Owned(Value::Text(format_timestamp(ts))),
            Field::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// A generated row that knows its table and column values.
pub trait LoadRow: Send + Sync {
    const TABLE: TableSpec;

    /// Values in `TABLE.columns` order.
    fn fields(&self) -> Vec<Field<'_>>;
}

// ── Strategy ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Multi-row parameterized INSERT statements.
    InsertBatches,
    /// Tab-delimited text buffer streamed through one positional statement.
    #[default]
    StreamingCopy,
}

impl FromStr for LoadStrategy {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" | "insert_batches" => Ok(Self::InsertBatches),
            "copy" | "streaming_copy" => Ok(Self::StreamingCopy),
            other => Err(SeedError::config(format!("unknown load strategy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub table: &'static str,
    pub rows: usize,
    pub chunks: usize,
}

pub struct BulkLoader {
    strategy: LoadStrategy,
    chunk_size: usize,
}

impl BulkLoader {
    pub fn new(strategy: LoadStrategy, chunk_size: usize) -> SeedResult<Self> {
        if chunk_size == 0 {
            return Err(SeedError::config("load chunk size must be greater than zero"));
        }
        Ok(Self {
            strategy,
            chunk_size,
        })
    }

    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Load all rows chunk by chunk. A failed chunk aborts the load with a
    /// LoadError naming its offset range; earlier chunks stay committed.
    pub fn load<R: LoadRow>(&self, store: &Store, rows: &[R]) -> SeedResult<LoadSummary> {
        let table = R::TABLE.name;
        let mut summary = LoadSummary {
            table,
            rows: 0,
            chunks: 0,
        };
        for (i, chunk) in rows.chunks(self.chunk_size).enumerate() {
            let start = i * self.chunk_size;
            let end = start + chunk.len();
            self.load_chunk(store, chunk)
                .map_err(|source| SeedError::Load {
                    table,
                    start,
                    end,
                    source: Box::new(source),
                })?;
            summary.rows += chunk.len();
            summary.chunks += 1;
            log::debug!("{table}: committed chunk {i} rows [{start}, {end})");
        }
        Ok(summary)
    }

    /// One chunk, one connection, one transaction.
    pub fn load_chunk<R: LoadRow>(&self, store: &Store, rows: &[R]) -> SeedResult<()> {
        // Returned to the pool when dropped, on every path out of here.
        let mut conn = store.acquire()?;
        let tx = conn.transaction()?;
        match self.strategy {
            LoadStrategy::InsertBatches => insert::insert_rows(&tx, rows)?,
            LoadStrategy::StreamingCopy => {
                let buffer = copy::encode_rows(rows);
                copy::copy_in(&tx, &R::TABLE, &buffer)?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
