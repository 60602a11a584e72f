//! Text bulk-copy format.
//!
//! One row per line, fields separated by TAB, in TableSpec column order.
//!   - NULL is the literal `\N`.
//!   - Datetimes use TIMESTAMP_FORMAT.
//!   - Backslash, TAB, LF and CR inside text are escaped as
//!     `\\`, `\t`, `\n`, `\r`, so a raw TAB or LF is always a separator.
//!
//! The format is positional: a buffer is only meaningful together with the
//! TableSpec it was encoded for. On the way in, each field is parsed
//! according to its ColumnKind and bound as a typed value.

use super::{format_timestamp, ColumnKind, Field, LoadRow, TableSpec};
use crate::error::{SeedError, SeedResult};
use rusqlite::{params_from_iter, types::Value, Transaction};
use std::borrow::Cow;
use std::fmt::Write;

pub const NULL_SENTINEL: &str = "\\N";

/// Serialize rows into one copy buffer.
pub fn encode_rows<R: LoadRow>(rows: &[R]) -> String {
    let mut out = String::with_capacity(rows.len() * 16 * R::TABLE.width());
    for row in rows {
        for (i, field) in row.fields().iter().enumerate() {
            if i > 0 {
                out.push('\t');
            }
            write_field(field, &mut out);
        }
        out.push('\n');
    }
    out
}

fn write_field(field: &Field<'_>, out: &mut String) {
    match field {
        Field::Int(i) => {
            let _ = write!(out, "{i}");
        }
        // Display for f64 is the shortest text that parses back to the same bits.
        Field::Real(r) => {
            let _ = write!(out, "{r}");
        }
        Field::Text(s) => escape_into(s, out),
        Field::Timestamp(ts) => out.push_str(&format_timestamp(ts)),
        Field::Null => out.push_str(NULL_SENTINEL),
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

fn unescape(raw: &str, line: usize) -> SeedResult<Cow<'_, str>> {
    if !raw.contains('\\') {
        return Ok(Cow::Borrowed(raw));
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => {
                return Err(SeedError::CopyFormat {
                    line,
                    reason: format!("bad escape sequence '\\{}'", other.unwrap_or(' ')),
                })
            }
        }
    }
    Ok(Cow::Owned(out))
}

/// Split one buffer line into `width` fields. `None` is NULL.
/// `line` is 1-based and only used for diagnostics.
pub fn decode_line(text: &str, width: usize, line: usize) -> SeedResult<Vec<Option<Cow<'_, str>>>> {
    let fields = text
        .split('\t')
        .map(|raw| {
            if raw == NULL_SENTINEL {
                Ok(None)
            } else {
                unescape(raw, line).map(Some)
            }
        })
        .collect::<SeedResult<Vec<_>>>()?;
    if fields.len() != width {
        return Err(SeedError::CopyFormat {
            line,
            reason: format!("expected {width} fields, found {}", fields.len()),
        });
    }
    Ok(fields)
}

/// Parse one decoded field as a value of `kind`.
pub fn typed_value(field: Option<&str>, kind: ColumnKind, line: usize) -> SeedResult<Value> {
    let Some(text) = field else {
        return Ok(Value::Null);
    };
    let bad = |e: &dyn std::fmt::Display| SeedError::CopyFormat {
        line,
        reason: format!("'{text}' is not a valid {kind:?}: {e}"),
    };
    Ok(match kind {
        ColumnKind::Integer => Value::Integer(text.parse::<i64>().map_err(|e| bad(&e))?),
        ColumnKind::Real => Value::Real(text.parse::<f64>().map_err(|e| bad(&e))?),
        ColumnKind::Text => Value::Text(text.to_owned()),
    })
}

/// Stream a copy buffer into `table` through one prepared positional
/// statement. Returns rows written.
pub(super) fn copy_in(tx: &Transaction<'_>, table: &TableSpec, buffer: &str) -> SeedResult<usize> {
    if table.kinds.len() != table.width() {
        return Err(SeedError::config(format!(
            "table '{}' declares {} columns but {} kinds",
            table.name,
            table.width(),
            table.kinds.len()
        )));
    }
    let mut stmt = tx.prepare_cached(&table.insert_sql(1))?;
    let mut written = 0;
    for (i, text) in buffer.split_terminator('\n').enumerate() {
        let line = i + 1;
        let values = decode_line(text, table.width(), line)?
            .iter()
            .zip(table.kinds)
            .map(|(field, kind)| typed_value(field.as_deref(), *kind, line))
            .collect::<SeedResult<Vec<Value>>>()?;
        stmt.execute(params_from_iter(values))?;
        written += 1;
    }
    Ok(written)
}
