//! Relational record source backed by SQLite.
//!
//! The configured query must return one row per student with a column for
//! every [`Field`], matched by name (case-insensitive). Extra columns are
//! ignored; a missing one fails the fetch before any row is read.
//!
//! The database is opened read-only. Values are normalised to text: `NULL`
//! reads as absent, numbers are formatted, blobs are decoded lossily.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Statement};

use ldapsync_core::{Field, Record, RecordSource, SourceConfig, SourceError};

/// Reads student rows from a SQLite database.
pub struct SqliteSource {
    conn: Connection,
    query: String,
}

impl SqliteSource {
    /// Open the database named in `config` read-only.
    pub fn open(config: &SourceConfig) -> Result<Self, SourceError> {
        Self::open_at(&config.database, &config.query)
    }

    pub fn open_at(path: &Path, query: &str) -> Result<Self, SourceError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SourceError::Open {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        tracing::debug!(path = %path.display(), "source database opened");
        Ok(Self::from_connection(conn, query))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection, query: impl Into<String>) -> Self {
        Self {
            conn,
            query: query.into(),
        }
    }
}

impl RecordSource for SqliteSource {
    fn fetch_all(&mut self) -> Result<Vec<Record>, SourceError> {
        let mut stmt = self.conn.prepare(&self.query).map_err(query_err)?;
        let columns = resolve_columns(&stmt)?;

        let mut rows = stmt.query([]).map_err(query_err)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut record = Record::default();
            for (field, index) in &columns {
                let value = row.get_ref(*index).map_err(query_err)?;
                record.set(*field, text_of(value));
            }
            records.push(record);
        }

        tracing::debug!(rows = records.len(), "source query finished");
        Ok(records)
    }
}

/// Index of the result column for every field, in column order.
fn resolve_columns(stmt: &Statement<'_>) -> Result<Vec<(Field, usize)>, SourceError> {
    let names = stmt.column_names();
    Field::in_column_order()
        .into_iter()
        .map(|field| {
            let wanted = field.column_name();
            names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(&wanted))
                .map(|index| (field, index))
                .ok_or_else(|| SourceError::Query {
                    source: format!("column `{wanted}` missing from source query").into(),
                })
        })
        .collect()
}

fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn query_err(e: rusqlite::Error) -> SourceError {
    SourceError::Query {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ValueRef::Null, None)]
    #[case(ValueRef::Integer(42), Some("42"))]
    #[case(ValueRef::Integer(-7), Some("-7"))]
    #[case(ValueRef::Real(2.5), Some("2.5"))]
    #[case(ValueRef::Text(b"Jena"), Some("Jena"))]
    #[case(ValueRef::Text(b""), Some(""))]
    #[case(ValueRef::Blob(b"0042"), Some("0042"))]
    fn values_normalise_to_text(#[case] value: ValueRef<'_>, #[case] expected: Option<&str>) {
        assert_eq!(text_of(value).as_deref(), expected);
    }

    #[test]
    fn column_lookup_ignores_case_and_extras() {
        let conn = Connection::open_in_memory().unwrap();
        let select: Vec<String> = Field::in_column_order()
            .into_iter()
            .map(|f| format!("NULL AS {}", f.column_name().to_uppercase()))
            .chain(std::iter::once("1 AS extra".to_string()))
            .collect();
        let stmt = conn.prepare(&format!("SELECT {}", select.join(", "))).unwrap();

        let columns = resolve_columns(&stmt).unwrap();
        assert_eq!(columns.len(), ldapsync_core::record::FIELD_COUNT);
        assert_eq!(columns[0].1, 0);
    }
}
