//! Load one `<table>.csv` entry into a new table.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use std::io::Read;
use tracing::debug;

use super::types::{effective_type, identity_column, TableTypes};
use super::{NULL_SENTINEL, TIME_FORMAT};
use crate::error::MigrationError;
use crate::schema::checked_identifier;

pub const CSV_DATE_FORMAT: &str = "%d-%b-%Y";
pub const CSV_TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

const STORE_DATE_FORMAT: &str = "%Y-%m-%d";
const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value ready to bind into an insert
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

/// Undo the NULL encoding of the given dump format version.
pub fn decode_null(raw: &str, dump_version: i64) -> Result<Option<&str>> {
    match dump_version {
        1 => Ok(if raw.trim().is_empty() { None } else { Some(raw) }),
        2 => Ok(if raw == NULL_SENTINEL {
            None
        } else {
            Some(raw.strip_prefix(NULL_SENTINEL).unwrap_or(raw))
        }),
        other => anyhow::bail!("Dump version {} is unknown", other),
    }
}

/// Convert dumped text to a store value according to its declared type.
pub fn coerce(raw: &str, declared: &str, dump_version: i64) -> Result<SqlValue> {
    let data = decode_null(raw, dump_version)?;
    let declared_lower = declared.to_lowercase();
    let kind = declared_lower
        .split('(')
        .next()
        .unwrap_or_default()
        .trim();

    let value = match (kind, data) {
        ("longvarchar" | "varchar" | "character", data) => match data {
            None => SqlValue::Null,
            Some(d) => SqlValue::Text(d.trim().to_string()),
        },
        ("char", data) => match data.map(str::trim) {
            None | Some("") => SqlValue::Null,
            Some(d) => SqlValue::Text(d.to_string()),
        },
        ("integer" | "float" | "double" | "boolean" | "time" | "timestamp" | "date", None) => {
            SqlValue::Null
        }
        ("integer", Some(d)) => SqlValue::Integer(
            d.trim()
                .parse()
                .with_context(|| format!("Invalid integer {:?}", d))?,
        ),
        ("float" | "double", Some(d)) => SqlValue::Real(
            d.trim()
                .parse()
                .with_context(|| format!("Invalid number {:?}", d))?,
        ),
        ("boolean", Some(d)) => {
            let d = d.trim();
            SqlValue::Integer(i64::from(d.eq_ignore_ascii_case("true") || d == "1"))
        }
        ("time", Some(d)) => {
            let time = NaiveTime::parse_from_str(d.trim(), TIME_FORMAT)
                .with_context(|| format!("Problem parsing time {:?} in database dump", d))?;
            SqlValue::Text(time.format(TIME_FORMAT).to_string())
        }
        ("timestamp", Some(d)) => {
            let timestamp = NaiveDateTime::parse_from_str(d.trim(), CSV_TIMESTAMP_FORMAT)
                .with_context(|| format!("Problem parsing timestamp {:?} in database dump", d))?;
            SqlValue::Text(timestamp.format(STORE_TIMESTAMP_FORMAT).to_string())
        }
        ("date", Some(d)) => {
            let date = NaiveDate::parse_from_str(d.trim(), CSV_DATE_FORMAT)
                .with_context(|| format!("Problem parsing date {:?} in database dump", d))?;
            SqlValue::Text(date.format(STORE_DATE_FORMAT).to_string())
        }
        _ => return Err(MigrationError::UnsupportedType(declared.to_string()).into()),
    };
    Ok(value)
}

/// Create `table` from the header of `reader` and insert every row.
/// Returns the number of rows loaded.
pub fn load_csv_table<R: Read>(
    conn: &Connection,
    table: &str,
    types: &TableTypes,
    reader: R,
    dump_version: i64,
) -> Result<u64> {
    let table = checked_identifier(table)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .with_context(|| format!("Cannot find the header line of {}", table))?
        .clone();
    if headers.is_empty() {
        anyhow::bail!("Cannot find the header line of {}", table);
    }

    let identity = identity_column(table);
    let mut columns = Vec::with_capacity(headers.len());
    let mut column_types = Vec::with_capacity(headers.len());
    let mut definitions = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        let column = checked_identifier(header.trim())?.to_lowercase();
        let declared = effective_type(types, &column);
        let definition = if identity.is_some_and(|id| id.eq_ignore_ascii_case(&column)) {
            format!("{} INTEGER PRIMARY KEY", column)
        } else {
            format!("{} {}", column, declared)
        };
        definitions.push(definition);
        column_types.push(declared);
        columns.push(column);
    }

    conn.execute(
        &format!("CREATE TABLE {} ({})", table, definitions.join(", ")),
        [],
    )
    .with_context(|| format!("Failed to create table {} from dump", table))?;

    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare_cached(&insert_sql)?;

    let mut count: u64 = 0;
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {} of {}", line + 1, table))?;
        if record.len() != columns.len() {
            anyhow::bail!(
                "Row {} of {} has {} fields, expected {}",
                line + 1,
                table,
                record.len(),
                columns.len()
            );
        }
        for (idx, raw) in record.iter().enumerate() {
            let value = coerce(raw, &column_types[idx], dump_version).with_context(|| {
                format!("Bad value in {}.{} row {}", table, columns[idx], line + 1)
            })?;
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
        count += 1;
    }

    debug!("Loaded {} rows into {}", count, table);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_decode_null_versions() {
        assert_eq!(decode_null("", 1).unwrap(), None);
        assert_eq!(decode_null("  ", 1).unwrap(), None);
        assert_eq!(decode_null("x", 1).unwrap(), Some("x"));
        assert_eq!(decode_null("", 2).unwrap(), Some(""));
        assert_eq!(decode_null("FLL-SW-NULL", 2).unwrap(), None);
        assert_eq!(decode_null("FLL-SW-NULLFLL-SW-NULL", 2).unwrap(), Some("FLL-SW-NULL"));
        assert!(decode_null("x", 3).is_err());
    }

    #[test]
    fn test_coerce_by_type() {
        assert_eq!(coerce(" 12 ", "INTEGER", 2).unwrap(), SqlValue::Integer(12));
        assert_eq!(coerce("1.5", "float", 2).unwrap(), SqlValue::Real(1.5));
        assert_eq!(coerce("TRUE", "boolean", 2).unwrap(), SqlValue::Integer(1));
        assert_eq!(coerce("1", "boolean", 2).unwrap(), SqlValue::Integer(1));
        assert_eq!(coerce("no", "boolean", 2).unwrap(), SqlValue::Integer(0));
        assert_eq!(
            coerce(" padded ", "varchar(64)", 2).unwrap(),
            SqlValue::Text("padded".to_string())
        );
        assert_eq!(coerce("  ", "char(32)", 2).unwrap(), SqlValue::Null);
        assert_eq!(
            coerce("07-Mar-2020", "date", 2).unwrap(),
            SqlValue::Text("2020-03-07".to_string())
        );
        assert_eq!(
            coerce("07-Mar-2020 13:05:09", "TIMESTAMP", 2).unwrap(),
            SqlValue::Text("2020-03-07 13:05:09".to_string())
        );
        assert_eq!(
            coerce("08:30:00", "time", 2).unwrap(),
            SqlValue::Text("08:30:00".to_string())
        );
        assert_eq!(coerce("FLL-SW-NULL", "integer", 2).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_coerce_rejects_unknown_type() {
        let err = coerce("x", "blob", 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MigrationError>(),
            Some(MigrationError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_load_csv_table() {
        let conn = Connection::open_in_memory().unwrap();
        let types: TableTypes = HashMap::from([
            ("teamnumber".to_string(), "integer".to_string()),
            ("teamname".to_string(), "varchar(255)".to_string()),
        ]);
        let data = "TeamNumber,TeamName,Extra\n1,Bots,FLL-SW-NULL\n2,FLL-SW-NULL,x\n";
        let count = load_csv_table(&conn, "teams", &types, data.as_bytes(), 2).unwrap();
        assert_eq!(count, 2);

        let name: Option<String> = conn
            .query_row("SELECT teamname FROM teams WHERE teamnumber = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, None);
        let extra: Option<String> = conn
            .query_row("SELECT extra FROM teams WHERE teamnumber = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(extra, None);
    }

    #[test]
    fn test_malformed_row_fails() {
        let conn = Connection::open_in_memory().unwrap();
        let types: TableTypes = HashMap::from([("n".to_string(), "integer".to_string())]);
        assert!(load_csv_table(&conn, "t", &types, "n\nabc\n".as_bytes(), 2).is_err());
    }
}
