//! Write a store out as a dump archive.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::csv_loader::{CSV_DATE_FORMAT, CSV_TIMESTAMP_FORMAT};
use super::{CHALLENGE_ENTRY, DUMP_VERSION, DUMP_VERSION_ENTRY, NULL_SENTINEL};
use crate::error::MigrationError;
use crate::params::Parameters;
use crate::schema::checked_identifier;
use crate::upgrade::table_names;

/// Column name and declared type as reported by the store.
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns
        .into_iter()
        .map(|(name, declared)| {
            let declared = if declared.trim().is_empty() {
                "longvarchar".to_string()
            } else {
                declared.to_lowercase()
            };
            (name.to_lowercase(), declared)
        })
        .collect())
}

/// Render one stored value the way the loader expects it for `declared`.
pub fn render_value(value: Value, declared: &str) -> Result<String> {
    let kind = declared.split('(').next().unwrap_or_default().trim();
    let text = match value {
        Value::Null => return Ok(NULL_SENTINEL.to_string()),
        Value::Integer(i) if kind == "boolean" => (i != 0).to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) if kind == "date" => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(|d| d.format(CSV_DATE_FORMAT).to_string())
            .map_err(|_| MigrationError::Inconsistent(format!("stored date {:?}", s)))?,
        Value::Text(s) if kind == "timestamp" => {
            NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                .map(|t| t.format(CSV_TIMESTAMP_FORMAT).to_string())
                .map_err(|_| MigrationError::Inconsistent(format!("stored timestamp {:?}", s)))?
        }
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    };

    // keep real text that happens to start with the sentinel distinguishable
    if text.starts_with(NULL_SENTINEL) {
        Ok(format!("{}{}", NULL_SENTINEL, text))
    } else {
        Ok(text)
    }
}

/// Write `challenge.xml`, `dump_version.txt` and a `.types`/`.csv` pair per
/// table.
pub fn dump_database<W: Write + Seek>(conn: &Connection, writer: W) -> Result<W> {
    let description = Parameters::new(conn).challenge_description()?;
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    zip.start_file(CHALLENGE_ENTRY, options)?;
    zip.write_all(description.to_xml().as_bytes())?;

    zip.start_file(DUMP_VERSION_ENTRY, options)?;
    writeln!(zip, "{}", DUMP_VERSION)?;

    let tables = table_names(conn)?;
    for table in &tables {
        let table = checked_identifier(table)?;
        let columns = table_columns(conn, table)?;

        zip.start_file(format!("{}.types", table), options)?;
        {
            let mut types = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut zip);
            for (name, declared) in &columns {
                types.write_record([name, declared])?;
            }
            types.flush()?;
        }

        zip.start_file(format!("{}.csv", table), options)?;
        let mut rows = csv::Writer::from_writer(&mut zip);
        rows.write_record(columns.iter().map(|(name, _)| name))?;

        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM {}", names.join(", "), table))?;
        let mut result = stmt.query([])?;
        let mut count = 0;
        while let Some(row) = result.next()? {
            let mut record = Vec::with_capacity(columns.len());
            for (idx, (_, declared)) in columns.iter().enumerate() {
                record.push(render_value(row.get::<_, Value>(idx)?, declared)?);
            }
            rows.write_record(&record)?;
            count += 1;
        }
        rows.flush()?;
        drop(rows);
        debug!("Dumped {} rows of {}", count, table);
    }

    let writer = zip.finish().context("Failed to finish dump archive")?;
    info!("Dumped {} tables", tables.len());
    Ok(writer)
}

pub fn dump_database_to_file(conn: &Connection, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = dump_database(conn, BufWriter::new(file))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(Value::Null, "integer").unwrap(), "FLL-SW-NULL");
        assert_eq!(render_value(Value::Integer(1), "boolean").unwrap(), "true");
        assert_eq!(render_value(Value::Integer(0), "boolean").unwrap(), "false");
        assert_eq!(render_value(Value::Integer(7), "integer").unwrap(), "7");
        assert_eq!(
            render_value(Value::Text("2020-03-07".into()), "date").unwrap(),
            "07-Mar-2020"
        );
        assert_eq!(
            render_value(Value::Text("2020-03-07 13:05:09".into()), "timestamp").unwrap(),
            "07-Mar-2020 13:05:09"
        );
        assert_eq!(
            render_value(Value::Text("FLL-SW-NULL".into()), "varchar(64)").unwrap(),
            "FLL-SW-NULLFLL-SW-NULL"
        );
    }

    #[test]
    fn test_bad_stored_date_is_inconsistent() {
        let err = render_value(Value::Text("soon".into()), "date").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MigrationError>(),
            Some(MigrationError::Inconsistent(_))
        ));
    }
}
