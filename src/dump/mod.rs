//! Dump archives: load one into a scratch store and write one out.
//!
//! A dump is a zip archive holding `challenge.xml`, an optional
//! `dump_version.txt`, and a `<table>.types` / `<table>.csv` pair per table.
//! Loading recreates the tables without key constraints and then runs the
//! upgrade ladder over the result.

pub mod csv_loader;
pub mod export;
pub mod extract;
pub mod types;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use zip::ZipArchive;

use crate::challenge::parse_challenge;
use crate::error::MigrationError;
use crate::params::Parameters;
use crate::schema::CURRENT_VERSION;
use crate::upgrade::upgrade_database;

pub use csv_loader::{coerce, load_csv_table, SqlValue};
pub use export::{dump_database, dump_database_to_file};
pub use extract::{Artifact, ArtifactDir};
pub use types::{read_type_info, version0_type_info, TypeInfo};

/// Format version written to `dump_version.txt`
pub const DUMP_VERSION: i64 = 2;
/// Stands in for NULL in version 2 dumps
pub const NULL_SENTINEL: &str = "FLL-SW-NULL";
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub const CHALLENGE_ENTRY: &str = "challenge.xml";
pub const DUMP_VERSION_ENTRY: &str = "dump_version.txt";

/// What a load produced besides the tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportResult {
    /// Where log and bug report files from the archive were written
    pub import_directory: PathBuf,
    /// True when the archive carried at least one bug report
    pub has_bugs: bool,
}

/// Load the dump at `archive_path` into the empty store `conn`, writing any
/// artifacts under the working directory.
pub fn load_database_dump(archive_path: &Path, conn: &mut Connection) -> Result<ImportResult> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open dump {:?}", archive_path))?;
    load_dump_reader(BufReader::new(file), conn)
}

pub fn load_dump_reader<R: Read + Seek>(reader: R, conn: &mut Connection) -> Result<ImportResult> {
    load_dump_with_artifacts(reader, conn, Path::new("."))
}

/// Load a dump, extracting log and bug files below `artifact_base`.
pub fn load_dump_with_artifacts<R: Read + Seek>(
    reader: R,
    conn: &mut Connection,
    artifact_base: &Path,
) -> Result<ImportResult> {
    let mut archive = ZipArchive::new(reader).context("Failed to read dump archive")?;
    let artifacts = ArtifactDir::new(artifact_base);

    let mut challenge_xml = None;
    let mut dump_version = 1;
    let mut has_bugs = false;
    let mut type_info = TypeInfo::new();
    let mut table_data: Vec<(String, String)> = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .context("Failed to read file from archive")?;
        let name = entry.name().to_string();

        if name == CHALLENGE_ENTRY {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            challenge_xml = Some(xml);
        } else if name == DUMP_VERSION_ENTRY {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            let line = text
                .lines()
                .next()
                .with_context(|| format!("{} is empty", DUMP_VERSION_ENTRY))?;
            dump_version = line.trim().parse().with_context(|| {
                format!("Error reading dump version information from {:?}", line)
            })?;
        } else if let Some(table) = name.strip_suffix(".csv") {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .with_context(|| format!("Failed to read {}", name))?;
            table_data.push((table.to_lowercase(), content));
        } else if let Some(table) = name.strip_suffix(".types") {
            let types = read_type_info(&mut entry)
                .with_context(|| format!("Typeinfo file {} is malformed", name))?;
            type_info.insert(table.to_lowercase(), types);
        } else if let Some(kind) = Artifact::classify(&name) {
            if entry.is_dir() {
                continue;
            }
            match kind {
                Artifact::Log => trace!("Found log file {}", name),
                Artifact::BugReport => {
                    warn!("Found bug report {}", name);
                    has_bugs = true;
                }
            }
            artifacts.extract(&name, &mut entry)?;
        } else {
            warn!("Unexpected file found in imported zip file, skipping: {}", name);
        }
    }

    let xml = challenge_xml.ok_or(MigrationError::MissingChallenge)?;
    let description = parse_challenge(&xml).context("Challenge document in dump is invalid")?;

    if type_info.is_empty() {
        debug!("Dump has no type information, assuming version 0 types");
        type_info = version0_type_info(&description);
    }

    let empty = HashMap::new();
    {
        let tx = conn.transaction()?;
        for (table, content) in &table_data {
            let types = type_info.get(table).unwrap_or(&empty);
            load_csv_table(&tx, table, types, content.as_bytes(), dump_version)
                .with_context(|| format!("Failed to load table {} from dump", table))?;
        }
        tx.commit()?;
    }
    info!("Loaded {} tables from dump version {}", table_data.len(), dump_version);

    let stored_version = Parameters::new(conn).database_version()?;
    if stored_version > CURRENT_VERSION {
        return Err(MigrationError::DumpTooNew {
            dump: stored_version,
            current: CURRENT_VERSION,
        }
        .into());
    }

    upgrade_database(conn, &description)?;

    Ok(ImportResult {
        import_directory: artifacts.path().to_path_buf(),
        has_bugs,
    })
}
