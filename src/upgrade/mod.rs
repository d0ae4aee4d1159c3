//! Version upgrade ladder.
//!
//! Every step moves the store exactly one version forward (the legacy
//! ladder jumps from 2 straight to 6) and commits together with its version
//! write. Steps at or below the stored version are skipped, so running the
//! ladder over a current store changes nothing.

pub mod levels;
mod steps;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::challenge::ChallengeDescription;
use crate::error::MigrationError;
use crate::params::Parameters;
use crate::schema::{checked_identifier, CURRENT_VERSION, PERFORMANCE_TABLE};
use crate::writer::create_score_views;

pub use steps::STEPS;

/// One rung of the ladder.
#[derive(Clone, Copy)]
pub struct UpgradeStep {
    /// Version the store is at once the step has run
    pub target_version: i64,
    pub description: &'static str,
    pub apply: fn(&Connection, &ChallengeDescription) -> Result<()>,
}

impl std::fmt::Debug for UpgradeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeStep")
            .field("target_version", &self.target_version)
            .field("description", &self.description)
            .finish()
    }
}

/// All steps, ordered by target version.
pub fn upgrade_steps() -> &'static [UpgradeStep] {
    STEPS
}

/// Bring the store to [`CURRENT_VERSION`].
///
/// `description` is only consulted by the very first step; later steps use
/// the description stored in the database, which an earlier step may have
/// extended.
pub fn upgrade_database(conn: &mut Connection, description: &ChallengeDescription) -> Result<()> {
    let start = Parameters::new(conn).database_version()?;
    info!("Upgrading database from version {}", start);

    upgrade_range(conn, description, CURRENT_VERSION)?;

    {
        let tx = conn.transaction()?;
        Parameters::new(&tx).set_defaults(true)?;
        if table_exists(&tx, PERFORMANCE_TABLE)? {
            let stored = Parameters::new(&tx).challenge_description()?;
            create_score_views(&tx, &stored)?;
        }
        tx.commit()?;
    }

    let version = Parameters::new(conn).database_version()?;
    if version != CURRENT_VERSION {
        return Err(MigrationError::VersionMismatch(version).into());
    }
    info!("Database is at version {}", version);
    Ok(())
}

/// Run the steps whose target lies above the stored version and at or below
/// `up_to`. Returns the version the store ends at.
pub fn upgrade_range(
    conn: &mut Connection,
    description: &ChallengeDescription,
    up_to: i64,
) -> Result<i64> {
    let mut version = Parameters::new(conn).database_version()?;

    for step in upgrade_steps() {
        if step.target_version <= version || step.target_version > up_to {
            continue;
        }

        debug!(
            "Upgrading database from {} to {}: {}",
            version, step.target_version, step.description
        );

        let tx = conn.transaction()?;
        let stored;
        let active = if version == 0 {
            description
        } else {
            stored = Parameters::new(&tx).challenge_description()?;
            &stored
        };

        (step.apply)(&tx, active).with_context(|| {
            format!(
                "Upgrade to version {} failed ({})",
                step.target_version, step.description
            )
        })?;
        Parameters::new(&tx).set_database_version(step.target_version)?;
        tx.commit()?;

        version = step.target_version;
    }

    Ok(version)
}

/// True when `table` exists, compared case-insensitively.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND lower(name) = lower(?1)",
            [table],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to look for table {}", table))?;
    Ok(found.is_some())
}

/// True when `table` has a column named `column`.
///
/// Both the upper and lower case forms of the table name are checked and
/// column names compare case-insensitively, since dumps from older stores
/// fold identifiers differently.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let table = checked_identifier(table)?;
    for candidate in [table.to_uppercase(), table.to_lowercase()] {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", candidate))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if names.iter().any(|name| name.eq_ignore_ascii_case(column)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Name of every table in the store, in creation order.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_strictly_increasing_and_end_at_current() {
        let steps = upgrade_steps();
        assert_eq!(steps.first().map(|s| s.target_version), Some(1));
        assert_eq!(steps.last().map(|s| s.target_version), Some(CURRENT_VERSION));
        for pair in steps.windows(2) {
            assert!(pair[0].target_version < pair[1].target_version);
        }
        let targets: Vec<_> = steps.iter().map(|s| s.target_version).collect();
        assert!(targets.contains(&6));
        assert!(!targets.contains(&3));
    }

    #[test]
    fn test_column_exists_ignores_case() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE judges (ID varchar(64), event_division varchar(32))")
            .unwrap();
        assert!(column_exists(&conn, "Judges", "id").unwrap());
        assert!(column_exists(&conn, "JUDGES", "EVENT_DIVISION").unwrap());
        assert!(!column_exists(&conn, "judges", "station").unwrap());
        assert!(!column_exists(&conn, "missing", "station").unwrap());
    }

    #[test]
    fn test_table_exists_ignores_case() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE PlayoffData (x INTEGER)").unwrap();
        assert!(table_exists(&conn, "playoffdata").unwrap());
        assert!(!table_exists(&conn, "playoff").unwrap());
    }

    #[test]
    fn test_column_exists_rejects_unsafe_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(column_exists(&conn, "x); DROP TABLE y; --", "a").is_err());
    }
}
