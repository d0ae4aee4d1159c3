//! Global and per-tournament parameters.
//!
//! Tournament parameters resolve in two levels: a value stored for the
//! tournament wins over the default stored for the internal tournament.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::trace;

use crate::challenge::{parse_challenge, ChallengeDescription};
use crate::error::MigrationError;
use crate::schema::{DUMMY_TOURNAMENT_NAME, INTERNAL_TOURNAMENT_ID};
use crate::upgrade::table_exists;

// Global parameter names
pub const DATABASE_VERSION: &str = "DatabaseVersion";
pub const CHALLENGE_DOCUMENT: &str = "ChallengeDocument";
pub const CURRENT_TOURNAMENT: &str = "CurrentTournament";
pub const STANDARDIZED_MEAN: &str = "StandardizedMean";
pub const STANDARDIZED_SIGMA: &str = "StandardizedSigma";
pub const DIVISION_FLIP_RATE: &str = "DivisionFlipRate";

pub const STANDARDIZED_MEAN_DEFAULT: f64 = 100.0;
pub const STANDARDIZED_SIGMA_DEFAULT: f64 = 20.0;
pub const DIVISION_FLIP_RATE_DEFAULT: i64 = 30;

// Tournament parameter names
pub const SEEDING_ROUNDS: &str = "SeedingRounds";
pub const PERFORMANCE_ADVANCEMENT_PERCENTAGE: &str = "PerformanceAdvancementPercentage";
pub const RUNNING_HEAD_TO_HEAD: &str = "RunningHeadToHead";

pub const SEEDING_ROUNDS_DEFAULT: i64 = 3;
pub const PERFORMANCE_ADVANCEMENT_PERCENTAGE_DEFAULT: i64 = 0;
pub const RUNNING_HEAD_TO_HEAD_DEFAULT: bool = true;

/// Parameter store of one database
pub struct Parameters<'c> {
    conn: &'c Connection,
}

impl<'c> Parameters<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn global(&self, param: &str) -> Result<Option<String>> {
        let value: Option<Value> = self
            .conn
            .query_row(
                "SELECT param_value FROM global_parameters WHERE param = ?1",
                [param],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read global parameter {}", param))?;
        Ok(value.and_then(value_to_string))
    }

    pub fn set_global(&self, param: &str, value: &str) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE global_parameters SET param_value = ?1 WHERE param = ?2",
                params![value, param],
            )
            .with_context(|| format!("Failed to update global parameter {}", param))?;
        if updated == 0 {
            self.conn
                .execute(
                    "INSERT INTO global_parameters (param, param_value) VALUES (?1, ?2)",
                    params![param, value],
                )
                .with_context(|| format!("Failed to insert global parameter {}", param))?;
        }
        Ok(())
    }

    /// Stored schema version; 0 when nothing has been stored yet.
    pub fn database_version(&self) -> Result<i64> {
        if !table_exists(self.conn, "global_parameters")? {
            return Ok(0);
        }
        match self.global(DATABASE_VERSION)? {
            None => Ok(0),
            Some(raw) => parse_int(DATABASE_VERSION, &raw),
        }
    }

    pub fn set_database_version(&self, version: i64) -> Result<()> {
        self.set_global(DATABASE_VERSION, &version.to_string())
    }

    pub fn challenge_description(&self) -> Result<ChallengeDescription> {
        let xml = self
            .global(CHALLENGE_DOCUMENT)?
            .ok_or_else(|| MigrationError::MissingParameter {
                param: CHALLENGE_DOCUMENT.to_string(),
                tournament: INTERNAL_TOURNAMENT_ID,
            })?;
        parse_challenge(&xml).context("Stored challenge description is invalid")
    }

    pub fn store_challenge_description(&self, description: &ChallengeDescription) -> Result<()> {
        trace!("Storing challenge description {}", description.title);
        self.set_global(CHALLENGE_DOCUMENT, &description.to_xml())
    }

    pub fn current_tournament(&self) -> Result<i64> {
        let raw = self
            .global(CURRENT_TOURNAMENT)?
            .ok_or_else(|| MigrationError::MissingParameter {
                param: CURRENT_TOURNAMENT.to_string(),
                tournament: INTERNAL_TOURNAMENT_ID,
            })?;
        parse_int(CURRENT_TOURNAMENT, &raw)
    }

    pub fn set_current_tournament(&self, tournament_id: i64) -> Result<()> {
        self.set_global(CURRENT_TOURNAMENT, &tournament_id.to_string())
    }

    /// Resolve a tournament parameter, falling back to the default.
    pub fn tournament(&self, tournament_id: i64, param: &str) -> Result<String> {
        let value: Option<Value> = self
            .conn
            .query_row(
                "SELECT param_value FROM tournament_parameters
                 WHERE param = ?1 AND (tournament = ?2 OR tournament = ?3)
                   AND param_value IS NOT NULL
                 ORDER BY tournament DESC",
                params![param, tournament_id, INTERNAL_TOURNAMENT_ID],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read tournament parameter {}", param))?;

        let value = value.and_then(value_to_string).ok_or_else(|| {
            MigrationError::MissingParameter {
                param: param.to_string(),
                tournament: tournament_id,
            }
        })?;
        trace!(tournament_id, param, value = value.as_str(), "tournament parameter");
        Ok(value)
    }

    /// True when a value is stored for exactly this tournament.
    pub fn tournament_value_exists(&self, tournament_id: i64, param: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM tournament_parameters WHERE param = ?1 AND tournament = ?2",
                params![param, tournament_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn default_exists(&self, param: &str) -> Result<bool> {
        self.tournament_value_exists(INTERNAL_TOURNAMENT_ID, param)
    }

    pub fn set_tournament(&self, tournament_id: i64, param: &str, value: &str) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE tournament_parameters SET param_value = ?1 WHERE param = ?2 AND tournament = ?3",
                params![value, param, tournament_id],
            )
            .with_context(|| format!("Failed to update tournament parameter {}", param))?;
        if updated == 0 {
            self.conn
                .execute(
                    "INSERT INTO tournament_parameters (param, param_value, tournament) VALUES (?1, ?2, ?3)",
                    params![param, value, tournament_id],
                )
                .with_context(|| format!("Failed to insert tournament parameter {}", param))?;
        }
        Ok(())
    }

    pub fn set_default(&self, param: &str, value: &str) -> Result<()> {
        self.set_tournament(INTERNAL_TOURNAMENT_ID, param, value)
    }

    /// Remove a tournament specific value so the default applies again.
    pub fn unset_tournament(&self, tournament_id: i64, param: &str) -> Result<()> {
        if tournament_id == INTERNAL_TOURNAMENT_ID {
            anyhow::bail!("Cannot unset {} for the internal tournament", param);
        }
        self.conn.execute(
            "DELETE FROM tournament_parameters WHERE tournament = ?1 AND param = ?2",
            params![tournament_id, param],
        )?;
        Ok(())
    }

    pub fn seeding_rounds(&self, tournament_id: i64) -> Result<i64> {
        parse_int(SEEDING_ROUNDS, &self.tournament(tournament_id, SEEDING_ROUNDS)?)
    }

    pub fn set_seeding_rounds(&self, tournament_id: i64, rounds: i64) -> Result<()> {
        self.set_tournament(tournament_id, SEEDING_ROUNDS, &rounds.to_string())
    }

    pub fn performance_advancement_percentage(&self, tournament_id: i64) -> Result<i64> {
        let raw = self.tournament(tournament_id, PERFORMANCE_ADVANCEMENT_PERCENTAGE)?;
        parse_int(PERFORMANCE_ADVANCEMENT_PERCENTAGE, &raw)
    }

    pub fn set_performance_advancement_percentage(
        &self,
        tournament_id: i64,
        percentage: i64,
    ) -> Result<()> {
        self.set_tournament(
            tournament_id,
            PERFORMANCE_ADVANCEMENT_PERCENTAGE,
            &percentage.to_string(),
        )
    }

    pub fn running_head_to_head(&self, tournament_id: i64) -> Result<bool> {
        Ok(parse_bool(&self.tournament(tournament_id, RUNNING_HEAD_TO_HEAD)?))
    }

    pub fn set_running_head_to_head(&self, tournament_id: i64, value: bool) -> Result<()> {
        self.set_tournament(tournament_id, RUNNING_HEAD_TO_HEAD, bool_str(value))
    }

    /// Fill in every parameter that has no value yet.
    pub fn set_defaults(&self, head_to_head: bool) -> Result<()> {
        if self.global(CURRENT_TOURNAMENT)?.is_none() && table_exists(self.conn, "Tournaments")? {
            let dummy: Option<i64> = self
                .conn
                .query_row(
                    "SELECT tournament_id FROM Tournaments WHERE Name = ?1",
                    [DUMMY_TOURNAMENT_NAME],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = dummy {
                self.set_current_tournament(id)?;
            }
        }
        if self.global(STANDARDIZED_MEAN)?.is_none() {
            self.set_global(STANDARDIZED_MEAN, &STANDARDIZED_MEAN_DEFAULT.to_string())?;
        }
        if self.global(STANDARDIZED_SIGMA)?.is_none() {
            self.set_global(STANDARDIZED_SIGMA, &STANDARDIZED_SIGMA_DEFAULT.to_string())?;
        }
        if self.global(DIVISION_FLIP_RATE)?.is_none() {
            self.set_global(DIVISION_FLIP_RATE, &DIVISION_FLIP_RATE_DEFAULT.to_string())?;
        }

        if !self.default_exists(SEEDING_ROUNDS)? {
            self.set_default(SEEDING_ROUNDS, &SEEDING_ROUNDS_DEFAULT.to_string())?;
        }
        if !self.default_exists(PERFORMANCE_ADVANCEMENT_PERCENTAGE)? {
            self.set_default(
                PERFORMANCE_ADVANCEMENT_PERCENTAGE,
                &PERFORMANCE_ADVANCEMENT_PERCENTAGE_DEFAULT.to_string(),
            )?;
        }
        if !self.default_exists(RUNNING_HEAD_TO_HEAD)? {
            self.set_default(RUNNING_HEAD_TO_HEAD, bool_str(head_to_head))?;
        }
        Ok(())
    }
}

/// Render a stored value as text; NULL has no text form.
pub fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn parse_int(param: &str, raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
        .with_context(|| format!("Parameter {} has non-numeric value {:?}", param, raw))
}

pub(crate) fn parse_bool(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed == "1" || trimmed.eq_ignore_ascii_case("true")
}

pub(crate) fn bool_str(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{GLOBAL_PARAMETERS, TOURNAMENT_PARAMETERS};
    use crate::writer::schema_gen::create_table;

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn, &GLOBAL_PARAMETERS, false).unwrap();
        create_table(&conn, &TOURNAMENT_PARAMETERS, false).unwrap();
        conn
    }

    #[test]
    fn test_version_is_zero_without_parameter_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(Parameters::new(&conn).database_version().unwrap(), 0);
    }

    #[test]
    fn test_set_global_updates_in_place() {
        let conn = store();
        let params = Parameters::new(&conn);
        params.set_database_version(3).unwrap();
        params.set_database_version(4).unwrap();
        assert_eq!(params.database_version().unwrap(), 4);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM global_parameters", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_missing_parameter_is_distinct_error() {
        let conn = store();
        let err = Parameters::new(&conn).seeding_rounds(7).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MigrationError>(),
            Some(MigrationError::MissingParameter { tournament: 7, .. })
        ));
    }

    #[test]
    fn test_defaults_do_not_overwrite() {
        let conn = store();
        let params = Parameters::new(&conn);
        params.set_default(SEEDING_ROUNDS, "5").unwrap();
        params.set_defaults(false).unwrap();
        assert_eq!(params.seeding_rounds(9).unwrap(), 5);
        assert!(!params.running_head_to_head(9).unwrap());
        assert_eq!(params.performance_advancement_percentage(9).unwrap(), 0);
    }

    #[test]
    fn test_unset_restores_default() {
        let conn = store();
        let params = Parameters::new(&conn);
        params.set_defaults(true).unwrap();
        params.set_running_head_to_head(2, false).unwrap();
        assert!(!params.running_head_to_head(2).unwrap());
        params.unset_tournament(2, RUNNING_HEAD_TO_HEAD).unwrap();
        assert!(params.running_head_to_head(2).unwrap());
        assert!(params.unset_tournament(INTERNAL_TOURNAMENT_ID, SEEDING_ROUNDS).is_err());
    }

    #[test]
    fn test_null_tournament_value_falls_back_to_default() {
        // legacy stores did not declare param_value NOT NULL
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tournament_parameters (param varchar(64), param_value longvarchar, tournament integer);",
        )
        .unwrap();
        let params = Parameters::new(&conn);
        params.set_default(SEEDING_ROUNDS, "3").unwrap();
        conn.execute(
            "INSERT INTO tournament_parameters (param, param_value, tournament) VALUES (?1, NULL, 4)",
            [SEEDING_ROUNDS],
        )
        .unwrap();

        assert!(params.tournament_value_exists(4, SEEDING_ROUNDS).unwrap());
        assert_eq!(params.seeding_rounds(4).unwrap(), 3);
    }
}
