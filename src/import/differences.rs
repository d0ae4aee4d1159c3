//! Compare a tournament's teams and inherited awards script settings
//! between two stores before importing.

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{error, warn};

use crate::params::value_to_string;
use crate::queries::{
    all_teams, find_team, find_tournament_by_name, tournament_exists, tournament_id,
    tournament_teams, Team, Tournament,
};
use crate::schema::tables::{AwardsScriptTable, AWARDS_SCRIPT_TABLES};
use crate::schema::{checked_identifier, INTERNAL_TOURNAMENT_ID, INTERNAL_TOURNAMENT_LEVEL_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TeamProperty {
    Name,
    Organization,
}

impl fmt::Display for TeamProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamProperty::Name => write!(f, "name"),
            TeamProperty::Organization => write!(f, "organization"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPropertyDifference {
    pub team_number: i64,
    pub property: TeamProperty,
    pub source_value: Option<String>,
    pub dest_value: Option<String>,
}

/// An awards script setting the source tournament inherits from its level
/// or the season that resolves differently in the destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AwardsScriptDifference {
    /// A keyed value such as a section text, macro value or presenter
    Value {
        table: String,
        key: String,
        source_value: Option<String>,
        dest_value: Option<String>,
    },
    /// The award or sponsor order
    Order {
        table: String,
        source_order: Vec<String>,
        dest_order: Vec<String>,
    },
}

impl fmt::Display for AwardsScriptDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwardsScriptDifference::Value {
                table,
                key,
                source_value,
                dest_value,
            } => write!(
                f,
                "{} {}: source {:?}, dest {:?}",
                table, key, source_value, dest_value
            ),
            AwardsScriptDifference::Order {
                table,
                source_order,
                dest_order,
            } => write!(
                f,
                "{}: source {:?}, dest {:?}",
                table, source_order, dest_order
            ),
        }
    }
}

/// Everything that keeps a tournament from importing cleanly
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DifferenceReport {
    pub tournament: String,
    pub missing_in_source: bool,
    pub missing_in_dest: bool,
    pub missing_teams: Vec<Team>,
    pub team_differences: Vec<TeamPropertyDifference>,
    /// Advisory only, the import overwrites these
    pub awards_script_differences: Vec<AwardsScriptDifference>,
}

impl DifferenceReport {
    /// True when a tournament or team problem blocks the import. Awards
    /// script differences do not count.
    pub fn has_differences(&self) -> bool {
        self.missing_in_source
            || self.missing_in_dest
            || !self.missing_teams.is_empty()
            || !self.team_differences.is_empty()
    }
}

/// Check that `tournament` exists on both sides and that every team the
/// source enters in it exists in `dest` with the same name and organization.
/// Nothing is modified.
pub fn check_for_differences(
    source: &Connection,
    dest: &Connection,
    tournament: &str,
) -> Result<DifferenceReport> {
    let mut report = DifferenceReport {
        tournament: tournament.to_string(),
        ..DifferenceReport::default()
    };

    if !tournament_exists(dest, tournament)? {
        error!("Tournament {} doesn't exist in the destination database", tournament);
        report.missing_in_dest = true;
    }
    if !tournament_exists(source, tournament)? {
        error!("Tournament {} doesn't exist in the source database", tournament);
        report.missing_in_source = true;
    }
    if report.missing_in_dest || report.missing_in_source {
        return Ok(report);
    }

    report.missing_teams = find_missing_teams(source, dest, tournament)?;
    for team in &report.missing_teams {
        error!(
            "Team {} is in the source database, but not the dest database",
            team.number
        );
    }

    report.team_differences = check_team_info(source, dest, tournament)?;
    for diff in &report.team_differences {
        error!(
            "{} is different for team {} source value: {:?} dest value: {:?}",
            diff.property, diff.team_number, diff.source_value, diff.dest_value
        );
    }

    report.awards_script_differences = check_awards_script(source, dest, tournament)?;
    for diff in &report.awards_script_differences {
        warn!("Awards script differs: {}", diff);
    }
    Ok(report)
}

/// Teams entered in `tournament` in the source that `dest` does not know.
pub fn find_missing_teams(source: &Connection, dest: &Connection, tournament: &str) -> Result<Vec<Team>> {
    let source_id = tournament_id(source, tournament)?;
    let dest_numbers: HashSet<i64> = all_teams(dest)?.into_iter().map(|t| t.number).collect();
    Ok(tournament_teams(source, source_id)?
        .into_iter()
        .filter(|team| !dest_numbers.contains(&team.number))
        .collect())
}

/// Name and organization mismatches of teams present on both sides.
pub fn check_team_info(
    source: &Connection,
    dest: &Connection,
    tournament: &str,
) -> Result<Vec<TeamPropertyDifference>> {
    let source_id = tournament_id(source, tournament)?;
    let mut differences = Vec::new();
    for team in tournament_teams(source, source_id)? {
        let Some(dest_team) = find_team(dest, team.number)? else {
            continue;
        };
        if team.name != dest_team.name {
            differences.push(TeamPropertyDifference {
                team_number: team.number,
                property: TeamProperty::Name,
                source_value: team.name.clone(),
                dest_value: dest_team.name.clone(),
            });
        }
        if team.organization != dest_team.organization {
            differences.push(TeamPropertyDifference {
                team_number: team.number,
                property: TeamProperty::Organization,
                source_value: team.organization.clone(),
                dest_value: dest_team.organization.clone(),
            });
        }
    }
    Ok(differences)
}

// =============================================================================
// Awards script
// =============================================================================

/// Season, level and tournament layers of a tournament, as SQL over the
/// parameters internal level (?1), internal tournament (?2), the
/// tournament's level (?3) and the tournament (?4).
const LAYER_SCOPE: &str = "((tournament_level_id = ?1 AND tournament_id = ?2)
     OR (tournament_level_id = ?3 AND tournament_id = ?2)
     OR (tournament_level_id = ?1 AND tournament_id = ?4))";

/// Compare the awards script settings the source tournament does not set
/// itself. Values set at the tournament layer of the source replace the
/// destination on import, so only inherited values can conflict. Returns an
/// empty list when either side lacks the tournament.
pub fn check_awards_script(
    source: &Connection,
    dest: &Connection,
    tournament: &str,
) -> Result<Vec<AwardsScriptDifference>> {
    let (Some(source_tournament), Some(dest_tournament)) = (
        find_tournament_by_name(source, tournament)?,
        find_tournament_by_name(dest, tournament)?,
    ) else {
        return Ok(Vec::new());
    };

    let mut differences = Vec::new();
    for script in AWARDS_SCRIPT_TABLES {
        if script.ordered {
            if specified_for_tournament(source, script, &source_tournament, None)? {
                continue;
            }
            let source_order = effective_order(source, script, &source_tournament)?;
            let dest_order = effective_order(dest, script, &dest_tournament)?;
            if source_order != dest_order {
                differences.push(AwardsScriptDifference::Order {
                    table: script.name.to_string(),
                    source_order,
                    dest_order,
                });
            }
        } else {
            let mut keys = script_keys(source, script)?;
            keys.extend(script_keys(dest, script)?);
            for key in keys {
                if specified_for_tournament(source, script, &source_tournament, Some(&key))? {
                    continue;
                }
                let source_value = effective_value(source, script, &source_tournament, &key)?;
                let dest_value = effective_value(dest, script, &dest_tournament, &key)?;
                if source_value != dest_value {
                    differences.push(AwardsScriptDifference::Value {
                        table: script.name.to_string(),
                        key,
                        source_value,
                        dest_value,
                    });
                }
            }
        }
    }
    Ok(differences)
}

fn script_keys(conn: &Connection, script: &AwardsScriptTable) -> Result<BTreeSet<String>> {
    let sql = format!(
        "SELECT DISTINCT {} FROM {}",
        checked_identifier(script.key_column)?,
        checked_identifier(script.name)?
    );
    let mut stmt = conn.prepare(&sql)?;
    let keys = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;
    Ok(keys)
}

/// Whether the tournament layer holds a row, for `key` or for any key.
fn specified_for_tournament(
    conn: &Connection,
    script: &AwardsScriptTable,
    tournament: &Tournament,
    key: Option<&str>,
) -> Result<bool> {
    let table = checked_identifier(script.name)?;
    let found: Option<i64> = match key {
        Some(key) => conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE tournament_level_id = ?1 AND tournament_id = ?2 AND {} = ?3",
                    table,
                    checked_identifier(script.key_column)?
                ),
                params![INTERNAL_TOURNAMENT_LEVEL_ID, tournament.id, key],
                |row| row.get(0),
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE tournament_level_id = ?1 AND tournament_id = ?2 LIMIT 1",
                    table
                ),
                params![INTERNAL_TOURNAMENT_LEVEL_ID, tournament.id],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(found.is_some())
}

/// Value of `key` from the highest layer that sets it.
fn effective_value(
    conn: &Connection,
    script: &AwardsScriptTable,
    tournament: &Tournament,
    key: &str,
) -> Result<Option<String>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?5 AND {} ORDER BY layer_rank DESC LIMIT 1",
        checked_identifier(script.value_column)?,
        checked_identifier(script.name)?,
        checked_identifier(script.key_column)?,
        LAYER_SCOPE
    );
    let value: Option<Value> = conn
        .query_row(
            &sql,
            params![
                INTERNAL_TOURNAMENT_LEVEL_ID,
                INTERNAL_TOURNAMENT_ID,
                tournament.level_id,
                tournament.id,
                key
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(value_to_string))
}

/// Keys of the highest layer that has any rows, in rank order.
fn effective_order(
    conn: &Connection,
    script: &AwardsScriptTable,
    tournament: &Tournament,
) -> Result<Vec<String>> {
    let table = checked_identifier(script.name)?;
    let sql = format!(
        "SELECT {key} FROM {table} WHERE {scope}
           AND layer_rank = (SELECT MAX(layer_rank) FROM {table} WHERE {scope})
         ORDER BY {rank}",
        key = checked_identifier(script.key_column)?,
        table = table,
        scope = LAYER_SCOPE,
        rank = checked_identifier(script.value_column)?
    );
    let mut stmt = conn.prepare(&sql)?;
    let order = stmt
        .query_map(
            params![
                INTERNAL_TOURNAMENT_LEVEL_ID,
                INTERNAL_TOURNAMENT_ID,
                tournament.level_id,
                tournament.id
            ],
            |row| row.get(0),
        )?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(order)
}
