//! Copy tournaments from one upgraded store into another.
//!
//! Every pass deletes the destination rows of a tournament and then inserts
//! the source rows with the tournament id rewritten, so importing the same
//! tournament twice leaves the destination as after the first import.

pub mod differences;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::io::{Read, Seek};
use tracing::{debug, info, warn};

use crate::challenge::ChallengeDescription;
use crate::dump::{load_dump_reader, ImportResult};
use crate::error::MigrationError;
use crate::params::Parameters;
use crate::queries::{
    all_levels, all_tournaments, create_tournament, find_tournament_by_id, find_tournament_by_name,
    get_or_create_level, level_by_id, level_by_name, set_next_level, tournament_id, Tournament,
};
use crate::schema::tables::AWARDS_SCRIPT_TABLES;
use crate::schema::{
    checked_identifier, is_internal_team, DEFAULT_TEAM_DIVISION, DEFAULT_TEAM_NAME,
    INTERNAL_TOURNAMENT_ID, INTERNAL_TOURNAMENT_LEVEL_ID, NO_NEXT_LEVEL_ID, PERFORMANCE_TABLE,
};
use crate::scores::update_score_totals;
use crate::writer::generate_db;

pub use differences::{
    check_awards_script, check_for_differences, check_team_info, find_missing_teams,
    AwardsScriptDifference, DifferenceReport, TeamProperty, TeamPropertyDifference,
};

/// Which groups of tournament data an import copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportOptions {
    /// Performance scores, playoff brackets and delayed score display
    pub performance: bool,
    /// Subjective scores, judges, nominees, advancing teams and award winners
    pub subjective: bool,
    pub finalist_schedule: bool,
    pub awards_script: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            performance: true,
            subjective: true,
            finalist_schedule: true,
            awards_script: true,
        }
    }
}

/// Rows of one table that belong to a tournament.
struct TournamentRows<'a> {
    table: &'a str,
    tournament_column: &'a str,
    /// Copied columns, tournament column excluded
    columns: Vec<String>,
    /// Rows whose value in this column is a sentinel team are left behind
    skip_internal_teams: Option<&'a str>,
}

impl<'a> TournamentRows<'a> {
    fn new(table: &'a str, tournament_column: &'a str, columns: &[&str]) -> Self {
        Self {
            table,
            tournament_column,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            skip_internal_teams: None,
        }
    }

    fn skipping_internal_teams(mut self, team_column: &'a str) -> Self {
        self.skip_internal_teams = Some(team_column);
        self
    }

    /// Replace the destination rows of `dest_id` with the source rows of
    /// `source_id`. Returns the number of rows inserted.
    fn copy(&self, source: &Connection, dest: &Connection, source_id: i64, dest_id: i64) -> Result<usize> {
        let table = checked_identifier(self.table)?;
        let tournament_column = checked_identifier(self.tournament_column)?;
        for column in &self.columns {
            checked_identifier(column)?;
        }

        dest.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", table, tournament_column),
            [dest_id],
        )
        .with_context(|| format!("Failed to clear {} for tournament {}", table, dest_id))?;

        let skip_idx = self
            .skip_internal_teams
            .and_then(|team| self.columns.iter().position(|c| c.eq_ignore_ascii_case(team)));

        let mut select = source.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.columns.join(", "),
            table,
            tournament_column
        ))?;
        let width = self.columns.len();
        let rows = select
            .query_map([source_id], |row| {
                (0..width)
                    .map(|idx| row.get::<_, Value>(idx))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let placeholders: Vec<String> = (1..=width + 1).map(|i| format!("?{}", i)).collect();
        let mut insert = dest.prepare(&format!(
            "INSERT INTO {} ({}, {}) VALUES ({})",
            table,
            tournament_column,
            self.columns.join(", "),
            placeholders.join(", ")
        ))?;

        let mut copied = 0;
        for row in rows {
            if let Some(idx) = skip_idx {
                if matches!(row[idx], Value::Integer(team) if is_internal_team(team)) {
                    continue;
                }
            }
            let values = std::iter::once(Value::Integer(dest_id)).chain(row);
            insert
                .execute(params_from_iter(values))
                .with_context(|| format!("Failed to copy a row of {}", table))?;
            copied += 1;
        }
        debug!(table, source_id, dest_id, copied, "copied tournament rows");
        Ok(copied)
    }
}

/// Copy the data of `tournament` from `source` into `dest`, which must both
/// be at the current version and both know the tournament by name. Score
/// totals of the destination tournament are recomputed afterwards.
///
/// The import is not atomic on its own; callers wrap it in a transaction.
pub fn import_database(
    source: &Connection,
    dest: &Connection,
    tournament: &str,
    options: &ImportOptions,
) -> Result<()> {
    let description = Parameters::new(dest).challenge_description()?;
    let source_id = tournament_id(source, tournament)?;
    let dest_id = tournament_id(dest, tournament)?;
    info!(tournament, source_id, dest_id, "Importing tournament");

    import_tournament_parameters(source, dest, source_id, dest_id)?;
    for rows in tournament_tables() {
        rows.copy(source, dest, source_id, dest_id)?;
    }
    import_tournament_teams(source, dest, source_id, dest_id)?;

    if options.awards_script {
        import_awards_script(
            source,
            dest,
            (INTERNAL_TOURNAMENT_LEVEL_ID, source_id),
            (INTERNAL_TOURNAMENT_LEVEL_ID, dest_id),
        )?;
    }

    if options.performance {
        for rows in performance_tables(&description) {
            rows.copy(source, dest, source_id, dest_id)?;
        }
    }

    if options.subjective {
        for rows in subjective_tables(&description) {
            rows.copy(source, dest, source_id, dest_id)?;
        }
    }

    if options.finalist_schedule {
        for rows in finalist_tables() {
            rows.copy(source, dest, source_id, dest_id)?;
        }
    }

    update_score_totals(&description, dest, dest_id)?;
    Ok(())
}

/// Import every tournament of `source`, creating the ones `dest` lacks.
/// Returns the names of the imported tournaments.
pub fn import_all_tournaments(
    source: &Connection,
    dest: &Connection,
    options: &ImportOptions,
) -> Result<Vec<String>> {
    let mut imported = Vec::new();
    for tournament in all_tournaments(source)? {
        if tournament.id == INTERNAL_TOURNAMENT_ID {
            continue;
        }
        ensure_tournament(source, dest, &tournament)?;
        import_database(source, dest, &tournament.name, options)?;
        imported.push(tournament.name);
    }
    Ok(imported)
}

/// Load a dump into a scratch store and build `dest` from it: schema, teams,
/// levels, tournaments, users, every tournament's data, level data and the
/// current tournament.
pub fn load_from_dump_into_new_db<R: Read + Seek>(
    reader: R,
    dest: &mut Connection,
) -> Result<ImportResult> {
    let mut scratch = Connection::open_in_memory().context("Failed to open scratch store")?;
    let result = load_dump_reader(reader, &mut scratch)?;
    let description = Parameters::new(&scratch).challenge_description()?;

    generate_db(dest, &description)?;

    let tx = dest.transaction()?;
    copy_teams(&scratch, &tx)?;
    copy_levels(&scratch, &tx)?;
    for tournament in all_tournaments(&scratch)? {
        if tournament.id != INTERNAL_TOURNAMENT_ID {
            ensure_tournament(&scratch, &tx, &tournament)?;
        }
    }
    copy_authentication(&scratch, &tx)?;

    let options = ImportOptions::default();
    for tournament in all_tournaments(&scratch)? {
        import_database(&scratch, &tx, &tournament.name, &options)?;
    }

    for level in all_levels(&scratch)? {
        if level.id == INTERNAL_TOURNAMENT_LEVEL_ID {
            continue;
        }
        let dest_level = level_by_name(&tx, &level.name)?
            .with_context(|| format!("Level {} was not created", level.name))?;
        import_ignored_categories(&scratch, &tx, level.id, dest_level.id)?;
        import_awards_script(
            &scratch,
            &tx,
            (level.id, INTERNAL_TOURNAMENT_ID),
            (dest_level.id, INTERNAL_TOURNAMENT_ID),
        )?;
    }
    // season wide awards script
    import_awards_script(
        &scratch,
        &tx,
        (INTERNAL_TOURNAMENT_LEVEL_ID, INTERNAL_TOURNAMENT_ID),
        (INTERNAL_TOURNAMENT_LEVEL_ID, INTERNAL_TOURNAMENT_ID),
    )?;

    match Parameters::new(&scratch).current_tournament() {
        Ok(source_current) => match find_tournament_by_id(&scratch, source_current)? {
            Some(current) => {
                let dest_current = tournament_id(&tx, &current.name)?;
                Parameters::new(&tx).set_current_tournament(dest_current)?;
            }
            None => warn!(source_current, "Current tournament of the dump does not exist"),
        },
        Err(err)
            if matches!(
                err.downcast_ref::<MigrationError>(),
                Some(MigrationError::MissingParameter { .. })
            ) =>
        {
            warn!("Dump has no current tournament, keeping the default");
        }
        Err(err) => return Err(err),
    }

    tx.commit()?;
    info!("Created new database from dump");
    Ok(result)
}

// =============================================================================
// Table groups
// =============================================================================

fn tournament_tables() -> Vec<TournamentRows<'static>> {
    vec![
        TournamentRows::new("tablenames", "Tournament", &["PairID", "SideA", "SideB"]),
        TournamentRows::new("table_division", "tournament", &["playoff_division", "table_id"]),
        TournamentRows::new("schedule", "tournament", &["team_number", "judging_station"]),
        TournamentRows::new(
            "sched_perf_rounds",
            "tournament",
            &["team_number", "perf_time", "table_color", "table_side", "practice"],
        ),
        TournamentRows::new("sched_subjective", "tournament", &["team_number", "name", "subj_time"]),
        TournamentRows::new("category_schedule_column", "tournament", &["category", "schedule_column"]),
    ]
}

fn performance_tables(description: &ChallengeDescription) -> Vec<TournamentRows<'static>> {
    let mut performance = TournamentRows::new(
        PERFORMANCE_TABLE,
        "Tournament",
        &["TeamNumber", "RunNumber", "TimeStamp", "NoShow", "Bye", "Verified"],
    );
    performance.columns.extend(
        description
            .performance
            .goals
            .iter()
            .filter(|g| !g.is_computed())
            .map(|g| g.name.clone()),
    );

    vec![
        performance,
        TournamentRows::new(
            "PlayoffData",
            "Tournament",
            &["event_division", "PlayoffRound", "LineNumber", "Team", "AssignedTable", "Printed", "run_number"],
        ),
        TournamentRows::new("automatic_finished_playoff", "tournament_id", &["bracket_name"]),
        TournamentRows::new("playoff_bracket_teams", "tournament_id", &["bracket_name", "team_number"]),
        TournamentRows::new("delayed_performance", "tournament_id", &["run_number", "delayed_until"]),
    ]
}

fn subjective_tables(description: &ChallengeDescription) -> Vec<TournamentRows<'_>> {
    let mut tables = vec![TournamentRows::new("Judges", "Tournament", &["id", "category", "station"])];

    for category in &description.subjective_categories {
        let mut rows = TournamentRows::new(&category.name, "Tournament", &["TeamNumber", "Judge", "NoShow"]);
        for goal in category.goals.iter().filter(|g| !g.is_computed()) {
            rows.columns.push(goal.name.clone());
            rows.columns.push(goal.comment_column());
        }
        rows.columns.extend(
            ["note", "comment_great_job", "comment_think_about"]
                .iter()
                .map(|c| c.to_string()),
        );
        tables.push(rows);
    }

    tables.extend([
        TournamentRows::new("non_numeric_nominees", "tournament", &["category", "team_number", "judge"]),
        TournamentRows::new("advancing_teams", "tournament_id", &["team_number", "award_group"])
            .skipping_internal_teams("team_number"),
        TournamentRows::new(
            "subjective_overall_award",
            "tournament_id",
            &["name", "team_number", "description", "place"],
        ),
        TournamentRows::new(
            "subjective_extra_award",
            "tournament_id",
            &["name", "team_number", "description", "award_group", "place"],
        ),
        TournamentRows::new(
            "subjective_challenge_award",
            "tournament_id",
            &["name", "team_number", "description", "award_group", "place"],
        ),
        TournamentRows::new("award_group_order", "tournament_id", &["award_group", "sort_order"]),
    ]);
    tables
}

fn finalist_tables() -> Vec<TournamentRows<'static>> {
    vec![
        TournamentRows::new("finalist_categories", "tournament", &["category", "division", "room"]),
        TournamentRows::new(
            "finalist_schedule",
            "tournament",
            &["category", "judge_time", "judge_end_time", "team_number", "division"],
        ),
        TournamentRows::new("playoff_schedules", "tournament_id", &["bracket_name", "start_time", "end_time"]),
        TournamentRows::new(
            "finalist_parameters",
            "tournament_id",
            &["award_group", "start_time", "slot_duration"],
        ),
    ]
}

// =============================================================================
// Passes with their own rules
// =============================================================================

/// Copy the resolved values so a changed default in the source still
/// reaches the destination.
fn import_tournament_parameters(
    source: &Connection,
    dest: &Connection,
    source_id: i64,
    dest_id: i64,
) -> Result<()> {
    let from = Parameters::new(source);
    let to = Parameters::new(dest);
    to.set_running_head_to_head(dest_id, from.running_head_to_head(source_id)?)?;
    to.set_performance_advancement_percentage(
        dest_id,
        from.performance_advancement_percentage(source_id)?,
    )?;
    to.set_seeding_rounds(dest_id, from.seeding_rounds(source_id)?)?;
    Ok(())
}

/// Sentinel teams are skipped; a missing award group falls back to the
/// default division and a missing judging station to the award group.
fn import_tournament_teams(source: &Connection, dest: &Connection, source_id: i64, dest_id: i64) -> Result<()> {
    dest.execute("DELETE FROM TournamentTeams WHERE Tournament = ?1", [dest_id])?;

    let mut select = source.prepare(
        "SELECT TeamNumber, event_division, judging_station FROM TournamentTeams WHERE Tournament = ?1",
    )?;
    let rows = select
        .query_map([source_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut insert = dest.prepare(
        "INSERT INTO TournamentTeams (Tournament, TeamNumber, event_division, judging_station)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (team, division, station) in rows {
        if is_internal_team(team) {
            continue;
        }
        let division = division.unwrap_or_else(|| DEFAULT_TEAM_DIVISION.to_string());
        let station = station.unwrap_or_else(|| division.clone());
        insert.execute(rusqlite::params![dest_id, team, division, station])?;
    }
    Ok(())
}

/// Awards script rows of one (level, tournament) scope.
fn import_awards_script(
    source: &Connection,
    dest: &Connection,
    (source_level, source_tournament): (i64, i64),
    (dest_level, dest_tournament): (i64, i64),
) -> Result<()> {
    for script in AWARDS_SCRIPT_TABLES {
        let table = checked_identifier(script.name)?;
        dest.execute(
            &format!(
                "DELETE FROM {} WHERE tournament_id = ?1 AND tournament_level_id = ?2",
                table
            ),
            [dest_tournament, dest_level],
        )?;

        let mut select = source.prepare(&format!(
            "SELECT layer_rank, {}, {} FROM {} WHERE tournament_id = ?1 AND tournament_level_id = ?2",
            script.key_column, script.value_column, table
        ))?;
        let rows = select
            .query_map([source_tournament, source_level], |row| {
                Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?, row.get::<_, Value>(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut insert = dest.prepare(&format!(
            "INSERT INTO {} (tournament_id, tournament_level_id, layer_rank, {}, {})
             VALUES (?1, ?2, ?3, ?4, ?5)",
            table, script.key_column, script.value_column
        ))?;
        for (rank, key, value) in rows {
            insert.execute(rusqlite::params![dest_tournament, dest_level, rank, key, value])?;
        }
    }
    Ok(())
}

/// Replace the categories a level ignores.
pub fn import_ignored_categories(
    source: &Connection,
    dest: &Connection,
    source_level: i64,
    dest_level: i64,
) -> Result<()> {
    TournamentRows::new(
        "categories_ignored",
        "level_id",
        &["category_identifier", "category_type"],
    )
    .copy(source, dest, source_level, dest_level)?;
    Ok(())
}

// =============================================================================
// Whole-store copies used when building from a dump
// =============================================================================

fn copy_teams(source: &Connection, dest: &Connection) -> Result<()> {
    let mut select = source.prepare("SELECT TeamNumber, TeamName, Organization FROM Teams")?;
    let teams = select
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut insert =
        dest.prepare("INSERT INTO Teams (TeamNumber, TeamName, Organization) VALUES (?1, ?2, ?3)")?;
    for (number, name, organization) in teams {
        if is_internal_team(number) {
            continue;
        }
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_TEAM_NAME.to_string());
        insert
            .execute(rusqlite::params![number, name, organization])
            .with_context(|| format!("Failed to copy team {}", number))?;
    }
    Ok(())
}

/// Create every source level by name, then link next levels by name.
fn copy_levels(source: &Connection, dest: &Connection) -> Result<()> {
    let levels = all_levels(source)?;
    for level in &levels {
        if level.id != INTERNAL_TOURNAMENT_LEVEL_ID {
            get_or_create_level(dest, &level.name)?;
        }
    }
    for level in &levels {
        if level.id == INTERNAL_TOURNAMENT_LEVEL_ID || level.next_level_id == NO_NEXT_LEVEL_ID {
            continue;
        }
        let Some(next) = level_by_id(source, level.next_level_id)? else {
            warn!(level = level.name.as_str(), "Next level is missing from the source");
            continue;
        };
        let dest_level = get_or_create_level(dest, &level.name)?;
        let dest_next = get_or_create_level(dest, &next.name)?;
        set_next_level(dest, dest_level, dest_next)?;
    }
    Ok(())
}

/// Create `tournament` in `dest` unless a tournament of that name exists.
/// Its level is matched by name. Modification times are left empty so
/// summaries are recomputed.
pub fn ensure_tournament(source: &Connection, dest: &Connection, tournament: &Tournament) -> Result<()> {
    if find_tournament_by_name(dest, &tournament.name)?.is_some() {
        return Ok(());
    }
    let level_name = level_by_id(source, tournament.level_id)?
        .map(|level| level.name)
        .with_context(|| format!("Tournament {} has no level", tournament.name))?;
    let dest_level = get_or_create_level(dest, &level_name)?;
    create_tournament(
        dest,
        &tournament.name,
        tournament.location.as_deref(),
        tournament.date.as_deref(),
        dest_level,
    )?;
    Ok(())
}

fn copy_authentication(source: &Connection, dest: &Connection) -> Result<()> {
    let mut select_users = source.prepare("SELECT fll_user, fll_pass FROM fll_authentication")?;
    let users = select_users
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut insert = dest.prepare("INSERT INTO fll_authentication (fll_user, fll_pass) VALUES (?1, ?2)")?;
    for (user, pass) in &users {
        insert.execute(rusqlite::params![user, pass])?;
    }

    let mut select_roles = source.prepare("SELECT fll_user, fll_role FROM auth_roles")?;
    let roles = select_roles
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut insert = dest.prepare("INSERT INTO auth_roles (fll_user, fll_role) VALUES (?1, ?2)")?;
    for (user, role) in &roles {
        insert.execute(rusqlite::params![user, role])?;
    }
    debug!(users = users.len(), roles = roles.len(), "copied authentication");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{Goal, PerformanceScoreCategory, SubjectiveScoreCategory};
    use crate::queries::{insert_team, Team};

    fn description() -> ChallengeDescription {
        ChallengeDescription {
            title: "Import".to_string(),
            revision: String::new(),
            performance: PerformanceScoreCategory {
                weight: 1.0,
                minimum_score: 0.0,
                goals: vec![Goal::numeric("bridge", "Bridge", 0.0, 3.0, 10.0)],
            },
            subjective_categories: vec![SubjectiveScoreCategory {
                name: "teamwork".to_string(),
                title: "Teamwork".to_string(),
                weight: 1.0,
                goals: vec![Goal::numeric("spirit", "Spirit", 1.0, 4.0, 1.0)],
            }],
            non_numeric_categories: vec![],
        }
    }

    fn store_with_tournament(name: &str) -> (Connection, i64) {
        let mut conn = Connection::open_in_memory().unwrap();
        generate_db(&mut conn, &description()).unwrap();
        let level = crate::queries::default_level_id(&conn).unwrap();
        let id = create_tournament(&conn, name, None, None, level).unwrap();
        (conn, id)
    }

    #[test]
    fn test_import_remaps_tournament_id() {
        let (source, source_id) = store_with_tournament("Regional");
        // shift the destination id away from the source id
        let (dest, _) = store_with_tournament("Other");
        let level = crate::queries::default_level_id(&dest).unwrap();
        let dest_id = create_tournament(&dest, "Regional", None, None, level).unwrap();
        assert_ne!(source_id, dest_id);

        for conn in [&source, &dest] {
            insert_team(
                conn,
                &Team {
                    number: 12,
                    name: Some("Gears".into()),
                    organization: None,
                },
            )
            .unwrap();
        }
        source
            .execute_batch(&format!(
                "INSERT INTO TournamentTeams (TeamNumber, Tournament, event_division, judging_station)
                     VALUES (12, {id}, 'A', 'Blue');
                 INSERT INTO TournamentTeams (TeamNumber, Tournament, event_division, judging_station)
                     VALUES (-1, {id}, 'A', 'Blue');
                 INSERT INTO Performance (TeamNumber, Tournament, RunNumber, bridge) VALUES (12, {id}, 1, 2);
                 INSERT INTO teamwork (TeamNumber, Tournament, Judge, spirit) VALUES (12, {id}, 'j', 4);",
                id = source_id
            ))
            .unwrap();

        import_database(&source, &dest, "Regional", &ImportOptions::default()).unwrap();

        let teams: i64 = dest
            .query_row("SELECT COUNT(*) FROM TournamentTeams WHERE Tournament = ?1", [dest_id], |r| r.get(0))
            .unwrap();
        assert_eq!(teams, 1);
        let total: f64 = dest
            .query_row("SELECT ComputedTotal FROM Performance WHERE Tournament = ?1", [dest_id], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 20.0);
        let subjective: f64 = dest
            .query_row(
                "SELECT computed_total FROM subjective_computed_scores WHERE tournament = ?1",
                [dest_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(subjective, 4.0);
    }

    #[test]
    fn test_options_skip_passes() {
        let (source, source_id) = store_with_tournament("Regional");
        let (dest, dest_id) = store_with_tournament("Regional");
        source
            .execute(
                "INSERT INTO Performance (TeamNumber, Tournament, RunNumber, bridge) VALUES (5, ?1, 1, 1)",
                [source_id],
            )
            .unwrap();

        let options = ImportOptions {
            performance: false,
            ..ImportOptions::default()
        };
        import_database(&source, &dest, "Regional", &options).unwrap();
        let rows: i64 = dest
            .query_row("SELECT COUNT(*) FROM Performance WHERE Tournament = ?1", [dest_id], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_unknown_tournament() {
        let (source, _) = store_with_tournament("Regional");
        let (dest, _) = store_with_tournament("Regional");
        let err = import_database(&source, &dest, "Nowhere", &ImportOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::MigrationError>(),
            Some(crate::error::MigrationError::UnknownTournament(_))
        ));
    }
}
