use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use tracing::{debug, trace};

use super::{column_exists, levels, table_exists, UpgradeStep};
use crate::challenge::{ChallengeDescription, NonNumericCategory, SubjectiveScoreCategory};
use crate::params::{Parameters, RUNNING_HEAD_TO_HEAD};
use crate::queries::{self, create_tournament, default_level_id, populate_levels};
use crate::schema::tables::*;
use crate::schema::{
    checked_identifier, goal_columns, is_internal_team, Column, ColumnType, TableSchema,
    DEFAULT_TEAM_DIVISION, INTERNAL_TOURNAMENT_ID, INTERNAL_TOURNAMENT_NAME, PERFORMANCE_TABLE,
};
use crate::writer::{create_table, insert_placeholder_tournaments};

pub static STEPS: &[UpgradeStep] = &[
    UpgradeStep {
        target_version: 1,
        description: "integer tournament ids and parameter tables",
        apply: upgrade_0_to_1,
    },
    UpgradeStep {
        target_version: 2,
        description: "schedule tables",
        apply: upgrade_1_to_2,
    },
    UpgradeStep {
        target_version: 6,
        description: "named subjective schedule times",
        apply: upgrade_2_to_6,
    },
    UpgradeStep {
        target_version: 7,
        description: "judging stations",
        apply: upgrade_6_to_7,
    },
    UpgradeStep {
        target_version: 8,
        description: "playoff run numbers",
        apply: upgrade_7_to_8,
    },
    UpgradeStep {
        target_version: 9,
        description: "finalist schedule",
        apply: upgrade_8_to_9,
    },
    UpgradeStep {
        target_version: 10,
        description: "table divisions",
        apply: upgrade_9_to_10,
    },
    UpgradeStep {
        target_version: 11,
        description: "subjective notes",
        apply: upgrade_10_to_11,
    },
    UpgradeStep {
        target_version: 12,
        description: "category schedule columns",
        apply: upgrade_11_to_12,
    },
    UpgradeStep {
        target_version: 13,
        description: "non-numeric nominees",
        apply: upgrade_12_to_13,
    },
    UpgradeStep {
        target_version: 14,
        description: "tournament modification times",
        apply: upgrade_13_to_14,
    },
    UpgradeStep {
        target_version: 15,
        description: "playoff bracket membership",
        apply: upgrade_14_to_15,
    },
    UpgradeStep {
        target_version: 16,
        description: "tournament dates",
        apply: upgrade_15_to_16,
    },
    UpgradeStep {
        target_version: 17,
        description: "running head to head default",
        apply: upgrade_16_to_17,
    },
    UpgradeStep {
        target_version: 18,
        description: "no schema change",
        apply: upgrade_17_to_18,
    },
    UpgradeStep {
        target_version: 19,
        description: "computed score tables",
        apply: upgrade_18_to_19,
    },
    UpgradeStep {
        target_version: 20,
        description: "award winners, advancing teams and tournament levels as text",
        apply: upgrade_19_to_20,
    },
    UpgradeStep {
        target_version: 21,
        description: "automatically finished playoffs",
        apply: upgrade_20_to_21,
    },
    UpgradeStep {
        target_version: 22,
        description: "award group order",
        apply: upgrade_21_to_22,
    },
    UpgradeStep {
        target_version: 23,
        description: "subjective goal comments",
        apply: upgrade_22_to_23,
    },
    UpgradeStep {
        target_version: 24,
        description: "nominee judges",
        apply: upgrade_23_to_24,
    },
    UpgradeStep {
        target_version: 25,
        description: "delayed performance display",
        apply: upgrade_24_to_25,
    },
    UpgradeStep {
        target_version: 26,
        description: "authentication roles",
        apply: upgrade_25_to_26,
    },
    UpgradeStep {
        target_version: 27,
        description: "login failure tracking",
        apply: upgrade_26_to_27,
    },
    UpgradeStep {
        target_version: 28,
        description: "finalist parameters, playoff schedules and nominee categories",
        apply: upgrade_27_to_28,
    },
    UpgradeStep {
        target_version: 29,
        description: "award places",
        apply: upgrade_28_to_29,
    },
    UpgradeStep {
        target_version: 30,
        description: "tournament level records",
        apply: upgrade_29_to_30,
    },
    UpgradeStep {
        target_version: 31,
        description: "ignored categories",
        apply: upgrade_30_to_31,
    },
    UpgradeStep {
        target_version: 32,
        description: "awards script",
        apply: upgrade_31_to_32,
    },
];

/// Tables whose `Tournament` column held the tournament name before version 1.
const NAME_KEYED_TABLES: &[&str] = &[
    "Judges",
    "tablenames",
    "TournamentTeams",
    "FinalScores",
    PERFORMANCE_TABLE,
    "PlayoffData",
];

// =============================================================================
// Helpers
// =============================================================================

/// Create `schema` without key constraints unless the table is already there.
fn ensure_table(conn: &Connection, schema: &TableSchema) -> Result<()> {
    if table_exists(conn, schema.name)? {
        trace!("Table {} already exists", schema.name);
        return Ok(());
    }
    create_table(conn, schema, false)
}

fn add_column_if_missing(conn: &Connection, table: &str, column: &Column) -> Result<()> {
    if !table_exists(conn, table)? || column_exists(conn, table, &column.name)? {
        return Ok(());
    }
    let table = checked_identifier(table)?;
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {}",
        table,
        column.definition()
    ))
    .with_context(|| format!("Failed to add column {} to {}", column.name, table))?;
    debug!("Added column {}.{}", table, column.name);
    Ok(())
}

fn tournament_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT tournament_id FROM Tournaments ORDER BY tournament_id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Replace the text tournament column of `table` with the integer id of the
/// named tournament. Names without a tournament become NULL.
fn rekey_tournament_column(conn: &Connection, table: &str, ids: &[(String, i64)]) -> Result<()> {
    if !table_exists(conn, table)? {
        debug!("No table {} to re-key", table);
        return Ok(());
    }
    let table = checked_identifier(table)?;

    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN tournament_rekey INTEGER",
        table
    ))?;
    {
        let mut update = conn.prepare(&format!(
            "UPDATE {} SET tournament_rekey = ?1 WHERE Tournament = ?2",
            table
        ))?;
        for (name, id) in ids {
            update.execute(params![id, name])?;
        }
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {table} DROP COLUMN Tournament;
         ALTER TABLE {table} RENAME COLUMN tournament_rekey TO Tournament;"
    ))
    .with_context(|| format!("Failed to re-key tournament column of {}", table))?;

    debug!("Re-keyed tournament column of {}", table);
    Ok(())
}

// =============================================================================
// Steps
// =============================================================================

fn upgrade_0_to_1(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS TournamentParameters")?;

    ensure_table(conn, &GLOBAL_PARAMETERS)?;
    Parameters::new(conn).store_challenge_description(description)?;

    let old_tournaments: Vec<(String, Option<String>)> = if table_exists(conn, "Tournaments")? {
        let mut stmt = conn.prepare("SELECT Name, Location FROM Tournaments")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    } else {
        Vec::new()
    };
    conn.execute_batch("DROP TABLE IF EXISTS Tournaments")?;

    ensure_table(conn, &TOURNAMENT_LEVEL)?;
    populate_levels(conn)?;
    create_table(conn, &TOURNAMENTS, false)?;
    insert_placeholder_tournaments(conn)?;

    let level = default_level_id(conn)?;
    for (name, location) in &old_tournaments {
        if name != INTERNAL_TOURNAMENT_NAME && !queries::tournament_exists(conn, name)? {
            create_tournament(conn, name, location.as_deref(), None, level)?;
        }
    }

    let ids: Vec<(String, i64)> = queries::all_tournaments(conn)?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();
    trace!("Tournament ids by name: {:?}", ids);

    let subjective = description
        .subjective_categories
        .iter()
        .map(|c| c.name.as_str());
    for table in NAME_KEYED_TABLES.iter().copied().chain(subjective) {
        rekey_tournament_column(conn, table, &ids)?;
    }

    ensure_table(conn, &TOURNAMENT_PARAMETERS)?;
    // head to head was always run in the early tournaments
    Parameters::new(conn).set_defaults(true)
}

fn upgrade_1_to_2(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &SCHEDULE)?;
    ensure_table(conn, &SCHED_PERF_ROUNDS)?;
    ensure_table(conn, &SCHED_SUBJECTIVE)
}

fn upgrade_2_to_6(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS sched_subjective")?;
    create_table(conn, &SCHED_SUBJECTIVE, false)?;

    if !column_exists(conn, "schedule", "presentation")? {
        return Ok(());
    }

    let mut select =
        conn.prepare("SELECT tournament, team_number, presentation, technical FROM schedule")?;
    let rows = select
        .query_map([], |row| {
            Ok((
                row.get::<_, Value>(0)?,
                row.get::<_, Value>(1)?,
                row.get::<_, Value>(2)?,
                row.get::<_, Value>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut insert = conn.prepare(
        "INSERT INTO sched_subjective (tournament, team_number, name, subj_time) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (tournament, team, presentation, technical) in rows {
        insert.execute(params![tournament, team, "Technical", technical])?;
        insert.execute(params![tournament, team, "Research", presentation])?;
    }
    Ok(())
}

fn upgrade_6_to_7(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    if table_exists(conn, "TournamentTeams")? {
        conn.execute(
            "UPDATE TournamentTeams SET event_division = ?1 WHERE event_division IS NULL",
            [DEFAULT_TEAM_DIVISION],
        )?;
        add_column_if_missing(
            conn,
            "TournamentTeams",
            &Column::new("judging_station", ColumnType::Varchar(64)),
        )?;
        conn.execute_batch("UPDATE TournamentTeams SET judging_station = event_division")?;
    }

    if column_exists(conn, "Judges", "event_division")? && !column_exists(conn, "Judges", "station")? {
        conn.execute_batch("ALTER TABLE Judges RENAME COLUMN event_division TO station")?;
    }
    Ok(())
}

fn upgrade_7_to_8(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    if !table_exists(conn, "PlayoffData")? {
        return Ok(());
    }
    add_column_if_missing(
        conn,
        "PlayoffData",
        &Column::new("run_number", ColumnType::Integer),
    )?;

    let has_performance = table_exists(conn, PERFORMANCE_TABLE)?;
    let mut update = conn.prepare(
        "UPDATE PlayoffData SET run_number = ?1 + PlayoffRound WHERE Tournament = ?2",
    )?;
    for tournament in tournament_ids(conn)? {
        let max_run: Option<i64> = if has_performance {
            conn.query_row(
                "SELECT MAX(RunNumber) FROM Performance WHERE Tournament = ?1",
                [tournament],
                |row| row.get(0),
            )?
        } else {
            None
        };
        update.execute(params![max_run.unwrap_or(0), tournament])?;
    }
    Ok(())
}

fn upgrade_8_to_9(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &FINALIST_CATEGORIES)?;
    ensure_table(conn, &FINALIST_SCHEDULE)
}

fn upgrade_9_to_10(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &TABLE_DIVISION)
}

fn upgrade_10_to_11(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    let note = Column::with_default("note", ColumnType::LongVarchar, "NULL");
    for category in &description.subjective_categories {
        add_column_if_missing(conn, &category.name, &note)?;
    }
    Ok(())
}

/// Schedule column holding the judging time of `category`, if any.
pub(super) fn schedule_column_for_category<'a>(
    category: &SubjectiveScoreCategory,
    columns: &'a [String],
) -> Option<&'a str> {
    let exact = columns
        .iter()
        .find(|c| **c == category.name || **c == category.title);
    if let Some(column) = exact {
        return Some(column);
    }

    if category.name.contains("programming") || category.name.contains("design") {
        return columns.iter().find(|c| c.as_str() == "Design").map(String::as_str);
    }
    None
}

fn upgrade_11_to_12(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &CATEGORY_SCHEDULE_COLUMN)?;

    let mut stations =
        conn.prepare("SELECT DISTINCT name FROM sched_subjective WHERE tournament = ?1 ORDER BY name")?;
    let mut insert = conn.prepare(
        "INSERT INTO category_schedule_column (tournament, category, schedule_column) VALUES (?1, ?2, ?3)",
    )?;

    for tournament in tournament_ids(conn)? {
        let columns = stations
            .query_map([tournament], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        trace!("Tournament {} has schedule columns {:?}", tournament, columns);

        for category in &description.subjective_categories {
            if let Some(column) = schedule_column_for_category(category, &columns) {
                trace!("Category {} maps to column {}", category.name, column);
                insert.execute(params![tournament, category.name, column])?;
            }
        }
    }
    Ok(())
}

fn upgrade_12_to_13(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    // some version 12 stores were created with the column
    add_column_if_missing(
        conn,
        "finalist_categories",
        &Column::with_default("room", ColumnType::Varchar(32), "NULL"),
    )?;
    ensure_table(conn, &NON_NUMERIC_NOMINEES)?;

    let mut schedule = conn.prepare(
        "SELECT DISTINCT category, team_number FROM finalist_schedule WHERE tournament = ?1",
    )?;
    let mut insert = conn.prepare(
        "INSERT INTO non_numeric_nominees (tournament, category, team_number) VALUES (?1, ?2, ?3)",
    )?;

    for tournament in tournament_ids(conn)? {
        let rows = schedule
            .query_map([tournament], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (category, team) in rows {
            if !description.is_subjective_title(&category) {
                insert.execute(params![tournament, category, team])?;
            }
        }
    }
    Ok(())
}

fn upgrade_13_to_14(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    // stores upgraded from version 0 already carry these
    for name in ["subjective_modified", "performance_seeding_modified", "summary_computed"] {
        let column = Column {
            name: name.into(),
            col_type: ColumnType::Timestamp,
            nullable: true,
            default: Some("NULL"),
        };
        add_column_if_missing(conn, "Tournaments", &column)?;
    }
    Ok(())
}

fn upgrade_14_to_15(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &PLAYOFF_BRACKET_TEAMS)?;
    if !table_exists(conn, "PlayoffData")? {
        return Ok(());
    }

    let mut select = conn.prepare("SELECT DISTINCT Tournament, event_division, Team FROM PlayoffData")?;
    let rows = select
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<i64>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut insert = conn.prepare(
        "INSERT INTO playoff_bracket_teams (tournament_id, bracket_name, team_number) VALUES (?1, ?2, ?3)",
    )?;
    for row in rows {
        let (Some(tournament), Some(bracket), Some(team)) = row else {
            continue;
        };
        if is_internal_team(team) {
            continue;
        }
        trace!("Bracket {} of tournament {} has team {}", bracket, tournament, team);
        insert.execute(params![tournament, bracket, team])?;
    }
    Ok(())
}

fn upgrade_15_to_16(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    add_column_if_missing(
        conn,
        "Tournaments",
        &Column::with_default("tournament_date", ColumnType::Date, "NULL"),
    )
}

fn upgrade_16_to_17(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    // every tournament before this version ran head to head
    Parameters::new(conn).set_default(RUNNING_HEAD_TO_HEAD, "1")
}

fn upgrade_17_to_18(_: &Connection, _: &ChallengeDescription) -> Result<()> {
    Ok(())
}

fn upgrade_18_to_19(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &SUBJECTIVE_COMPUTED_SCORES)?;
    ensure_table(conn, &FINAL_SCORES)?;
    ensure_table(conn, &OVERALL_SCORES)
}

fn upgrade_19_to_20(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &SUBJECTIVE_OVERALL_AWARD)?;
    ensure_table(conn, &SUBJECTIVE_EXTRA_AWARD)?;
    ensure_table(conn, &SUBJECTIVE_CHALLENGE_AWARD)?;
    ensure_table(conn, &ADVANCING_TEAMS)?;

    add_column_if_missing(
        conn,
        "Tournaments",
        &Column::with_default("level", ColumnType::Varchar(128), "NULL"),
    )?;
    add_column_if_missing(
        conn,
        "Tournaments",
        &Column::with_default("next_level", ColumnType::Varchar(128), "NULL"),
    )
}

fn upgrade_20_to_21(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &AUTOMATIC_FINISHED_PLAYOFF)
}

fn upgrade_21_to_22(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &AWARD_GROUP_ORDER)
}

fn upgrade_22_to_23(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    for category in &description.subjective_categories {
        for goal in goal_columns(&category.goals) {
            let comment = Column::dynamic(format!("{}_comment", goal.name), ColumnType::LongVarchar);
            let comment = Column {
                default: Some("NULL"),
                ..comment
            };
            add_column_if_missing(conn, &category.name, &comment)?;
        }
        add_column_if_missing(
            conn,
            &category.name,
            &Column::with_default("comment_great_job", ColumnType::LongVarchar, "NULL"),
        )?;
        add_column_if_missing(
            conn,
            &category.name,
            &Column::with_default("comment_think_about", ColumnType::LongVarchar, "NULL"),
        )?;
    }
    Ok(())
}

fn upgrade_23_to_24(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    add_column_if_missing(
        conn,
        "non_numeric_nominees",
        &Column::with_default("judge", ColumnType::Varchar(64), "NULL"),
    )
}

fn upgrade_24_to_25(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &DELAYED_PERFORMANCE)
}

fn upgrade_25_to_26(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &FLL_AUTHENTICATION)?;
    ensure_table(conn, &AUTH_ROLES)?;

    // everyone who could log in before roles existed was an admin
    for user in queries::users(conn)? {
        debug!("Adding admin role to {}", user);
        queries::set_roles(conn, &user, &["ADMIN"])?;
    }
    Ok(())
}

fn upgrade_26_to_27(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    add_column_if_missing(
        conn,
        "fll_authentication",
        &Column::required_default("num_failures", ColumnType::Integer, "0"),
    )?;
    add_column_if_missing(
        conn,
        "fll_authentication",
        &Column::with_default("last_failure", ColumnType::Timestamp, "NULL"),
    )
}

fn upgrade_27_to_28(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &FINALIST_PARAMETERS)?;
    ensure_table(conn, &PLAYOFF_SCHEDULES)?;

    if table_exists(conn, "finalist_schedule")?
        && !column_exists(conn, "finalist_schedule", "judge_end_time")?
    {
        conn.execute_batch(
            "ALTER TABLE finalist_schedule ADD COLUMN judge_end_time TIME DEFAULT NULL;
             UPDATE finalist_schedule SET judge_end_time = time(judge_time, '+20 minutes')
                 WHERE judge_end_time IS NULL;",
        )?;
    }

    // every nominee category must be known to the description
    let mut categories = BTreeSet::new();
    let mut select = conn.prepare(
        "SELECT DISTINCT category FROM non_numeric_nominees WHERE tournament = ?1",
    )?;
    for tournament in tournament_ids(conn)? {
        if tournament == INTERNAL_TOURNAMENT_ID {
            continue;
        }
        let found = select
            .query_map([tournament], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        categories.extend(found);
    }

    let mut updated = description.clone();
    for title in categories {
        if updated.non_numeric_category(&title).is_none() {
            trace!("Adding non-numeric category {:?} to the challenge description", title);
            updated.non_numeric_categories.push(NonNumericCategory {
                title,
                per_award_group: true,
            });
        }
    }
    if updated != *description {
        Parameters::new(conn).store_challenge_description(&updated)?;
    }
    Ok(())
}

fn upgrade_28_to_29(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    let place = Column::with_default("place", ColumnType::Integer, "1");
    for table in [
        SUBJECTIVE_OVERALL_AWARD.name,
        SUBJECTIVE_EXTRA_AWARD.name,
        SUBJECTIVE_CHALLENGE_AWARD.name,
    ] {
        add_column_if_missing(conn, table, &place)?;
    }
    Ok(())
}

fn upgrade_29_to_30(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    if !table_exists(conn, TOURNAMENT_LEVEL.name)? {
        create_table(conn, &TOURNAMENT_LEVEL, false)?;
    }
    populate_levels(conn)?;

    // present already when the store started at version 0
    if column_exists(conn, "Tournaments", "level_id")? {
        return Ok(());
    }
    conn.execute_batch("ALTER TABLE Tournaments ADD COLUMN level_id INTEGER")?;
    levels::assign_levels_from_text(conn)
}

fn upgrade_30_to_31(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    ensure_table(conn, &CATEGORIES_IGNORED)
}

fn upgrade_31_to_32(conn: &Connection, _: &ChallengeDescription) -> Result<()> {
    for table in AWARDS_SCRIPT_TABLES {
        ensure_table(conn, &table.schema().schema())?;
    }
    Ok(())
}
