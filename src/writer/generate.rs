//! Build a current-version database from scratch.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::schema_gen::{create_table, create_views};
use crate::challenge::ChallengeDescription;
use crate::params::Parameters;
use crate::queries::{
    self, create_internal_tournament, create_tournament, default_level_id, populate_levels,
};
use crate::schema::tables::{
    AWARDS_SCRIPT_TABLES, FIXED_TABLES, GLOBAL_PARAMETERS, TEAMS, TOURNAMENTS, TOURNAMENT_LEVEL,
};
use crate::schema::{
    performance_table, subjective_table, BYE_TEAM_NUMBER, CURRENT_VERSION, DROP_TOURNAMENT_NAME,
    DUMMY_TOURNAMENT_NAME, INTERNAL_TEAM_ORGANIZATION, NULL_TEAM_NUMBER, TIE_TEAM_NUMBER,
};

/// Create every table, view and sentinel row of a version 32 database.
///
/// The store is expected to be empty. Everything happens in one
/// transaction, so a failure leaves the store untouched.
pub fn generate_db(conn: &mut Connection, description: &ChallengeDescription) -> Result<()> {
    info!("Creating database for challenge {:?}", description.title);
    let tx = conn.transaction()?;

    create_table(&tx, &GLOBAL_PARAMETERS, true)?;
    let parameters = Parameters::new(&tx);
    parameters.store_challenge_description(description)?;

    for schema in FIXED_TABLES {
        if schema.name == GLOBAL_PARAMETERS.name {
            continue;
        }
        create_table(&tx, schema, true)?;
        debug!("Created table {}", schema.name);

        if schema.name == TOURNAMENT_LEVEL.name {
            populate_levels(&tx)?;
        } else if schema.name == TOURNAMENTS.name {
            insert_placeholder_tournaments(&tx)?;
        } else if schema.name == TEAMS.name {
            insert_sentinel_teams(&tx)?;
        }
    }

    create_dynamic_tables(&tx, description, true)?;
    for table in AWARDS_SCRIPT_TABLES {
        create_table(&tx, &table.schema().schema(), true)?;
    }
    create_score_views(&tx, description)?;

    parameters.set_defaults(true)?;
    parameters.set_database_version(CURRENT_VERSION)?;

    tx.commit().context("Failed to commit new database")?;
    info!("Database created at version {}", CURRENT_VERSION);
    Ok(())
}

/// Performance table plus one table per subjective category.
pub fn create_dynamic_tables(
    conn: &Connection,
    description: &ChallengeDescription,
    with_constraints: bool,
) -> Result<()> {
    create_table(conn, &performance_table(description).schema(), with_constraints)?;
    for category in &description.subjective_categories {
        create_table(conn, &subjective_table(category).schema(), with_constraints)?;
        debug!("Created subjective table {}", category.name);
    }
    Ok(())
}

/// (Re)create the seeding views over the performance table.
pub fn create_score_views(conn: &Connection, description: &ChallengeDescription) -> Result<()> {
    let performance = performance_table(description);
    create_views(conn, &performance.schema().column_names())
}

/// BYE, TIE and NULL teams so bracket rows always have a team to reference.
pub fn insert_sentinel_teams(conn: &Connection) -> Result<()> {
    let sentinels = [
        (BYE_TEAM_NUMBER, "BYE"),
        (TIE_TEAM_NUMBER, "TIE"),
        (NULL_TEAM_NUMBER, "NULL"),
    ];
    for (number, name) in sentinels {
        if queries::find_team(conn, number)?.is_some() {
            continue;
        }
        conn.execute(
            "INSERT INTO Teams (TeamNumber, TeamName, Organization) VALUES (?1, ?2, ?3)",
            params![number, name, INTERNAL_TEAM_ORGANIZATION],
        )
        .with_context(|| format!("Failed to insert sentinel team {}", name))?;
    }
    Ok(())
}

/// DUMMY and DROP under the default level, plus the internal tournament.
pub fn insert_placeholder_tournaments(conn: &Connection) -> Result<()> {
    let level = default_level_id(conn)?;
    create_tournament(
        conn,
        DUMMY_TOURNAMENT_NAME,
        Some("Default dummy tournament"),
        None,
        level,
    )?;
    create_tournament(
        conn,
        DROP_TOURNAMENT_NAME,
        Some("Dummy tournament for dropped teams"),
        None,
        level,
    )?;
    create_internal_tournament(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{Goal, PerformanceScoreCategory, SubjectiveScoreCategory};
    use crate::queries::{all_tournaments, level_by_id};
    use crate::schema::{INTERNAL_TOURNAMENT_ID, INTERNAL_TOURNAMENT_LEVEL_ID};
    use crate::upgrade::{column_exists, table_exists};

    fn description() -> ChallengeDescription {
        ChallengeDescription {
            title: "Test".to_string(),
            revision: "1".to_string(),
            performance: PerformanceScoreCategory {
                weight: 1.0,
                minimum_score: 0.0,
                goals: vec![Goal::numeric("ramp", "Ramp", 0.0, 3.0, 5.0)],
            },
            subjective_categories: vec![SubjectiveScoreCategory {
                name: "core_values".to_string(),
                title: "Core Values".to_string(),
                weight: 1.0,
                goals: vec![Goal::numeric("spirit", "Spirit", 1.0, 4.0, 1.0)],
            }],
            non_numeric_categories: vec![],
        }
    }

    #[test]
    fn test_generate_db_version_and_sentinels() {
        let mut conn = Connection::open_in_memory().unwrap();
        generate_db(&mut conn, &description()).unwrap();

        let params = Parameters::new(&conn);
        assert_eq!(params.database_version().unwrap(), CURRENT_VERSION);
        assert_eq!(params.challenge_description().unwrap(), description());

        let names: Vec<_> = all_tournaments(&conn)
            .unwrap()
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        assert!(names.contains(&(INTERNAL_TOURNAMENT_ID, "__INTERNAL__".to_string())));
        assert!(names.iter().any(|(_, n)| n == "DUMMY"));
        assert!(names.iter().any(|(_, n)| n == "DROP"));

        let dummy = queries::tournament_id(&conn, "DUMMY").unwrap();
        assert_eq!(params.current_tournament().unwrap(), dummy);
        assert!(level_by_id(&conn, INTERNAL_TOURNAMENT_LEVEL_ID).unwrap().is_some());

        for number in [BYE_TEAM_NUMBER, TIE_TEAM_NUMBER, NULL_TEAM_NUMBER] {
            assert!(queries::find_team(&conn, number).unwrap().is_some());
        }
    }

    #[test]
    fn test_generate_db_creates_dynamic_tables_and_views() {
        let mut conn = Connection::open_in_memory().unwrap();
        generate_db(&mut conn, &description()).unwrap();

        assert!(table_exists(&conn, "core_values").unwrap());
        assert!(column_exists(&conn, "Performance", "ramp").unwrap());
        assert!(column_exists(&conn, "core_values", "spirit_comment").unwrap());
        assert!(table_exists(&conn, "awards_script_sponsor_order").unwrap());

        let views: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'view'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(views, 3);
    }

    #[test]
    fn test_default_parameters() {
        let mut conn = Connection::open_in_memory().unwrap();
        generate_db(&mut conn, &description()).unwrap();
        let params = Parameters::new(&conn);
        assert_eq!(params.seeding_rounds(42).unwrap(), 3);
        assert!(params.running_head_to_head(42).unwrap());
        assert_eq!(params.performance_advancement_percentage(42).unwrap(), 0);
    }
}
