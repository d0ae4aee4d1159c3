//! Lookups and inserts for tournaments, levels, teams and users shared by
//! the schema builder, the upgrade steps and the importer.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MigrationError;
use crate::schema::{
    DEFAULT_TOURNAMENT_LEVEL_NAME, INTERNAL_TOURNAMENT_ID, INTERNAL_TOURNAMENT_LEVEL_ID,
    INTERNAL_TOURNAMENT_LEVEL_NAME, INTERNAL_TOURNAMENT_NAME, NO_NEXT_LEVEL_ID,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub level_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentLevel {
    pub id: i64,
    pub name: String,
    pub next_level_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub number: i64,
    pub name: Option<String>,
    pub organization: Option<String>,
}

// =============================================================================
// Tournaments
// =============================================================================

fn tournament_from_row(row: &rusqlite::Row) -> rusqlite::Result<Tournament> {
    Ok(Tournament {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        date: row.get(3)?,
        level_id: row.get(4)?,
    })
}

pub fn find_tournament_by_name(conn: &Connection, name: &str) -> Result<Option<Tournament>> {
    conn.query_row(
        "SELECT tournament_id, Name, Location, tournament_date, level_id FROM Tournaments WHERE Name = ?1",
        [name],
        tournament_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to look up tournament {}", name))
}

pub fn find_tournament_by_id(conn: &Connection, id: i64) -> Result<Option<Tournament>> {
    conn.query_row(
        "SELECT tournament_id, Name, Location, tournament_date, level_id FROM Tournaments WHERE tournament_id = ?1",
        [id],
        tournament_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to look up tournament id {}", id))
}

/// Tournament id for `name`, or [`MigrationError::UnknownTournament`].
pub fn tournament_id(conn: &Connection, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT tournament_id FROM Tournaments WHERE Name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    id.ok_or_else(|| MigrationError::UnknownTournament(name.to_string()).into())
}

pub fn tournament_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(find_tournament_by_name(conn, name)?.is_some())
}

pub fn all_tournaments(conn: &Connection) -> Result<Vec<Tournament>> {
    let mut stmt = conn.prepare(
        "SELECT tournament_id, Name, Location, tournament_date, level_id FROM Tournaments ORDER BY tournament_id",
    )?;
    let tournaments = stmt
        .query_map([], tournament_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tournaments)
}

/// Create a tournament and return its id.
pub fn create_tournament(
    conn: &Connection,
    name: &str,
    location: Option<&str>,
    date: Option<&str>,
    level_id: i64,
) -> Result<i64> {
    if tournament_exists(conn, name)? {
        return Err(MigrationError::Duplicate(format!("tournament {}", name)).into());
    }
    conn.execute(
        "INSERT INTO Tournaments (Name, Location, tournament_date, level_id) VALUES (?1, ?2, ?3, ?4)",
        params![name, location, date, level_id],
    )
    .with_context(|| format!("Failed to create tournament {}", name))?;
    let id = conn.last_insert_rowid();
    debug!(id, name, "created tournament");
    Ok(id)
}

pub fn set_tournament_level(conn: &Connection, tournament_id: i64, level_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE Tournaments SET level_id = ?1 WHERE tournament_id = ?2",
        params![level_id, tournament_id],
    )?;
    Ok(())
}

/// Make sure the internal tournament and its level exist under their
/// reserved ids, renaming anything that already uses the reserved name.
pub fn create_internal_tournament(conn: &Connection) -> Result<()> {
    create_internal_level(conn)?;

    if let Some(existing) = find_tournament_by_name(conn, INTERNAL_TOURNAMENT_NAME)? {
        if existing.id != INTERNAL_TOURNAMENT_ID {
            warn!(id = existing.id, "renaming tournament that uses the internal name");
            conn.execute(
                "UPDATE Tournaments SET Name = ?1 WHERE tournament_id = ?2",
                params![format!("Imported-{}", existing.name), existing.id],
            )?;
        }
    }

    if find_tournament_by_id(conn, INTERNAL_TOURNAMENT_ID)?.is_none() {
        conn.execute(
            "INSERT INTO Tournaments (tournament_id, Name, level_id) VALUES (?1, ?2, ?3)",
            params![
                INTERNAL_TOURNAMENT_ID,
                INTERNAL_TOURNAMENT_NAME,
                INTERNAL_TOURNAMENT_LEVEL_ID
            ],
        )
        .context("Failed to create internal tournament")?;
    }
    Ok(())
}

// =============================================================================
// Tournament levels
// =============================================================================

fn level_from_row(row: &rusqlite::Row) -> rusqlite::Result<TournamentLevel> {
    Ok(TournamentLevel {
        id: row.get(0)?,
        name: row.get(1)?,
        next_level_id: row.get(2)?,
    })
}

pub fn level_by_name(conn: &Connection, name: &str) -> Result<Option<TournamentLevel>> {
    conn.query_row(
        "SELECT level_id, level_name, next_level_id FROM tournament_level WHERE level_name = ?1",
        [name],
        level_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to look up level {}", name))
}

pub fn level_by_id(conn: &Connection, id: i64) -> Result<Option<TournamentLevel>> {
    conn.query_row(
        "SELECT level_id, level_name, next_level_id FROM tournament_level WHERE level_id = ?1",
        [id],
        level_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to look up level id {}", id))
}

pub fn all_levels(conn: &Connection) -> Result<Vec<TournamentLevel>> {
    let mut stmt =
        conn.prepare("SELECT level_id, level_name, next_level_id FROM tournament_level ORDER BY level_id")?;
    let levels = stmt
        .query_map([], level_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(levels)
}

/// Create a level with no next level and return its id.
pub fn create_level(conn: &Connection, name: &str) -> Result<i64> {
    if level_by_name(conn, name)?.is_some() {
        return Err(MigrationError::Duplicate(format!("tournament level {}", name)).into());
    }
    conn.execute(
        "INSERT INTO tournament_level (level_name, next_level_id) VALUES (?1, ?2)",
        params![name, NO_NEXT_LEVEL_ID],
    )
    .with_context(|| format!("Failed to create level {}", name))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_or_create_level(conn: &Connection, name: &str) -> Result<i64> {
    match level_by_name(conn, name)? {
        Some(level) => Ok(level.id),
        None => create_level(conn, name),
    }
}

pub fn set_next_level(conn: &Connection, level_id: i64, next_level_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE tournament_level SET next_level_id = ?1 WHERE level_id = ?2",
        params![next_level_id, level_id],
    )?;
    Ok(())
}

pub fn default_level_id(conn: &Connection) -> Result<i64> {
    level_by_name(conn, DEFAULT_TOURNAMENT_LEVEL_NAME)?
        .map(|level| level.id)
        .ok_or_else(|| {
            MigrationError::Inconsistent(format!(
                "default tournament level {:?} is missing",
                DEFAULT_TOURNAMENT_LEVEL_NAME
            ))
            .into()
        })
}

fn create_internal_level(conn: &Connection) -> Result<()> {
    if let Some(existing) = level_by_name(conn, INTERNAL_TOURNAMENT_LEVEL_NAME)? {
        if existing.id != INTERNAL_TOURNAMENT_LEVEL_ID {
            conn.execute(
                "UPDATE tournament_level SET level_name = ?1 WHERE level_id = ?2",
                params![format!("Imported-{}", existing.name), existing.id],
            )?;
        }
    }

    if level_by_id(conn, INTERNAL_TOURNAMENT_LEVEL_ID)?.is_none() {
        conn.execute(
            "INSERT INTO tournament_level (level_id, level_name, next_level_id) VALUES (?1, ?2, ?3)",
            params![
                INTERNAL_TOURNAMENT_LEVEL_ID,
                INTERNAL_TOURNAMENT_LEVEL_NAME,
                NO_NEXT_LEVEL_ID
            ],
        )
        .context("Failed to create internal tournament level")?;
    }
    Ok(())
}

/// Insert the internal level and the default level into a new level table.
pub fn populate_levels(conn: &Connection) -> Result<()> {
    create_internal_level(conn)?;
    get_or_create_level(conn, DEFAULT_TOURNAMENT_LEVEL_NAME)?;
    Ok(())
}

// =============================================================================
// Teams
// =============================================================================

pub fn all_teams(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt =
        conn.prepare("SELECT TeamNumber, TeamName, Organization FROM Teams ORDER BY TeamNumber")?;
    let teams = stmt
        .query_map([], |row| {
            Ok(Team {
                number: row.get(0)?,
                name: row.get(1)?,
                organization: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(teams)
}

pub fn find_team(conn: &Connection, number: i64) -> Result<Option<Team>> {
    conn.query_row(
        "SELECT TeamNumber, TeamName, Organization FROM Teams WHERE TeamNumber = ?1",
        [number],
        |row| {
            Ok(Team {
                number: row.get(0)?,
                name: row.get(1)?,
                organization: row.get(2)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("Failed to look up team {}", number))
}

/// Teams entered in a tournament, sentinel teams excluded.
pub fn tournament_teams(conn: &Connection, tournament_id: i64) -> Result<Vec<Team>> {
    let mut stmt = conn.prepare(
        "SELECT Teams.TeamNumber, Teams.TeamName, Teams.Organization
         FROM Teams, TournamentTeams
         WHERE Teams.TeamNumber = TournamentTeams.TeamNumber
           AND TournamentTeams.Tournament = ?1
           AND Teams.TeamNumber >= 0
         ORDER BY Teams.TeamNumber",
    )?;
    let teams = stmt
        .query_map([tournament_id], |row| {
            Ok(Team {
                number: row.get(0)?,
                name: row.get(1)?,
                organization: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(teams)
}

pub fn insert_team(conn: &Connection, team: &Team) -> Result<()> {
    if find_team(conn, team.number)?.is_some() {
        return Err(MigrationError::Duplicate(format!("team {}", team.number)).into());
    }
    conn.execute(
        "INSERT INTO Teams (TeamNumber, TeamName, Organization) VALUES (?1, ?2, ?3)",
        params![team.number, team.name, team.organization],
    )
    .with_context(|| format!("Failed to insert team {}", team.number))?;
    Ok(())
}

// =============================================================================
// Users
// =============================================================================

pub fn users(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT fll_user FROM fll_authentication ORDER BY fll_user")?;
    let users = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(users)
}

/// Replace the roles of `user`.
pub fn set_roles(conn: &Connection, user: &str, roles: &[&str]) -> Result<()> {
    conn.execute("DELETE FROM auth_roles WHERE fll_user = ?1", [user])?;
    let mut insert = conn.prepare_cached("INSERT INTO auth_roles (fll_user, fll_role) VALUES (?1, ?2)")?;
    for role in roles {
        insert
            .execute(params![user, role])
            .with_context(|| format!("Failed to add role {} to {}", role, user))?;
    }
    Ok(())
}
