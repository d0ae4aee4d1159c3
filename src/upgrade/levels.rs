//! Turn the free-text `level` / `next_level` columns of tournaments into
//! `tournament_level` records.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::queries::{
    default_level_id, get_or_create_level, level_by_name, set_next_level, set_tournament_level,
};
use crate::schema::{INTERNAL_TOURNAMENT_ID, INTERNAL_TOURNAMENT_LEVEL_ID};

type LevelPair = (Option<String>, Option<String>);

/// Create a level for every distinct (level, next level) pair and point each
/// tournament at the level of its pair.
///
/// A level name that shows up with two different next levels becomes two
/// records, the later one named `<name>_<n>` with `n` counting from 0 and
/// skipping names that some level already has.
pub fn assign_levels_from_text(conn: &Connection) -> Result<()> {
    let default_level = default_level_id(conn)?;

    let pairs: Vec<LevelPair> = {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT level, next_level FROM Tournaments ORDER BY level, next_level",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut taken: HashSet<String> = HashSet::new();
    for (level, next) in &pairs {
        taken.extend(level.iter().cloned());
        taken.extend(next.iter().cloned());
    }

    let mut next_levels: HashMap<String, Option<String>> = HashMap::new();
    let mut mismatches = 0;
    let mut assignments: HashMap<LevelPair, i64> = HashMap::new();

    for (level, next) in pairs {
        let level_id = match &level {
            None => default_level,
            Some(name) => {
                let resolved = match next_levels.get(name) {
                    None => {
                        next_levels.insert(name.clone(), next.clone());
                        name.clone()
                    }
                    Some(stored) if *stored == next => name.clone(),
                    Some(_) => {
                        let renamed = unused_level_name(conn, name, &mut mismatches, &taken)?;
                        taken.insert(renamed.clone());
                        renamed
                    }
                };

                let id = get_or_create_level(conn, &resolved)?;
                if let Some(next_name) = &next {
                    let next_id = get_or_create_level(conn, next_name)?;
                    set_next_level(conn, id, next_id)?;
                }
                debug!(level = resolved.as_str(), next = ?next, id, "synthesized level");
                id
            }
        };
        assignments.insert((level, next), level_id);
    }

    let tournaments: Vec<(i64, LevelPair)> = {
        let mut stmt = conn.prepare("SELECT tournament_id, level, next_level FROM Tournaments")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, (row.get(1)?, row.get(2)?))))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    for (tournament_id, pair) in tournaments {
        let level_id = if tournament_id == INTERNAL_TOURNAMENT_ID {
            INTERNAL_TOURNAMENT_LEVEL_ID
        } else {
            match assignments.get(&pair) {
                Some(id) => *id,
                None => {
                    warn!(
                        tournament_id,
                        level = ?pair.0,
                        next = ?pair.1,
                        "No level created for tournament, using the default level"
                    );
                    default_level
                }
            }
        };
        set_tournament_level(conn, tournament_id, level_id)?;
    }
    Ok(())
}

/// `<name>_<n>` for the first `n` from `counter` that no level uses yet.
fn unused_level_name(
    conn: &Connection,
    name: &str,
    counter: &mut u32,
    taken: &HashSet<String>,
) -> Result<String> {
    loop {
        let candidate = format!("{}_{}", name, counter);
        *counter += 1;
        if !taken.contains(&candidate) && level_by_name(conn, &candidate)?.is_none() {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{level_by_id, level_by_name, populate_levels};
    use crate::schema::tables::TOURNAMENT_LEVEL;
    use crate::writer::create_table;
    use rusqlite::params;

    /// Level assigned to each tournament, by tournament name.
    fn levels_by_tournament(conn: &Connection) -> Result<Vec<(String, String)>> {
        let mut stmt = conn.prepare(
            "SELECT Tournaments.Name, tournament_level.level_name
             FROM Tournaments, tournament_level
             WHERE Tournaments.level_id = tournament_level.level_id
             ORDER BY Tournaments.Name",
        )?;
        let rows = stmt
            .query_map(params![], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Tournaments as they looked between versions 20 and 29.
    fn legacy_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Tournaments (
                 tournament_id INTEGER PRIMARY KEY,
                 Name varchar(128),
                 Location longvarchar,
                 level varchar(128),
                 next_level varchar(128));
             INSERT INTO Tournaments VALUES (-1, '__INTERNAL__', NULL, NULL, NULL);
             INSERT INTO Tournaments VALUES (1, 'North', NULL, 'State', 'National');
             INSERT INTO Tournaments VALUES (2, 'South', NULL, 'State', 'Regional');
             INSERT INTO Tournaments VALUES (3, 'Local', NULL, NULL, NULL);
             ALTER TABLE Tournaments ADD COLUMN level_id INTEGER;",
        )
        .unwrap();
        create_table(&conn, &TOURNAMENT_LEVEL, false).unwrap();
        populate_levels(&conn).unwrap();
        conn
    }

    fn level_of(conn: &Connection, tournament: i64) -> i64 {
        conn.query_row(
            "SELECT level_id FROM Tournaments WHERE tournament_id = ?1",
            [tournament],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_same_level_name_with_different_next_levels() {
        let conn = legacy_store();
        assign_levels_from_text(&conn).unwrap();

        let state = level_by_name(&conn, "State").unwrap().unwrap();
        let state_0 = level_by_name(&conn, "State_0").unwrap().unwrap();
        assert_ne!(state.id, state_0.id);

        let national = level_by_name(&conn, "National").unwrap().unwrap();
        let regional = level_by_name(&conn, "Regional").unwrap().unwrap();
        assert_eq!(state.next_level_id, national.id);
        assert_eq!(state_0.next_level_id, regional.id);

        assert_eq!(level_of(&conn, 1), state.id);
        assert_eq!(level_of(&conn, 2), state_0.id);
    }

    #[test]
    fn test_internal_and_unleveled_tournaments() {
        let conn = legacy_store();
        assign_levels_from_text(&conn).unwrap();

        assert_eq!(level_of(&conn, -1), INTERNAL_TOURNAMENT_LEVEL_ID);
        let default_level = default_level_id(&conn).unwrap();
        assert_eq!(level_of(&conn, 3), default_level);
        assert!(level_by_id(&conn, default_level).unwrap().is_some());

        let names: Vec<_> = levels_by_tournament(&conn)
            .unwrap()
            .into_iter()
            .map(|(t, l)| format!("{}={}", t, l))
            .collect();
        assert!(names.contains(&"North=State".to_string()));
        assert!(names.contains(&"South=State_0".to_string()));
    }

    #[test]
    fn test_disambiguated_name_skips_existing_level() {
        let conn = legacy_store();
        conn.execute(
            "INSERT INTO Tournaments (tournament_id, Name, level, next_level) VALUES (4, 'West', 'State_0', 'National')",
            [],
        )
        .unwrap();
        assign_levels_from_text(&conn).unwrap();

        let names = levels_by_tournament(&conn).unwrap();
        assert!(names.contains(&("West".to_string(), "State_0".to_string())));
        assert!(names.contains(&("South".to_string(), "State_1".to_string())));
        assert_ne!(level_of(&conn, 2), level_of(&conn, 4));
    }
}
