//! Recompute the aggregate score columns of one tournament.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use tracing::{debug, trace};

use crate::challenge::{ChallengeDescription, Goal, RawScore};
use crate::schema::{checked_identifier, PERFORMANCE_TABLE};

/// Goal group recorded for a category-wide subjective total
pub const CATEGORY_GOAL_GROUP: &str = "";

fn raw_score(value: Value) -> RawScore {
    match value {
        Value::Null => RawScore::Missing,
        Value::Integer(i) => RawScore::Number(i as f64),
        Value::Real(f) => RawScore::Number(f),
        Value::Text(s) => RawScore::Text(s),
        Value::Blob(b) => RawScore::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn is_true(value: &Value) -> bool {
    match value {
        Value::Integer(i) => *i != 0,
        Value::Real(f) => *f != 0.0,
        Value::Text(s) => s.eq_ignore_ascii_case("true") || s.trim() == "1",
        _ => false,
    }
}

/// Scored goals only; computed goals have no column.
fn stored_goals(goals: &[Goal]) -> Vec<&Goal> {
    goals.iter().filter(|g| !g.is_computed()).collect()
}

fn goal_total(goals: &[&Goal], values: impl Iterator<Item = Value>) -> f64 {
    goals
        .iter()
        .zip(values)
        .map(|(goal, value)| goal.score(&raw_score(value)))
        .sum()
}

/// Refresh `Performance.ComputedTotal` and rebuild the tournament's rows in
/// `subjective_computed_scores`.
pub fn update_score_totals(
    description: &ChallengeDescription,
    conn: &Connection,
    tournament_id: i64,
) -> Result<()> {
    update_performance_totals(description, conn, tournament_id)?;
    update_subjective_totals(description, conn, tournament_id)?;
    Ok(())
}

/// Byes keep whatever total they have; no-shows get NULL; everything else is
/// the goal sum floored at the category minimum.
pub fn update_performance_totals(
    description: &ChallengeDescription,
    conn: &Connection,
    tournament_id: i64,
) -> Result<()> {
    let goals = stored_goals(&description.performance.goals);
    let mut select_columns = vec!["TeamNumber", "RunNumber", "NoShow", "Bye"];
    for goal in &goals {
        select_columns.push(checked_identifier(&goal.name)?);
    }
    let sql = format!(
        "SELECT {} FROM {} WHERE Tournament = ?1",
        select_columns.join(", "),
        PERFORMANCE_TABLE
    );

    let rows: Vec<Vec<Value>> = {
        let mut stmt = conn.prepare(&sql)?;
        let width = select_columns.len();
        let rows = stmt
            .query_map([tournament_id], |row| {
                (0..width).map(|idx| row.get::<_, Value>(idx)).collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let minimum = description.performance.minimum_score;
    let mut update = conn.prepare_cached(
        "UPDATE Performance SET ComputedTotal = ?1
         WHERE TeamNumber = ?2 AND Tournament = ?3 AND RunNumber = ?4",
    )?;
    let mut updated = 0;
    for row in rows {
        let mut values = row.into_iter();
        let team = values.next().unwrap_or(Value::Null);
        let run = values.next().unwrap_or(Value::Null);
        let no_show = values.next().unwrap_or(Value::Null);
        let bye = values.next().unwrap_or(Value::Null);
        if is_true(&bye) {
            continue;
        }

        let total = if is_true(&no_show) {
            None
        } else {
            Some(goal_total(&goals, values).max(minimum))
        };
        trace!(?team, ?run, ?total, "performance total");
        update
            .execute(params![total, team, tournament_id, run])
            .context("Failed to update performance total")?;
        updated += 1;
    }
    debug!(tournament_id, updated, "updated performance totals");
    Ok(())
}

/// No-shows are recorded with a NULL total.
pub fn update_subjective_totals(
    description: &ChallengeDescription,
    conn: &Connection,
    tournament_id: i64,
) -> Result<()> {
    conn.execute(
        "DELETE FROM subjective_computed_scores WHERE tournament = ?1",
        [tournament_id],
    )?;

    let mut insert = conn.prepare_cached(
        "INSERT INTO subjective_computed_scores
         (category, goal_group, tournament, team_number, judge, computed_total, no_show)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for category in &description.subjective_categories {
        let table = checked_identifier(&category.name)?;
        let goals = stored_goals(&category.goals);
        let mut select_columns = vec!["TeamNumber", "Judge", "NoShow"];
        for goal in &goals {
            select_columns.push(checked_identifier(&goal.name)?);
        }
        let sql = format!(
            "SELECT {} FROM {} WHERE Tournament = ?1",
            select_columns.join(", "),
            table
        );
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to read scores of {}", table))?;
        let width = select_columns.len();
        let rows = stmt
            .query_map([tournament_id], |row| {
                (0..width).map(|idx| row.get::<_, Value>(idx)).collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for row in rows {
            let mut values = row.into_iter();
            let team = values.next().unwrap_or(Value::Null);
            let judge = values.next().unwrap_or(Value::Null);
            let no_show = is_true(&values.next().unwrap_or(Value::Null));
            let total = if no_show {
                None
            } else {
                Some(goal_total(&goals, values))
            };
            insert.execute(params![
                category.name,
                CATEGORY_GOAL_GROUP,
                tournament_id,
                team,
                judge,
                total,
                no_show
            ])?;
        }
        debug!(category = category.name.as_str(), tournament_id, "rebuilt subjective totals");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{PerformanceScoreCategory, SubjectiveScoreCategory};
    use crate::writer::generate_db;

    fn description() -> ChallengeDescription {
        ChallengeDescription {
            title: "Scores".to_string(),
            revision: String::new(),
            performance: PerformanceScoreCategory {
                weight: 1.0,
                minimum_score: 5.0,
                goals: vec![
                    Goal::numeric("bridge", "Bridge", 0.0, 3.0, 10.0),
                    Goal::numeric("tower", "Tower", 0.0, 1.0, 25.0),
                ],
            },
            subjective_categories: vec![SubjectiveScoreCategory {
                name: "teamwork".to_string(),
                title: "Teamwork".to_string(),
                weight: 1.0,
                goals: vec![Goal::numeric("spirit", "Spirit", 1.0, 4.0, 2.0)],
            }],
            non_numeric_categories: vec![],
        }
    }

    fn total(conn: &Connection, team: i64) -> Option<f64> {
        conn.query_row(
            "SELECT ComputedTotal FROM Performance WHERE TeamNumber = ?1",
            [team],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_performance_totals() {
        let mut conn = Connection::open_in_memory().unwrap();
        let desc = description();
        generate_db(&mut conn, &desc).unwrap();
        conn.execute_batch(
            "INSERT INTO Teams (TeamNumber, TeamName) VALUES (1, 'a'), (2, 'b'), (3, 'c'), (4, 'd');
             INSERT INTO Performance (TeamNumber, Tournament, RunNumber, bridge, tower)
                 VALUES (1, 1, 1, 2, 1);
             INSERT INTO Performance (TeamNumber, Tournament, RunNumber, bridge, tower)
                 VALUES (2, 1, 1, 0, 0);
             INSERT INTO Performance (TeamNumber, Tournament, RunNumber, NoShow)
                 VALUES (3, 1, 1, 1);
             INSERT INTO Performance (TeamNumber, Tournament, RunNumber, Bye, ComputedTotal)
                 VALUES (4, 1, 1, 1, 99);",
        )
        .unwrap();

        update_score_totals(&desc, &conn, 1).unwrap();
        assert_eq!(total(&conn, 1), Some(45.0));
        assert_eq!(total(&conn, 2), Some(5.0));
        assert_eq!(total(&conn, 3), None);
        assert_eq!(total(&conn, 4), Some(99.0));
    }

    #[test]
    fn test_subjective_totals_are_rebuilt() {
        let mut conn = Connection::open_in_memory().unwrap();
        let desc = description();
        generate_db(&mut conn, &desc).unwrap();
        conn.execute_batch(
            "INSERT INTO teamwork (TeamNumber, Tournament, Judge, spirit) VALUES (1, 1, 'j1', 3);
             INSERT INTO teamwork (TeamNumber, Tournament, Judge, NoShow) VALUES (2, 1, 'j1', 1);
             INSERT INTO subjective_computed_scores
                 (category, goal_group, tournament, team_number, judge, computed_total)
                 VALUES ('teamwork', '', 1, 9, 'stale', 1);",
        )
        .unwrap();

        update_score_totals(&desc, &conn, 1).unwrap();
        let rows: Vec<(i64, Option<f64>, bool)> = conn
            .prepare(
                "SELECT team_number, computed_total, no_show FROM subjective_computed_scores
                 WHERE tournament = 1 ORDER BY team_number",
            )
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![(1, Some(6.0), false), (2, None, true)]);
    }
}
