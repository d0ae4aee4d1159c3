use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::schema::TableSchema;

/// Generate CREATE TABLE SQL for a table schema.
///
/// Key constraints are only emitted when `with_constraints` is set; tables
/// created while upgrading a loaded dump must accept whatever the dump holds.
pub fn generate_create_table(schema: &TableSchema, with_constraints: bool) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", schema.name);
    let mut columns: Vec<String> = schema
        .columns
        .iter()
        .map(|col| format!("    {}", col.definition()))
        .collect();

    if with_constraints {
        if !schema.primary_key.is_empty() {
            columns.push(format!(
                "    CONSTRAINT {}_pk PRIMARY KEY ({})",
                schema.name.to_lowercase(),
                schema.primary_key.join(", ")
            ));
        }

        for column in schema.unique {
            columns.push(format!(
                "    CONSTRAINT {}_{}_unique UNIQUE ({})",
                schema.name.to_lowercase(),
                column.to_lowercase(),
                column
            ));
        }

        // Add foreign key constraints
        for fk in schema.foreign_keys {
            columns.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {}({})",
                fk.columns.join(", "),
                fk.references_table,
                fk.references_columns.join(", ")
            ));
        }
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

pub fn create_table(conn: &Connection, schema: &TableSchema, with_constraints: bool) -> Result<()> {
    let sql = generate_create_table(schema, with_constraints);
    conn.execute(&sql, [])
        .with_context(|| format!("Failed to create table: {}", schema.name))?;
    Ok(())
}

/// Views over the performance table; recreated whenever the table is.
pub fn create_views(conn: &Connection, performance_columns: &[&str]) -> Result<()> {
    conn.execute_batch(
        "DROP VIEW IF EXISTS verified_performance;
         DROP VIEW IF EXISTS performance_seeding_max;
         DROP VIEW IF EXISTS tournament_seeding_rounds;
         CREATE VIEW tournament_seeding_rounds AS
             SELECT T1.tournament_id,
                 (SELECT TP3.param_value FROM tournament_parameters AS TP3
                     WHERE TP3.param = 'SeedingRounds'
                     AND TP3.tournament = (
                         SELECT MAX(TP2.tournament) FROM tournament_parameters AS TP2
                             WHERE TP2.param = 'SeedingRounds'
                             AND TP2.tournament IN (-1, T1.tournament_id))) AS seeding_rounds
             FROM Tournaments AS T1;
         CREATE VIEW performance_seeding_max AS
             SELECT MAX(Performance.TeamNumber) AS TeamNumber,
                    MAX(Performance.ComputedTotal) AS score,
                    AVG(Performance.ComputedTotal) AS average,
                    Performance.Tournament
             FROM Performance, tournament_seeding_rounds AS TSR
             WHERE Performance.Tournament = TSR.tournament_id
               AND Performance.RunNumber <= TSR.seeding_rounds
             GROUP BY Performance.Tournament, Performance.TeamNumber;",
    )
    .context("Failed to create seeding views")?;

    let sql = format!(
        "CREATE VIEW verified_performance AS SELECT {} FROM Performance WHERE Verified = 1",
        performance_columns.join(", ")
    );
    conn.execute(&sql, [])
        .context("Failed to create verified_performance view")?;
    Ok(())
}
