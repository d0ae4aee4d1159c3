//! Column type metadata carried by a dump.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;

use crate::challenge::{ChallengeDescription, Goal};
use crate::schema::tables::FIXED_TABLES;
use crate::schema::{goal_column_type, ColumnType};

/// Column name (lower case) to declared type, per table (lower case).
pub type TableTypes = HashMap<String, String>;
pub type TypeInfo = HashMap<String, TableTypes>;

/// Read a `<table>.types` entry: one `column,type` record per line.
pub fn read_type_info<R: Read>(reader: R) -> Result<TableTypes> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut types = TableTypes::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read type record {}", line + 1))?;
        if record.len() != 2 {
            anyhow::bail!(
                "Type record {} has {} fields, expected 2",
                line + 1,
                record.len()
            );
        }
        let column = record[0].to_lowercase();
        let declared = &record[1];
        // dumps from one old release wrote the type without its size
        let declared = if declared.eq_ignore_ascii_case("character") {
            "character(64)".to_string()
        } else {
            declared.to_string()
        };
        types.insert(column, declared);
    }
    Ok(types)
}

/// Declared type to use for a column, filling in sizes old dumps left out.
pub fn effective_type(types: &TableTypes, column: &str) -> String {
    match types.get(column) {
        None => "longvarchar".to_string(),
        Some(t) if t.eq_ignore_ascii_case("varchar") => "varchar(255)".to_string(),
        Some(t) if t.eq_ignore_ascii_case("char") => "char(255)".to_string(),
        Some(t) => t.clone(),
    }
}

/// Column the store must assign ids to when a dumped row leaves it empty.
pub fn identity_column(table: &str) -> Option<&'static str> {
    FIXED_TABLES
        .iter()
        .find(|schema| schema.name.eq_ignore_ascii_case(table))
        .and_then(|schema| {
            schema
                .columns
                .iter()
                .find(|c| c.col_type == ColumnType::Identity)
        })
        .and_then(|column| match &column.name {
            std::borrow::Cow::Borrowed(name) => Some(*name),
            std::borrow::Cow::Owned(_) => None,
        })
}

fn legacy_goal_type(goal: &Goal) -> &'static str {
    match goal_column_type(goal) {
        ColumnType::LongVarchar => "longvarchar",
        _ => "float",
    }
}

fn table(columns: &[(&str, &str)]) -> TableTypes {
    columns
        .iter()
        .map(|(name, declared)| (name.to_lowercase(), declared.to_string()))
        .collect()
}

/// Types for dumps written before type metadata existed.
pub fn version0_type_info(description: &ChallengeDescription) -> TypeInfo {
    let mut info = TypeInfo::new();

    info.insert(
        "tournaments".to_string(),
        table(&[("Name", "varchar(128)"), ("Location", "longvarchar")]),
    );
    info.insert(
        "teams".to_string(),
        table(&[
            ("TeamNumber", "integer"),
            ("TeamName", "varchar(255)"),
            ("Organization", "varchar(255)"),
            ("Division", "varchar(32)"),
            ("Region", "varchar(255)"),
        ]),
    );
    info.insert(
        "tablenames".to_string(),
        table(&[
            ("Tournament", "varchar(128)"),
            ("PairID", "integer"),
            ("SideA", "varchar(64)"),
            ("SideB", "varchar(64)"),
        ]),
    );
    info.insert(
        "playoffdata".to_string(),
        table(&[
            ("event_division", "varchar(32)"),
            ("Tournament", "varchar(128)"),
            ("PlayoffRound", "integer"),
            ("LineNumber", "integer"),
            ("Team", "integer"),
            ("AssignedTable", "varchar(64)"),
            ("Printed", "boolean"),
        ]),
    );
    info.insert(
        "tournamentteams".to_string(),
        table(&[
            ("TeamNumber", "integer"),
            ("Tournament", "varchar(128)"),
            ("event_division", "varchar(32)"),
        ]),
    );
    info.insert(
        "judges".to_string(),
        table(&[
            ("id", "varchar(64)"),
            ("category", "varchar(64)"),
            ("Tournament", "varchar(128)"),
            ("event_division", "varchar(32)"),
        ]),
    );

    let mut performance = table(&[
        ("TeamNumber", "integer"),
        ("Tournament", "varchar(128)"),
        ("RunNumber", "integer"),
        ("TimeStamp", "timestamp"),
        ("NoShow", "boolean"),
        ("Bye", "boolean"),
        ("Verified", "boolean"),
        ("ComputedTotal", "float"),
        ("StandardizedScore", "float"),
    ]);
    for goal in description.performance.goals.iter().filter(|g| !g.is_computed()) {
        performance.insert(goal.name.to_lowercase(), legacy_goal_type(goal).to_string());
    }
    info.insert("performance".to_string(), performance);

    let mut final_scores = table(&[("TeamNumber", "integer"), ("Tournament", "varchar(128)")]);
    for category in &description.subjective_categories {
        let mut subjective = table(&[
            ("TeamNumber", "integer"),
            ("Tournament", "varchar(128)"),
            ("Judge", "varchar(64)"),
            ("NoShow", "boolean"),
            ("ComputedTotal", "float"),
            ("StandardizedScore", "float"),
        ]);
        for goal in category.goals.iter().filter(|g| !g.is_computed()) {
            subjective.insert(goal.name.to_lowercase(), legacy_goal_type(goal).to_string());
        }
        info.insert(category.name.to_lowercase(), subjective);
        final_scores.insert(category.name.to_lowercase(), "float".to_string());
    }
    info.insert("finalscores".to_string(), final_scores);

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{EnumeratedValue, GoalKind, PerformanceScoreCategory, SubjectiveScoreCategory};

    #[test]
    fn test_read_type_info() {
        let types = read_type_info("TeamNumber,INTEGER\nname,character\n".as_bytes()).unwrap();
        assert_eq!(types["teamnumber"], "INTEGER");
        assert_eq!(types["name"], "character(64)");
    }

    #[test]
    fn test_read_type_info_rejects_wrong_width() {
        assert!(read_type_info("a,integer,extra\n".as_bytes()).is_err());
    }

    #[test]
    fn test_effective_type_fills_in_sizes() {
        let types = table(&[("a", "varchar"), ("b", "CHAR"), ("c", "integer")]);
        assert_eq!(effective_type(&types, "a"), "varchar(255)");
        assert_eq!(effective_type(&types, "b"), "char(255)");
        assert_eq!(effective_type(&types, "c"), "integer");
        assert_eq!(effective_type(&types, "d"), "longvarchar");
    }

    #[test]
    fn test_identity_columns() {
        assert_eq!(identity_column("tournaments"), Some("tournament_id"));
        assert_eq!(identity_column("TOURNAMENT_LEVEL"), Some("level_id"));
        assert_eq!(identity_column("teams"), None);
    }

    #[test]
    fn test_version0_types_follow_goals() {
        let description = ChallengeDescription {
            title: "t".to_string(),
            revision: String::new(),
            performance: PerformanceScoreCategory {
                weight: 1.0,
                minimum_score: 0.0,
                goals: vec![
                    Goal::numeric("Bridge", "Bridge", 0.0, 1.0, 1.0),
                    Goal {
                        kind: GoalKind::Enumerated(vec![EnumeratedValue {
                            value: "a".to_string(),
                            title: "A".to_string(),
                            score: 1.0,
                        }]),
                        ..Goal::numeric("flag", "Flag", 0.0, 1.0, 1.0)
                    },
                    Goal {
                        kind: GoalKind::Computed,
                        ..Goal::numeric("total", "Total", 0.0, 1.0, 1.0)
                    },
                ],
            },
            subjective_categories: vec![SubjectiveScoreCategory {
                name: "Teamwork".to_string(),
                title: "Teamwork".to_string(),
                weight: 1.0,
                goals: vec![Goal::numeric("roles", "Roles", 1.0, 4.0, 1.0)],
            }],
            non_numeric_categories: vec![],
        };

        let info = version0_type_info(&description);
        let performance = &info["performance"];
        assert_eq!(performance["bridge"], "float");
        assert_eq!(performance["flag"], "longvarchar");
        assert!(!performance.contains_key("total"));
        assert_eq!(info["teamwork"]["roles"], "float");
        assert_eq!(info["finalscores"]["teamwork"], "float");
        assert_eq!(info["judges"]["tournament"], "varchar(128)");
    }
}
