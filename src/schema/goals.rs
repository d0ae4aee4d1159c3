//! Column sets derived from the challenge description.
//!
//! Schema creation, the upgrade steps and the importer all take the goal
//! columns from here so the three never disagree on a table's shape.

use super::types::{Column, ColumnType, DynamicTable, ForeignKey};
use crate::challenge::{ChallengeDescription, Goal, SubjectiveScoreCategory};

pub const PERFORMANCE_TABLE: &str = "Performance";

static SCORE_TABLE_KEYS: &[ForeignKey] = &[
    ForeignKey::team(&["TeamNumber"]),
    ForeignKey::tournament(&["Tournament"]),
];

/// Store type for a goal: enumerated goals hold the chosen value, everything
/// else a number.
pub fn goal_column_type(goal: &Goal) -> ColumnType {
    if goal.is_enumerated() {
        ColumnType::LongVarchar
    } else {
        ColumnType::Float
    }
}

/// One column per non-computed goal, in description order.
pub fn goal_columns(goals: &[Goal]) -> Vec<Column> {
    goals
        .iter()
        .filter(|g| !g.is_computed())
        .map(|g| Column::dynamic(g.name.clone(), goal_column_type(g)))
        .collect()
}

/// Goal columns each followed by that goal's comment column.
pub fn goal_columns_with_comments(goals: &[Goal]) -> Vec<Column> {
    goals
        .iter()
        .filter(|g| !g.is_computed())
        .flat_map(|g| {
            [
                Column::dynamic(g.name.clone(), goal_column_type(g)),
                Column::dynamic(g.comment_column(), ColumnType::LongVarchar),
            ]
        })
        .collect()
}

pub fn performance_table(description: &ChallengeDescription) -> DynamicTable {
    let mut columns = vec![
        Column::required("TeamNumber", ColumnType::Integer),
        Column::required("Tournament", ColumnType::Integer),
        Column::required("RunNumber", ColumnType::Integer),
        Column::required_default("TimeStamp", ColumnType::Timestamp, "CURRENT_TIMESTAMP"),
        Column::required_default("NoShow", ColumnType::Boolean, "FALSE"),
        Column::required_default("Bye", ColumnType::Boolean, "FALSE"),
        Column::required_default("Verified", ColumnType::Boolean, "FALSE"),
    ];
    columns.extend(goal_columns(&description.performance.goals));
    columns.push(Column::new("ComputedTotal", ColumnType::Float));
    columns.push(Column::new("StandardizedScore", ColumnType::Float));

    DynamicTable {
        name: PERFORMANCE_TABLE.to_string(),
        columns,
        primary_key: &["TeamNumber", "Tournament", "RunNumber"],
        foreign_keys: SCORE_TABLE_KEYS,
    }
}

pub fn subjective_table(category: &SubjectiveScoreCategory) -> DynamicTable {
    let mut columns = vec![
        Column::required("TeamNumber", ColumnType::Integer),
        Column::required("Tournament", ColumnType::Integer),
        Column::required("Judge", ColumnType::Varchar(64)),
        Column::required_default("NoShow", ColumnType::Boolean, "FALSE"),
    ];
    columns.extend(goal_columns_with_comments(&category.goals));
    columns.push(Column::with_default("note", ColumnType::LongVarchar, "NULL"));
    columns.push(Column::with_default(
        "comment_great_job",
        ColumnType::LongVarchar,
        "NULL",
    ));
    columns.push(Column::with_default(
        "comment_think_about",
        ColumnType::LongVarchar,
        "NULL",
    ));

    DynamicTable {
        name: category.name.clone(),
        columns,
        primary_key: &["TeamNumber", "Tournament", "Judge"],
        foreign_keys: SCORE_TABLE_KEYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{EnumeratedValue, GoalKind, PerformanceScoreCategory};

    fn description() -> ChallengeDescription {
        ChallengeDescription {
            title: "t".to_string(),
            revision: String::new(),
            performance: PerformanceScoreCategory {
                weight: 1.0,
                minimum_score: 0.0,
                goals: vec![
                    Goal::numeric("bridge", "Bridge", 0.0, 1.0, 10.0),
                    Goal {
                        kind: GoalKind::Enumerated(vec![EnumeratedValue {
                            value: "up".to_string(),
                            title: "Up".to_string(),
                            score: 5.0,
                        }]),
                        ..Goal::numeric("flag", "Flag", 0.0, 1.0, 1.0)
                    },
                    Goal {
                        kind: GoalKind::Computed,
                        ..Goal::numeric("bonus", "Bonus", 0.0, 1.0, 1.0)
                    },
                ],
            },
            subjective_categories: vec![SubjectiveScoreCategory {
                name: "teamwork".to_string(),
                title: "Teamwork".to_string(),
                weight: 1.0,
                goals: vec![
                    Goal::numeric("roles", "Roles", 1.0, 4.0, 1.0),
                    Goal::numeric("spirit", "Spirit", 1.0, 4.0, 1.0),
                ],
            }],
            non_numeric_categories: vec![],
        }
    }

    #[test]
    fn test_goal_columns_skip_computed_and_keep_order() {
        let desc = description();
        let cols = goal_columns(&desc.performance.goals);
        let names: Vec<_> = cols.iter().map(|c| c.name.as_ref()).collect();
        assert_eq!(names, vec!["bridge", "flag"]);
        assert_eq!(cols[0].col_type, ColumnType::Float);
        assert_eq!(cols[1].col_type, ColumnType::LongVarchar);
    }

    #[test]
    fn test_goal_columns_are_deterministic() {
        let desc = description();
        assert_eq!(
            goal_columns(&desc.performance.goals),
            goal_columns(&desc.performance.goals)
        );
        assert_eq!(
            performance_table(&desc),
            performance_table(&desc.clone())
        );
    }

    #[test]
    fn test_subjective_table_columns() {
        let desc = description();
        let table = subjective_table(&desc.subjective_categories[0]);
        assert_eq!(
            table.schema().column_names(),
            vec![
                "TeamNumber",
                "Tournament",
                "Judge",
                "NoShow",
                "roles",
                "roles_comment",
                "spirit",
                "spirit_comment",
                "note",
                "comment_great_job",
                "comment_think_about",
            ]
        );
    }

    #[test]
    fn test_performance_table_has_no_comment_columns() {
        let table = performance_table(&description());
        let names = table.schema().column_names().join(",");
        assert!(!names.contains("_comment"));
        assert!(names.ends_with("bridge,flag,ComputedTotal,StandardizedScore"));
    }
}
