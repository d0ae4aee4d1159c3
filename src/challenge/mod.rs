//! The season's scoring rubric: categories, goals and how goals score.
//!
//! The description drives the shape of the performance table and of every
//! subjective category table, so it is stored inside each database under the
//! `ChallengeDocument` global parameter.

pub mod parser;

pub use parser::parse_challenge;

/// One value an enumerated goal may take.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumeratedValue {
    pub value: String,
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoalKind {
    Numeric,
    Enumerated(Vec<EnumeratedValue>),
    /// Derived from other goals; never stored in a column.
    Computed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub name: String,
    pub title: String,
    pub min: f64,
    pub max: f64,
    pub multiplier: f64,
    pub initial_value: f64,
    pub kind: GoalKind,
}

impl Goal {
    pub fn numeric(name: &str, title: &str, min: f64, max: f64, multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            min,
            max,
            multiplier,
            initial_value: min,
            kind: GoalKind::Numeric,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.kind, GoalKind::Computed)
    }

    pub fn is_enumerated(&self) -> bool {
        matches!(self.kind, GoalKind::Enumerated(_))
    }

    /// Name of the free-text column that carries a judge's comment for this goal.
    pub fn comment_column(&self) -> String {
        format!("{}_comment", self.name)
    }

    /// Score contribution of a raw numeric entry.
    pub fn score_numeric(&self, raw: f64) -> f64 {
        match self.kind {
            GoalKind::Numeric => raw * self.multiplier,
            _ => 0.0,
        }
    }

    /// Score contribution of an enumerated entry, `None` when the value is unknown.
    pub fn score_enumerated(&self, raw: &str) -> Option<f64> {
        match &self.kind {
            GoalKind::Enumerated(values) => values
                .iter()
                .find(|v| v.value.eq_ignore_ascii_case(raw))
                .map(|v| v.score * self.multiplier),
            _ => None,
        }
    }
}

/// A goal entry as read back from a score table.
#[derive(Debug, Clone, PartialEq)]
pub enum RawScore {
    Missing,
    Number(f64),
    Text(String),
}

impl Goal {
    /// Points for one entry. Missing entries, unknown enumerated values and
    /// computed goals all score 0.
    pub fn score(&self, raw: &RawScore) -> f64 {
        match (&self.kind, raw) {
            (GoalKind::Computed, _) | (_, RawScore::Missing) => 0.0,
            (GoalKind::Numeric, RawScore::Number(n)) => self.score_numeric(*n),
            (GoalKind::Numeric, RawScore::Text(t)) => {
                t.trim().parse().map(|n| self.score_numeric(n)).unwrap_or(0.0)
            }
            (GoalKind::Enumerated(_), RawScore::Text(t)) => {
                self.score_enumerated(t).unwrap_or(0.0)
            }
            (GoalKind::Enumerated(_), RawScore::Number(n)) => {
                self.score_enumerated(&n.to_string()).unwrap_or(0.0)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceScoreCategory {
    pub weight: f64,
    pub minimum_score: f64,
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectiveScoreCategory {
    /// Also the name of the category's score table.
    pub name: String,
    pub title: String,
    pub weight: f64,
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonNumericCategory {
    pub title: String,
    pub per_award_group: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeDescription {
    pub title: String,
    pub revision: String,
    pub performance: PerformanceScoreCategory,
    pub subjective_categories: Vec<SubjectiveScoreCategory>,
    pub non_numeric_categories: Vec<NonNumericCategory>,
}

impl ChallengeDescription {
    pub fn subjective_category(&self, name: &str) -> Option<&SubjectiveScoreCategory> {
        self.subjective_categories.iter().find(|c| c.name == name)
    }

    pub fn is_subjective_title(&self, title: &str) -> bool {
        self.subjective_categories.iter().any(|c| c.title == title)
    }

    pub fn non_numeric_category(&self, title: &str) -> Option<&NonNumericCategory> {
        self.non_numeric_categories.iter().find(|c| c.title == title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enumerated() -> Goal {
        Goal {
            name: "flag".to_string(),
            title: "Flag".to_string(),
            min: 0.0,
            max: 1.0,
            multiplier: 2.0,
            initial_value: 0.0,
            kind: GoalKind::Enumerated(vec![
                EnumeratedValue {
                    value: "up".to_string(),
                    title: "Up".to_string(),
                    score: 10.0,
                },
                EnumeratedValue {
                    value: "down".to_string(),
                    title: "Down".to_string(),
                    score: 0.0,
                },
            ]),
        }
    }

    #[test]
    fn test_numeric_score_uses_multiplier() {
        let goal = Goal::numeric("bridge", "Bridge", 0.0, 3.0, 15.0);
        assert_eq!(goal.score_numeric(2.0), 30.0);
        assert!(!goal.is_enumerated());
    }

    #[test]
    fn test_enumerated_score_matches_value() {
        let goal = enumerated();
        assert_eq!(goal.score_enumerated("UP"), Some(20.0));
        assert_eq!(goal.score_enumerated("down"), Some(0.0));
        assert_eq!(goal.score_enumerated("sideways"), None);
        assert_eq!(goal.score_numeric(1.0), 0.0);
    }

    #[test]
    fn test_score_entry_kinds() {
        let numeric = Goal::numeric("bridge", "Bridge", 0.0, 3.0, 15.0);
        assert_eq!(numeric.score(&RawScore::Number(1.0)), 15.0);
        assert_eq!(numeric.score(&RawScore::Text("2".into())), 30.0);
        assert_eq!(numeric.score(&RawScore::Missing), 0.0);
        assert_eq!(enumerated().score(&RawScore::Text("up".into())), 20.0);

        let computed = Goal {
            kind: GoalKind::Computed,
            ..Goal::numeric("bonus", "Bonus", 0.0, 1.0, 100.0)
        };
        assert_eq!(computed.score(&RawScore::Number(1.0)), 0.0);
    }

    #[test]
    fn test_comment_column() {
        assert_eq!(enumerated().comment_column(), "flag_comment");
    }
}
