use anyhow::{bail, Context, Result};
use roxmltree::{Document, Node};
use std::fmt::Write;

use super::{
    ChallengeDescription, EnumeratedValue, Goal, GoalKind, NonNumericCategory,
    PerformanceScoreCategory, SubjectiveScoreCategory,
};
use crate::schema::checked_identifier;

/// Parse a challenge document.
///
/// Category and goal names become table and column names, so anything that
/// is not a plain SQL identifier is rejected here.
pub fn parse_challenge(xml: &str) -> Result<ChallengeDescription> {
    let doc = Document::parse(xml).context("Failed to parse challenge document")?;
    let root = doc.root_element();
    if !root.has_tag_name("fll") {
        bail!(
            "Challenge document root is <{}>, expected <fll>",
            root.tag_name().name()
        );
    }

    let mut performance = None;
    let mut subjective_categories = Vec::new();
    let mut non_numeric_categories = Vec::new();

    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "Performance" => {
                performance = Some(PerformanceScoreCategory {
                    weight: number_attr(child, "weight", 1.0)?,
                    minimum_score: number_attr(child, "minimumScore", 0.0)?,
                    goals: parse_goals(child)?,
                });
            }
            "subjectiveCategory" => {
                let name = required_attr(child, "name")?;
                checked_identifier(name)?;
                subjective_categories.push(SubjectiveScoreCategory {
                    name: name.to_string(),
                    title: child.attribute("title").unwrap_or(name).to_string(),
                    weight: number_attr(child, "weight", 1.0)?,
                    goals: parse_goals(child)?,
                });
            }
            "nonNumericCategory" => {
                non_numeric_categories.push(NonNumericCategory {
                    title: required_attr(child, "title")?.to_string(),
                    per_award_group: child
                        .attribute("perAwardGroup")
                        .map(|v| v.eq_ignore_ascii_case("true"))
                        .unwrap_or(true),
                });
            }
            _ => {}
        }
    }

    let performance = performance.context("Challenge document has no <Performance> element")?;

    Ok(ChallengeDescription {
        title: root.attribute("title").unwrap_or_default().to_string(),
        revision: root.attribute("revision").unwrap_or_default().to_string(),
        performance,
        subjective_categories,
        non_numeric_categories,
    })
}

/// Goals in document order, looking through `goalGroup` wrappers.
fn parse_goals(category: Node) -> Result<Vec<Goal>> {
    let mut goals = Vec::new();
    for child in category.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "goal" => goals.push(parse_goal(child)?),
            "computedGoal" => {
                let name = required_attr(child, "name")?;
                checked_identifier(name)?;
                goals.push(Goal {
                    name: name.to_string(),
                    title: child.attribute("title").unwrap_or(name).to_string(),
                    min: 0.0,
                    max: 0.0,
                    multiplier: 1.0,
                    initial_value: 0.0,
                    kind: GoalKind::Computed,
                });
            }
            "goalGroup" => goals.extend(parse_goals(child)?),
            _ => {}
        }
    }
    Ok(goals)
}

fn parse_goal(node: Node) -> Result<Goal> {
    let name = required_attr(node, "name")?;
    checked_identifier(name)?;

    let mut values = Vec::new();
    for value in node.children().filter(|n| n.has_tag_name("value")) {
        let raw = required_attr(value, "value")?;
        values.push(EnumeratedValue {
            value: raw.to_string(),
            title: value.attribute("title").unwrap_or(raw).to_string(),
            score: number_attr(value, "score", 0.0)?,
        });
    }

    let min = number_attr(node, "min", 0.0)?;
    Ok(Goal {
        name: name.to_string(),
        title: node.attribute("title").unwrap_or(name).to_string(),
        min,
        max: number_attr(node, "max", 1.0)?,
        multiplier: number_attr(node, "multiplier", 1.0)?,
        initial_value: number_attr(node, "initialValue", min)?,
        kind: if values.is_empty() {
            GoalKind::Numeric
        } else {
            GoalKind::Enumerated(values)
        },
    })
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).with_context(|| {
        format!(
            "<{}> is missing the {} attribute",
            node.tag_name().name(),
            name
        )
    })
}

fn number_attr(node: Node, name: &str, default: f64) -> Result<f64> {
    match node.attribute(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().with_context(|| {
            format!(
                "<{}> attribute {}={:?} is not a number",
                node.tag_name().name(),
                name,
                raw
            )
        }),
    }
}

impl ChallengeDescription {
    /// Serialize back to the document format read by [`parse_challenge`].
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            out,
            "<fll title=\"{}\" revision=\"{}\">",
            escape(&self.title),
            escape(&self.revision)
        );

        let _ = writeln!(
            out,
            "  <Performance weight=\"{}\" minimumScore=\"{}\">",
            self.performance.weight, self.performance.minimum_score
        );
        write_goals(&mut out, &self.performance.goals);
        out.push_str("  </Performance>\n");

        for category in &self.subjective_categories {
            let _ = writeln!(
                out,
                "  <subjectiveCategory name=\"{}\" title=\"{}\" weight=\"{}\">",
                escape(&category.name),
                escape(&category.title),
                category.weight
            );
            write_goals(&mut out, &category.goals);
            out.push_str("  </subjectiveCategory>\n");
        }

        for category in &self.non_numeric_categories {
            let _ = writeln!(
                out,
                "  <nonNumericCategory title=\"{}\" perAwardGroup=\"{}\"/>",
                escape(&category.title),
                category.per_award_group
            );
        }

        out.push_str("</fll>\n");
        out
    }
}

fn write_goals(out: &mut String, goals: &[Goal]) {
    for goal in goals {
        match &goal.kind {
            GoalKind::Computed => {
                let _ = writeln!(
                    out,
                    "    <computedGoal name=\"{}\" title=\"{}\"/>",
                    escape(&goal.name),
                    escape(&goal.title)
                );
            }
            kind => {
                let _ = write!(
                    out,
                    "    <goal name=\"{}\" title=\"{}\" min=\"{}\" max=\"{}\" multiplier=\"{}\" initialValue=\"{}\"",
                    escape(&goal.name),
                    escape(&goal.title),
                    goal.min,
                    goal.max,
                    goal.multiplier,
                    goal.initial_value
                );
                match kind {
                    GoalKind::Enumerated(values) => {
                        out.push_str(">\n");
                        for value in values {
                            let _ = writeln!(
                                out,
                                "      <value value=\"{}\" title=\"{}\" score=\"{}\"/>",
                                escape(&value.value),
                                escape(&value.title),
                                value.score
                            );
                        }
                        out.push_str("    </goal>\n");
                    }
                    _ => out.push_str("/>\n"),
                }
            }
        }
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<fll title="Test &amp; Season" revision="A">
  <Performance weight="1" minimumScore="5">
    <goal name="bridge" title="Bridge" min="0" max="3" multiplier="15"/>
    <goal name="flag" title="Flag">
      <value value="up" title="Up" score="10"/>
      <value value="down" title="Down" score="0"/>
    </goal>
    <computedGoal name="bonus" title="Bonus"/>
  </Performance>
  <subjectiveCategory name="teamwork" title="Teamwork" weight="0.5">
    <goalGroup title="Core">
      <goal name="roles" title="Roles" min="1" max="4"/>
    </goalGroup>
    <goal name="spirit" title="Spirit" min="1" max="4"/>
  </subjectiveCategory>
  <nonNumericCategory title="Judges Award" perAwardGroup="false"/>
</fll>
"#;

    #[test]
    fn test_parse_sample() {
        let description = parse_challenge(SAMPLE).unwrap();
        assert_eq!(description.title, "Test & Season");
        assert_eq!(description.performance.minimum_score, 5.0);
        assert_eq!(description.performance.goals.len(), 3);
        assert!(description.performance.goals[1].is_enumerated());
        assert!(description.performance.goals[2].is_computed());

        let teamwork = description.subjective_category("teamwork").unwrap();
        let names: Vec<_> = teamwork.goals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["roles", "spirit"]);
        assert!(!description.non_numeric_categories[0].per_award_group);
    }

    #[test]
    fn test_to_xml_reparses_to_same_description() {
        let description = parse_challenge(SAMPLE).unwrap();
        let reparsed = parse_challenge(&description.to_xml()).unwrap();
        assert_eq!(description, reparsed);
    }

    #[test]
    fn test_rejects_unsafe_category_name() {
        let xml = r#"<fll><Performance/><subjectiveCategory name="x; DROP TABLE Teams"/></fll>"#;
        assert!(parse_challenge(xml).is_err());
    }

    #[test]
    fn test_requires_performance() {
        assert!(parse_challenge("<fll/>").is_err());
    }
}
