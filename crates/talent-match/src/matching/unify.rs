//! Score Unifier: flattens the three heterogeneous score tables into one
//! long-form set of (employee, sub-test, value) triples.

use crate::source::{tables, Row};

/// Columns of `profiles_psych` that may or may not be present depending on
/// the deployment; each becomes its own sub-test when the schema carries it.
const PSYCH_COLUMNS: [&str; 2] = ["iq", "pauli"];

#[derive(Debug, Clone, PartialEq)]
pub struct RawScore {
    pub employee_id: String,
    pub tv_name: String,
    pub value: f64,
}

#[derive(Debug, Default)]
pub struct UnifiedScores {
    pub scores: Vec<RawScore>,
    /// The competency-assessment cycle that was selected, when one exists.
    pub latest_competency_year: Option<i64>,
}

/// Pure transform; values that fail to parse as real numbers are dropped
/// here rather than zero-filled.
pub fn unify_scores(psych: &[Row], competencies: &[Row], behavioral: &[Row]) -> UnifiedScores {
    let mut scores = Vec::new();

    // Explicit capability check: a psych column only contributes when the
    // fetched schema actually carries it.
    for column in PSYCH_COLUMNS {
        if !psych.iter().any(|row| row.contains_key(column)) {
            continue;
        }
        for row in psych {
            push_score(&mut scores, row, "employee_id", column, column);
        }
    }

    let latest_competency_year = competencies
        .iter()
        .filter_map(|row| tables::integer_field(row, "year"))
        .max();

    if let Some(latest) = latest_competency_year {
        // All rows tied on the max year are included; an employee assessed
        // twice in that cycle keeps both entries.
        for row in competencies {
            if tables::integer_field(row, "year") != Some(latest) {
                continue;
            }
            if let Some(tv_name) = tables::text_field(row, "pillar_code") {
                push_score(&mut scores, row, "employee_id", "score", &tv_name);
            }
        }
    }

    for row in behavioral {
        if let Some(tv_name) = tables::text_field(row, "scale_code") {
            push_score(&mut scores, row, "employee_id", "score", &tv_name);
        }
    }

    UnifiedScores {
        scores,
        latest_competency_year,
    }
}

fn push_score(
    scores: &mut Vec<RawScore>,
    row: &Row,
    id_column: &str,
    value_column: &str,
    tv_name: &str,
) {
    let (Some(employee_id), Some(value)) = (
        tables::text_field(row, id_column),
        tables::numeric_field(row, value_column),
    ) else {
        return;
    };

    scores.push(RawScore {
        employee_id,
        tv_name: tv_name.to_string(),
        value,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).expect("fixture rows deserialize")
    }

    fn find<'a>(unified: &'a UnifiedScores, employee: &str, tv: &str) -> Vec<&'a RawScore> {
        unified
            .scores
            .iter()
            .filter(|score| score.employee_id == employee && score.tv_name == tv)
            .collect()
    }

    #[test]
    fn psych_columns_only_contribute_when_present_in_schema() {
        let with_iq = rows(json!([{ "employee_id": "E1", "iq": 120 }]));
        let unified = unify_scores(&with_iq, &[], &[]);
        assert_eq!(find(&unified, "E1", "iq").len(), 1);
        assert!(find(&unified, "E1", "pauli").is_empty());

        let without = rows(json!([{ "employee_id": "E1", "verbal": 55 }]));
        let unified = unify_scores(&without, &[], &[]);
        assert!(unified.scores.is_empty());
    }

    #[test]
    fn selects_only_latest_competency_cycle() {
        let competencies = rows(json!([
            { "employee_id": "E1", "pillar_code": "LEAD", "score": 3.0, "year": 2023 },
            { "employee_id": "E1", "pillar_code": "LEAD", "score": 4.0, "year": 2024 },
            { "employee_id": "E2", "pillar_code": "LEAD", "score": 2.5, "year": 2024 }
        ]));

        let unified = unify_scores(&[], &competencies, &[]);
        assert_eq!(unified.latest_competency_year, Some(2024));
        assert_eq!(unified.scores.len(), 2);
        assert_eq!(find(&unified, "E1", "LEAD")[0].value, 4.0);
    }

    #[test]
    fn max_year_ties_keep_duplicate_subtest_rows() {
        let competencies = rows(json!([
            { "employee_id": "E1", "pillar_code": "LEAD", "score": 3.0, "year": 2024 },
            { "employee_id": "E1", "pillar_code": "LEAD", "score": 4.0, "year": 2024 }
        ]));

        let unified = unify_scores(&[], &competencies, &[]);
        assert_eq!(find(&unified, "E1", "LEAD").len(), 2);
    }

    #[test]
    fn non_numeric_values_are_dropped_not_zero_filled() {
        let behavioral = rows(json!([
            { "employee_id": "E1", "scale_code": "N", "score": "not-a-number" },
            { "employee_id": "E1", "scale_code": "G", "score": "7" }
        ]));

        let unified = unify_scores(&[], &[], &behavioral);
        assert_eq!(unified.scores.len(), 1);
        assert_eq!(unified.scores[0].tv_name, "G");
        assert_eq!(unified.scores[0].value, 7.0);
    }

    #[test]
    fn behavioral_scales_flow_through_by_scale_code() {
        let behavioral = rows(json!([
            { "employee_id": "E9", "scale_code": "Z", "score": 5 }
        ]));
        let unified = unify_scores(&[], &[], &behavioral);
        assert_eq!(find(&unified, "E9", "Z").len(), 1);
    }
}
