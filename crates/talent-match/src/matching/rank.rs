//! Ranker: the final deterministic total order over the output table.

use serde::Serialize;
use std::cmp::Ordering;

/// One fully-enriched output row per (employee, sub-test) pair.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub employee_id: String,
    pub fullname: Option<String>,
    pub directorate: Option<String>,
    pub role: Option<String>,
    pub grade: Option<String>,
    pub tgv_name: String,
    pub tv_name: String,
    pub meaning: Option<String>,
    pub behavior_example: Option<String>,
    pub note: Option<String>,
    pub baseline_score: Option<f64>,
    pub user_score: f64,
    pub tv_match_rate: Option<f64>,
    pub tgv_match_rate: Option<f64>,
    pub final_match_rate: Option<f64>,
    pub data_completeness: f64,
}

/// Sort: final match rate descending, then employee id, group name, and
/// sub-test name ascending. Rows without a final rate sort after every row
/// that has one. Reproducible for identical inputs.
pub fn sort_rows(rows: &mut [MatchRow]) {
    rows.sort_by(|a, b| {
        descending_with_missing_last(a.final_match_rate, b.final_match_rate)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
            .then_with(|| a.tgv_name.cmp(&b.tgv_name))
            .then_with(|| a.tv_name.cmp(&b.tv_name))
    });
}

fn descending_with_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => right.total_cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
