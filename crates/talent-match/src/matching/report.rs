//! Views over the ranked result table used by callers: the per-employee
//! ranking, benchmark data-quality figures, and the benchmark summary string
//! handed to the profile generator.

use super::baseline::median;
use super::rank::MatchRow;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one matching invocation. Rows are fully sorted and never
/// mutated after construction.
#[derive(Debug)]
pub struct MatchReport {
    pub rows: Vec<MatchRow>,
    pub latest_competency_year: Option<i64>,
}

impl MatchReport {
    /// One row per employee, in rank order — the first detail row of each
    /// employee, since rows are sorted with final rate as the primary key.
    pub fn ranking(&self) -> Vec<&MatchRow> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.employee_id.as_str()))
            .collect()
    }

    pub fn top_candidates(&self, limit: usize) -> Vec<&MatchRow> {
        self.ranking().into_iter().take(limit).collect()
    }

    /// Average data completeness across the benchmark cohort, used for the
    /// soft data-quality warning. `None` when no benchmark employee appears
    /// in the output at all.
    pub fn benchmark_average_completeness(&self, benchmark_ids: &[String]) -> Option<f64> {
        let wanted: BTreeSet<&str> = benchmark_ids.iter().map(String::as_str).collect();
        let mut per_employee: BTreeMap<&str, f64> = BTreeMap::new();

        for row in &self.rows {
            if wanted.contains(row.employee_id.as_str()) {
                per_employee
                    .entry(row.employee_id.as_str())
                    .or_insert(row.data_completeness);
            }
        }

        if per_employee.is_empty() {
            return None;
        }
        Some(per_employee.values().sum::<f64>() / per_employee.len() as f64)
    }

    /// Compact description of the benchmark cohort's group profile (median
    /// group match rate per group), formatted as input for the
    /// profile-generation collaborator.
    pub fn benchmark_summary(&self, benchmark_ids: &[String]) -> String {
        let wanted: BTreeSet<&str> = benchmark_ids.iter().map(String::as_str).collect();
        let mut group_rates: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();

        for row in &self.rows {
            if !wanted.contains(row.employee_id.as_str()) {
                continue;
            }
            let Some(rate) = row.tgv_match_rate else {
                continue;
            };
            // One group rate per (employee, group); detail rows repeat it.
            if seen.insert((row.employee_id.as_str(), row.tgv_name.as_str())) {
                group_rates.entry(row.tgv_name.as_str()).or_default().push(rate);
            }
        }

        if group_rates.is_empty() {
            return "No benchmark profile available.".to_string();
        }

        let mut summary =
            String::from("Benchmark cohort profile (median group match rate):\n");
        for (tgv_name, mut rates) in group_rates {
            let value = median(&mut rates);
            summary.push_str(&format!("- {tgv_name}: {value:.1}%\n"));
        }
        summary
    }
}
