//! Aggregator: two sequential unweighted means (sub-test -> group, then
//! group -> employee) plus the data-completeness ratio.

use super::MatchedRecord;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct EmployeeAggregates {
    /// Mean sub-test match rate per (employee, group).
    group_rates: BTreeMap<(String, String), f64>,
    /// Mean of each employee's group rates — never a flat mean of sub-tests,
    /// so every group weighs the same regardless of how many sub-tests back it.
    final_rates: BTreeMap<String, f64>,
    /// Percentage of all catalog sub-tests the employee has any record for.
    completeness: BTreeMap<String, f64>,
}

impl EmployeeAggregates {
    pub fn compute(records: &[MatchedRecord], expected_subtests: usize) -> Self {
        let mut rate_sums: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        let mut seen_subtests: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for record in records {
            seen_subtests
                .entry(record.employee_id.clone())
                .or_default()
                .insert(record.tv_name.clone());

            // Records without a usable baseline are excluded from the mean,
            // not zero-filled into it.
            if let Some(rate) = record.tv_match_rate {
                let key = (record.employee_id.clone(), record.tgv_name.clone());
                let slot = rate_sums.entry(key).or_insert((0.0, 0));
                slot.0 += rate;
                slot.1 += 1;
            }
        }

        let group_rates: BTreeMap<(String, String), f64> = rate_sums
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect();

        let mut final_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for ((employee_id, _), rate) in &group_rates {
            let slot = final_sums.entry(employee_id.clone()).or_insert((0.0, 0));
            slot.0 += rate;
            slot.1 += 1;
        }
        let final_rates = final_sums
            .into_iter()
            .map(|(employee_id, (sum, count))| (employee_id, sum / count as f64))
            .collect();

        let completeness = seen_subtests
            .into_iter()
            .map(|(employee_id, subtests)| {
                let ratio = if expected_subtests == 0 {
                    0.0
                } else {
                    subtests.len() as f64 / expected_subtests as f64 * 100.0
                };
                (employee_id, ratio)
            })
            .collect();

        Self {
            group_rates,
            final_rates,
            completeness,
        }
    }

    pub fn group_rate(&self, employee_id: &str, tgv_name: &str) -> Option<f64> {
        self.group_rates
            .get(&(employee_id.to_string(), tgv_name.to_string()))
            .copied()
    }

    pub fn final_rate(&self, employee_id: &str) -> Option<f64> {
        self.final_rates.get(employee_id).copied()
    }

    pub fn completeness(&self, employee_id: &str) -> Option<f64> {
        self.completeness.get(employee_id).copied()
    }
}
