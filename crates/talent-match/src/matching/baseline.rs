//! Baseline Calculator: per sub-test median of the benchmark cohort's raw
//! values. The median is deliberate — it keeps one outlier benchmark
//! employee from skewing the 100% reference.

use super::MatchedScore;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct BaselineTable {
    baselines: BTreeMap<String, f64>,
}

impl BaselineTable {
    /// Compute baselines strictly over the benchmark employee set. Sub-tests
    /// no benchmark employee has simply have no entry, and later contribute
    /// no match rate for anyone.
    pub fn from_benchmark(records: &[MatchedScore], benchmark_ids: &BTreeSet<String>) -> Self {
        let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

        for record in records {
            if benchmark_ids.contains(&record.employee_id) {
                samples
                    .entry(record.tv_name.as_str())
                    .or_default()
                    .push(record.value);
            }
        }

        let baselines = samples
            .into_iter()
            .map(|(tv_name, mut values)| (tv_name.to_string(), median(&mut values)))
            .collect();

        Self { baselines }
    }

    pub fn get(&self, tv_name: &str) -> Option<f64> {
        self.baselines.get(tv_name).copied()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

/// Statistical median; even-sized samples average the two middle values.
/// Callers guarantee at least one value.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(employee: &str, tv: &str, value: f64) -> MatchedScore {
        MatchedScore {
            employee_id: employee.to_string(),
            tv_name: tv.to_string(),
            tgv_name: "Cognitive".to_string(),
            value,
        }
    }

    fn benchmark(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn median_of_even_cohort_averages_middle_values() {
        let records = vec![score("E1", "iq", 100.0), score("E2", "iq", 120.0)];
        let table = BaselineTable::from_benchmark(&records, &benchmark(&["E1", "E2"]));
        assert_eq!(table.get("iq"), Some(110.0));
    }

    #[test]
    fn median_of_odd_cohort_takes_middle_value() {
        let records = vec![
            score("E1", "iq", 90.0),
            score("E2", "iq", 100.0),
            score("E3", "iq", 300.0),
        ];
        let table = BaselineTable::from_benchmark(&records, &benchmark(&["E1", "E2", "E3"]));
        assert_eq!(table.get("iq"), Some(100.0));
    }

    #[test]
    fn non_benchmark_scores_never_shift_the_baseline() {
        let records = vec![
            score("E1", "iq", 100.0),
            score("E2", "iq", 120.0),
            score("E9", "iq", 500.0),
        ];
        let table = BaselineTable::from_benchmark(&records, &benchmark(&["E1", "E2"]));
        assert_eq!(table.get("iq"), Some(110.0));
    }

    #[test]
    fn subtests_missing_from_cohort_have_no_baseline() {
        let records = vec![score("E9", "pauli", 42.0)];
        let table = BaselineTable::from_benchmark(&records, &benchmark(&["E1"]));
        assert!(table.get("pauli").is_none());
        assert!(table.is_empty());
    }
}
