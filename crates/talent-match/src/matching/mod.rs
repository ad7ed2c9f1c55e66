//! The matching pipeline: unify scores, compute benchmark baselines, derive
//! direction-aware match rates, aggregate them hierarchically, enrich with
//! dimension data, and rank.

mod aggregate;
mod baseline;
pub mod catalog;
pub mod export;
mod rank;
mod rate;
mod report;
mod unify;

pub use catalog::{ScaleDirection, SubtestCatalog, SubtestEntry};
pub use export::{ExportError, DEFAULT_EXPORT_COLUMNS, EXPORT_COLUMNS};
pub use rank::MatchRow;
pub use report::MatchReport;

use crate::source::{table, tables, Row, SourceError, TableSource};
use aggregate::EmployeeAggregates;
use baseline::BaselineTable;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use unify::UnifiedScores;

/// One score joined against the sub-test catalog; unmapped scores never get
/// this far.
#[derive(Debug, Clone)]
pub(crate) struct MatchedScore {
    pub employee_id: String,
    pub tv_name: String,
    pub tgv_name: String,
    pub value: f64,
}

/// A matched score with its baseline and derived rate attached. Read-only
/// once built; the aggregation pass never mutates it.
#[derive(Debug, Clone)]
pub(crate) struct MatchedRecord {
    pub employee_id: String,
    pub tv_name: String,
    pub tgv_name: String,
    pub user_score: f64,
    pub baseline_score: Option<f64>,
    pub tv_match_rate: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("benchmark set is empty; select at least one benchmark employee")]
    EmptyBenchmark,
    #[error("required table '{table}' is empty")]
    MissingTable { table: &'static str },
    #[error("no employee produced a matchable sub-test for this benchmark set")]
    NoMatches,
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Entry point for one matching invocation. Holds only the table source;
/// every run fetches a fresh snapshot of all tables.
pub struct MatchingEngine<S> {
    source: Arc<S>,
}

impl<S: TableSource> MatchingEngine<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Run the full pipeline for the given benchmark cohort. Either the
    /// whole computation completes or one tagged failure is returned; there
    /// are no partial results.
    pub fn run(&self, benchmark_ids: &[String]) -> Result<MatchReport, MatchingError> {
        if benchmark_ids.is_empty() {
            return Err(MatchingError::EmptyBenchmark);
        }
        let benchmark: BTreeSet<String> = benchmark_ids.iter().cloned().collect();

        let psych = self.required(table::PROFILES_PSYCH)?;
        let competencies = self.required(table::COMPETENCIES_YEARLY)?;
        let behavioral = self.required(table::PAPI_SCORES)?;
        let mapping = self.required(table::DIM_TALENT_MAPPING)?;

        let catalog = SubtestCatalog::from_rows(&mapping);
        if catalog.is_empty() {
            return Err(MatchingError::MissingTable {
                table: table::DIM_TALENT_MAPPING,
            });
        }

        let UnifiedScores {
            scores,
            latest_competency_year,
        } = unify::unify_scores(&psych, &competencies, &behavioral);

        // Inner join against the catalog: sub-tests without a mapping row
        // are dropped for every employee.
        let matched: Vec<MatchedScore> = scores
            .into_iter()
            .filter_map(|score| {
                catalog.get(&score.tv_name).map(|entry| MatchedScore {
                    employee_id: score.employee_id,
                    tv_name: score.tv_name,
                    tgv_name: entry.tgv_name.clone(),
                    value: score.value,
                })
            })
            .collect();

        if matched.is_empty() {
            return Err(MatchingError::NoMatches);
        }

        let baselines = BaselineTable::from_benchmark(&matched, &benchmark);
        info!(
            matched = matched.len(),
            baselines = baselines.len(),
            ?latest_competency_year,
            "computed benchmark baselines"
        );

        let records: Vec<MatchedRecord> = matched
            .into_iter()
            .map(|score| {
                let baseline_score = baselines.get(&score.tv_name);
                let direction = catalog
                    .get(&score.tv_name)
                    .map(|entry| entry.direction)
                    .unwrap_or(ScaleDirection::Normal);
                MatchedRecord {
                    tv_match_rate: rate::match_rate(direction, score.value, baseline_score),
                    employee_id: score.employee_id,
                    tv_name: score.tv_name,
                    tgv_name: score.tgv_name,
                    user_score: score.value,
                    baseline_score,
                }
            })
            .collect();

        let aggregates = EmployeeAggregates::compute(&records, catalog.distinct_subtests());

        let employees = tables::employee_index(&self.required(table::EMPLOYEES)?);
        let directorates =
            tables::dimension_index(&self.required(table::DIM_DIRECTORATES)?, "directorate_id");
        let positions =
            tables::dimension_index(&self.required(table::DIM_POSITIONS)?, "position_id");
        let grades = tables::dimension_index(&self.required(table::DIM_GRADES)?, "grade_id");

        let mut rows: Vec<MatchRow> = records
            .into_iter()
            .map(|record| {
                let employee = employees.get(&record.employee_id);
                let entry = catalog.get(&record.tv_name);

                // Dimension-lookup misses leave descriptive fields unset;
                // they are never fatal.
                let lookup = |id: Option<&String>, index: &std::collections::BTreeMap<String, String>| {
                    id.and_then(|id| index.get(id)).cloned()
                };

                MatchRow {
                    fullname: employee.and_then(|e| e.fullname.clone()),
                    directorate: lookup(
                        employee.and_then(|e| e.directorate_id.as_ref()),
                        &directorates,
                    ),
                    role: lookup(employee.and_then(|e| e.position_id.as_ref()), &positions),
                    grade: lookup(employee.and_then(|e| e.grade_id.as_ref()), &grades),
                    tgv_match_rate: aggregates.group_rate(&record.employee_id, &record.tgv_name),
                    final_match_rate: aggregates.final_rate(&record.employee_id),
                    data_completeness: aggregates
                        .completeness(&record.employee_id)
                        .unwrap_or(0.0),
                    meaning: entry.and_then(|e| e.meaning.clone()),
                    behavior_example: entry.and_then(|e| e.behavior_example.clone()),
                    note: entry.and_then(|e| e.note.clone()),
                    employee_id: record.employee_id,
                    tgv_name: record.tgv_name,
                    tv_name: record.tv_name,
                    baseline_score: record.baseline_score,
                    user_score: record.user_score,
                    tv_match_rate: record.tv_match_rate,
                }
            })
            .collect();

        rank::sort_rows(&mut rows);
        info!(rows = rows.len(), "matching completed");

        Ok(MatchReport {
            rows,
            latest_competency_year,
        })
    }

    /// Fetch a table that must be non-empty for the run to proceed. An empty
    /// fetch is the single aggregate upstream failure for the whole run.
    fn required(&self, name: &'static str) -> Result<Vec<Row>, MatchingError> {
        let rows = self.source.fetch_all(name)?;
        if rows.is_empty() {
            return Err(MatchingError::MissingTable { table: name });
        }
        Ok(rows)
    }
}
