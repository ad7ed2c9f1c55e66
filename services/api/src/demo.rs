use crate::infra::FixtureTableSource;
use crate::routes::soft_warnings;
use clap::Args;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use talent_match::config::{AppConfig, MatchingConfig};
use talent_match::error::AppError;
use talent_match::matching::{export, MatchReport, MatchingEngine, DEFAULT_EXPORT_COLUMNS};
use talent_match::source::{table, RestTableSource, Row};
use talent_match::telemetry;

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// Benchmark employee id; repeat the flag to build a cohort.
    #[arg(long = "benchmark", required = true)]
    pub(crate) benchmark: Vec<String>,
    /// Write the full result table to this CSV file.
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Comma-separated column subset for the CSV export.
    #[arg(long)]
    pub(crate) columns: Option<String>,
    /// How many ranked candidates to print.
    #[arg(long, default_value_t = 10)]
    pub(crate) top: usize,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// How many ranked candidates to print.
    #[arg(long, default_value_t = 10)]
    pub(crate) top: usize,
}

pub(crate) async fn run_match(args: MatchArgs) -> Result<(), AppError> {
    let MatchArgs {
        benchmark,
        csv,
        columns,
        top,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let source = Arc::new(RestTableSource::from_config(&config.source)?);
    let engine = MatchingEngine::new(source);

    let cohort = benchmark.clone();
    let report = tokio::task::spawn_blocking(move || engine.run(&cohort)).await??;

    render_report(&report, &benchmark, &config.matching, top);

    if let Some(path) = csv {
        let columns: Vec<String> = match columns {
            Some(list) => list
                .split(',')
                .map(|column| column.trim().to_string())
                .filter(|column| !column.is_empty())
                .collect(),
            None => DEFAULT_EXPORT_COLUMNS
                .iter()
                .map(|column| column.to_string())
                .collect(),
        };
        let body = export::to_csv(&report.rows, &columns)?;
        std::fs::write(&path, body)?;
        println!("\nWrote {} detail rows to {}", report.rows.len(), path.display());
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let benchmark = vec!["E1".to_string(), "E2".to_string(), "E3".to_string()];

    println!("Talent matching demo (embedded dataset)");
    println!(
        "Benchmark cohort: {}",
        benchmark.join(", ")
    );

    let source = Arc::new(FixtureTableSource::new(demo_tables()));
    let engine = MatchingEngine::new(source);
    let report = engine.run(&benchmark)?;

    render_report(&report, &benchmark, &MatchingConfig::default(), args.top);
    Ok(())
}

fn render_report(
    report: &MatchReport,
    benchmark: &[String],
    settings: &MatchingConfig,
    top: usize,
) {
    if let Some(year) = report.latest_competency_year {
        println!("Competency cycle: {year}");
    }

    for warning in soft_warnings(report, benchmark, settings) {
        println!("Warning: {warning}");
    }

    println!("\nRanked candidates");
    for (position, row) in report.top_candidates(top).iter().enumerate() {
        println!(
            "{:>3}. {} | {} | {} | {} | final {} | completeness {:.1}%",
            position + 1,
            row.employee_id,
            row.fullname.as_deref().unwrap_or("-"),
            row.role.as_deref().unwrap_or("-"),
            row.directorate.as_deref().unwrap_or("-"),
            format_rate(row.final_match_rate),
            row.data_completeness
        );
    }

    println!("\n{}", report.benchmark_summary(benchmark));
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(value) => format!("{value:.1}%"),
        None => "n/a".to_string(),
    }
}

fn rows(value: serde_json::Value) -> Vec<Row> {
    serde_json::from_value(value).unwrap_or_default()
}

/// Embedded dataset for the demo command: six employees across two
/// directorates with psychometric, competency, and behavioral scores.
pub(crate) fn demo_tables() -> HashMap<&'static str, Vec<Row>> {
    let mut tables = HashMap::new();

    tables.insert(
        table::EMPLOYEES,
        rows(json!([
            { "employee_id": "E1", "fullname": "Joko Susilo", "directorate_id": "d1", "position_id": "p1", "grade_id": "g2" },
            { "employee_id": "E2", "fullname": "Sari Dewi", "directorate_id": "d1", "position_id": "p1", "grade_id": "g2" },
            { "employee_id": "E3", "fullname": "Budi Hartono", "directorate_id": "d1", "position_id": "p2", "grade_id": "g1" },
            { "employee_id": "E4", "fullname": "Rina Wulandari", "directorate_id": "d2", "position_id": "p2", "grade_id": "g1" },
            { "employee_id": "E5", "fullname": "Agus Pratama", "directorate_id": "d2", "position_id": "p3", "grade_id": "g1" },
            { "employee_id": "E6", "fullname": "Maya Lestari", "directorate_id": "d2", "position_id": "p3", "grade_id": "g2" }
        ])),
    );
    tables.insert(
        table::DIM_DIRECTORATES,
        rows(json!([
            { "directorate_id": "d1", "name": "Operations" },
            { "directorate_id": "d2", "name": "Commercial" }
        ])),
    );
    tables.insert(
        table::DIM_POSITIONS,
        rows(json!([
            { "position_id": "p1", "name": "Data Analyst" },
            { "position_id": "p2", "name": "Account Manager" },
            { "position_id": "p3", "name": "Field Supervisor" }
        ])),
    );
    tables.insert(
        table::DIM_GRADES,
        rows(json!([
            { "grade_id": "g1", "name": "III" },
            { "grade_id": "g2", "name": "IV" }
        ])),
    );
    tables.insert(
        table::PROFILES_PSYCH,
        rows(json!([
            { "employee_id": "E1", "iq": 112, "pauli": 78 },
            { "employee_id": "E2", "iq": 104, "pauli": 84 },
            { "employee_id": "E3", "iq": 118, "pauli": 71 },
            { "employee_id": "E4", "iq": 125, "pauli": 90 },
            { "employee_id": "E5", "iq": 98, "pauli": 65 },
            { "employee_id": "E6", "iq": 109, "pauli": 81 }
        ])),
    );
    tables.insert(
        table::COMPETENCIES_YEARLY,
        rows(json!([
            { "employee_id": "E1", "pillar_code": "LEAD", "score": 3.6, "year": 2024 },
            { "employee_id": "E1", "pillar_code": "EXEC", "score": 3.2, "year": 2024 },
            { "employee_id": "E2", "pillar_code": "LEAD", "score": 3.4, "year": 2024 },
            { "employee_id": "E2", "pillar_code": "EXEC", "score": 3.8, "year": 2024 },
            { "employee_id": "E3", "pillar_code": "LEAD", "score": 3.1, "year": 2024 },
            { "employee_id": "E3", "pillar_code": "EXEC", "score": 3.5, "year": 2024 },
            { "employee_id": "E4", "pillar_code": "LEAD", "score": 4.1, "year": 2024 },
            { "employee_id": "E4", "pillar_code": "EXEC", "score": 3.9, "year": 2024 },
            { "employee_id": "E5", "pillar_code": "LEAD", "score": 2.7, "year": 2024 },
            { "employee_id": "E6", "pillar_code": "LEAD", "score": 3.3, "year": 2024 },
            { "employee_id": "E6", "pillar_code": "EXEC", "score": 3.0, "year": 2024 },
            { "employee_id": "E1", "pillar_code": "LEAD", "score": 2.9, "year": 2023 }
        ])),
    );
    tables.insert(
        table::PAPI_SCORES,
        rows(json!([
            { "employee_id": "E1", "scale_code": "N", "score": 7.0 },
            { "employee_id": "E1", "scale_code": "Z", "score": 4.0 },
            { "employee_id": "E2", "scale_code": "N", "score": 6.0 },
            { "employee_id": "E2", "scale_code": "Z", "score": 5.0 },
            { "employee_id": "E3", "scale_code": "N", "score": 8.0 },
            { "employee_id": "E3", "scale_code": "Z", "score": 3.0 },
            { "employee_id": "E4", "scale_code": "N", "score": 9.0 },
            { "employee_id": "E4", "scale_code": "Z", "score": 2.0 },
            { "employee_id": "E5", "scale_code": "N", "score": 5.0 },
            { "employee_id": "E5", "scale_code": "Z", "score": 8.0 },
            { "employee_id": "E6", "scale_code": "N", "score": 7.0 },
            { "employee_id": "E6", "scale_code": "Z", "score": 6.0 }
        ])),
    );
    tables.insert(
        table::DIM_TALENT_MAPPING,
        rows(json!([
            { "Sub-test": "iq", "Talent Group Variable (TGV)": "Cognitive", "Meaning": "General reasoning ability" },
            { "Sub-test": "pauli", "Talent Group Variable (TGV)": "Cognitive", "Meaning": "Sustained concentration" },
            { "Sub-test": "LEAD", "Talent Group Variable (TGV)": "Leadership", "Meaning": "People leadership" },
            { "Sub-test": "EXEC", "Talent Group Variable (TGV)": "Leadership", "Meaning": "Execution discipline" },
            { "Sub-test": "N", "Talent Group Variable (TGV)": "Work Style", "Meaning": "Need to finish a task" },
            { "Sub-test": "Z", "Talent Group Variable (TGV)": "Work Style", "Meaning": "Need for change", "Note": "Inverse Scale: lower is better" }
        ])),
    );

    tables
}
