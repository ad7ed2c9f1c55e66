use crate::infra::{AppState, MatchingState};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use talent_match::error::AppError;
use talent_match::matching::{export, MatchReport, MatchRow, DEFAULT_EXPORT_COLUMNS};
use talent_match::profile::{ProfileGenerator, ProfileRequest};
use talent_match::source::TableSource;

#[derive(Debug, Deserialize)]
pub(crate) struct RunMatchingRequest {
    pub(crate) benchmark_employee_ids: Vec<String>,
    #[serde(default)]
    pub(crate) include_details: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunMatchingResponse {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) latest_competency_year: Option<i64>,
    pub(crate) benchmark_size: usize,
    pub(crate) warnings: Vec<String>,
    pub(crate) ranking: Vec<RankingEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) details: Option<Vec<MatchRow>>,
}

/// One candidate in the deduplicated ranking view.
#[derive(Debug, Serialize)]
pub(crate) struct RankingEntry {
    pub(crate) employee_id: String,
    pub(crate) fullname: Option<String>,
    pub(crate) role: Option<String>,
    pub(crate) grade: Option<String>,
    pub(crate) directorate: Option<String>,
    pub(crate) data_completeness: f64,
    pub(crate) final_match_rate: Option<f64>,
    /// True when the candidate out-performs the benchmark reference (>100%).
    pub(crate) exceeds_benchmark: bool,
}

impl RankingEntry {
    fn from_row(row: &MatchRow) -> Self {
        Self {
            employee_id: row.employee_id.clone(),
            fullname: row.fullname.clone(),
            role: row.role.clone(),
            grade: row.grade.clone(),
            directorate: row.directorate.clone(),
            data_completeness: row.data_completeness,
            final_match_rate: row.final_match_rate,
            exceeds_benchmark: row.final_match_rate.is_some_and(|rate| rate > 100.0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportMatchingRequest {
    pub(crate) benchmark_employee_ids: Vec<String>,
    /// Column subset for the download; defaults to the ranking columns.
    #[serde(default)]
    pub(crate) columns: Option<Vec<String>>,
    /// Export every per-sub-test detail row instead of one row per employee.
    #[serde(default)]
    pub(crate) include_details: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateProfileRequest {
    pub(crate) role_name: String,
    pub(crate) role_purpose: String,
    pub(crate) job_level: String,
    #[serde(default)]
    pub(crate) benchmark_employee_ids: Option<Vec<String>>,
}

pub(crate) fn with_service_routes<S, P>(state: Arc<MatchingState<S, P>>) -> Router
where
    S: TableSource + 'static,
    P: ProfileGenerator + 'static,
{
    Router::new()
        .route("/api/v1/matching/run", post(run_matching_endpoint::<S, P>))
        .route(
            "/api/v1/matching/export",
            post(export_matching_endpoint::<S, P>),
        )
        .route(
            "/api/v1/reference/employees",
            get(reference_employees_endpoint::<S, P>),
        )
        .route(
            "/api/v1/reference/roles",
            get(reference_roles_endpoint::<S, P>),
        )
        .route(
            "/api/v1/profile/generate",
            post(generate_profile_endpoint::<S, P>),
        )
        .with_state(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Soft warnings the caller is expected to surface alongside the results.
pub(crate) fn soft_warnings(
    report: &MatchReport,
    benchmark_ids: &[String],
    settings: &talent_match::config::MatchingConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if benchmark_ids.len() < settings.recommended_benchmarks {
        warnings.push(format!(
            "only {} benchmark employee(s) selected; at least {} are recommended for accuracy",
            benchmark_ids.len(),
            settings.recommended_benchmarks
        ));
    }

    if let Some(average) = report.benchmark_average_completeness(benchmark_ids) {
        if average < settings.completeness_warning_threshold {
            warnings.push(format!(
                "benchmark data quality is low: average completeness {average:.1}% (threshold {:.0}%)",
                settings.completeness_warning_threshold
            ));
        }
    }

    warnings
}

async fn run_report<S, P>(
    state: &Arc<MatchingState<S, P>>,
    benchmark_ids: Vec<String>,
) -> Result<MatchReport, AppError>
where
    S: TableSource + 'static,
    P: 'static + Send + Sync,
{
    let engine = state.engine.clone();
    let report =
        tokio::task::spawn_blocking(move || engine.run(&benchmark_ids)).await??;
    Ok(report)
}

pub(crate) async fn run_matching_endpoint<S, P>(
    State(state): State<Arc<MatchingState<S, P>>>,
    Json(payload): Json<RunMatchingRequest>,
) -> Result<Json<RunMatchingResponse>, AppError>
where
    S: TableSource + 'static,
    P: ProfileGenerator + 'static,
{
    let RunMatchingRequest {
        benchmark_employee_ids,
        include_details,
    } = payload;

    let report = run_report(&state, benchmark_employee_ids.clone()).await?;
    let warnings = soft_warnings(&report, &benchmark_employee_ids, &state.settings);
    let ranking = report.ranking().into_iter().map(RankingEntry::from_row).collect();
    let details = include_details.then(|| report.rows.clone());

    Ok(Json(RunMatchingResponse {
        generated_at: Utc::now(),
        latest_competency_year: report.latest_competency_year,
        benchmark_size: benchmark_employee_ids.len(),
        warnings,
        ranking,
        details,
    }))
}

pub(crate) async fn export_matching_endpoint<S, P>(
    State(state): State<Arc<MatchingState<S, P>>>,
    Json(payload): Json<ExportMatchingRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, AppError>
where
    S: TableSource + 'static,
    P: ProfileGenerator + 'static,
{
    let ExportMatchingRequest {
        benchmark_employee_ids,
        columns,
        include_details,
    } = payload;

    let report = run_report(&state, benchmark_employee_ids).await?;

    let columns: Vec<String> = columns.unwrap_or_else(|| {
        DEFAULT_EXPORT_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .collect()
    });

    let body = if include_details {
        export::to_csv(&report.rows, &columns)?
    } else {
        export::to_csv(report.ranking(), &columns)?
    };

    let filename = format!(
        "attachment; filename=\"talent_match_{}.csv\"",
        Utc::now().format("%Y%m%d")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}

pub(crate) async fn reference_employees_endpoint<S, P>(
    State(state): State<Arc<MatchingState<S, P>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: TableSource + 'static,
    P: ProfileGenerator + 'static,
{
    let reference = state.reference.clone();
    let source = state.source.clone();
    let lists =
        tokio::task::spawn_blocking(move || reference.get_or_refresh(&*source)).await??;
    Ok(Json(json!({ "employees": lists.employees })))
}

pub(crate) async fn reference_roles_endpoint<S, P>(
    State(state): State<Arc<MatchingState<S, P>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: TableSource + 'static,
    P: ProfileGenerator + 'static,
{
    let reference = state.reference.clone();
    let source = state.source.clone();
    let lists =
        tokio::task::spawn_blocking(move || reference.get_or_refresh(&*source)).await??;
    Ok(Json(json!({ "roles": lists.roles })))
}

pub(crate) async fn generate_profile_endpoint<S, P>(
    State(state): State<Arc<MatchingState<S, P>>>,
    Json(payload): Json<GenerateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: TableSource + 'static,
    P: ProfileGenerator + 'static,
{
    let GenerateProfileRequest {
        role_name,
        role_purpose,
        job_level,
        benchmark_employee_ids,
    } = payload;

    if role_name.trim().is_empty() {
        return Err(AppError::Validation("role_name must not be empty".to_string()));
    }
    if role_purpose.trim().is_empty() {
        return Err(AppError::Validation(
            "role_purpose must not be empty".to_string(),
        ));
    }

    let benchmark_summary = match &benchmark_employee_ids {
        Some(ids) if !ids.is_empty() => {
            let report = run_report(&state, ids.clone()).await?;
            Some(report.benchmark_summary(ids))
        }
        _ => None,
    };

    let generator = state.generator.clone();
    let request = ProfileRequest {
        role_name,
        role_purpose,
        job_level,
        benchmark_summary,
    };
    let profile =
        tokio::task::spawn_blocking(move || generator.generate(&request)).await??;

    Ok(Json(json!({ "profile": profile })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_tables;
    use crate::infra::FixtureTableSource;
    use std::time::Duration;
    use talent_match::config::MatchingConfig;
    use talent_match::matching::MatchingEngine;
    use talent_match::profile::{JobProfile, ProfileError};
    use talent_match::source::ReferenceCache;

    struct StubGenerator;

    impl ProfileGenerator for StubGenerator {
        fn generate(&self, request: &ProfileRequest) -> Result<JobProfile, ProfileError> {
            Ok(JobProfile {
                job_description: format!("Stub profile for {}", request.role_name),
                responsibilities: vec!["Own the talent pipeline".to_string()],
                qualifications: vec!["Analytical background".to_string()],
                key_competencies: request
                    .benchmark_summary
                    .iter()
                    .map(|summary| summary.lines().count().to_string())
                    .collect(),
            })
        }
    }

    fn state() -> Arc<MatchingState<FixtureTableSource, StubGenerator>> {
        let source = Arc::new(FixtureTableSource::new(demo_tables()));
        Arc::new(MatchingState {
            engine: Arc::new(MatchingEngine::new(source.clone())),
            source,
            reference: Arc::new(ReferenceCache::new(Duration::from_secs(60))),
            generator: Arc::new(StubGenerator),
            settings: MatchingConfig::default(),
        })
    }

    fn benchmark() -> Vec<String> {
        vec!["E1".to_string(), "E2".to_string(), "E3".to_string()]
    }

    fn sparse_report() -> MatchReport {
        let row = |employee: &str| MatchRow {
            employee_id: employee.to_string(),
            fullname: None,
            directorate: None,
            role: None,
            grade: None,
            tgv_name: "Cognitive".to_string(),
            tv_name: "iq".to_string(),
            meaning: None,
            behavior_example: None,
            note: None,
            baseline_score: Some(100.0),
            user_score: 90.0,
            tv_match_rate: Some(90.0),
            tgv_match_rate: Some(90.0),
            final_match_rate: Some(90.0),
            data_completeness: 40.0,
        };

        MatchReport {
            rows: vec![row("E1"), row("E2"), row("E3")],
            latest_competency_year: Some(2024),
        }
    }

    #[test]
    fn soft_warnings_flag_low_benchmark_completeness() {
        // Full-size cohort, so only the data-quality branch can fire: each
        // benchmark employee carries 40% completeness against the default
        // 80% threshold.
        let warnings = soft_warnings(&sparse_report(), &benchmark(), &MatchingConfig::default());

        assert_eq!(warnings.len(), 1, "got: {warnings:?}");
        assert!(warnings[0].contains("average completeness 40.0%"), "got: {}", warnings[0]);
        assert!(warnings[0].contains("threshold 80%"), "got: {}", warnings[0]);
    }

    #[tokio::test]
    async fn run_endpoint_returns_ranking_without_details_by_default() {
        let request = RunMatchingRequest {
            benchmark_employee_ids: benchmark(),
            include_details: false,
        };

        let Json(body) = run_matching_endpoint(State(state()), Json(request))
            .await
            .expect("matching runs");

        assert_eq!(body.benchmark_size, 3);
        assert!(body.warnings.is_empty());
        assert!(body.details.is_none());
        assert!(!body.ranking.is_empty());

        // Ranking is deduplicated and descending by final rate.
        let rates: Vec<f64> = body
            .ranking
            .iter()
            .filter_map(|entry| entry.final_match_rate)
            .collect();
        for pair in rates.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[tokio::test]
    async fn run_endpoint_warns_on_small_benchmark() {
        let request = RunMatchingRequest {
            benchmark_employee_ids: vec!["E1".to_string()],
            include_details: true,
        };

        let Json(body) = run_matching_endpoint(State(state()), Json(request))
            .await
            .expect("matching runs");

        assert!(body
            .warnings
            .iter()
            .any(|warning| warning.contains("recommended")));
        assert!(body.details.is_some());
    }

    #[tokio::test]
    async fn run_endpoint_rejects_empty_benchmark() {
        let request = RunMatchingRequest {
            benchmark_employee_ids: Vec::new(),
            include_details: false,
        };

        let error = run_matching_endpoint(State(state()), Json(request))
            .await
            .expect_err("empty benchmark rejected");
        assert!(matches!(
            error,
            AppError::Matching(talent_match::matching::MatchingError::EmptyBenchmark)
        ));
    }

    #[tokio::test]
    async fn export_endpoint_produces_csv_with_default_columns() {
        let request = ExportMatchingRequest {
            benchmark_employee_ids: benchmark(),
            columns: None,
            include_details: false,
        };

        let response = export_matching_endpoint(State(state()), Json(request))
            .await
            .expect("export succeeds")
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .expect("content type set");
        assert_eq!(content_type, "text/csv");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body = String::from_utf8(bytes.to_vec()).expect("utf-8 csv");
        assert!(body.starts_with("employee_id,fullname,role,grade,directorate"));
    }

    #[tokio::test]
    async fn export_endpoint_rejects_unknown_columns() {
        let request = ExportMatchingRequest {
            benchmark_employee_ids: benchmark(),
            columns: Some(vec!["employee_id".to_string(), "shoe_size".to_string()]),
            include_details: false,
        };

        let error = export_matching_endpoint(State(state()), Json(request))
            .await
            .expect_err("unknown column rejected");
        assert!(matches!(error, AppError::Export(_)));
    }

    #[tokio::test]
    async fn reference_endpoints_serve_cached_lists() {
        let shared = state();

        let Json(employees) = reference_employees_endpoint(State(shared.clone()))
            .await
            .expect("employees load");
        assert!(employees["employees"]
            .as_array()
            .is_some_and(|list| !list.is_empty()));

        let Json(roles) = reference_roles_endpoint(State(shared))
            .await
            .expect("roles load");
        assert!(roles["roles"].as_array().is_some_and(|list| !list.is_empty()));
    }

    #[tokio::test]
    async fn profile_endpoint_forwards_benchmark_summary() {
        let request = GenerateProfileRequest {
            role_name: "Data Analyst".to_string(),
            role_purpose: "Find talent".to_string(),
            job_level: "IV".to_string(),
            benchmark_employee_ids: Some(benchmark()),
        };

        let Json(body) = generate_profile_endpoint(State(state()), Json(request))
            .await
            .expect("profile generates");

        assert_eq!(
            body["profile"]["job_description"].as_str(),
            Some("Stub profile for Data Analyst")
        );
        // The stub records how many summary lines it received.
        assert!(body["profile"]["key_competencies"]
            .as_array()
            .is_some_and(|list| !list.is_empty()));
    }

    #[tokio::test]
    async fn profile_endpoint_rejects_blank_role_name() {
        let request = GenerateProfileRequest {
            role_name: "   ".to_string(),
            role_purpose: "Find talent".to_string(),
            job_level: "IV".to_string(),
            benchmark_employee_ids: None,
        };

        let error = generate_profile_endpoint(State(state()), Json(request))
            .await
            .expect_err("blank role rejected");
        assert!(matches!(error, AppError::Validation(_)));
    }
}
