use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_match::config::MatchingConfig;
use talent_match::matching::MatchingEngine;
use talent_match::source::{ReferenceCache, Row, SourceError, TableSource};

/// Liveness/metrics state shared with the health endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the matching and profile routes need, generic over the table
/// source and profile generator so tests can swap in fixtures.
pub(crate) struct MatchingState<S, P> {
    pub(crate) engine: Arc<MatchingEngine<S>>,
    pub(crate) source: Arc<S>,
    pub(crate) reference: Arc<ReferenceCache>,
    pub(crate) generator: Arc<P>,
    pub(crate) settings: MatchingConfig,
}

/// In-memory table source backing the demo command and the route tests.
#[derive(Default, Clone)]
pub(crate) struct FixtureTableSource {
    tables: HashMap<&'static str, Vec<Row>>,
}

impl FixtureTableSource {
    pub(crate) fn new(tables: HashMap<&'static str, Vec<Row>>) -> Self {
        Self { tables }
    }
}

impl TableSource for FixtureTableSource {
    fn fetch_all(&self, table: &str) -> Result<Vec<Row>, SourceError> {
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}
