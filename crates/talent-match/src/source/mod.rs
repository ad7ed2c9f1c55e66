pub mod cache;
mod rest;
pub mod tables;

pub use cache::{EmployeeOption, ReferenceCache, ReferenceLists};
pub use rest::RestTableSource;

/// One record from an upstream table, kept as loose field-value pairs because
/// the source schemas are only partially known (optional columns appear and
/// disappear between deployments).
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Table names the matching pipeline reads. Every one of these must fetch
/// non-empty for a run to proceed.
pub mod table {
    pub const EMPLOYEES: &str = "employees";
    pub const DIM_POSITIONS: &str = "dim_positions";
    pub const DIM_DIRECTORATES: &str = "dim_directorates";
    pub const DIM_GRADES: &str = "dim_grades";
    pub const PROFILES_PSYCH: &str = "profiles_psych";
    pub const COMPETENCIES_YEARLY: &str = "competencies_yearly";
    pub const PAPI_SCORES: &str = "papi_scores";
    pub const DIM_TALENT_MAPPING: &str = "dim_talent_mapping";
}

/// Storage abstraction so the matching engine can be exercised against
/// in-memory fixtures as well as the REST-backed production source.
pub trait TableSource: Send + Sync {
    /// Fetch every row of a named table. Transport failures surface as
    /// `SourceError::Unavailable` once the client's retries are spent.
    fn fetch_all(&self, table: &str) -> Result<Vec<Row>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("table source unavailable for '{table}': {detail}")]
    Unavailable { table: String, detail: String },
    #[error("table '{table}' returned a malformed payload: {detail}")]
    Malformed { table: String, detail: String },
}
