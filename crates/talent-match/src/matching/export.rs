//! Flat delimited export of the ranked table, restricted to a caller-chosen
//! column subset, with standard CSV quoting.

use super::rank::MatchRow;

/// Every column the export understands, in canonical order.
pub const EXPORT_COLUMNS: &[&str] = &[
    "employee_id",
    "fullname",
    "directorate",
    "role",
    "grade",
    "tgv_name",
    "tv_name",
    "meaning",
    "behavior_example",
    "note",
    "baseline_score",
    "user_score",
    "tv_match_rate",
    "tgv_match_rate",
    "final_match_rate",
    "data_completeness",
];

/// Columns of the per-employee ranking download.
pub const DEFAULT_EXPORT_COLUMNS: &[&str] = &[
    "employee_id",
    "fullname",
    "role",
    "grade",
    "directorate",
    "data_completeness",
    "final_match_rate",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unknown export column '{0}'")]
    UnknownColumn(String),
    #[error("no export columns requested")]
    NoColumns,
    #[error("failed to encode csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output was not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("failed to write csv: {0}")]
    Io(#[from] std::io::Error),
}

pub fn to_csv<'a, I, S>(rows: I, columns: &[S]) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a MatchRow>,
    S: AsRef<str>,
{
    if columns.is_empty() {
        return Err(ExportError::NoColumns);
    }
    for column in columns {
        if !EXPORT_COLUMNS.contains(&column.as_ref()) {
            return Err(ExportError::UnknownColumn(column.as_ref().to_string()));
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(AsRef::as_ref))?;

    for row in rows {
        writer.write_record(columns.iter().map(|column| column_value(row, column.as_ref())))?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn column_value(row: &MatchRow, column: &str) -> String {
    match column {
        "employee_id" => row.employee_id.clone(),
        "fullname" => optional_text(&row.fullname),
        "directorate" => optional_text(&row.directorate),
        "role" => optional_text(&row.role),
        "grade" => optional_text(&row.grade),
        "tgv_name" => row.tgv_name.clone(),
        "tv_name" => row.tv_name.clone(),
        "meaning" => optional_text(&row.meaning),
        "behavior_example" => optional_text(&row.behavior_example),
        "note" => optional_text(&row.note),
        "baseline_score" => optional_number(row.baseline_score),
        "user_score" => format_number(row.user_score),
        "tv_match_rate" => optional_number(row.tv_match_rate),
        "tgv_match_rate" => optional_number(row.tgv_match_rate),
        "final_match_rate" => optional_number(row.final_match_rate),
        "data_completeness" => format_number(row.data_completeness),
        // Unreachable: columns were validated up front.
        _ => String::new(),
    }
}

fn optional_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn optional_number(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

fn format_number(value: f64) -> String {
    format!("{value}")
}
