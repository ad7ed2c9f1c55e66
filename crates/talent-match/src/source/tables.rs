//! Tolerant field access over loosely-typed source rows.
//!
//! Upstream tables deliver numbers as JSON numbers or as strings depending on
//! how the column was loaded; anything that fails to parse as a real number is
//! treated as missing, never as zero.

use super::Row;
use serde_json::Value;
use std::collections::BTreeMap;

/// Read a text field, trimming whitespace. Numeric values are rendered as
/// text so identifier columns survive either representation.
pub fn text_field(row: &Row, name: &str) -> Option<String> {
    match row.get(name)? {
        Value::String(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Read a numeric field, coercing numeric strings. Non-finite values count
/// as missing.
pub fn numeric_field(row: &Row, name: &str) -> Option<f64> {
    let value = match row.get(name)? {
        Value::Number(value) => value.as_f64()?,
        Value::String(value) => value.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

pub fn integer_field(row: &Row, name: &str) -> Option<i64> {
    match row.get(name)? {
        Value::Number(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float as i64)),
        Value::String(value) => value.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Descriptive fields for one employee, used to enrich the ranked output.
#[derive(Debug, Clone)]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub fullname: Option<String>,
    pub directorate_id: Option<String>,
    pub position_id: Option<String>,
    pub grade_id: Option<String>,
}

impl EmployeeRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            employee_id: text_field(row, "employee_id")?,
            fullname: text_field(row, "fullname"),
            directorate_id: text_field(row, "directorate_id"),
            position_id: text_field(row, "position_id"),
            grade_id: text_field(row, "grade_id"),
        })
    }
}

/// Index employee rows by id, first row winning on duplicates.
pub fn employee_index(rows: &[Row]) -> BTreeMap<String, EmployeeRecord> {
    let mut index = BTreeMap::new();
    for row in rows {
        if let Some(record) = EmployeeRecord::from_row(row) {
            index
                .entry(record.employee_id.clone())
                .or_insert(record);
        }
    }
    index
}

/// Index a dimension table (`dim_directorates`, `dim_positions`,
/// `dim_grades`) from its id column to its display name.
pub fn dimension_index(rows: &[Row], id_column: &str) -> BTreeMap<String, String> {
    let mut index = BTreeMap::new();
    for row in rows {
        let (Some(id), Some(name)) = (text_field(row, id_column), text_field(row, "name")) else {
            continue;
        };
        index.entry(id).or_insert(name);
    }
    index
}
