//! Static reference data describing every known sub-test: which talent group
//! it belongs to, its descriptive text, and whether its scale is inverted.

use crate::source::{tables, Row};
use std::collections::BTreeMap;

const COL_SUBTEST: &str = "Sub-test";
const COL_GROUP: &str = "Talent Group Variable (TGV)";
const COL_MEANING: &str = "Meaning";
const COL_BEHAVIOR: &str = "Behavior Example";
const COL_NOTE: &str = "Note";

/// Whether a higher raw value is better (`Normal`) or worse (`Inverse`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Normal,
    Inverse,
}

impl ScaleDirection {
    /// The mapping table signals an inverted scale through free text in its
    /// note column rather than a dedicated flag.
    pub fn from_note(note: Option<&str>) -> Self {
        match note {
            Some(text) if text.to_ascii_lowercase().contains("inverse scale") => Self::Inverse,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubtestEntry {
    pub tv_name: String,
    pub tgv_name: String,
    pub direction: ScaleDirection,
    pub meaning: Option<String>,
    pub behavior_example: Option<String>,
    pub note: Option<String>,
}

/// One entry per sub-test name; raw scores whose sub-test is absent from the
/// catalog are dropped entirely by the join in the engine.
#[derive(Debug, Default)]
pub struct SubtestCatalog {
    entries: BTreeMap<String, SubtestEntry>,
}

impl SubtestCatalog {
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut entries = BTreeMap::new();

        for row in rows {
            let (Some(tv_name), Some(tgv_name)) = (
                tables::text_field(row, COL_SUBTEST),
                tables::text_field(row, COL_GROUP),
            ) else {
                continue;
            };

            let note = tables::text_field(row, COL_NOTE);
            let entry = SubtestEntry {
                direction: ScaleDirection::from_note(note.as_deref()),
                meaning: tables::text_field(row, COL_MEANING),
                behavior_example: tables::text_field(row, COL_BEHAVIOR),
                note,
                tv_name: tv_name.clone(),
                tgv_name,
            };

            // One mapping row per sub-test; first row wins on duplicates.
            entries.entry(tv_name).or_insert(entry);
        }

        Self { entries }
    }

    pub fn get(&self, tv_name: &str) -> Option<&SubtestEntry> {
        self.entries.get(tv_name)
    }

    /// Global denominator for data completeness.
    pub fn distinct_subtests(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).expect("fixture rows deserialize")
    }

    #[test]
    fn direction_inferred_from_note_text() {
        assert_eq!(
            ScaleDirection::from_note(Some("Inverse Scale: lower is better")),
            ScaleDirection::Inverse
        );
        assert_eq!(
            ScaleDirection::from_note(Some("INVERSE SCALE")),
            ScaleDirection::Inverse
        );
        assert_eq!(
            ScaleDirection::from_note(Some("higher is better")),
            ScaleDirection::Normal
        );
        assert_eq!(ScaleDirection::from_note(None), ScaleDirection::Normal);
    }

    #[test]
    fn catalog_keeps_first_row_per_subtest() {
        let catalog = SubtestCatalog::from_rows(&rows(json!([
            { "Sub-test": "iq", "Talent Group Variable (TGV)": "Cognitive", "Meaning": "General reasoning" },
            { "Sub-test": "iq", "Talent Group Variable (TGV)": "Duplicate Group" },
            { "Sub-test": "Z", "Talent Group Variable (TGV)": "Behavioral", "Note": "Inverse Scale" }
        ])));

        assert_eq!(catalog.distinct_subtests(), 2);
        let iq = catalog.get("iq").expect("iq mapped");
        assert_eq!(iq.tgv_name, "Cognitive");
        assert_eq!(iq.direction, ScaleDirection::Normal);
        assert_eq!(iq.meaning.as_deref(), Some("General reasoning"));

        let z = catalog.get("Z").expect("Z mapped");
        assert_eq!(z.direction, ScaleDirection::Inverse);
    }

    #[test]
    fn rows_without_group_are_skipped() {
        let catalog = SubtestCatalog::from_rows(&rows(json!([
            { "Sub-test": "orphan" }
        ])));
        assert!(catalog.is_empty());
        assert!(catalog.get("orphan").is_none());
    }
}
